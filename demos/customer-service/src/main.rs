mod config;
mod customer;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use jade_cqrs::cloudevents::http::CloudEventsState;
use jade_cqrs::cloudevents::IngressMode;
use jade_cqrs::es::postgres::PostgresPersist;
use jade_cqrs::es::EventStoreImpl;
use jade_cqrs::queue::{storage::PostgresQueue, QueueReceiver, WorkerHost};
use jade_cqrs::{Aggregate, AggregateHandler, CommandBus, CommandRegistry, CqrsCommandEngine, Handler};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use customer::{Customer, CreateCustomer, LoggingEmailGateway, SendWelcomeEmail, SendWelcomeEmailHandler, UpdateCustomer};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "customer_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Builds a connection pool rather than a single shared client: every
/// session (an aggregate save, a queue poll) checks out its own connection,
/// so concurrent requests never share a connection-scoped transaction.
fn build_pool(database_url: &str) -> anyhow::Result<deadpool_postgres::Pool> {
    let pg_config: tokio_postgres::Config = database_url.parse()?;
    let manager_config = deadpool_postgres::ManagerConfig {
        recycling_method: deadpool_postgres::RecyclingMethod::Fast,
    };
    let manager = deadpool_postgres::Manager::from_config(pg_config, tokio_postgres::NoTls, manager_config);
    let pool = deadpool_postgres::Pool::builder(manager).max_size(16).build()?;
    Ok(pool)
}

async fn health() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let config = Config::from_env();

    info!("connecting to database...");
    let pool = build_pool(&config.database_url)?;
    let persist = PostgresPersist::<Customer>::new(pool.clone());
    persist.ensure_schema().await?;

    let store_for_handler = Arc::new(EventStoreImpl::new(persist.clone()));
    let engine = Arc::new(CqrsCommandEngine::new(
        EventStoreImpl::new(persist),
        vec![],
        Box::new(|e| error!(error = %e, "dispatcher failed")),
    ));
    let handler = Arc::new(AggregateHandler::new(engine));
    let welcome_email_handler = Arc::new(SendWelcomeEmailHandler::new(
        store_for_handler,
        Arc::new(LoggingEmailGateway),
    ));

    let mut registry = CommandRegistry::new();
    registry.register(handler.clone() as Arc<dyn Handler<CreateCustomer>>);
    registry.register(handler.clone() as Arc<dyn Handler<UpdateCustomer>>);
    registry.register(welcome_email_handler as Arc<dyn Handler<SendWelcomeEmail>>);
    let bus = CommandBus::new(Arc::new(registry));

    let mut workers = None;
    let mode = if config.queued_ingress {
        let queue = Arc::new(PostgresQueue::new(pool.clone()));
        let mut receivers = Vec::with_capacity(config.queue_workers);
        for _ in 0..config.queue_workers {
            receivers.push(QueueReceiver::new(queue.clone(), Customer::PREFIX, bus.clone()));
        }
        workers = Some(WorkerHost::start(receivers));
        IngressMode::Queued(queue)
    } else {
        IngressMode::Direct(bus)
    };

    let cloud_events_state = Arc::new(CloudEventsState { mode });

    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let router = Router::new()
        .route("/health", get(health))
        .merge(jade_cqrs::cloudevents::http::router(cloud_events_state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    let addr = format!("{}:{}", config.host, config.port);
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(workers) = workers {
        workers.stop().await;
    }
    info!("server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
