use clap::Parser;

/// Runtime configuration, loaded from environment variables / CLI flags.
#[derive(Debug, Clone, Parser)]
#[command(name = "customer-service")]
pub struct Config {
    /// Postgres connection string.
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// HTTP server bind host.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// HTTP server bind port.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Route CloudEvents through the database queue instead of handling them
    /// inline on the request thread.
    #[arg(long, env = "QUEUED_INGRESS", default_value_t = false)]
    pub queued_ingress: bool,

    /// Number of queue receivers to run when `queued_ingress` is set.
    #[arg(long, env = "QUEUE_WORKERS", default_value_t = 2)]
    pub queue_workers: usize,
}

impl Config {
    pub fn from_env() -> Self {
        Config::parse()
    }
}
