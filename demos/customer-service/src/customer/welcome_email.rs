use std::sync::Arc;

use jade_cqrs::{Command, CqrsContext, CqrsError, EventStore, Handler, Metadata};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::aggregate::Customer;
use super::events::CustomerEvent;

/// Sends a customer's welcome email. Outside the aggregate: it has nothing
/// to decide about `Customer`'s own state transitions, only a side effect
/// to perform once and a fact to record that it happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendWelcomeEmail {
    pub customer_id: String,
    pub metadata: Metadata,
}

impl Command for SendWelcomeEmail {
    const SCHEMA: &'static str = "urn:schema:jade:command:customer:send-welcome-email:1";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

/// The external dependency this handler calls out to. Kept as a trait so
/// the handler's idempotency/rejection logic can be exercised without a
/// real mail provider.
#[async_trait::async_trait]
pub trait EmailGateway: Send + Sync {
    async fn send_welcome_email(&self, customer_id: &str, email: &str) -> Result<(), String>;
}

/// Logs instead of actually sending mail. Stands in for a real provider
/// (SES, Postmark, ...) until one is wired.
pub struct LoggingEmailGateway;

#[async_trait::async_trait]
impl EmailGateway for LoggingEmailGateway {
    async fn send_welcome_email(&self, customer_id: &str, email: &str) -> Result<(), String> {
        info!(customer_id, email, "welcome email sent");
        Ok(())
    }
}

/// Custom (non-aggregate) handler: reads `Customer` state directly off the
/// event store, calls an external gateway, then appends the outcome itself
/// rather than going through `Aggregate::create`/`decide`.
pub struct SendWelcomeEmailHandler<ES>
where
    ES: EventStore<Customer>,
{
    store: Arc<ES>,
    gateway: Arc<dyn EmailGateway>,
}

impl<ES> SendWelcomeEmailHandler<ES>
where
    ES: EventStore<Customer>,
{
    #[must_use]
    pub fn new(store: Arc<ES>, gateway: Arc<dyn EmailGateway>) -> Self {
        Self { store, gateway }
    }
}

#[async_trait::async_trait]
impl<ES> Handler<SendWelcomeEmail> for SendWelcomeEmailHandler<ES>
where
    ES: EventStore<Customer>,
{
    async fn handle(&self, command: SendWelcomeEmail, _context: &CqrsContext) -> Result<(), CqrsError> {
        let (customer, version) = match self.store.get_by_id(&command.customer_id).await {
            Ok(found) => found,
            Err(CqrsError::NotFound) => {
                return Err(CqrsError::DomainRejection(format!(
                    "customer {} does not exist",
                    command.customer_id
                )))
            }
            Err(e) => return Err(e),
        };

        if customer.welcome_email_sent {
            info!(customer_id = %command.customer_id, "welcome email already sent, skipping");
            return Ok(());
        }
        if customer.email.is_empty() {
            return Err(CqrsError::DomainRejection(format!(
                "customer {} has no email on file",
                command.customer_id
            )));
        }

        if let Err(e) = self.gateway.send_welcome_email(&command.customer_id, &customer.email).await {
            warn!(customer_id = %command.customer_id, error = %e, "welcome email gateway failed");
            return Err(CqrsError::ExternalFailure(e));
        }

        let event = CustomerEvent::WelcomeEmailSent;
        let mut resulting_state = customer;
        resulting_state.evolve(event.clone());
        self.store
            .save(&command.customer_id, &resulting_state, vec![event], version, _context)
            .await?;
        Ok(())
    }
}
