use crate::bus::CommandBus;
use crate::cloudevents::{self, CloudEvent};
use crate::errors::CqrsError;
use crate::queue::storage::{PostgresQueue, QueuedMessage};
use crate::CqrsContext;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, warn};

const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);
const POLL_IDLE: Duration = Duration::from_secs(1);
const POLL_ERROR: Duration = Duration::from_secs(5);

/// One queue's consumer (spec §4.I): `Idle -> Polling -> Processing ->
/// Acking -> Polling`, looping until told to stop. Per-aggregate ordering
/// is not enforced here — the store's optimistic version is the ordering
/// authority (spec §4.I "Ordering").
pub struct QueueReceiver {
    queue: Arc<PostgresQueue>,
    queue_name: String,
    bus: CommandBus,
    visibility_timeout: Duration,
}

impl QueueReceiver {
    #[must_use]
    pub fn new(queue: Arc<PostgresQueue>, queue_name: impl Into<String>, bus: CommandBus) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            bus,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Runs the poll loop until `stop` is signalled true.
    pub async fn run(&self, mut stop: watch::Receiver<bool>) {
        debug!(queue = %self.queue_name, "receiver starting");
        loop {
            if *stop.borrow() {
                break;
            }
            tokio::select! {
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
                outcome = self.queue.poll(&self.queue_name, self.visibility_timeout) => {
                    match outcome {
                        Ok(Some(message)) => self.process(message).await,
                        Ok(None) => tokio::time::sleep(POLL_IDLE).await,
                        Err(e) => {
                            error!(queue = %self.queue_name, error = %e, "poll failed");
                            tokio::time::sleep(POLL_ERROR).await;
                        }
                    }
                }
            }
        }
        debug!(queue = %self.queue_name, "receiver stopped");
    }

    async fn process(&self, message: QueuedMessage) {
        match self.dispatch(&message).await {
            Ok(()) => {
                if let Err(e) = self.queue.ack(&self.queue_name, &message.id).await {
                    error!(queue = %self.queue_name, message_id = %message.id, error = %e, "ack failed");
                }
            }
            Err(e) => {
                warn!(
                    queue = %self.queue_name,
                    message_id = %message.id,
                    error = %e,
                    "processing failed, leaving message for retry"
                );
            }
        }
    }

    async fn dispatch(&self, message: &QueuedMessage) -> Result<(), CqrsError> {
        let ce: CloudEvent = serde_json::from_value(message.payload.clone())?;
        let schema = cloudevents::command_schema(&ce)?;
        let data = ce
            .data
            .clone()
            .ok_or_else(|| CqrsError::MalformedPayload("cloud event has no data".to_string()))?;
        self.bus.dispatch_payload(schema, data, CqrsContext::default()).await
    }
}
