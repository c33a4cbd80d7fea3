use crate::command::Command;
use crate::errors::CqrsError;
use crate::registry::CommandRegistry;
use crate::CqrsContext;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// The command bus's error surface (spec §4.F): deliberately narrower than
/// `CqrsError` — a bus caller only ever needs to know "nothing could take
/// this" vs. "something took it and failed."
#[derive(Debug, Clone, Error)]
pub enum BusError {
    #[error("no handler registered for command type {0}")]
    NoHandler(String),
    #[error("handler failed: {0}")]
    HandlerError(String),
}

/// The command bus (spec §4.F): `Send(command) -> Result<(), BusError>`,
/// resolved by the command's runtime type token — the in-process entry
/// point for a caller holding a concrete `Command` value. CloudEvents
/// ingress and the queue receiver hold only a schema URN and a JSON
/// payload instead of a typed command, so they go through
/// `dispatch_payload` directly against the registry (spec §4.E); that path
/// isn't part of the bus's own contract and keeps its wider `CqrsError`
/// taxonomy (`UnknownSchema`, `MalformedPayload`) instead of `BusError`.
#[derive(Clone)]
pub struct CommandBus {
    registry: Arc<CommandRegistry>,
}

impl CommandBus {
    #[must_use]
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self { registry }
    }

    /// Sends a concrete command to its registered handler by type, with no
    /// registration-time schema work at the call site (spec §4.F).
    pub async fn send<C>(&self, command: C, context: CqrsContext) -> Result<(), BusError>
    where
        C: Command,
    {
        let type_name = std::any::type_name::<C>();
        let result = self.registry.dispatch_typed(command, context).await;
        match &result {
            Ok(()) => info!(command = type_name, "command sent"),
            Err(e) => warn!(command = type_name, error = %e, "command send failed"),
        }
        result.map_err(|e| match e {
            CqrsError::NoHandler(name) => BusError::NoHandler(name),
            other => BusError::HandlerError(other.to_string()),
        })
    }

    /// Decodes `payload` against `schema` and dispatches it, for callers
    /// (CloudEvents ingress, the queue receiver) that only hold a schema
    /// URN and a JSON payload rather than a typed command.
    pub async fn dispatch_payload(
        &self,
        schema: &str,
        payload: serde_json::Value,
        context: CqrsContext,
    ) -> Result<(), CqrsError> {
        self.registry.dispatch_payload(schema, payload, context).await
    }

    pub fn is_known(&self, schema: &str) -> bool {
        self.registry.is_registered(schema)
    }

    pub fn known_schemas(&self) -> Vec<String> {
        self.registry.known_schemas()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct PingCommand {
        metadata: Metadata,
    }

    impl Command for PingCommand {
        const SCHEMA: &'static str = "urn:schema:jade:command:ping:send:1";
        fn metadata(&self) -> &Metadata {
            &self.metadata
        }
    }

    #[tokio::test]
    async fn send_with_no_handler_is_bus_no_handler() {
        let bus = CommandBus::new(Arc::new(CommandRegistry::new()));
        let command = PingCommand {
            metadata: Metadata::new("m1", "c1"),
        };
        let result = bus.send(command, CqrsContext::default()).await;
        assert!(matches!(result, Err(BusError::NoHandler(_))));
    }

    #[tokio::test]
    async fn unknown_schema_is_reported_before_dispatch() {
        let bus = CommandBus::new(Arc::new(CommandRegistry::new()));
        assert!(!bus.is_known("urn:schema:jade:command:ghost:act:1"));
        let result = bus
            .dispatch_payload(
                "urn:schema:jade:command:ghost:act:1",
                serde_json::json!({}),
                CqrsContext::default(),
            )
            .await;
        assert!(matches!(result, Err(CqrsError::UnknownSchema(_))));
    }
}
