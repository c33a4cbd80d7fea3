use crate::command::Command;
use crate::context::CqrsContext;
use crate::errors::CqrsError;
use crate::handler::Handler;
use futures::future::BoxFuture;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

type ErasedHandlerFn =
    Arc<dyn Fn(Box<dyn Any + Send>, CqrsContext) -> BoxFuture<'static, Result<(), CqrsError>> + Send + Sync>;

type ErasedDecoder = Arc<dyn Fn(serde_json::Value) -> Result<Box<dyn Any + Send>, serde_json::Error> + Send + Sync>;

/// The command registry (spec §4.E): maps a schema URN to a concrete Rust
/// type, and that type to a handler, without any dynamic reflection at the
/// call sites that invoke it. Registration is the only place `TypeId` and
/// `Any` appear.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    schema_to_type: HashMap<String, TypeId>,
    type_to_handler: HashMap<TypeId, ErasedHandlerFn>,
    schema_to_decoder: HashMap<String, ErasedDecoder>,
}

impl CommandRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` to serve every command of type `C`. Only one
    /// handler may own a given schema; registering the same schema twice
    /// replaces the prior mapping (last registration wins, matching how
    /// the registry is built once at startup).
    pub fn register<C>(&mut self, handler: Arc<dyn Handler<C>>)
    where
        C: Command,
    {
        let type_id = TypeId::of::<C>();
        self.schema_to_type.insert(C::SCHEMA.to_string(), type_id);
        self.schema_to_decoder.insert(
            C::SCHEMA.to_string(),
            Arc::new(|payload: serde_json::Value| {
                let command: C = serde_json::from_value(payload)?;
                Ok(Box::new(command) as Box<dyn Any + Send>)
            }),
        );
        self.type_to_handler.insert(
            type_id,
            Arc::new(move |boxed, context| {
                let handler = handler.clone();
                Box::pin(async move {
                    let command = *boxed
                        .downcast::<C>()
                        .expect("decoder and handler registered for the same TypeId");
                    handler.handle(command, &context).await
                })
            }),
        );
    }

    pub fn is_registered(&self, schema: &str) -> bool {
        self.schema_to_type.contains_key(schema)
    }

    pub fn known_schemas(&self) -> Vec<String> {
        self.schema_to_type.keys().cloned().collect()
    }

    /// Decodes `payload` against `schema` and dispatches it to its
    /// registered handler. `UnknownSchema` if nothing is registered for it,
    /// `NoHandler` if a schema is known but (incorrectly) has no handler
    /// wired — a setup bug, not a runtime condition a well-formed registry
    /// should ever hit. This is the entry point for callers that only hold
    /// a schema URN and a JSON payload (CloudEvents ingress, the queue
    /// receiver) — `DeserializeCommand` followed by dispatch, per spec §4.E.
    pub async fn dispatch_payload(
        &self,
        schema: &str,
        payload: serde_json::Value,
        context: CqrsContext,
    ) -> Result<(), CqrsError> {
        let type_id = self
            .schema_to_type
            .get(schema)
            .ok_or_else(|| CqrsError::UnknownSchema(schema.to_string()))?;
        let decoder = self
            .schema_to_decoder
            .get(schema)
            .ok_or_else(|| CqrsError::UnknownSchema(schema.to_string()))?;
        let boxed = decoder(payload)?;
        let handler = self
            .type_to_handler
            .get(type_id)
            .ok_or_else(|| CqrsError::NoHandler(schema.to_string()))?;
        handler(boxed, context).await
    }

    /// Dispatches an already-typed command straight to its handler by
    /// runtime type token, skipping JSON encode/decode entirely (spec
    /// §4.F: "resolution is by the command's runtime type token"). This is
    /// what `CommandBus::send` calls for in-process callers holding a
    /// concrete `Command` value.
    pub async fn dispatch_typed<C>(&self, command: C, context: CqrsContext) -> Result<(), CqrsError>
    where
        C: Command,
    {
        let type_id = TypeId::of::<C>();
        let handler = self
            .type_to_handler
            .get(&type_id)
            .ok_or_else(|| CqrsError::NoHandler(std::any::type_name::<C>().to_string()))?;
        handler(Box::new(command), context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{AggregateId, Metadata};
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};

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

    struct CountingHandler(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Handler<PingCommand> for CountingHandler {
        async fn handle(&self, _command: PingCommand, _context: &CqrsContext) -> Result<(), CqrsError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_routes_to_registered_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(CountingHandler(counter.clone())) as Arc<dyn Handler<PingCommand>>);

        let payload = serde_json::json!({ "metadata": { "id": "m1", "correlationId": "c1" } });
        registry
            .dispatch_payload(PingCommand::SCHEMA, payload, CqrsContext::default())
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_unknown_schema_errors() {
        let registry = CommandRegistry::new();
        let result = registry
            .dispatch_payload("urn:schema:jade:command:unknown:act:1", serde_json::json!({}), CqrsContext::default())
            .await;
        assert!(matches!(result, Err(CqrsError::UnknownSchema(_))));
    }

    #[allow(dead_code)]
    fn assert_aggregate_id_type(_: AggregateId) {}

    #[tokio::test]
    async fn dispatch_typed_skips_json_round_trip() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = CommandRegistry::new();
        registry.register(Arc::new(CountingHandler(counter.clone())) as Arc<dyn Handler<PingCommand>>);

        let command = PingCommand {
            metadata: Metadata::new("m1", "c1"),
        };
        registry
            .dispatch_typed(command, CqrsContext::default())
            .await
            .unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_typed_unregistered_type_is_no_handler() {
        let registry = CommandRegistry::new();
        let command = PingCommand {
            metadata: Metadata::new("m1", "c1"),
        };
        let result = registry.dispatch_typed(command, CqrsContext::default()).await;
        assert!(matches!(result, Err(CqrsError::NoHandler(_))));
    }
}
