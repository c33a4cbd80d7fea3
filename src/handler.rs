use crate::command::IntoAggregateCommand;
use crate::errors::CqrsError;
use crate::event_store::EventStore;
use crate::{Aggregate, CqrsCommandEngine, CqrsContext};
use std::sync::Arc;

/// The custom handler surface (spec §4.K): anything that turns one command
/// into effects — an aggregate command via the engine, or a side effect
/// with no aggregate at all — implements this.
#[async_trait::async_trait]
pub trait Handler<C>: Send + Sync {
    async fn handle(&self, command: C, context: &CqrsContext) -> Result<(), CqrsError>;
}

/// Wraps a `CqrsCommandEngine` so every command that converts into `A`'s
/// unified command type is servable by a single handler instance — the
/// "any-command" pattern (spec §9 design note): one concrete Rust type per
/// action, routed by a blanket impl instead of a non-object-safe generic
/// dispatch method.
pub struct AggregateHandler<A, ES>
where
    A: Aggregate + 'static,
    ES: EventStore<A>,
{
    engine: Arc<CqrsCommandEngine<A, ES>>,
}

impl<A, ES> AggregateHandler<A, ES>
where
    A: Aggregate + 'static,
    ES: EventStore<A>,
{
    #[must_use]
    pub fn new(engine: Arc<CqrsCommandEngine<A, ES>>) -> Self {
        Self { engine }
    }
}

#[async_trait::async_trait]
impl<A, ES, C> Handler<C> for AggregateHandler<A, ES>
where
    A: Aggregate + 'static,
    ES: EventStore<A>,
    C: IntoAggregateCommand<A>,
{
    async fn handle(&self, command: C, context: &CqrsContext) -> Result<(), CqrsError> {
        let aggregate_id = command.aggregate_id();
        let metadata = command.metadata().clone();
        let command_context = context.clone().with_command_metadata(metadata);
        let aggregate_command = command.into_aggregate_command();
        self.engine
            .execute(aggregate_id, &aggregate_command, &command_context)
            .await?;
        Ok(())
    }
}
