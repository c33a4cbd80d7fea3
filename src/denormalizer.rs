use crate::{Aggregate, CqrsContext, CqrsError, EventEnvelope};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// The projection contract (spec §9 design note): anything that needs to
/// react to committed events without being on the write path implements
/// this. Dispatch failures never fail the command that produced the
/// events — the engine routes them to its error handler instead.
#[async_trait::async_trait]
pub trait Dispatcher<A: Aggregate>: Send + Sync {
    async fn dispatch(
        &self,
        aggregate_id: &str,
        events: &[EventEnvelope<A>],
        context: &CqrsContext,
    ) -> Result<(), CqrsError>;
}

/// A read-model view built by folding an aggregate's events.
pub trait View<A: Aggregate>: Debug + Clone + Default + Serialize + DeserializeOwned + Send + Sync {
    const TYPE: &'static str;

    fn view_id(event: &EventEnvelope<A>) -> String;

    /// `None` means this event doesn't affect the view.
    fn update(&self, event: &EventEnvelope<A>) -> Option<Self>;
}

pub trait ViewElements<A: Aggregate>: View<A> {
    fn aggregate_id(&self) -> String;
}
