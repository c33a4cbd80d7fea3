use crate::errors::CqrsError;
use crate::event::EventEnvelope;
use crate::metadata::Version;
use crate::{Aggregate, CqrsContext};
use std::fmt::Debug;

/// The repository contract (spec §4.D): rehydrate an aggregate by id, and
/// append new events under optimistic concurrency.
///
/// `get_by_id` only ever fails with `CqrsError::NotFound` or
/// `CqrsError::StoreFailure`. `save` only ever fails with
/// `CqrsError::Concurrency` or `CqrsError::StoreFailure`.
#[async_trait::async_trait]
pub trait EventStore<A>: Debug + Send + Sync
where
    A: Aggregate + 'static,
{
    async fn get_by_id(&self, aggregate_id: &str) -> Result<(A, Version), CqrsError>;

    /// Commits `events`, which must have been produced against a stream at
    /// exactly `expected_version` (`0` for a brand-new stream).
    /// `resulting_state` is the aggregate folded through `events`; passed in
    /// so the store can snapshot without re-deriving it.
    async fn save(
        &self,
        aggregate_id: &str,
        resulting_state: &A,
        events: Vec<A::Event>,
        expected_version: Version,
        context: &CqrsContext,
    ) -> Result<Vec<EventEnvelope<A>>, CqrsError>;
}

pub type DynEventStore<A> = std::sync::Arc<dyn EventStore<A>>;
