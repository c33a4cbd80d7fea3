use crate::errors::CqrsError;
use crate::event::EventEnvelope;
use crate::metadata::Version;
use crate::snapshot::Snapshot;
use crate::Aggregate;
use futures::stream::Stream;
use std::fmt::Debug;
use std::pin::Pin;

pub type EventStream<A> = Pin<Box<dyn Stream<Item = Result<EventEnvelope<A>, CqrsError>> + Send>>;

/// Low-level storage backend wired into `EventStoreImpl` (spec §4.D). A
/// backend only needs to get fetch and atomic append right; rehydration and
/// the create/update branching live in `EventStoreImpl`.
#[async_trait::async_trait]
pub trait EventStoreStorage<A>: Clone + Debug + Send + Sync
where
    A: Aggregate + 'static,
{
    type Session: Send + Sync;

    async fn start_session(&self) -> Result<Self::Session, CqrsError>;
    async fn commit_session(&self, session: Self::Session) -> Result<(), CqrsError>;

    async fn fetch_snapshot(&self, aggregate_id: &str) -> Result<Option<Snapshot<A>>, CqrsError>;

    async fn fetch_events_from_version(
        &self,
        aggregate_id: &str,
        version: Version,
    ) -> Result<EventStream<A>, CqrsError>;

    /// Appends `events` directly after `expected_version`, failing with
    /// `CqrsError::Concurrency` if the stream has since moved past it.
    /// `expected_version == 0` means "this stream must not exist yet".
    async fn append_events(
        &self,
        session: &mut Self::Session,
        aggregate_id: &str,
        events: Vec<EventEnvelope<A>>,
        expected_version: Version,
    ) -> Result<(), CqrsError>;

    async fn save_snapshot(
        &self,
        session: &mut Self::Session,
        snapshot: Snapshot<A>,
    ) -> Result<(), CqrsError>;
}
