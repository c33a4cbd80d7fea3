use crate::errors::CqrsError;
use crate::es::storage::{EventStoreStorage, EventStream};
use crate::event::EventEnvelope;
use crate::metadata::Version;
use crate::snapshot::Snapshot;
use crate::Aggregate;
use futures::stream;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Reference backend used by the crate's own tests and by consumers before
/// they wire up Postgres.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPersist<A>
where
    A: Aggregate,
{
    snapshots: Arc<Mutex<HashMap<String, Snapshot<A>>>>,
    journal: Arc<Mutex<HashMap<String, Vec<EventEnvelope<A>>>>>,
}

impl<A> InMemoryPersist<A>
where
    A: Aggregate,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl<A> EventStoreStorage<A> for InMemoryPersist<A>
where
    A: Aggregate,
{
    type Session = (
        OwnedMutexGuard<HashMap<String, Snapshot<A>>>,
        OwnedMutexGuard<HashMap<String, Vec<EventEnvelope<A>>>>,
    );

    async fn start_session(&self) -> Result<Self::Session, CqrsError> {
        let snapshots = self.snapshots.clone().lock_owned().await;
        let journal = self.journal.clone().lock_owned().await;
        Ok((snapshots, journal))
    }

    async fn commit_session(&self, _session: Self::Session) -> Result<(), CqrsError> {
        Ok(())
    }

    async fn fetch_snapshot(&self, aggregate_id: &str) -> Result<Option<Snapshot<A>>, CqrsError> {
        let snapshots = self.snapshots.lock().await;
        Ok(snapshots.get(aggregate_id).cloned())
    }

    async fn fetch_events_from_version(
        &self,
        aggregate_id: &str,
        version: Version,
    ) -> Result<EventStream<A>, CqrsError> {
        let journal = self.journal.lock().await;
        let items: Vec<Result<EventEnvelope<A>, CqrsError>> = journal
            .get(aggregate_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|e| e.version > version)
            .map(Ok)
            .collect();
        Ok(Box::pin(stream::iter(items)))
    }

    async fn append_events(
        &self,
        session: &mut Self::Session,
        aggregate_id: &str,
        events: Vec<EventEnvelope<A>>,
        expected_version: Version,
    ) -> Result<(), CqrsError> {
        let stream = session.1.entry(aggregate_id.to_string()).or_default();
        let current_version = stream.last().map(|e| e.version).unwrap_or(0);
        if current_version != expected_version {
            return Err(CqrsError::Concurrency);
        }
        stream.extend(events);
        Ok(())
    }

    async fn save_snapshot(
        &self,
        session: &mut Self::Session,
        snapshot: Snapshot<A>,
    ) -> Result<(), CqrsError> {
        session.0.insert(snapshot.aggregate_id.clone(), snapshot);
        Ok(())
    }
}
