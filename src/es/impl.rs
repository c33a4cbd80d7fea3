use crate::errors::CqrsError;
use crate::es::storage::EventStoreStorage;
use crate::event::EventEnvelope;
use crate::metadata::Version;
use crate::snapshot::{should_snapshot, Snapshot};
use crate::{Aggregate, CqrsContext, EventStore};
use chrono::Duration;
use futures::StreamExt;
use tracing::debug;

/// Generic `EventStore` over any `EventStoreStorage` backend: folds
/// snapshot + tail events into state on read, and decides when to
/// re-snapshot on write (spec §4.D, §9).
#[derive(Debug, Clone)]
pub struct EventStoreImpl<A, P>
where
    A: Aggregate,
    P: EventStoreStorage<A>,
{
    persist: P,
    snapshot_interval: u64,
    snapshot_max_age: Duration,
    _phantom: std::marker::PhantomData<A>,
}

impl<A, P> EventStoreImpl<A, P>
where
    A: Aggregate,
    P: EventStoreStorage<A>,
{
    #[must_use]
    pub fn new(persist: P) -> Self {
        Self {
            persist,
            snapshot_interval: 100,
            snapshot_max_age: Duration::hours(1),
            _phantom: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn with_snapshot_policy(mut self, interval: u64, max_age: Duration) -> Self {
        self.snapshot_interval = interval;
        self.snapshot_max_age = max_age;
        self
    }
}

#[async_trait::async_trait]
impl<A, P> EventStore<A> for EventStoreImpl<A, P>
where
    A: Aggregate,
    P: EventStoreStorage<A>,
{
    async fn get_by_id(&self, aggregate_id: &str) -> Result<(A, Version), CqrsError> {
        let maybe_snapshot = self.persist.fetch_snapshot(aggregate_id).await?;
        let (mut state, from_version) = match maybe_snapshot {
            Some(snapshot) => (Some(snapshot.state), snapshot.version),
            None => (None, 0),
        };

        let mut latest_version = from_version;
        let mut stream = self
            .persist
            .fetch_events_from_version(aggregate_id, from_version)
            .await?;
        while let Some(event) = stream.next().await {
            let event = event?;
            state = Some(match state {
                Some(mut agg) => {
                    agg.evolve(event.payload);
                    agg
                }
                None => A::init(event.payload),
            });
            latest_version = event.version;
        }

        match state {
            Some(agg) => Ok((agg, latest_version)),
            None => Err(CqrsError::NotFound),
        }
    }

    async fn save(
        &self,
        aggregate_id: &str,
        resulting_state: &A,
        events: Vec<A::Event>,
        expected_version: Version,
        context: &CqrsContext,
    ) -> Result<Vec<EventEnvelope<A>>, CqrsError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        // Fetched before the session starts: backends that hold their
        // session lock for its whole lifetime (e.g. `InMemoryPersist`)
        // would deadlock against their own lock otherwise.
        let last_snapshot = self.persist.fetch_snapshot(aggregate_id).await?;
        let (last_snapshot_version, last_snapshot_at) = match &last_snapshot {
            Some(snapshot) => (snapshot.version, Some(snapshot.snapshotted_at)),
            None => (0, None),
        };

        let mut session = self.persist.start_session().await?;
        let envelopes: Vec<EventEnvelope<A>> = events
            .into_iter()
            .enumerate()
            .map(|(i, payload)| EventEnvelope {
                event_id: context.next_uuid(),
                aggregate_id: aggregate_id.to_string(),
                version: expected_version + i as u64 + 1,
                payload,
                metadata: context.event_metadata(),
                at: context.now(),
            })
            .collect();

        self.persist
            .append_events(&mut session, aggregate_id, envelopes.clone(), expected_version)
            .await?;

        let new_version = envelopes.last().map(|e| e.version).unwrap_or(expected_version);
        if should_snapshot(
            new_version,
            last_snapshot_version,
            last_snapshot_at,
            context.now(),
            self.snapshot_interval,
            self.snapshot_max_age,
        ) {
            debug!(aggregate_id, version = new_version, "writing snapshot");
            self.persist
                .save_snapshot(
                    &mut session,
                    Snapshot {
                        aggregate_id: aggregate_id.to_string(),
                        state: resulting_state.clone(),
                        version: new_version,
                        snapshotted_at: context.now(),
                    },
                )
                .await?;
        }

        self.persist.commit_session(session).await?;
        Ok(envelopes)
    }
}
