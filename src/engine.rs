use crate::context::CqrsContext;
use crate::denormalizer::Dispatcher;
use crate::errors::CqrsError;
use crate::metadata::{AggregateId, Version};
use crate::{Aggregate, EventEnvelope, EventStore};
use tracing::{debug, error, info};

/// Rehydration and command pipeline (spec §4.C): the sole entry point that
/// turns one aggregate command into persisted events and fans them out to
/// dispatchers. Aggregates never see the store or the dispatchers.
pub struct CqrsCommandEngine<A, ES>
where
    A: Aggregate + 'static,
    ES: EventStore<A>,
{
    store: ES,
    dispatchers: Vec<Box<dyn Dispatcher<A>>>,
    error_handler: Box<dyn Fn(&CqrsError) + Send + Sync>,
}

impl<A, ES> CqrsCommandEngine<A, ES>
where
    A: Aggregate + 'static,
    ES: EventStore<A>,
{
    #[must_use]
    pub fn new(
        store: ES,
        dispatchers: Vec<Box<dyn Dispatcher<A>>>,
        error_handler: Box<dyn Fn(&CqrsError) + Send + Sync>,
    ) -> Self {
        Self {
            store,
            dispatchers,
            error_handler,
        }
    }

    pub fn append_dispatcher(&mut self, dispatcher: Box<dyn Dispatcher<A>>) {
        self.dispatchers.push(dispatcher);
    }

    pub fn store(&self) -> &ES {
        &self.store
    }

    /// Executes one command against the aggregate identified by
    /// `aggregate_id` (generated fresh if `None`). Implements the exact
    /// branch policy of spec §4.C: not-found takes the create path, found
    /// takes the decide path, and an empty `decide` result is a no-op
    /// success rather than an error.
    pub async fn execute(
        &self,
        aggregate_id: Option<AggregateId>,
        command: &A::Command,
        context: &CqrsContext,
    ) -> Result<(AggregateId, Version), CqrsError> {
        if let Some(raw_id) = &aggregate_id {
            if raw_id.trim().is_empty() {
                return Err(CqrsError::BadCommand("aggregate id must not be empty".to_string()));
            }
        }
        let id = aggregate_id.unwrap_or_else(|| context.next_uuid());
        debug!(aggregate_id = %id, "executing command");

        match self.store.get_by_id(&id).await {
            Ok((state, version)) => self.decide(&id, state, version, command, context).await,
            Err(CqrsError::NotFound) => self.create(&id, command, context).await,
            Err(e) => {
                error!(aggregate_id = %id, error = %e, "failed to load aggregate");
                Err(e)
            }
        }
    }

    async fn create(
        &self,
        id: &str,
        command: &A::Command,
        context: &CqrsContext,
    ) -> Result<(AggregateId, Version), CqrsError> {
        let events = A::create(command).map_err(|e| CqrsError::DomainRejection(e.to_string()))?;
        if events.is_empty() {
            return Err(CqrsError::DomainRejection(
                "create produced no events".to_string(),
            ));
        }

        let mut resulting: Option<A> = None;
        for event in &events {
            resulting = Some(match resulting {
                Some(mut agg) => {
                    agg.evolve(event.clone());
                    agg
                }
                None => A::init(event.clone()),
            });
        }
        let resulting = resulting.expect("events is non-empty");

        let committed = self.store.save(id, &resulting, events, 0, context).await?;
        self.dispatch(id, &committed, context).await;
        info!(aggregate_id = %id, "aggregate created");
        Ok((id.to_string(), committed.len() as Version))
    }

    async fn decide(
        &self,
        id: &str,
        state: A,
        version: Version,
        command: &A::Command,
        context: &CqrsContext,
    ) -> Result<(AggregateId, Version), CqrsError> {
        let events = state
            .decide(command)
            .map_err(|e| CqrsError::DomainRejection(e.to_string()))?;
        if events.is_empty() {
            debug!(aggregate_id = %id, "decide produced no events, no-op success");
            return Ok((id.to_string(), version));
        }

        let mut resulting = state;
        for event in &events {
            resulting.evolve(event.clone());
        }

        let committed = self
            .store
            .save(id, &resulting, events, version, context)
            .await?;
        self.dispatch(id, &committed, context).await;
        info!(aggregate_id = %id, "aggregate updated");
        Ok((id.to_string(), version + committed.len() as Version))
    }

    async fn dispatch(&self, aggregate_id: &str, events: &[EventEnvelope<A>], context: &CqrsContext) {
        if events.is_empty() {
            return;
        }
        for (i, dispatcher) in self.dispatchers.iter().enumerate() {
            if let Err(e) = dispatcher.dispatch(aggregate_id, events, context).await {
                error!(dispatcher_index = i, error = %e, "dispatcher failed");
                (self.error_handler)(&e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::es::inmemory::InMemoryPersist;
    use crate::es::EventStoreImpl;
    use crate::testing::{TestAggregate, TestCommand};
    use crate::CqrsCommandEngine;
    use crate::CqrsContext;
    use crate::CqrsError;

    #[tokio::test]
    async fn create_then_decide() {
        let store = EventStoreImpl::new(InMemoryPersist::<TestAggregate>::new());
        let engine = CqrsCommandEngine::new(store, vec![], Box::new(|_e| {}));
        let context = CqrsContext::default();

        let (id, version) = engine
            .execute(
                None,
                &TestCommand::Initialize {
                    name: "toto".to_string(),
                },
                &context,
            )
            .await
            .expect("create should succeed");
        assert_eq!(version, 1);

        let (_, version) = engine
            .execute(Some(id.clone()), &TestCommand::Increment, &context)
            .await
            .expect("update should succeed");
        assert_eq!(version, 2);
    }

    #[tokio::test]
    async fn decide_no_op_does_not_advance_version() {
        let store = EventStoreImpl::new(InMemoryPersist::<TestAggregate>::new());
        let engine = CqrsCommandEngine::new(store, vec![], Box::new(|_e| {}));
        let context = CqrsContext::default();

        let (id, _) = engine
            .execute(
                None,
                &TestCommand::Initialize {
                    name: "toto".to_string(),
                },
                &context,
            )
            .await
            .unwrap();

        let (_, version) = engine
            .execute(Some(id.clone()), &TestCommand::NoOp, &context)
            .await
            .unwrap();
        assert_eq!(version, 1);
    }

    #[tokio::test]
    async fn update_only_command_against_unknown_id_is_rejected_not_not_found() {
        // Not-found always takes the create path (spec §4.C); an update-only
        // command can't create, so it surfaces as a domain rejection, never
        // as a bare `NotFound` escaping the pipeline (spec §7).
        let store = EventStoreImpl::new(InMemoryPersist::<TestAggregate>::new());
        let engine = CqrsCommandEngine::new(store, vec![], Box::new(|_e| {}));
        let context = CqrsContext::default();

        let result = engine
            .execute(Some("missing".to_string()), &TestCommand::Increment, &context)
            .await;
        assert!(matches!(result, Err(CqrsError::DomainRejection(_))));
    }

    #[tokio::test]
    async fn empty_aggregate_id_is_rejected_as_bad_command() {
        let store = EventStoreImpl::new(InMemoryPersist::<TestAggregate>::new());
        let engine = CqrsCommandEngine::new(store, vec![], Box::new(|_e| {}));
        let context = CqrsContext::default();

        let result = engine
            .execute(Some(String::new()), &TestCommand::Increment, &context)
            .await;
        assert!(matches!(result, Err(CqrsError::BadCommand(_))));

        let result = engine
            .execute(Some("   ".to_string()), &TestCommand::Increment, &context)
            .await;
        assert!(matches!(result, Err(CqrsError::BadCommand(_))));
    }
}
