use jade_cqrs::es::inmemory::InMemoryPersist;
use jade_cqrs::es::EventStoreImpl;
use jade_cqrs::{Aggregate, CqrsCommandEngine, CqrsContext, CqrsError, Event, EventStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomerCommand {
    Create {
        name: String,
        email: String,
    },
    Update {
        name: String,
        email: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CustomerEvent {
    Created { name: String, email: String },
    Updated { name: String, email: String },
}

impl Event for CustomerEvent {
    fn schema(&self) -> &'static str {
        match self {
            CustomerEvent::Created { .. } => "urn:schema:jade:event:customer:created:2",
            CustomerEvent::Updated { .. } => "urn:schema:jade:event:customer:updated:1",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CustomerError {
    #[error("customer already exists")]
    AlreadyExists,
    #[error("customer does not exist")]
    NotFound,
}

impl Aggregate for Customer {
    const PREFIX: &'static str = "customer";
    type Command = CustomerCommand;
    type Event = CustomerEvent;
    type Error = CustomerError;

    fn create(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CustomerCommand::Create { name, email } => Ok(vec![CustomerEvent::Created {
                name: name.clone(),
                email: email.clone(),
            }]),
            CustomerCommand::Update { .. } => Err(CustomerError::NotFound),
        }
    }

    fn decide(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CustomerCommand::Create { .. } => Err(CustomerError::AlreadyExists),
            CustomerCommand::Update { name, email } => Ok(vec![CustomerEvent::Updated {
                name: name.clone(),
                email: email.clone(),
            }]),
        }
    }

    fn init(event: Self::Event) -> Self {
        let mut state = Self::default();
        state.evolve(event);
        state
    }

    fn evolve(&mut self, event: Self::Event) {
        match event {
            CustomerEvent::Created { name, email } | CustomerEvent::Updated { name, email } => {
                self.name = name;
                self.email = email;
            }
        }
    }
}

fn engine() -> CqrsCommandEngine<Customer, EventStoreImpl<Customer, InMemoryPersist<Customer>>> {
    let store = EventStoreImpl::new(InMemoryPersist::<Customer>::new());
    CqrsCommandEngine::new(store, vec![], Box::new(|_e| {}))
}

// Spec §8 scenario 1: create customer.
#[tokio::test]
async fn create_customer_appends_one_event_at_version_one() {
    let engine = engine();
    let context = CqrsContext::default();

    let (id, version) = engine
        .execute(
            Some("c1".to_string()),
            &CustomerCommand::Create {
                name: "Alice".to_string(),
                email: "a@x".to_string(),
            },
            &context,
        )
        .await
        .expect("create should succeed");

    assert_eq!(id, "c1");
    assert_eq!(version, 1);

    let (state, version) = engine.store().get_by_id("c1").await.unwrap();
    assert_eq!(version, 1);
    assert_eq!(state.name, "Alice");
    assert_eq!(state.email, "a@x");
}

// Spec §8 scenario 2: update customer.
#[tokio::test]
async fn update_customer_advances_stream_and_rehydrates() {
    let engine = engine();
    let context = CqrsContext::default();

    engine
        .execute(
            Some("c1".to_string()),
            &CustomerCommand::Create {
                name: "Alice".to_string(),
                email: "a@x".to_string(),
            },
            &context,
        )
        .await
        .unwrap();

    let (_, version) = engine
        .execute(
            Some("c1".to_string()),
            &CustomerCommand::Update {
                name: "Alice2".to_string(),
                email: "a2@x".to_string(),
            },
            &context,
        )
        .await
        .expect("update should succeed");

    assert_eq!(version, 2);

    let (state, version) = engine.store().get_by_id("c1").await.unwrap();
    assert_eq!(version, 2);
    assert_eq!(state.name, "Alice2");
    assert_eq!(state.email, "a2@x");
}

// Spec §8 scenario 3: optimistic conflict — two concurrent updates racing on
// the same version, only one may win.
#[tokio::test]
async fn concurrent_updates_on_same_version_only_one_wins() {
    let engine = engine();
    let context = CqrsContext::default();

    engine
        .execute(
            Some("c1".to_string()),
            &CustomerCommand::Create {
                name: "Alice".to_string(),
                email: "a@x".to_string(),
            },
            &context,
        )
        .await
        .unwrap();

    let (state, version) = engine.store().get_by_id("c1").await.unwrap();
    let events_a = state
        .decide(&CustomerCommand::Update {
            name: "Alice2".to_string(),
            email: "a2@x".to_string(),
        })
        .unwrap();
    let events_b = state
        .decide(&CustomerCommand::Update {
            name: "Alice3".to_string(),
            email: "a3@x".to_string(),
        })
        .unwrap();

    let mut resulting_a = state.clone();
    for e in &events_a {
        resulting_a.evolve(e.clone());
    }
    let mut resulting_b = state;
    for e in &events_b {
        resulting_b.evolve(e.clone());
    }

    let first = engine
        .store()
        .save("c1", &resulting_a, events_a, version, &context)
        .await;
    let second = engine
        .store()
        .save("c1", &resulting_b, events_b, version, &context)
        .await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(CqrsError::Concurrency)));
}

// Spec §8 scenario: decide returning no events is a no-op and leaves the
// version unchanged.
#[tokio::test]
async fn repeated_pipeline_call_with_no_events_is_a_no_op() {
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum NoOpCommand {
        Create,
        Touch,
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct NoOpAggregate;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct NoOpEvent;

    impl Event for NoOpEvent {
        fn schema(&self) -> &'static str {
            "urn:schema:jade:event:noop:touched:1"
        }
    }

    #[derive(Debug, Clone, thiserror::Error)]
    #[error("rejected")]
    struct NoOpError;

    impl Aggregate for NoOpAggregate {
        const PREFIX: &'static str = "noop";
        type Command = NoOpCommand;
        type Event = NoOpEvent;
        type Error = NoOpError;

        fn create(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
            match command {
                NoOpCommand::Create => Ok(vec![NoOpEvent]),
                NoOpCommand::Touch => Err(NoOpError),
            }
        }

        fn decide(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
            match command {
                NoOpCommand::Touch => Ok(vec![]),
                NoOpCommand::Create => Err(NoOpError),
            }
        }

        fn init(_event: Self::Event) -> Self {
            Self
        }

        fn evolve(&mut self, _event: Self::Event) {}
    }

    let store = EventStoreImpl::new(InMemoryPersist::<NoOpAggregate>::new());
    let engine = CqrsCommandEngine::new(store, vec![], Box::new(|_e| {}));
    let context = CqrsContext::default();

    let (id, version) = engine
        .execute(Some("n1".to_string()), &NoOpCommand::Create, &context)
        .await
        .unwrap();
    assert_eq!(version, 1);

    let (_, version_after) = engine
        .execute(Some(id), &NoOpCommand::Touch, &context)
        .await
        .unwrap();
    assert_eq!(version_after, 1);
}
