//! Fixture aggregate used by this crate's own unit tests.

use crate::event::Event;
use crate::Aggregate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, thiserror::Error)]
pub enum TestError {
    #[error("test error: {0}")]
    Rejected(String),
}

impl From<&str> for TestError {
    fn from(value: &str) -> Self {
        Self::Rejected(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TestCommand {
    Initialize { name: String },
    Increment,
    Decrement,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TestEvent {
    Created { name: String },
    Incremented,
    Decremented,
}

impl Event for TestEvent {
    fn schema(&self) -> &'static str {
        match self {
            TestEvent::Created { .. } => "urn:schema:jade:event:test:created:1",
            TestEvent::Incremented => "urn:schema:jade:event:test:incremented:1",
            TestEvent::Decremented => "urn:schema:jade:event:test:decremented:1",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestAggregate {
    pub counter: i32,
    pub name: String,
}

impl Aggregate for TestAggregate {
    const PREFIX: &'static str = "test";

    type Command = TestCommand;
    type Event = TestEvent;
    type Error = TestError;

    fn create(command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TestCommand::Initialize { name } => Ok(vec![TestEvent::Created { name: name.clone() }]),
            _ => Err(TestError::Rejected(
                "only Initialize can create this aggregate".to_string(),
            )),
        }
    }

    fn decide(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            TestCommand::Initialize { .. } => {
                Err(TestError::Rejected("aggregate already exists".to_string()))
            }
            TestCommand::Increment => Ok(vec![TestEvent::Incremented]),
            TestCommand::Decrement => Ok(vec![TestEvent::Decremented]),
            TestCommand::NoOp => Ok(vec![]),
        }
    }

    fn init(event: Self::Event) -> Self {
        let mut aggregate = Self::default();
        aggregate.evolve(event);
        aggregate
    }

    fn evolve(&mut self, event: Self::Event) {
        match event {
            TestEvent::Created { name } => self.name = name,
            TestEvent::Incremented => self.counter += 1,
            TestEvent::Decremented => self.counter -= 1,
        }
    }
}
