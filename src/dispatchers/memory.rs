use crate::{Aggregate, CqrsContext, CqrsError, Dispatcher, EventEnvelope};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// A simple in-memory dispatcher that stores events in memory. Useful for
/// tests and for consumers without a real projection yet.
pub struct InMemoryDispatcher<A: Aggregate> {
    events: Arc<Mutex<HashMap<String, Vec<EventEnvelope<A>>>>>,
}

impl<A: Aggregate> InMemoryDispatcher<A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn get_events(&self, aggregate_id: &str) -> Vec<EventEnvelope<A>> {
        let events = self.events.lock().unwrap();
        events.get(aggregate_id).cloned().unwrap_or_default()
    }

    pub fn get_all_events(&self) -> HashMap<String, Vec<EventEnvelope<A>>> {
        let events = self.events.lock().unwrap();
        events.clone()
    }

    pub fn clear(&self) {
        let mut events = self.events.lock().unwrap();
        events.clear();
    }
}

impl<A: Aggregate> Default for InMemoryDispatcher<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<A: Aggregate> Dispatcher<A> for InMemoryDispatcher<A> {
    async fn dispatch(
        &self,
        aggregate_id: &str,
        events: &[EventEnvelope<A>],
        _context: &CqrsContext,
    ) -> Result<(), CqrsError> {
        debug!(aggregate_id, "dispatching events to in-memory store");
        let mut store = self.events.lock().unwrap();
        let aggregate_events = store.entry(aggregate_id.to_string()).or_default();
        for event in events {
            aggregate_events.push(event.clone());
        }
        info!(event_count = events.len(), "dispatched events to in-memory store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Metadata;
    use crate::testing::{TestAggregate, TestEvent};
    use chrono::Utc;

    #[tokio::test]
    async fn dispatch_appends_and_clear_resets() {
        let dispatcher = InMemoryDispatcher::<TestAggregate>::new();
        let context = CqrsContext::default();

        let events = vec![
            EventEnvelope {
                event_id: "event1".to_string(),
                aggregate_id: "agg1".to_string(),
                version: 1,
                payload: TestEvent::Created {
                    name: "toto".to_string(),
                },
                metadata: Metadata::new("m1", "corr1"),
                at: Utc::now(),
            },
            EventEnvelope {
                event_id: "event2".to_string(),
                aggregate_id: "agg1".to_string(),
                version: 2,
                payload: TestEvent::Incremented,
                metadata: Metadata::new("m2", "corr1"),
                at: Utc::now(),
            },
        ];

        dispatcher.dispatch("agg1", &events, &context).await.unwrap();

        let stored = dispatcher.get_events("agg1");
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].event_id, "event1");

        let all = dispatcher.get_all_events();
        assert_eq!(all.len(), 1);
        assert!(all.contains_key("agg1"));

        dispatcher.clear();
        assert!(dispatcher.get_events("agg1").is_empty());
    }
}
