use crate::metadata::{Metadata, Version};
use crate::Aggregate;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A single event variant. Each concrete event type is associated with a
/// schema URN of the form `urn:schema:jade:event:{aggregate}:{action}:{version}`
/// (spec §3), which is also this event's wire type tag.
///
/// Unlike `Command`, this is an instance method rather than an associated
/// constant: an event enum legitimately carries one URN per variant (e.g.
/// `Created` vs. `Updated`), so there is no single type-level schema to
/// read without risking a caller reading the wrong variant's URN.
pub trait Event: Debug + Serialize + DeserializeOwned + Clone + PartialEq + Sync + Send {
    fn schema(&self) -> &'static str;
}

/// An event as persisted in a stream: payload plus its position and
/// provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope<A>
where
    A: Aggregate,
{
    #[serde(rename = "_id")]
    pub event_id: String,
    pub aggregate_id: String,
    pub version: Version,
    pub payload: A::Event,
    pub metadata: Metadata,
    pub at: DateTime<Utc>,
}
