use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The envelope carried by every command, and persisted on every event.
///
/// See spec §3 "Metadata envelope".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Unique per command/event.
    pub id: String,
    /// Groups a causally related interaction.
    pub correlation_id: String,
    /// The prior id that caused this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Server fills this in if absent on a command; always present once persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Metadata {
    pub fn new(id: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            correlation_id: correlation_id.into(),
            causation_id: None,
            user_id: None,
            timestamp: None,
        }
    }

    pub fn with_causation_id(mut self, causation_id: impl Into<String>) -> Self {
        self.causation_id = Some(causation_id.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Stamps `timestamp` if the client didn't supply one. Open Question in
    /// spec §9 resolved here: the server only fills gaps, it never overrides
    /// a client-supplied timestamp.
    pub fn stamp_if_absent(mut self, now: DateTime<Utc>) -> Self {
        if self.timestamp.is_none() {
            self.timestamp = Some(now);
        }
        self
    }

    /// Derives the metadata for an event caused by this command/event:
    /// same correlation id, causation id set to this id.
    pub fn derive(&self, next_id: impl Into<String>) -> Self {
        Self {
            id: next_id.into(),
            correlation_id: self.correlation_id.clone(),
            causation_id: Some(self.id.clone()),
            user_id: self.user_id.clone(),
            timestamp: None,
        }
    }
}

/// An opaque, non-empty, stable identifier for one aggregate instance.
pub type AggregateId = String;

/// A monotonically increasing stream version. `0` means "no stream yet".
pub type Version = u64;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_keeps_correlation_and_sets_causation() {
        let m = Metadata::new("cmd-1", "corr-1").with_user_id("alice");
        let derived = m.derive("evt-1");
        assert_eq!(derived.correlation_id, "corr-1");
        assert_eq!(derived.causation_id.as_deref(), Some("cmd-1"));
        assert_eq!(derived.user_id.as_deref(), Some("alice"));
    }

    #[test]
    fn stamp_if_absent_does_not_override() {
        let ts = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let m = Metadata::new("cmd-1", "corr-1").with_timestamp(ts);
        let stamped = m.stamp_if_absent(Utc::now());
        assert_eq!(stamped.timestamp, Some(ts));
    }
}
