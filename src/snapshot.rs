use crate::metadata::{AggregateId, Version};
use crate::Aggregate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot<A>
where
    A: Aggregate,
{
    pub aggregate_id: AggregateId,
    pub state: A,
    pub version: Version,
    pub snapshotted_at: DateTime<Utc>,
}

/// Pure snapshot cadence decision (spec §9 design note): the store asks
/// this after every successful append, it never decides on its own.
/// Snapshots every `interval` versions, or after `max_age` has elapsed
/// since the last one, whichever comes first.
pub fn should_snapshot(
    version: Version,
    last_snapshot_version: Version,
    last_snapshot_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: u64,
    max_age: chrono::Duration,
) -> bool {
    if version.saturating_sub(last_snapshot_version) >= interval {
        return true;
    }
    match last_snapshot_at {
        Some(at) => now - at >= max_age,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn snapshots_on_interval() {
        assert!(should_snapshot(100, 0, Some(Utc::now()), Utc::now(), 100, Duration::hours(1)));
        assert!(!should_snapshot(50, 0, Some(Utc::now()), Utc::now(), 100, Duration::hours(1)));
    }

    #[test]
    fn snapshots_on_age_even_below_interval() {
        let old = Utc::now() - Duration::hours(2);
        assert!(should_snapshot(10, 0, Some(old), Utc::now(), 100, Duration::hours(1)));
    }

    #[test]
    fn snapshots_when_never_snapshotted() {
        assert!(should_snapshot(1, 0, None, Utc::now(), 100, Duration::hours(1)));
    }
}
