use crate::kv::ValueStore;
use crate::table::Tables;
use crate::transaction::TransactionDiff;

/// Tracks the earliest notification behavior timestamp across all peers.
/// Replay re-derives from the ordered index whenever any behavior timestamp
/// moved; the probe is a single ordered read, never a scan.
pub(crate) struct MutableNotificationBehaviorTimestampView {
    earliest_timestamp: Option<i64>,
}

impl MutableNotificationBehaviorTimestampView {
    pub(crate) fn new(tables: &mut Tables, store: &dyn ValueStore) -> Self {
        Self {
            earliest_timestamp: tables
                .notification_settings
                .earliest_behavior_timestamp(store)
                .map(|(_, timestamp)| timestamp),
        }
    }

    pub(crate) fn replay(
        &mut self,
        tables: &mut Tables,
        store: &dyn ValueStore,
        diff: &TransactionDiff,
    ) -> bool {
        if !diff.updated_behavior_timestamps.is_empty() {
            let earliest = tables
                .notification_settings
                .earliest_behavior_timestamp(store)
                .map(|(_, timestamp)| timestamp);
            if earliest != self.earliest_timestamp {
                self.earliest_timestamp = earliest;
                return true;
            }
        }
        false
    }

    pub(crate) fn snapshot(&self) -> NotificationBehaviorTimestampView {
        NotificationBehaviorTimestampView {
            earliest_timestamp: self.earliest_timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationBehaviorTimestampView {
    pub earliest_timestamp: Option<i64>,
}
