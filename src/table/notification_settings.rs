use super::EntityTable;
use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::{i64_from_key, PeerId, PeerNotificationSettings};

/// Per-peer notification settings plus a derived `(timestamp, peer)` index
/// over `behavior_timestamp`, reconciled at commit like any other secondary
/// index so the earliest entry is one ordered probe away.
pub struct NotificationSettingsTable {
    inner: EntityTable<PeerId, PeerNotificationSettings>,
    index_partition: Partition,
}

impl NotificationSettingsTable {
    pub fn new(partition: Partition, index_partition: Partition) -> Self {
        Self {
            inner: EntityTable::new(partition, "notification_settings", |id| id.to_key()),
            index_partition,
        }
    }

    pub fn get(&mut self, store: &dyn ValueStore, id: PeerId) -> Option<PeerNotificationSettings> {
        self.inner.get(store, id)
    }

    pub fn set(&mut self, store: &dyn ValueStore, id: PeerId, settings: PeerNotificationSettings) {
        self.inner.set(store, id, settings);
    }

    /// The earliest behavior timestamp across all peers, if any.
    pub fn earliest_behavior_timestamp(&self, store: &dyn ValueStore) -> Option<(PeerId, i64)> {
        store
            .scan_prefix(self.index_partition.id, &[])
            .next()
            .and_then(|(key, _)| {
                if key.len() != 16 {
                    return None;
                }
                let timestamp = i64_from_key(&key[0..8])?;
                let peer_id = PeerId::from_key(&key[8..16])?;
                Some((peer_id, timestamp))
            })
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    pub fn transaction_updated(
        &mut self,
        store: &dyn ValueStore,
    ) -> Vec<(
        PeerId,
        Option<PeerNotificationSettings>,
        PeerNotificationSettings,
    )> {
        self.inner.transaction_updated(store)
    }

    pub fn before_commit(&mut self, store: &mut dyn ValueStore) -> Result<(), ChatstoreError> {
        for (peer_id, previous) in self.inner.take_pending() {
            let settings = self.inner.flush_one(store, peer_id)?;
            let previous_timestamp = previous.and_then(|s| s.behavior_timestamp);
            if previous_timestamp != settings.behavior_timestamp {
                if let Some(timestamp) = previous_timestamp {
                    store.remove(
                        self.index_partition.id,
                        &PeerNotificationSettings::behavior_index_key(peer_id, timestamp),
                    );
                }
                if let Some(timestamp) = settings.behavior_timestamp {
                    store.set(
                        self.index_partition.id,
                        &PeerNotificationSettings::behavior_index_key(peer_id, timestamp),
                        Vec::new(),
                    );
                }
            }
        }
        Ok(())
    }

    pub fn clear_memory_cache(&mut self) {
        self.inner.clear_memory_cache();
    }

    pub(crate) fn cached_len(&self) -> usize {
        self.inner.cached_len()
    }
}
