use super::EntityTable;
use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::{CachedPeerData, PeerId};

/// Auxiliary per-peer records, written independently of the peer itself.
pub struct CachedPeerDataTable {
    inner: EntityTable<PeerId, CachedPeerData>,
}

impl CachedPeerDataTable {
    pub fn new(partition: Partition) -> Self {
        Self {
            inner: EntityTable::new(partition, "cached_peer_data", |id| id.to_key()),
        }
    }

    pub fn get(&mut self, store: &dyn ValueStore, id: PeerId) -> Option<CachedPeerData> {
        self.inner.get(store, id)
    }

    pub fn set(&mut self, store: &dyn ValueStore, data: CachedPeerData) {
        self.inner.set(store, data.peer_id, data);
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    pub fn transaction_updated(
        &mut self,
        store: &dyn ValueStore,
    ) -> Vec<(PeerId, Option<CachedPeerData>, CachedPeerData)> {
        self.inner.transaction_updated(store)
    }

    pub fn before_commit(&mut self, store: &mut dyn ValueStore) -> Result<(), ChatstoreError> {
        self.inner.before_commit(store)
    }

    pub fn clear_memory_cache(&mut self) {
        self.inner.clear_memory_cache();
    }

    pub(crate) fn cached_len(&self) -> usize {
        self.inner.cached_len()
    }
}
