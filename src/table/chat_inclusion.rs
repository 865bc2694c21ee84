use super::EntityTable;
use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::{ChatInclusion, PeerId};

/// Per-peer chat list inclusion records. Peers with no stored record read as
/// `ChatInclusion::Never`. The observable inclusion boolean is derived by the
/// view layer, which also folds in whether the peer has messages.
pub struct ChatInclusionTable {
    inner: EntityTable<PeerId, ChatInclusion>,
}

impl ChatInclusionTable {
    pub fn new(partition: Partition) -> Self {
        Self {
            inner: EntityTable::new(partition, "chat_inclusion", |id| id.to_key()),
        }
    }

    pub fn get_record(&mut self, store: &dyn ValueStore, id: PeerId) -> ChatInclusion {
        self.inner.get(store, id).unwrap_or_default()
    }

    pub fn set_record(&mut self, store: &dyn ValueStore, id: PeerId, inclusion: ChatInclusion) {
        self.inner.set(store, id, inclusion);
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    /// Peers whose stored record changed net this transaction. An absent
    /// previous record compares as `Never`.
    pub fn transaction_updated_peers(&mut self, store: &dyn ValueStore) -> Vec<PeerId> {
        self.inner
            .transaction_updated(store)
            .into_iter()
            .filter(|(_, previous, current)| previous.unwrap_or_default() != *current)
            .map(|(id, _, _)| id)
            .collect()
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
