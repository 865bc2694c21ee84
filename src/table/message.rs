use super::EntityTable;
use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::{Message, MessageId};

pub struct MessageTable {
    inner: EntityTable<MessageId, Message>,
}

impl MessageTable {
    pub fn new(partition: Partition) -> Self {
        Self {
            inner: EntityTable::new(partition, "message", |id| id.to_key()),
        }
    }

    pub fn get(&mut self, store: &dyn ValueStore, id: MessageId) -> Option<Message> {
        self.inner.get(store, id)
    }

    pub fn set(&mut self, store: &dyn ValueStore, message: Message) {
        self.inner.set(store, message.id, message);
    }

    /// Whether any message of `peer_id` is stored. One bounded prefix probe,
    /// used by the inclusion view's re-derivation.
    pub fn peer_has_messages(
        &self,
        store: &dyn ValueStore,
        peer_id: crate::model::PeerId,
    ) -> bool {
        let prefix = MessageId::peer_prefix(peer_id);
        let has_any = store
            .scan_prefix(self.inner.partition.id, &prefix)
            .next()
            .is_some();
        has_any
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    pub fn transaction_updated(
        &mut self,
        store: &dyn ValueStore,
    ) -> Vec<(MessageId, Option<Message>, Message)> {
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
