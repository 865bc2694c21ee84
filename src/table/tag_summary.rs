use super::EntityTable;
use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::{TagSummary, TagSummaryKey};

/// Per-peer aggregate counters, advanced incrementally as messages land.
pub struct TagSummaryTable {
    inner: EntityTable<TagSummaryKey, TagSummary>,
}

impl TagSummaryTable {
    pub fn new(partition: Partition) -> Self {
        Self {
            inner: EntityTable::new(partition, "tag_summary", |key| key.to_key()),
        }
    }

    pub fn get(&mut self, store: &dyn ValueStore, key: TagSummaryKey) -> Option<TagSummary> {
        self.inner.get(store, key)
    }

    pub fn set(&mut self, store: &dyn ValueStore, key: TagSummaryKey, summary: TagSummary) {
        self.inner.set(store, key, summary);
    }

    /// Counts one message into the summary and raises its high-water id.
    pub fn add_contribution(&mut self, store: &dyn ValueStore, key: TagSummaryKey, id: u32) {
        let mut summary = self.inner.get(store, key).unwrap_or_default();
        summary.count += 1;
        summary.max_id = summary.max_id.max(id);
        self.inner.set(store, key, summary);
    }

    /// Uncounts one message. The count clamps at zero; `max_id` stays as a
    /// high-water mark.
    pub fn remove_contribution(&mut self, store: &dyn ValueStore, key: TagSummaryKey) {
        let mut summary = self.inner.get(store, key).unwrap_or_default();
        summary.count = (summary.count - 1).max(0);
        self.inner.set(store, key, summary);
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    pub fn transaction_updated(
        &mut self,
        store: &dyn ValueStore,
    ) -> Vec<(TagSummaryKey, Option<TagSummary>, TagSummary)> {
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

#[cfg(test)]
mod tests {
    use super::super::TAG_SUMMARIES;
    use super::TagSummaryTable;
    use crate::kv::MemoryValueStore;
    use crate::model::{MessageTags, PeerId, TagSummaryKey};

    const KEY: TagSummaryKey = TagSummaryKey {
        tag: MessageTags::PHOTO,
        peer_id: PeerId(1),
        namespace: 0,
    };

    #[test]
    fn contributions_accumulate_and_clamp() {
        let store = MemoryValueStore::new();
        let mut table = TagSummaryTable::new(TAG_SUMMARIES);

        table.add_contribution(&store, KEY, 5);
        table.add_contribution(&store, KEY, 3);
        let summary = table.get(&store, KEY).expect("summary");
        assert_eq!(summary.count, 2);
        assert_eq!(summary.max_id, 5);

        table.remove_contribution(&store, KEY);
        table.remove_contribution(&store, KEY);
        table.remove_contribution(&store, KEY);
        let summary = table.get(&store, KEY).expect("summary");
        assert_eq!(summary.count, 0);
        assert_eq!(summary.max_id, 5);
    }
}
