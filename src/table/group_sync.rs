use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::GroupAndNamespace;
use std::collections::{BTreeSet, HashMap};

/// Synchronization flags: the set of `(group, namespace)` pairs whose
/// aggregate message stats must be re-fetched. Stored as presence markers;
/// the whole set is small and loaded in one scan.
pub struct GroupSyncTable {
    partition: Partition,
    cached: Option<BTreeSet<GroupAndNamespace>>,
    updated_initial: HashMap<GroupAndNamespace, bool>,
}

impl GroupSyncTable {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            cached: None,
            updated_initial: HashMap::new(),
        }
    }

    pub fn get(&mut self, store: &dyn ValueStore) -> BTreeSet<GroupAndNamespace> {
        if let Some(set) = &self.cached {
            return set.clone();
        }
        let set: BTreeSet<GroupAndNamespace> = store
            .scan_prefix(self.partition.id, &[])
            .filter_map(|(key, _)| GroupAndNamespace::from_key(&key))
            .collect();
        self.cached = Some(set.clone());
        set
    }

    pub fn set_operation(&mut self, store: &dyn ValueStore, key: GroupAndNamespace, needed: bool) {
        let currently = self.get(store).contains(&key);
        self.updated_initial.entry(key).or_insert(currently);
        let set = self.cached.as_mut().expect("set loaded by get");
        if needed {
            set.insert(key);
        } else {
            set.remove(&key);
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.updated_initial.is_empty()
    }

    /// Final membership per touched key, restricted to net changes.
    pub fn transaction_updated_operations(
        &mut self,
        store: &dyn ValueStore,
    ) -> HashMap<GroupAndNamespace, bool> {
        let touched: Vec<(GroupAndNamespace, bool)> =
            self.updated_initial.iter().map(|(k, v)| (*k, *v)).collect();
        let current = self.get(store);
        touched
            .into_iter()
            .filter_map(|(key, initial)| {
                let now = current.contains(&key);
                (now != initial).then_some((key, now))
            })
            .collect()
    }

    pub fn before_commit(&mut self, store: &mut dyn ValueStore) -> Result<(), ChatstoreError> {
        if self.updated_initial.is_empty() {
            return Ok(());
        }
        let Some(current) = self.cached.clone() else {
            panic!("pending group sync operations with no loaded membership");
        };
        for (key, _initial) in std::mem::take(&mut self.updated_initial) {
            if current.contains(&key) {
                store.set(self.partition.id, &key.to_key(), Vec::new());
            } else {
                store.remove(self.partition.id, &key.to_key());
            }
        }
        Ok(())
    }

    pub fn clear_memory_cache(&mut self) {
        assert!(
            self.updated_initial.is_empty(),
            "clear_memory_cache with pending group sync operations"
        );
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::super::GROUP_SYNC;
    use super::GroupSyncTable;
    use crate::kv::MemoryValueStore;
    use crate::model::{GroupAndNamespace, PeerGroupId};

    fn key(group: i32, namespace: u32) -> GroupAndNamespace {
        GroupAndNamespace {
            group_id: PeerGroupId(group),
            namespace,
        }
    }

    #[test]
    fn toggles_within_one_transaction_report_net_change_only() {
        let store = MemoryValueStore::new();
        let mut table = GroupSyncTable::new(GROUP_SYNC);

        table.set_operation(&store, key(1, 0), true);
        table.set_operation(&store, key(1, 0), false);
        table.set_operation(&store, key(2, 0), true);

        let updated = table.transaction_updated_operations(&store);
        assert_eq!(updated.len(), 1);
        assert_eq!(updated.get(&key(2, 0)), Some(&true));
    }

    #[test]
    fn membership_round_trips_through_storage() {
        let mut store = MemoryValueStore::new();
        let mut table = GroupSyncTable::new(GROUP_SYNC);

        table.set_operation(&store, key(1, 0), true);
        table.set_operation(&store, key(-3, 7), true);
        table.before_commit(&mut store).expect("commit");
        table.clear_memory_cache();

        let set = table.get(&store);
        assert!(set.contains(&key(1, 0)));
        assert!(set.contains(&key(-3, 7)));
        assert_eq!(set.len(), 2);
    }
}
