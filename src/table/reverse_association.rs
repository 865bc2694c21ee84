use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::{KeyBuf, PeerId};
use std::collections::{BTreeSet, HashMap};

/// Derived index answering "which peers reference this one".
///
/// Rows are presence markers under a `(target, source)` composite key, so one
/// prefix scan per target enumerates its referencers. The index is mutated
/// only from commit-time reconciliation, never derived lazily at read time.
pub struct ReverseAssociationTable {
    partition: Partition,
    cached: HashMap<PeerId, BTreeSet<PeerId>>,
    updated_initial: HashMap<PeerId, BTreeSet<PeerId>>,
}

fn composite_key(target: PeerId, source: PeerId) -> KeyBuf {
    let mut key = target.to_key();
    key.extend_from_slice(&source.to_key());
    key
}

impl ReverseAssociationTable {
    pub fn new(partition: Partition) -> Self {
        Self {
            partition,
            cached: HashMap::new(),
            updated_initial: HashMap::new(),
        }
    }

    /// Referencers of `target`, from cache or one prefix scan.
    pub fn get(&mut self, store: &dyn ValueStore, target: PeerId) -> BTreeSet<PeerId> {
        if let Some(set) = self.cached.get(&target) {
            return set.clone();
        }
        let prefix = target.to_key();
        let mut set = BTreeSet::new();
        for (key, _) in store.scan_prefix(self.partition.id, &prefix) {
            if let Some(source) = PeerId::from_key(&key[prefix.len()..]) {
                set.insert(source);
            }
        }
        self.cached.insert(target, set.clone());
        set
    }

    pub fn add_reverse_association(
        &mut self,
        store: &dyn ValueStore,
        target: PeerId,
        source: PeerId,
    ) {
        let current = self.get(store, target);
        self.updated_initial
            .entry(target)
            .or_insert_with(|| current.clone());
        self.cached.entry(target).or_default().insert(source);
    }

    pub fn remove_reverse_association(
        &mut self,
        store: &dyn ValueStore,
        target: PeerId,
        source: PeerId,
    ) {
        let current = self.get(store, target);
        self.updated_initial
            .entry(target)
            .or_insert_with(|| current.clone());
        self.cached.entry(target).or_default().remove(&source);
    }

    pub fn has_pending(&self) -> bool {
        !self.updated_initial.is_empty()
    }

    /// Writes only the per-target set difference between the transaction's
    /// initial membership and the final membership.
    pub fn before_commit(&mut self, store: &mut dyn ValueStore) -> Result<(), ChatstoreError> {
        for (target, initial) in std::mem::take(&mut self.updated_initial) {
            let Some(current) = self.cached.get(&target) else {
                panic!("pending reverse association set for {target:?} missing from cache");
            };
            for source in initial.difference(current) {
                store.remove(self.partition.id, &composite_key(target, *source));
            }
            for source in current.difference(&initial) {
                store.set(self.partition.id, &composite_key(target, *source), Vec::new());
            }
        }
        Ok(())
    }

    pub fn clear_memory_cache(&mut self) {
        assert!(
            self.updated_initial.is_empty(),
            "clear_memory_cache with pending reverse association writes"
        );
        self.cached.clear();
    }
}
