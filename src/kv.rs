//! Boundary to the ordered key-value primitive.
//!
//! The engine only assumes point get/set/remove plus a lazy, restartable
//! prefix scan over named partitions. Durability and atomic batching are the
//! primitive's responsibility; `commit` marks the batch boundary. The
//! in-memory implementation below backs embedding and tests.

use crate::error::ChatstoreError;
use std::collections::HashMap;
use std::ops::Bound;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionId(pub u16);

/// Declared key shape of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Fixed-width order-preserving encoding of a 64-bit identifier.
    Int64,
    /// Variable-length byte string.
    Bytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub id: PartitionId,
    pub key_type: KeyType,
}

pub trait ValueStore {
    fn get(&self, partition: PartitionId, key: &[u8]) -> Option<Vec<u8>>;

    fn set(&mut self, partition: PartitionId, key: &[u8], value: Vec<u8>);

    fn remove(&mut self, partition: PartitionId, key: &[u8]);

    /// Lazy iteration over `(key, value)` pairs whose key starts with
    /// `prefix`, in key order. Each call restarts; nothing persists across
    /// calls.
    fn scan_prefix<'a>(
        &'a self,
        partition: PartitionId,
        prefix: &'a [u8],
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a>;

    /// Marks the end of a write batch. Everything set since the previous
    /// commit must become visible and durable together.
    fn commit(&mut self) -> Result<(), ChatstoreError>;
}

/// Copy-on-write in-memory value store.
///
/// Writes apply eagerly; under the single-writer discipline the batch is
/// trivially atomic and `commit` has no further work. An engine with real
/// durability implements the same trait with staged batches.
#[derive(Debug, Default, Clone)]
pub struct MemoryValueStore {
    partitions: HashMap<PartitionId, im::OrdMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, partition: PartitionId) -> usize {
        self.partitions.get(&partition).map_or(0, |map| map.len())
    }

    pub fn is_empty(&self, partition: PartitionId) -> bool {
        self.len(partition) == 0
    }
}

impl ValueStore for MemoryValueStore {
    fn get(&self, partition: PartitionId, key: &[u8]) -> Option<Vec<u8>> {
        self.partitions
            .get(&partition)
            .and_then(|map| map.get(key))
            .cloned()
    }

    fn set(&mut self, partition: PartitionId, key: &[u8], value: Vec<u8>) {
        self.partitions
            .entry(partition)
            .or_default()
            .insert(key.to_vec(), value);
    }

    fn remove(&mut self, partition: PartitionId, key: &[u8]) {
        if let Some(map) = self.partitions.get_mut(&partition) {
            map.remove(key);
        }
    }

    fn scan_prefix<'a>(
        &'a self,
        partition: PartitionId,
        prefix: &'a [u8],
    ) -> Box<dyn Iterator<Item = (Vec<u8>, Vec<u8>)> + 'a> {
        let Some(map) = self.partitions.get(&partition) else {
            return Box::new(std::iter::empty());
        };
        Box::new(
            map.range::<_, [u8]>((Bound::Included(prefix), Bound::Unbounded))
                .take_while(move |(key, _)| key.starts_with(prefix))
                .map(|(key, value)| (key.clone(), value.clone())),
        )
    }

    fn commit(&mut self) -> Result<(), ChatstoreError> {
        Ok(())
    }
}
