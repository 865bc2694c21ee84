//! Write-back entity tables.
//!
//! Every table buffers mutations in memory and flushes at commit. The first
//! write to an identifier in a transaction records the pre-transaction value;
//! later writes keep that first recording, so the commit can always compare
//! final-vs-initial. Flush order is fixed: primary-data tables run before the
//! tables that derive secondary indexes from them.

mod cached_peer_data;
mod chat_inclusion;
mod group_sync;
mod message;
mod notification_settings;
mod peer;
mod reverse_association;
mod tag_summary;

pub use cached_peer_data::CachedPeerDataTable;
pub use chat_inclusion::ChatInclusionTable;
pub use group_sync::GroupSyncTable;
pub use message::MessageTable;
pub use notification_settings::NotificationSettingsTable;
pub use peer::PeerTable;
pub use reverse_association::ReverseAssociationTable;
pub use tag_summary::TagSummaryTable;

use crate::codec;
use crate::error::ChatstoreError;
use crate::kv::{KeyType, Partition, PartitionId, ValueStore};
use crate::model::KeyBuf;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

pub const PEERS: Partition = Partition {
    id: PartitionId(1),
    key_type: KeyType::Int64,
};
pub const REVERSE_ASSOCIATIONS: Partition = Partition {
    id: PartitionId(2),
    key_type: KeyType::Bytes,
};
pub const CACHED_PEER_DATA: Partition = Partition {
    id: PartitionId(3),
    key_type: KeyType::Int64,
};
pub const MESSAGES: Partition = Partition {
    id: PartitionId(4),
    key_type: KeyType::Bytes,
};
pub const TAG_SUMMARIES: Partition = Partition {
    id: PartitionId(5),
    key_type: KeyType::Bytes,
};
pub const CHAT_INCLUSION: Partition = Partition {
    id: PartitionId(6),
    key_type: KeyType::Int64,
};
pub const NOTIFICATION_SETTINGS: Partition = Partition {
    id: PartitionId(7),
    key_type: KeyType::Int64,
};
pub const NOTIFICATION_BEHAVIOR_INDEX: Partition = Partition {
    id: PartitionId(8),
    key_type: KeyType::Bytes,
};
pub const GROUP_SYNC: Partition = Partition {
    id: PartitionId(9),
    key_type: KeyType::Bytes,
};

/// Shared write-back machinery for tables whose rows are one entity per key.
///
/// Concrete tables either delegate `before_commit` wholesale or drain the
/// pending set themselves to interleave secondary-index reconciliation.
pub(crate) struct EntityTable<K, V> {
    partition: Partition,
    kind: &'static str,
    key_fn: fn(&K) -> KeyBuf,
    cached: HashMap<K, V>,
    updated_initial: HashMap<K, Option<V>>,
}

impl<K, V> EntityTable<K, V>
where
    K: Eq + Hash + Copy + Debug,
    V: Clone + PartialEq + Serialize + DeserializeOwned,
{
    pub(crate) fn new(partition: Partition, kind: &'static str, key_fn: fn(&K) -> KeyBuf) -> Self {
        Self {
            partition,
            kind,
            key_fn,
            cached: HashMap::new(),
            updated_initial: HashMap::new(),
        }
    }

    /// Cache hit, else point-read + decode + populate. Absence and decode
    /// failure both read as `None`.
    pub(crate) fn get(&mut self, store: &dyn ValueStore, key: K) -> Option<V> {
        if let Some(value) = self.cached.get(&key) {
            return Some(value.clone());
        }
        let bytes = store.get(self.partition.id, &(self.key_fn)(&key))?;
        let value: V = codec::decode(self.kind, &bytes)?;
        self.cached.insert(key, value.clone());
        Some(value)
    }

    /// Records the pre-transaction value on the first write of `key`, then
    /// updates the cache. No I/O happens here.
    pub(crate) fn set(&mut self, store: &dyn ValueStore, key: K, value: V) {
        if !self.updated_initial.contains_key(&key) {
            let previous = self.get(store, key);
            self.updated_initial.insert(key, previous);
        }
        self.cached.insert(key, value);
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.updated_initial.is_empty()
    }

    /// Before/after pairs for every key written this transaction, without
    /// re-reading storage. Panics if a pending key is missing from the cache:
    /// that means the single-writer discipline was violated.
    pub(crate) fn transaction_updated(&mut self, store: &dyn ValueStore) -> Vec<(K, Option<V>, V)> {
        let keys: Vec<K> = self.updated_initial.keys().copied().collect();
        let mut result = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(current) = self.get(store, key) else {
                panic!("pending {} entity {key:?} missing from cache", self.kind);
            };
            let initial = self.updated_initial[&key].clone();
            result.push((key, initial, current));
        }
        result
    }

    pub(crate) fn take_pending(&mut self) -> HashMap<K, Option<V>> {
        std::mem::take(&mut self.updated_initial)
    }

    /// Encodes and writes the cached value of one drained pending key,
    /// returning it for index reconciliation. Panics if the value left the
    /// cache: the write-back path trusts its own cache completely.
    pub(crate) fn flush_one(
        &mut self,
        store: &mut dyn ValueStore,
        key: K,
    ) -> Result<V, ChatstoreError> {
        let Some(value) = self.cached.get(&key) else {
            panic!("pending {} entity {key:?} missing from cache", self.kind);
        };
        store.set(self.partition.id, &(self.key_fn)(&key), codec::encode(value)?);
        Ok(value.clone())
    }

    /// Plain flush for tables without derived indexes.
    pub(crate) fn before_commit(&mut self, store: &mut dyn ValueStore) -> Result<(), ChatstoreError> {
        for (key, _previous) in self.take_pending() {
            self.flush_one(store, key)?;
        }
        Ok(())
    }

    /// Drops the decode cache. Must not be called mid-transaction.
    pub(crate) fn clear_memory_cache(&mut self) {
        assert!(
            self.updated_initial.is_empty(),
            "clear_memory_cache with pending {} writes",
            self.kind
        );
        self.cached.clear();
    }

    pub(crate) fn cached_len(&self) -> usize {
        self.cached.len()
    }
}

/// The full table catalog, in commit dependency order.
pub struct Tables {
    pub peers: PeerTable,
    pub reverse_associations: ReverseAssociationTable,
    pub cached_peer_data: CachedPeerDataTable,
    pub messages: MessageTable,
    pub tag_summaries: TagSummaryTable,
    pub chat_inclusion: ChatInclusionTable,
    pub notification_settings: NotificationSettingsTable,
    pub group_sync: GroupSyncTable,
}

impl Tables {
    pub fn new() -> Self {
        Self {
            peers: PeerTable::new(PEERS),
            reverse_associations: ReverseAssociationTable::new(REVERSE_ASSOCIATIONS),
            cached_peer_data: CachedPeerDataTable::new(CACHED_PEER_DATA),
            messages: MessageTable::new(MESSAGES),
            tag_summaries: TagSummaryTable::new(TAG_SUMMARIES),
            chat_inclusion: ChatInclusionTable::new(CHAT_INCLUSION),
            notification_settings: NotificationSettingsTable::new(
                NOTIFICATION_SETTINGS,
                NOTIFICATION_BEHAVIOR_INDEX,
            ),
            group_sync: GroupSyncTable::new(GROUP_SYNC),
        }
    }

    pub fn has_pending(&self) -> bool {
        self.peers.has_pending()
            || self.reverse_associations.has_pending()
            || self.cached_peer_data.has_pending()
            || self.messages.has_pending()
            || self.tag_summaries.has_pending()
            || self.chat_inclusion.has_pending()
            || self.notification_settings.has_pending()
            || self.group_sync.has_pending()
    }

    /// Flushes every pending write. Primary-data tables run first; tables
    /// fed by their reconciliation (reverse associations) run after.
    pub fn before_commit(&mut self, store: &mut dyn ValueStore) -> Result<(), ChatstoreError> {
        self.peers
            .before_commit(store, &mut self.reverse_associations)?;
        self.cached_peer_data.before_commit(store)?;
        self.messages.before_commit(store)?;
        self.tag_summaries.before_commit(store)?;
        self.chat_inclusion.before_commit(store)?;
        self.notification_settings.before_commit(store)?;
        self.reverse_associations.before_commit(store)?;
        self.group_sync.before_commit(store)?;
        Ok(())
    }

    pub fn clear_memory_caches(&mut self) {
        self.peers.clear_memory_cache();
        self.reverse_associations.clear_memory_cache();
        self.cached_peer_data.clear_memory_cache();
        self.messages.clear_memory_cache();
        self.tag_summaries.clear_memory_cache();
        self.chat_inclusion.clear_memory_cache();
        self.notification_settings.clear_memory_cache();
        self.group_sync.clear_memory_cache();
    }

    pub fn cached_entities(&self) -> usize {
        self.peers.cached_len()
            + self.cached_peer_data.cached_len()
            + self.messages.cached_len()
            + self.tag_summaries.cached_len()
            + self.chat_inclusion.cached_len()
            + self.notification_settings.cached_len()
    }
}

impl Default for Tables {
    fn default() -> Self {
        Self::new()
    }
}
