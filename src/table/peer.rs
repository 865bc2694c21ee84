use super::{EntityTable, ReverseAssociationTable};
use crate::error::ChatstoreError;
use crate::kv::{Partition, ValueStore};
use crate::model::{Peer, PeerId};

/// The canonical entity table: peer records plus commit-time maintenance of
/// the reverse association index.
pub struct PeerTable {
    inner: EntityTable<PeerId, Peer>,
}

impl PeerTable {
    pub fn new(partition: Partition) -> Self {
        Self {
            inner: EntityTable::new(partition, "peer", |id| id.to_key()),
        }
    }

    pub fn get(&mut self, store: &dyn ValueStore, id: PeerId) -> Option<Peer> {
        self.inner.get(store, id)
    }

    pub fn set(&mut self, store: &dyn ValueStore, peer: Peer) {
        self.inner.set(store, peer.id, peer);
    }

    pub fn has_pending(&self) -> bool {
        self.inner.has_pending()
    }

    pub fn transaction_updated_peers(
        &mut self,
        store: &dyn ValueStore,
    ) -> Vec<(Option<Peer>, Peer)> {
        self.inner
            .transaction_updated(store)
            .into_iter()
            .map(|(_, previous, current)| (previous, current))
            .collect()
    }

    /// Flushes pending peers and reconciles the reverse association index by
    /// diffing each peer's previous vs current `associated_peer`. Index
    /// operations are issued only on change.
    pub fn before_commit(
        &mut self,
        store: &mut dyn ValueStore,
        reverse: &mut ReverseAssociationTable,
    ) -> Result<(), ChatstoreError> {
        for (peer_id, previous) in self.inner.take_pending() {
            let peer = self.inner.flush_one(store, peer_id)?;
            let previous_association = previous.as_ref().and_then(|p| p.associated_peer);
            if previous_association != peer.associated_peer {
                if let Some(target) = previous_association {
                    reverse.remove_reverse_association(store, target, peer_id);
                }
                if let Some(target) = peer.associated_peer {
                    reverse.add_reverse_association(store, target, peer_id);
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

#[cfg(test)]
mod tests {
    use super::super::{PEERS, REVERSE_ASSOCIATIONS};
    use super::{PeerTable, ReverseAssociationTable};
    use crate::kv::{MemoryValueStore, ValueStore};
    use crate::model::{Peer, PeerId};

    fn peer(id: i64, associated: Option<i64>) -> Peer {
        Peer {
            id: PeerId(id),
            name: format!("peer-{id}"),
            associated_peer: associated.map(PeerId),
        }
    }

    #[test]
    fn get_reads_through_and_caches() {
        let mut store = MemoryValueStore::new();
        let mut table = PeerTable::new(PEERS);
        let mut reverse = ReverseAssociationTable::new(REVERSE_ASSOCIATIONS);

        assert_eq!(table.get(&store, PeerId(1)), None);
        table.set(&store, peer(1, None));
        table.before_commit(&mut store, &mut reverse).expect("commit");

        let mut fresh = PeerTable::new(PEERS);
        assert_eq!(fresh.get(&store, PeerId(1)), Some(peer(1, None)));
        // Second read hits the cache even if the partition were cleared.
        store.remove(PEERS.id, &PeerId(1).to_key());
        assert_eq!(fresh.get(&store, PeerId(1)), Some(peer(1, None)));
    }

    #[test]
    fn first_previous_value_is_preserved_across_rewrites() {
        let store = MemoryValueStore::new();
        let mut table = PeerTable::new(PEERS);

        table.set(&store, peer(1, None));
        table.set(&store, peer(1, Some(2)));
        table.set(&store, peer(1, Some(3)));

        let updated = table.transaction_updated_peers(&store);
        assert_eq!(updated.len(), 1);
        let (previous, current) = &updated[0];
        assert_eq!(*previous, None);
        assert_eq!(current.associated_peer, Some(PeerId(3)));
    }

    #[test]
    fn association_reconciliation_issues_moves_once() {
        let mut store = MemoryValueStore::new();
        let mut table = PeerTable::new(PEERS);
        let mut reverse = ReverseAssociationTable::new(REVERSE_ASSOCIATIONS);

        table.set(&store, peer(1, Some(10)));
        table.before_commit(&mut store, &mut reverse).expect("commit");
        reverse.before_commit(&mut store).expect("index commit");
        assert!(reverse.get(&store, PeerId(10)).contains(&PeerId(1)));

        table.set(&store, peer(1, Some(20)));
        table.before_commit(&mut store, &mut reverse).expect("commit");
        reverse.before_commit(&mut store).expect("index commit");

        assert!(reverse.get(&store, PeerId(10)).is_empty());
        assert!(reverse.get(&store, PeerId(20)).contains(&PeerId(1)));
    }

    #[test]
    fn unchanged_association_does_not_touch_index() {
        let mut store = MemoryValueStore::new();
        let mut table = PeerTable::new(PEERS);
        let mut reverse = ReverseAssociationTable::new(REVERSE_ASSOCIATIONS);

        table.set(&store, peer(1, Some(10)));
        table.before_commit(&mut store, &mut reverse).expect("commit");
        reverse.before_commit(&mut store).expect("index commit");

        // Rename without changing the association.
        let mut renamed = peer(1, Some(10));
        renamed.name = "renamed".into();
        table.set(&store, renamed);
        table.before_commit(&mut store, &mut reverse).expect("commit");
        assert!(!reverse.has_pending());
    }

    #[test]
    #[should_panic(expected = "clear_memory_cache")]
    fn clear_cache_with_pending_writes_is_fatal() {
        let store = MemoryValueStore::new();
        let mut table = PeerTable::new(PEERS);
        table.set(&store, peer(1, None));
        table.clear_memory_cache();
    }
}
