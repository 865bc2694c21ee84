use crate::kv::ValueStore;
use crate::model::{Peer, PeerId};
use crate::table::Tables;
use crate::transaction::TransactionDiff;

pub(crate) struct MutablePeerView {
    peer_id: PeerId,
    peer: Option<Peer>,
}

impl MutablePeerView {
    pub(crate) fn new(tables: &mut Tables, store: &dyn ValueStore, peer_id: PeerId) -> Self {
        Self {
            peer_id,
            peer: tables.peers.get(store, peer_id),
        }
    }

    pub(crate) fn replay(&mut self, diff: &TransactionDiff) -> bool {
        if let Some((_, current)) = diff.updated_peers.get(&self.peer_id) {
            if self.peer.as_ref() != Some(current) {
                self.peer = Some(current.clone());
                return true;
            }
        }
        false
    }

    pub(crate) fn snapshot(&self) -> PeerView {
        PeerView {
            peer_id: self.peer_id,
            peer: self.peer.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerView {
    pub peer_id: PeerId,
    pub peer: Option<Peer>,
}
