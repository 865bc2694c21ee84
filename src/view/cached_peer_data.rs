use crate::kv::ValueStore;
use crate::model::{CachedPeerData, PeerId};
use crate::table::Tables;
use crate::transaction::TransactionDiff;

pub(crate) struct MutableCachedPeerDataView {
    peer_id: PeerId,
    data: Option<CachedPeerData>,
}

impl MutableCachedPeerDataView {
    pub(crate) fn new(tables: &mut Tables, store: &dyn ValueStore, peer_id: PeerId) -> Self {
        Self {
            peer_id,
            data: tables.cached_peer_data.get(store, peer_id),
        }
    }

    pub(crate) fn replay(&mut self, diff: &TransactionDiff) -> bool {
        if let Some(current) = diff.updated_cached_peer_data.get(&self.peer_id) {
            if self.data.as_ref() != Some(current) {
                self.data = Some(current.clone());
                return true;
            }
        }
        false
    }

    pub(crate) fn snapshot(&self) -> CachedPeerDataView {
        CachedPeerDataView {
            peer_id: self.peer_id,
            data: self.data.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPeerDataView {
    pub peer_id: PeerId,
    pub data: Option<CachedPeerData>,
}
