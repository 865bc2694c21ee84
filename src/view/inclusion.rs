use crate::kv::ValueStore;
use crate::model::{ChatInclusion, PeerId};
use crate::table::Tables;
use crate::transaction::TransactionDiff;

/// The inclusion boolean is derived, not stored: the diff only marks peers
/// whose inclusion may have moved, and replay re-derives from the inclusion
/// record plus one bounded message-table probe.
pub(crate) struct MutablePeerInclusionView {
    peer_id: PeerId,
    included: bool,
}

fn derive(tables: &mut Tables, store: &dyn ValueStore, peer_id: PeerId) -> bool {
    match tables.chat_inclusion.get_record(store, peer_id) {
        ChatInclusion::Never => false,
        ChatInclusion::IfHasMessages => tables.messages.peer_has_messages(store, peer_id),
        ChatInclusion::Always { .. } => true,
    }
}

impl MutablePeerInclusionView {
    pub(crate) fn new(tables: &mut Tables, store: &dyn ValueStore, peer_id: PeerId) -> Self {
        Self {
            peer_id,
            included: derive(tables, store, peer_id),
        }
    }

    pub(crate) fn replay(
        &mut self,
        tables: &mut Tables,
        store: &dyn ValueStore,
        diff: &TransactionDiff,
    ) -> bool {
        if diff.updated_inclusions.contains(&self.peer_id) {
            let included = derive(tables, store, self.peer_id);
            if included != self.included {
                self.included = included;
                return true;
            }
        }
        false
    }

    pub(crate) fn snapshot(&self) -> PeerInclusionView {
        PeerInclusionView {
            peer_id: self.peer_id,
            included: self.included,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerInclusionView {
    pub peer_id: PeerId,
    pub included: bool,
}
