//! The write-transaction mutation surface.
//!
//! All domain mutations go through [`Transaction`]; tables buffer the writes
//! and the owning store runs the commit pipeline when the closure returns.
//! Transactions are synchronous, non-reentrant units: they run to completion
//! on the single owning context and commit as one batch.

mod diff;

pub use diff::TransactionDiff;

use crate::kv::ValueStore;
use crate::model::{
    CachedPeerData, ChatInclusion, GroupAndNamespace, Message, MessageId, Peer, PeerId,
    PeerNotificationSettings, TagSummaryKey,
};
use crate::table::Tables;
use std::collections::{BTreeSet, HashSet};

pub struct Transaction<'a> {
    tables: &'a mut Tables,
    store: &'a dyn ValueStore,
    /// Peers whose derived inclusion may have changed through message flow
    /// rather than an inclusion-record write.
    inclusion_markers: HashSet<PeerId>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn new(tables: &'a mut Tables, store: &'a dyn ValueStore) -> Self {
        Self {
            tables,
            store,
            inclusion_markers: HashSet::new(),
        }
    }

    pub(crate) fn into_inclusion_markers(self) -> HashSet<PeerId> {
        self.inclusion_markers
    }

    pub fn get_peer(&mut self, id: PeerId) -> Option<Peer> {
        self.tables.peers.get(self.store, id)
    }

    pub fn set_peer(&mut self, peer: Peer) {
        self.tables.peers.set(self.store, peer);
    }

    /// Peers currently referencing `target` through their `associated_peer`.
    pub fn referencers_of(&mut self, target: PeerId) -> BTreeSet<PeerId> {
        self.tables.reverse_associations.get(self.store, target)
    }

    pub fn get_cached_peer_data(&mut self, id: PeerId) -> Option<CachedPeerData> {
        self.tables.cached_peer_data.get(self.store, id)
    }

    pub fn set_cached_peer_data(&mut self, data: CachedPeerData) {
        self.tables.cached_peer_data.set(self.store, data);
    }

    pub fn get_message(&mut self, id: MessageId) -> Option<Message> {
        self.tables.messages.get(self.store, id)
    }

    /// Stores a message and advances the per-peer tag summaries by the tag
    /// delta against whatever was stored under the same id.
    pub fn add_message(&mut self, message: Message) {
        let id = message.id;
        let previous = self.tables.messages.get(self.store, id);
        match &previous {
            None => {
                for tag in message.tags.iter() {
                    self.tables.tag_summaries.add_contribution(
                        self.store,
                        TagSummaryKey {
                            tag,
                            peer_id: id.peer_id,
                            namespace: id.namespace,
                        },
                        id.id,
                    );
                }
                self.inclusion_markers.insert(id.peer_id);
            }
            Some(previous) => {
                for tag in previous.tags.iter() {
                    if !message.tags.contains(tag) {
                        self.tables.tag_summaries.remove_contribution(
                            self.store,
                            TagSummaryKey {
                                tag,
                                peer_id: id.peer_id,
                                namespace: id.namespace,
                            },
                        );
                    }
                }
                for tag in message.tags.iter() {
                    if !previous.tags.contains(tag) {
                        self.tables.tag_summaries.add_contribution(
                            self.store,
                            TagSummaryKey {
                                tag,
                                peer_id: id.peer_id,
                                namespace: id.namespace,
                            },
                            id.id,
                        );
                    }
                }
            }
        }
        self.tables.messages.set(self.store, message);
    }

    pub fn get_chat_inclusion(&mut self, id: PeerId) -> ChatInclusion {
        self.tables.chat_inclusion.get_record(self.store, id)
    }

    pub fn set_chat_inclusion(&mut self, id: PeerId, inclusion: ChatInclusion) {
        self.tables.chat_inclusion.set_record(self.store, id, inclusion);
    }

    pub fn get_notification_settings(&mut self, id: PeerId) -> Option<PeerNotificationSettings> {
        self.tables.notification_settings.get(self.store, id)
    }

    pub fn set_notification_settings(&mut self, id: PeerId, settings: PeerNotificationSettings) {
        self.tables.notification_settings.set(self.store, id, settings);
    }

    pub fn groups_needing_sync(&mut self) -> BTreeSet<GroupAndNamespace> {
        self.tables.group_sync.get(self.store)
    }

    pub fn set_group_needs_sync(&mut self, key: GroupAndNamespace) {
        self.tables.group_sync.set_operation(self.store, key, true);
    }

    pub fn clear_group_needs_sync(&mut self, key: GroupAndNamespace) {
        self.tables.group_sync.set_operation(self.store, key, false);
    }
}
