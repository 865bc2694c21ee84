use crate::kv::ValueStore;
use crate::model::{
    CachedPeerData, GroupAndNamespace, Message, MessageId, Peer, PeerId, PeerNotificationSettings,
    TagSummary, TagSummaryKey,
};
use crate::table::Tables;
use std::collections::{HashMap, HashSet};

/// Everything one committed transaction changed, keyed by the identity each
/// change kind uses. Every field defaults to empty and is populated only with
/// *net* changes, so a view inspects just the one or two fields it cares
/// about. Views ignore fields they do not recognize, which is what allows
/// new change kinds to be added here without touching existing views.
#[derive(Debug, Clone, Default)]
pub struct TransactionDiff {
    pub updated_peers: HashMap<PeerId, (Option<Peer>, Peer)>,
    pub updated_cached_peer_data: HashMap<PeerId, CachedPeerData>,
    pub updated_messages: HashMap<MessageId, (Option<Message>, Message)>,
    pub updated_tag_summaries: HashMap<TagSummaryKey, TagSummary>,
    /// Peers whose derived chat-list inclusion may have changed. Carries no
    /// value: the inclusion view re-derives its boolean from the tables.
    pub updated_inclusions: HashSet<PeerId>,
    pub updated_notification_settings: HashMap<PeerId, PeerNotificationSettings>,
    /// Peers whose behavior timestamp moved; the earliest-timestamp view
    /// re-derives from the index when this is non-empty.
    pub updated_behavior_timestamps: HashSet<PeerId>,
    pub updated_group_sync_operations: HashMap<GroupAndNamespace, bool>,
}

impl TransactionDiff {
    pub fn is_empty(&self) -> bool {
        self.updated_peers.is_empty()
            && self.updated_cached_peer_data.is_empty()
            && self.updated_messages.is_empty()
            && self.updated_tag_summaries.is_empty()
            && self.updated_inclusions.is_empty()
            && self.updated_notification_settings.is_empty()
            && self.updated_behavior_timestamps.is_empty()
            && self.updated_group_sync_operations.is_empty()
    }

    /// Assembles the diff from every table's pending bookkeeping. Runs while
    /// the pending sets are still intact, immediately before the flush that
    /// drains them. Writes whose final value equals the pre-transaction value
    /// are suppressed.
    pub(crate) fn collect(
        tables: &mut Tables,
        store: &dyn ValueStore,
        inclusion_markers: HashSet<PeerId>,
    ) -> TransactionDiff {
        let mut diff = TransactionDiff::default();

        for (previous, current) in tables.peers.transaction_updated_peers(store) {
            if previous.as_ref() != Some(&current) {
                diff.updated_peers.insert(current.id, (previous, current));
            }
        }

        for (peer_id, previous, current) in tables.cached_peer_data.transaction_updated(store) {
            if previous.as_ref() != Some(&current) {
                diff.updated_cached_peer_data.insert(peer_id, current);
            }
        }

        for (id, previous, current) in tables.messages.transaction_updated(store) {
            if previous.as_ref() != Some(&current) {
                diff.updated_messages.insert(id, (previous, current));
            }
        }

        for (key, previous, current) in tables.tag_summaries.transaction_updated(store) {
            if previous.as_ref() != Some(&current) {
                diff.updated_tag_summaries.insert(key, current);
            }
        }

        diff.updated_inclusions
            .extend(tables.chat_inclusion.transaction_updated_peers(store));
        diff.updated_inclusions.extend(inclusion_markers);

        for (peer_id, previous, current) in tables.notification_settings.transaction_updated(store)
        {
            if previous.as_ref() == Some(&current) {
                continue;
            }
            let previous_timestamp = previous.and_then(|s| s.behavior_timestamp);
            if previous_timestamp != current.behavior_timestamp {
                diff.updated_behavior_timestamps.insert(peer_id);
            }
            diff.updated_notification_settings.insert(peer_id, current);
        }

        diff.updated_group_sync_operations = tables
            .group_sync
            .transaction_updated_operations(store);

        diff
    }
}
