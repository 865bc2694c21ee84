//! Incrementally maintained read projections.
//!
//! A mutable view is seeded once from a consistent read of the tables, then
//! advanced in place by replaying each committed transaction's diff. Replay
//! inspects only the diff fields the view recognizes and reports whether the
//! in-memory state actually changed; only then is a fresh immutable snapshot
//! published to the subscriber.

mod behavior_timestamp;
mod cached_peer_data;
mod group_sync;
mod inclusion;
mod peer;
mod tag_summary;

pub use behavior_timestamp::NotificationBehaviorTimestampView;
pub use cached_peer_data::CachedPeerDataView;
pub use group_sync::GroupSyncStatsView;
pub use inclusion::PeerInclusionView;
pub use peer::PeerView;
pub use tag_summary::TagSummaryView;

use behavior_timestamp::MutableNotificationBehaviorTimestampView;
use cached_peer_data::MutableCachedPeerDataView;
use group_sync::MutableGroupSyncStatsView;
use inclusion::MutablePeerInclusionView;
use peer::MutablePeerView;
use tag_summary::MutableTagSummaryView;

use crate::kv::ValueStore;
use crate::model::{PeerId, TagSummaryKey};
use crate::table::Tables;
use crate::transaction::TransactionDiff;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// What to project. One key produces one mutable/immutable view pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKey {
    Peer { peer_id: PeerId },
    CachedPeerData { peer_id: PeerId },
    TagSummary { key: TagSummaryKey },
    PeerInclusion { peer_id: PeerId },
    GroupSyncStats,
    NotificationBehaviorTimestamp,
}

/// Immutable snapshot of one view, safe to hand to any number of readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewSnapshot {
    Peer(PeerView),
    CachedPeerData(CachedPeerDataView),
    TagSummary(TagSummaryView),
    PeerInclusion(PeerInclusionView),
    GroupSyncStats(GroupSyncStatsView),
    NotificationBehaviorTimestamp(NotificationBehaviorTimestampView),
}

pub(crate) enum MutableViewState {
    Peer(MutablePeerView),
    CachedPeerData(MutableCachedPeerDataView),
    TagSummary(MutableTagSummaryView),
    PeerInclusion(MutablePeerInclusionView),
    GroupSyncStats(MutableGroupSyncStatsView),
    NotificationBehaviorTimestamp(MutableNotificationBehaviorTimestampView),
}

impl MutableViewState {
    fn seed(key: ViewKey, tables: &mut Tables, store: &dyn ValueStore) -> Self {
        match key {
            ViewKey::Peer { peer_id } => {
                MutableViewState::Peer(MutablePeerView::new(tables, store, peer_id))
            }
            ViewKey::CachedPeerData { peer_id } => {
                MutableViewState::CachedPeerData(MutableCachedPeerDataView::new(
                    tables, store, peer_id,
                ))
            }
            ViewKey::TagSummary { key } => {
                MutableViewState::TagSummary(MutableTagSummaryView::new(tables, store, key))
            }
            ViewKey::PeerInclusion { peer_id } => {
                MutableViewState::PeerInclusion(MutablePeerInclusionView::new(
                    tables, store, peer_id,
                ))
            }
            ViewKey::GroupSyncStats => {
                MutableViewState::GroupSyncStats(MutableGroupSyncStatsView::new(tables, store))
            }
            ViewKey::NotificationBehaviorTimestamp => MutableViewState::NotificationBehaviorTimestamp(
                MutableNotificationBehaviorTimestampView::new(tables, store),
            ),
        }
    }

    /// Applies one committed diff; true iff the projection changed.
    fn replay(
        &mut self,
        tables: &mut Tables,
        store: &dyn ValueStore,
        diff: &TransactionDiff,
    ) -> bool {
        match self {
            MutableViewState::Peer(view) => view.replay(diff),
            MutableViewState::CachedPeerData(view) => view.replay(diff),
            MutableViewState::TagSummary(view) => view.replay(diff),
            MutableViewState::PeerInclusion(view) => view.replay(tables, store, diff),
            MutableViewState::GroupSyncStats(view) => view.replay(diff),
            MutableViewState::NotificationBehaviorTimestamp(view) => {
                view.replay(tables, store, diff)
            }
        }
    }

    fn snapshot(&self) -> ViewSnapshot {
        match self {
            MutableViewState::Peer(view) => ViewSnapshot::Peer(view.snapshot()),
            MutableViewState::CachedPeerData(view) => {
                ViewSnapshot::CachedPeerData(view.snapshot())
            }
            MutableViewState::TagSummary(view) => ViewSnapshot::TagSummary(view.snapshot()),
            MutableViewState::PeerInclusion(view) => ViewSnapshot::PeerInclusion(view.snapshot()),
            MutableViewState::GroupSyncStats(view) => {
                ViewSnapshot::GroupSyncStats(view.snapshot())
            }
            MutableViewState::NotificationBehaviorTimestamp(view) => {
                ViewSnapshot::NotificationBehaviorTimestamp(view.snapshot())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// One live subscription: the synchronously seeded snapshot plus a channel
/// delivering a fresh snapshot after every commit whose replay changed the
/// view.
pub struct ViewSubscription {
    pub id: SubscriptionId,
    pub initial: Arc<ViewSnapshot>,
    pub updates: UnboundedReceiver<Arc<ViewSnapshot>>,
}

struct ViewEntry {
    view: MutableViewState,
    sender: UnboundedSender<Arc<ViewSnapshot>>,
}

/// Registry of live mutable views, advanced after every commit.
#[derive(Default)]
pub(crate) struct ViewBag {
    entries: HashMap<u64, ViewEntry>,
    next_id: u64,
}

impl ViewBag {
    pub(crate) fn subscribe(
        &mut self,
        tables: &mut Tables,
        store: &dyn ValueStore,
        key: ViewKey,
    ) -> ViewSubscription {
        let view = MutableViewState::seed(key, tables, store);
        let initial = Arc::new(view.snapshot());
        let (sender, updates) = mpsc::unbounded_channel();
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, ViewEntry { view, sender });
        ViewSubscription {
            id: SubscriptionId(id),
            initial,
            updates,
        }
    }

    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.entries.remove(&id.0).is_some()
    }

    /// Replays `diff` into every live view, publishing snapshots for those
    /// that changed. Views whose subscriber is gone are dropped. Returns how
    /// many snapshots were published.
    pub(crate) fn replay_all(
        &mut self,
        tables: &mut Tables,
        store: &dyn ValueStore,
        diff: &TransactionDiff,
    ) -> usize {
        let mut published = 0;
        let mut dropped: Vec<u64> = Vec::new();
        for (id, entry) in self.entries.iter_mut() {
            if entry.view.replay(tables, store, diff) {
                let snapshot = Arc::new(entry.view.snapshot());
                if entry.sender.send(snapshot).is_err() {
                    dropped.push(*id);
                } else {
                    published += 1;
                }
            }
        }
        for id in dropped {
            self.entries.remove(&id);
        }
        published
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
