//! Replay equivalence: after any sequence of committed transactions, a view
//! advanced by diff replay must equal a view seeded fresh from table state.

use chatstore::config::ChatstoreConfig;
use chatstore::model::{
    ChatInclusion, GroupAndNamespace, Message, MessageId, MessageTags, Peer, PeerGroupId, PeerId,
    PeerNotificationSettings, TagSummaryKey,
};
use chatstore::transaction::Transaction;
use chatstore::view::{ViewKey, ViewSnapshot, ViewSubscription};
use chatstore::Chatstore;
use proptest::prelude::*;
use std::sync::Arc;
use tempfile::tempdir;

#[derive(Debug, Clone)]
enum Op {
    SetPeer { id: i64, associated: Option<i64> },
    AddMessage { peer: i64, id: u32, tags: u32 },
    SetInclusion { peer: i64, record: u8 },
    SetSettings { peer: i64, timestamp: Option<i64> },
    GroupSync { group: i32, needed: bool },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1_i64..4, prop::option::of(10_i64..13))
            .prop_map(|(id, associated)| Op::SetPeer { id, associated }),
        (1_i64..4, 1_u32..8, 0_u32..16).prop_map(|(peer, id, tags)| Op::AddMessage {
            peer,
            id,
            tags
        }),
        (1_i64..4, 0_u8..3).prop_map(|(peer, record)| Op::SetInclusion { peer, record }),
        (1_i64..4, prop::option::of(0_i64..50))
            .prop_map(|(peer, timestamp)| Op::SetSettings { peer, timestamp }),
        (1_i32..3, any::<bool>()).prop_map(|(group, needed)| Op::GroupSync { group, needed }),
    ]
}

fn apply(txn: &mut Transaction<'_>, op: &Op) {
    match op {
        Op::SetPeer { id, associated } => txn.set_peer(Peer {
            id: PeerId(*id),
            name: format!("peer-{id}"),
            associated_peer: associated.map(PeerId),
        }),
        Op::AddMessage { peer, id, tags } => txn.add_message(Message {
            id: MessageId {
                peer_id: PeerId(*peer),
                namespace: 0,
                id: *id,
            },
            timestamp: 1_000 + *id as i64,
            text: format!("m{id}"),
            tags: MessageTags(*tags),
        }),
        Op::SetInclusion { peer, record } => txn.set_chat_inclusion(
            PeerId(*peer),
            match *record {
                0 => ChatInclusion::Never,
                1 => ChatInclusion::IfHasMessages,
                _ => ChatInclusion::Always { pinned_rank: None },
            },
        ),
        Op::SetSettings { peer, timestamp } => txn.set_notification_settings(
            PeerId(*peer),
            PeerNotificationSettings {
                muted_until: None,
                behavior_timestamp: *timestamp,
            },
        ),
        Op::GroupSync { group, needed } => {
            let key = GroupAndNamespace {
                group_id: PeerGroupId(*group),
                namespace: 0,
            };
            if *needed {
                txn.set_group_needs_sync(key);
            } else {
                txn.clear_group_needs_sync(key);
            }
        }
    }
}

fn tracked_keys() -> Vec<ViewKey> {
    let mut keys = Vec::new();
    for id in 1..4 {
        keys.push(ViewKey::Peer { peer_id: PeerId(id) });
        keys.push(ViewKey::PeerInclusion { peer_id: PeerId(id) });
        for tag in [MessageTags::PHOTO, MessageTags::VIDEO] {
            keys.push(ViewKey::TagSummary {
                key: TagSummaryKey {
                    tag,
                    peer_id: PeerId(id),
                    namespace: 0,
                },
            });
        }
    }
    keys.push(ViewKey::GroupSyncStats);
    keys.push(ViewKey::NotificationBehaviorTimestamp);
    keys
}

fn latest(sub: &mut ViewSubscription) -> Arc<ViewSnapshot> {
    let mut current = Arc::clone(&sub.initial);
    while let Ok(snapshot) = sub.updates.try_recv() {
        current = snapshot;
    }
    current
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn replayed_views_equal_freshly_seeded_views(
        transactions in prop::collection::vec(prop::collection::vec(arb_op(), 1..5), 1..8),
    ) {
        let dir = tempdir().expect("tempdir");
        let mut store =
            Chatstore::open(ChatstoreConfig::development(), dir.path()).expect("open");

        let keys = tracked_keys();
        let mut subscriptions: Vec<ViewSubscription> =
            keys.iter().map(|key| store.subscribe(*key)).collect();

        for ops in &transactions {
            store
                .with_transaction(|txn| {
                    for op in ops {
                        apply(txn, op);
                    }
                })
                .expect("commit");
        }

        for (key, sub) in keys.iter().zip(subscriptions.iter_mut()) {
            let replayed = latest(sub);
            let reseeded = store.subscribe(*key).initial;
            prop_assert_eq!(
                &*replayed,
                &*reseeded,
                "view {:?} diverged from a fresh seed",
                key
            );
        }
    }
}
