use chatstore::config::ChatstoreConfig;
use chatstore::model::{Peer, PeerId};
use chatstore::Chatstore;
use std::collections::BTreeSet;
use tempfile::tempdir;

fn peer(id: i64, associated: Option<i64>) -> Peer {
    Peer {
        id: PeerId(id),
        name: format!("peer-{id}"),
        associated_peer: associated.map(PeerId),
    }
}

/// Recomputes the reverse index from scratch by scanning every peer record.
fn full_recomputation(
    store: &mut Chatstore,
    peer_ids: &[i64],
    target: PeerId,
) -> BTreeSet<PeerId> {
    store
        .with_transaction(|txn| {
            peer_ids
                .iter()
                .filter_map(|id| txn.get_peer(PeerId(*id)))
                .filter(|p| p.associated_peer == Some(target))
                .map(|p| p.id)
                .collect()
        })
        .expect("read transaction")
}

#[test]
fn incremental_reconciliation_matches_full_recomputation() {
    let dir = tempdir().expect("tempdir");
    let mut store = Chatstore::open(ChatstoreConfig::default(), dir.path()).expect("open");

    let peer_ids: Vec<i64> = (1..=6).collect();
    let targets = [PeerId(10), PeerId(11), PeerId(12)];

    // Deterministic churn: every step points one peer at a rotating target,
    // sometimes clearing the association entirely.
    let steps: Vec<(i64, Option<i64>)> = (0..40)
        .map(|step| {
            let id = peer_ids[step % peer_ids.len()];
            let association = match step % 4 {
                0 => Some(10),
                1 => Some(11),
                2 => Some(12),
                _ => None,
            };
            (id, association)
        })
        .collect();

    for (id, association) in steps {
        store
            .with_transaction(|txn| txn.set_peer(peer(id, association)))
            .expect("commit");

        for target in targets {
            let incremental = store
                .with_transaction(|txn| txn.referencers_of(target))
                .expect("read index");
            let recomputed = full_recomputation(&mut store, &peer_ids, target);
            assert_eq!(
                incremental, recomputed,
                "index diverged for target {target:?}"
            );
        }
    }
}

#[test]
fn index_state_is_storage_backed_not_cache_backed() {
    let dir = tempdir().expect("tempdir");
    let mut store = Chatstore::open(ChatstoreConfig::default(), dir.path()).expect("open");

    store
        .with_transaction(|txn| {
            txn.set_peer(peer(1, Some(10)));
            txn.set_peer(peer(2, Some(10)));
            txn.set_peer(peer(3, Some(11)));
        })
        .expect("seed");

    store.clear_memory_caches();

    let referencers = store
        .with_transaction(|txn| txn.referencers_of(PeerId(10)))
        .expect("read after cache clear");
    let expected: BTreeSet<PeerId> = [PeerId(1), PeerId(2)].into_iter().collect();
    assert_eq!(referencers, expected);
}
