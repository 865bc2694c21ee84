//! Embedded single-writer cache of chat entities with incrementally
//! maintained views.
//!
//! All engine state is owned by one logical execution context: callers on
//! other contexts must marshal onto it. Writes happen inside
//! [`Chatstore::with_transaction`]; at commit, tables flush to the key-value
//! primitive in dependency order, the transaction's diff is assembled, and
//! every live view replays it. Views that changed publish a fresh immutable
//! snapshot to their subscriber.

pub mod codec;
pub mod config;
pub mod durable;
pub mod error;
pub mod kv;
pub mod metadata;
pub mod model;
pub mod table;
pub mod transaction;
pub mod view;

use crate::config::{ChatstoreConfig, DurabilityMode};
use crate::error::ChatstoreError;
use crate::kv::{MemoryValueStore, ValueStore};
use crate::metadata::StoreMetadata;
use crate::model::PeerId;
use crate::table::Tables;
use crate::transaction::{Transaction, TransactionDiff};
use crate::view::{SubscriptionId, ViewBag, ViewKey, ViewSubscription};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreMetrics {
    pub commits_total: u64,
    pub last_commit_seq: u64,
    pub live_views: usize,
    pub cached_entities: usize,
    pub snapshots_published: u64,
}

pub struct Chatstore {
    config: ChatstoreConfig,
    dir: PathBuf,
    store: Box<dyn ValueStore>,
    tables: Tables,
    views: ViewBag,
    in_transaction: bool,
    instance_id: Uuid,
    commit_seq: u64,
    commits_total: u64,
    snapshots_published: u64,
}

impl Chatstore {
    /// Opens a store over the in-memory value store. Embedders with a real
    /// ordered key-value engine use [`Chatstore::open_with_store`].
    pub fn open(config: ChatstoreConfig, dir: &Path) -> Result<Self, ChatstoreError> {
        Self::open_with_store(config, dir, Box::new(MemoryValueStore::new()))
    }

    pub fn open_with_store(
        config: ChatstoreConfig,
        dir: &Path,
        store: Box<dyn ValueStore>,
    ) -> Result<Self, ChatstoreError> {
        if config.max_cached_entities == 0 {
            return Err(ChatstoreError::InvalidConfig {
                message: "max_cached_entities must be positive".into(),
            });
        }
        std::fs::create_dir_all(dir)?;
        let stamp = match metadata::read(dir)? {
            Some(stamp) => stamp,
            None => {
                let stamp = StoreMetadata::fresh();
                metadata::write(dir, &stamp, config.durability_mode == DurabilityMode::Full)?;
                stamp
            }
        };
        info!(
            instance_id = %stamp.instance_id,
            last_commit_seq = stamp.last_commit_seq,
            "opened chatstore"
        );
        Ok(Self {
            config,
            dir: dir.to_path_buf(),
            store,
            tables: Tables::new(),
            views: ViewBag::default(),
            in_transaction: false,
            instance_id: stamp.instance_id,
            commit_seq: stamp.last_commit_seq,
            commits_total: 0,
            snapshots_published: 0,
        })
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Runs one unit of work against the tables and commits it.
    ///
    /// Transactions are synchronous and non-reentrant: calling this from
    /// within a transaction closure is a programming error and fails with
    /// [`ChatstoreError::TransactionInProgress`]. There is no rollback path;
    /// once the closure returns, the commit runs to completion (atomicity of
    /// the batched writes is the key-value primitive's contract). A closure
    /// that only reads skips the flush, persist, and replay steps entirely.
    pub fn with_transaction<R>(
        &mut self,
        f: impl FnOnce(&mut Transaction<'_>) -> R,
    ) -> Result<R, ChatstoreError> {
        if self.in_transaction {
            return Err(ChatstoreError::TransactionInProgress);
        }
        self.in_transaction = true;
        let (value, markers) = {
            let mut txn = Transaction::new(&mut self.tables, &*self.store);
            let value = f(&mut txn);
            let markers = txn.into_inclusion_markers();
            (value, markers)
        };
        let outcome = self.commit(markers);
        self.in_transaction = false;
        outcome?;
        Ok(value)
    }

    fn commit(&mut self, inclusion_markers: HashSet<PeerId>) -> Result<(), ChatstoreError> {
        if !self.tables.has_pending() {
            return Ok(());
        }
        let diff = TransactionDiff::collect(&mut self.tables, &*self.store, inclusion_markers);
        self.tables.before_commit(&mut *self.store)?;
        self.store.commit()?;
        self.commit_seq += 1;
        self.commits_total += 1;
        metadata::write(
            &self.dir,
            &StoreMetadata {
                format_version: metadata::FORMAT_VERSION,
                instance_id: self.instance_id,
                last_commit_seq: self.commit_seq,
            },
            self.config.durability_mode == DurabilityMode::Full,
        )?;
        if !diff.is_empty() {
            let published = self
                .views
                .replay_all(&mut self.tables, &*self.store, &diff);
            self.snapshots_published += published as u64;
            debug!(
                commit_seq = self.commit_seq,
                published, "commit replayed into live views"
            );
        }
        if self.tables.cached_entities() > self.config.max_cached_entities {
            debug!("decode caches crossed the configured ceiling, clearing");
            self.tables.clear_memory_caches();
        }
        Ok(())
    }

    /// Seeds a view from current table state and registers it for replay.
    /// The seeded snapshot is returned synchronously; later snapshots arrive
    /// on the subscription channel only when a commit changed the view.
    pub fn subscribe(&mut self, key: ViewKey) -> ViewSubscription {
        self.views.subscribe(&mut self.tables, &*self.store, key)
    }

    /// Releases the mutable view behind a subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.views.unsubscribe(id)
    }

    /// Drops every table's decode cache. Pending writes must not exist.
    pub fn clear_memory_caches(&mut self) {
        self.tables.clear_memory_caches();
    }

    pub fn metrics(&self) -> StoreMetrics {
        StoreMetrics {
            commits_total: self.commits_total,
            last_commit_seq: self.commit_seq,
            live_views: self.views.len(),
            cached_entities: self.tables.cached_entities(),
            snapshots_published: self.snapshots_published,
        }
    }
}

#[cfg(test)]
mod lib_tests;
