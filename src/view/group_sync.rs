use crate::kv::ValueStore;
use crate::model::GroupAndNamespace;
use crate::table::Tables;
use crate::transaction::TransactionDiff;
use std::collections::BTreeSet;

pub(crate) struct MutableGroupSyncStatsView {
    groups: BTreeSet<GroupAndNamespace>,
}

impl MutableGroupSyncStatsView {
    pub(crate) fn new(tables: &mut Tables, store: &dyn ValueStore) -> Self {
        Self {
            groups: tables.group_sync.get(store),
        }
    }

    pub(crate) fn replay(&mut self, diff: &TransactionDiff) -> bool {
        let mut updated = false;
        for (key, needed) in &diff.updated_group_sync_operations {
            if *needed {
                if self.groups.insert(*key) {
                    updated = true;
                }
            } else if self.groups.remove(key) {
                updated = true;
            }
        }
        updated
    }

    pub(crate) fn snapshot(&self) -> GroupSyncStatsView {
        GroupSyncStatsView {
            groups: self.groups.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSyncStatsView {
    pub groups: BTreeSet<GroupAndNamespace>,
}
