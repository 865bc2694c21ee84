use crate::kv::ValueStore;
use crate::model::{TagSummary, TagSummaryKey};
use crate::table::Tables;
use crate::transaction::TransactionDiff;

pub(crate) struct MutableTagSummaryView {
    key: TagSummaryKey,
    summary: Option<TagSummary>,
}

impl MutableTagSummaryView {
    pub(crate) fn new(tables: &mut Tables, store: &dyn ValueStore, key: TagSummaryKey) -> Self {
        Self {
            key,
            summary: tables.tag_summaries.get(store, key),
        }
    }

    pub(crate) fn replay(&mut self, diff: &TransactionDiff) -> bool {
        if let Some(current) = diff.updated_tag_summaries.get(&self.key) {
            if self.summary.as_ref() != Some(current) {
                self.summary = Some(*current);
                return true;
            }
        }
        false
    }

    pub(crate) fn snapshot(&self) -> TagSummaryView {
        TagSummaryView {
            key: self.key,
            count: self.summary.map(|s| s.count),
            max_id: self.summary.map(|s| s.max_id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSummaryView {
    pub key: TagSummaryKey,
    pub count: Option<i32>,
    pub max_id: Option<u32>,
}
