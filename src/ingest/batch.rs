use crate::storage::JobRecord;
use std::collections::BTreeSet;

/// Changes accumulated for one query since the last successful checkpoint
#[derive(Debug, Clone, Default)]
pub struct PendingBatch {
    query: String,
    inserts: Vec<JobRecord>,
    tags: BTreeSet<String>,
}

impl PendingBatch {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            inserts: Vec::new(),
            tags: BTreeSet::new(),
        }
    }

    /// Query token every change in this batch is tagged with
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Queues the query tag for an existing record
    ///
    /// Returns false if it was already queued.
    pub fn queue_tag(&mut self, identifier: &str) -> bool {
        self.tags.insert(identifier.to_string())
    }

    /// Queues a freshly fetched record, tagging it with the batch query
    pub fn queue_insert(&mut self, mut record: JobRecord) {
        record.add_search(&self.query);
        self.inserts.push(record);
    }

    pub fn inserts(&self) -> &[JobRecord] {
        &self.inserts
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Number of records this batch would write
    pub fn len(&self) -> usize {
        self.inserts.len() + self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.tags.is_empty()
    }

    /// Drops everything queued; only called once the batch is durable
    pub fn clear(&mut self) {
        self.inserts.clear();
        self.tags.clear();
    }
}
