//! Durable checkpoints of a pending batch

use crate::ingest::batch::PendingBatch;
use crate::storage::{StorageResult, Store};

/// What one successful flush wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// New records inserted
    pub inserted: usize,
    /// Existing records that gained the query tag
    pub tagged: usize,
    /// Inserts that hit an existing record and were applied as a tag instead
    pub duplicates: usize,
}

/// Writes pending batches to a store as single atomic units
///
/// Tracks consecutive failures so that a store that keeps refusing writes
/// is reported louder than a one-off hiccup.
#[derive(Debug)]
pub struct CheckpointWriter {
    max_failures: u32,
    consecutive_failures: u32,
}

impl CheckpointWriter {
    /// # Arguments
    ///
    /// * `max_failures` - Consecutive failures after which failures log at ERROR
    pub fn new(max_failures: u32) -> Self {
        Self {
            max_failures,
            consecutive_failures: 0,
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Writes `batch` to `store`
    ///
    /// Tags are applied first, then inserts. An insert rejected as a duplicate
    /// is turned into a tag on the existing record. Either everything is
    /// committed or the store is rolled back and the error returned; the
    /// batch itself is never modified.
    pub fn flush<S: Store + ?Sized>(
        &mut self,
        store: &mut S,
        batch: &PendingBatch,
    ) -> StorageResult<FlushReport> {
        match Self::write(store, batch) {
            Ok(report) => {
                self.consecutive_failures = 0;
                tracing::info!(
                    "Checkpoint for query '{}': {} inserted, {} tagged",
                    batch.query(),
                    report.inserted,
                    report.tagged
                );
                Ok(report)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.max_failures {
                    tracing::error!(
                        "Checkpoint for query '{}' failed {} times in a row, {} records unsaved: {}",
                        batch.query(),
                        self.consecutive_failures,
                        batch.len(),
                        e
                    );
                } else {
                    tracing::warn!(
                        "Checkpoint for query '{}' failed, keeping {} records for the next one: {}",
                        batch.query(),
                        batch.len(),
                        e
                    );
                }
                Err(e)
            }
        }
    }

    fn write<S: Store + ?Sized>(store: &mut S, batch: &PendingBatch) -> StorageResult<FlushReport> {
        store.begin_batch()?;

        match Self::apply(store, batch) {
            Ok(report) => {
                // commit_batch discards the batch itself on failure
                store.commit_batch()?;
                Ok(report)
            }
            Err(e) => {
                if let Err(rollback) = store.rollback_batch() {
                    tracing::warn!("Rollback after failed checkpoint also failed: {}", rollback);
                }
                Err(e)
            }
        }
    }

    fn apply<S: Store + ?Sized>(store: &mut S, batch: &PendingBatch) -> StorageResult<FlushReport> {
        let mut report = FlushReport::default();
        let query = batch.query();

        for identifier in batch.tags() {
            report.tagged += store.append_tag(identifier, query)?;
        }

        for record in batch.inserts() {
            match store.insert(record) {
                Ok(()) => report.inserted += 1,
                Err(e) if e.is_duplicate_key() => {
                    tracing::debug!(
                        "{} was stored by someone else, tagging it with '{}' instead",
                        record.url,
                        query
                    );
                    report.tagged += store.append_tag(&record.url, query)?;
                    report.duplicates += 1;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::test_support::MemoryStore;
    use crate::storage::JobRecord;

    fn stored(url: &str, searches: &[&str]) -> JobRecord {
        let mut record = JobRecord::new(url);
        for s in searches {
            record.add_search(s);
        }
        record
    }

    #[test]
    fn test_flush_applies_tags_and_inserts() {
        let mut store = MemoryStore::with_records(vec![stored("B", &["q=old"])]);
        let mut batch = PendingBatch::new("q=new");
        batch.queue_tag("B");
        batch.queue_insert(JobRecord::new("A"));

        let mut writer = CheckpointWriter::new(3);
        let report = writer.flush(&mut store, &batch).unwrap();

        assert_eq!(
            report,
            FlushReport {
                inserted: 1,
                tagged: 1,
                duplicates: 0
            }
        );
        assert_eq!(store.searches("A"), vec!["q=new"]);
        assert_eq!(store.searches("B"), vec!["q=old", "q=new"]);
        assert_eq!(store.commits, 1);
    }

    #[test]
    fn test_duplicate_insert_becomes_tag() {
        // Another writer stored A after the run listed the corpus
        let mut store = MemoryStore::with_records(vec![stored("A", &["q=other"])]);
        let mut batch = PendingBatch::new("q=new");
        batch.queue_insert(JobRecord::new("A"));

        let mut writer = CheckpointWriter::new(3);
        let report = writer.flush(&mut store, &batch).unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.duplicates, 1);
        assert_eq!(report.tagged, 1);
        assert_eq!(store.searches("A"), vec!["q=other", "q=new"]);
    }

    #[test]
    fn test_failed_commit_rolls_back_and_counts() {
        let mut store = MemoryStore::default();
        store.failing_commits = 2;
        let mut batch = PendingBatch::new("q=new");
        batch.queue_insert(JobRecord::new("A"));

        let mut writer = CheckpointWriter::new(3);
        assert!(writer.flush(&mut store, &batch).is_err());
        assert!(writer.flush(&mut store, &batch).is_err());
        assert_eq!(writer.consecutive_failures(), 2);
        assert!(store.records.is_empty());
        assert_eq!(batch.len(), 1);

        writer.flush(&mut store, &batch).unwrap();
        assert_eq!(writer.consecutive_failures(), 0);
        assert_eq!(store.searches("A"), vec!["q=new"]);
    }

    #[test]
    fn test_failed_insert_rolls_back_tags() {
        let mut store = MemoryStore::with_records(vec![stored("B", &["q=old"])]);
        store.failing_inserts.insert("A".to_string());
        let mut batch = PendingBatch::new("q=new");
        batch.queue_tag("B");
        batch.queue_insert(JobRecord::new("A"));

        let mut writer = CheckpointWriter::new(3);
        assert!(writer.flush(&mut store, &batch).is_err());
        assert_eq!(store.searches("B"), vec!["q=old"]);
        assert_eq!(store.rollbacks, 1);
    }
}
