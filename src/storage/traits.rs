//! Storage traits and error types
//!
//! This module defines the trait interface for corpus backends and
//! associated error types.

use crate::storage::{JobRecord, RunRecord};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Record already exists: {0}")]
    DuplicateKey(String),

    #[error("No batch in progress")]
    NoActiveBatch,

    #[error("A batch is already in progress")]
    BatchInProgress,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// True for the unique-key collision the ingest pipeline converts into a tag update
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey(_))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for corpus backends
///
/// A store holds job records keyed by their canonical URL and must refuse a
/// second record with the same key. Writes made outside a batch are durable
/// when the call returns; writes made between `begin_batch` and
/// `commit_batch` become durable together, or not at all.
pub trait Store {
    // ===== Membership =====

    /// Lists every identifier currently in the corpus
    fn list_known(&self) -> StorageResult<HashSet<String>>;

    /// Checks whether a single identifier is in the corpus
    fn exists(&self, identifier: &str) -> StorageResult<bool>;

    /// Gets a record by identifier
    fn get(&self, identifier: &str) -> StorageResult<Option<JobRecord>>;

    /// Counts records in the corpus
    fn count(&self) -> StorageResult<u64>;

    // ===== Mutation =====

    /// Adds a query token to an existing record's `searches`
    ///
    /// Returns the number of records modified: 1 if the token was added,
    /// 0 if it was already present or the identifier is unknown.
    fn append_tag(&mut self, identifier: &str, query: &str) -> StorageResult<usize>;

    /// Inserts a new record
    ///
    /// Fails with `StorageError::DuplicateKey` if the identifier exists.
    fn insert(&mut self, record: &JobRecord) -> StorageResult<()>;

    // ===== Batches =====

    /// Starts an atomic batch of writes
    fn begin_batch(&mut self) -> StorageResult<()>;

    /// Makes every write since `begin_batch` durable
    ///
    /// On error nothing from the batch is kept.
    fn commit_batch(&mut self) -> StorageResult<()>;

    /// Discards every write since `begin_batch`
    fn rollback_batch(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts records per query token, most common first
    fn search_counts(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Counts records tagged by more than one search
    fn multi_search_count(&self) -> StorageResult<u64> {
        let mut count = 0;
        for identifier in self.list_known()? {
            if let Some(record) = self.get(&identifier)? {
                if record.searches.len() > 1 {
                    count += 1;
                }
            }
        }
        Ok(count)
    }

    /// Records the outcome of one ingest run
    ///
    /// Backends without run history ignore this.
    fn record_run(&mut self, _run: &RunRecord) -> StorageResult<()> {
        Ok(())
    }

    /// Lists the most recent runs, newest first
    fn recent_runs(&self, _limit: usize) -> StorageResult<Vec<RunRecord>> {
        Ok(Vec::new())
    }
}
