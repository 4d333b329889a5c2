//! Storage module for persisting the job corpus
//!
//! This module handles everything the ingest pipeline persists:
//! - The job record model
//! - The `Store` trait both backends implement
//! - A SQLite backend (unique key on the job URL, run history)
//! - A flat-file JSON backend (whole-corpus file replaced atomically)

mod json;
mod record;
mod schema;
mod sqlite;
mod traits;

pub use json::JsonFileStore;
pub use record::{Field, JobRecord};
pub use sqlite::SqliteStore;
pub use traits::{Store, StorageError, StorageResult};

/// Summary of one finished ingest run as stored in the runs table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    /// Database ID; 0 until stored
    pub id: i64,
    pub query: String,
    pub config_hash: String,
    pub started_at: String,
    pub finished_at: String,
    pub status: RunStatus,
    pub total_pages: u32,
    pub links_collected: u64,
    pub new_records: u64,
    pub tagged_records: u64,
    pub skipped_items: u64,
    pub failed_pages: u64,
}

impl RunRecord {
    /// Row for a run that ended without its final checkpoint
    pub fn failed(query: &str, config_hash: &str, started_at: &str, finished_at: &str) -> Self {
        Self {
            id: 0,
            query: query.to_string(),
            config_hash: config_hash.to_string(),
            started_at: started_at.to_string(),
            finished_at: finished_at.to_string(),
            status: RunStatus::Failed,
            total_pages: 0,
            links_collected: 0,
            new_records: 0,
            tagged_records: 0,
            skipped_items: 0,
            failed_pages: 0,
        }
    }
}

/// Outcome of an ingest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every page and item was processed
    Completed,
    /// Finished, but discovery fell back to one page or some pages/items were skipped
    Degraded,
    /// The final checkpoint could not be written
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(Self::Completed),
            "degraded" => Some(Self::Degraded),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
