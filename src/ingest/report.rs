use crate::ingest::checkpoint::FlushReport;
use crate::state::IngestPhase;
use crate::storage::{RunRecord, RunStatus};
use chrono::{DateTime, Utc};

/// Summary of one ingest run for one query
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Query token the run tagged records with
    pub query: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// Result pages walked
    pub total_pages: u32,
    /// True if the page count fell back to 1
    pub pages_degraded: bool,
    /// 1-based indices of pages that were skipped
    pub failed_pages: Vec<u32>,

    /// Unique identifiers collected across pages
    pub links_collected: usize,
    /// Identifiers already stored when the run started
    pub known: usize,
    /// Identifiers that had to be fetched
    pub to_fetch: usize,

    /// Records inserted by a committed checkpoint
    pub new_records: usize,
    /// Records that gained the query tag in a committed checkpoint
    pub tagged_records: usize,
    /// Inserts converted to tags because the record already existed
    pub duplicates: usize,
    /// Identifiers whose detail fetch failed
    pub skipped: Vec<String>,

    /// Number of successful fetches at each committed checkpoint
    pub checkpoints: Vec<usize>,
    /// Checkpoint attempts that failed
    pub flush_failures: usize,

    /// Every phase the run entered, starting at `Idle`
    pub phases: Vec<IngestPhase>,
}

impl RunReport {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            started_at: Utc::now(),
            finished_at: None,
            total_pages: 0,
            pages_degraded: false,
            failed_pages: Vec::new(),
            links_collected: 0,
            known: 0,
            to_fetch: 0,
            new_records: 0,
            tagged_records: 0,
            duplicates: 0,
            skipped: Vec::new(),
            checkpoints: Vec::new(),
            flush_failures: 0,
            phases: vec![IngestPhase::Idle],
        }
    }

    /// Phase the run is currently in
    pub fn phase(&self) -> IngestPhase {
        self.phases.last().copied().unwrap_or(IngestPhase::Idle)
    }

    pub(crate) fn record_flush(&mut self, position: usize, flush: &FlushReport) {
        self.checkpoints.push(position);
        self.new_records += flush.inserted;
        self.tagged_records += flush.tagged;
        self.duplicates += flush.duplicates;
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Completed only if every page and every item made it
    pub fn status(&self) -> RunStatus {
        if self.pages_degraded || !self.failed_pages.is_empty() || !self.skipped.is_empty() {
            RunStatus::Degraded
        } else {
            RunStatus::Completed
        }
    }

    /// Converts the report into a row for the runs table
    pub fn to_run_record(&self, config_hash: &str) -> RunRecord {
        RunRecord {
            id: 0,
            query: self.query.clone(),
            config_hash: config_hash.to_string(),
            started_at: self.started_at.to_rfc3339(),
            finished_at: self.finished_at.unwrap_or_else(Utc::now).to_rfc3339(),
            status: self.status(),
            total_pages: self.total_pages,
            links_collected: self.links_collected as u64,
            new_records: self.new_records as u64,
            tagged_records: self.tagged_records as u64,
            skipped_items: self.skipped.len() as u64,
            failed_pages: self.failed_pages.len() as u64,
        }
    }
}
