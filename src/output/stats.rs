//! Statistics generation from the corpus
//!
//! This module provides functionality for extracting and displaying
//! corpus statistics from the storage layer.

use crate::storage::{RunRecord, RunStatus, Store};
use crate::HarvestError;

/// Number of runs shown by `print_statistics`
pub const RECENT_RUNS: usize = 10;

/// Corpus statistics summary
#[derive(Debug, Clone)]
pub struct CorpusStatistics {
    /// Total number of stored job records
    pub total_records: u64,

    /// Records per query token, most common first
    pub search_counts: Vec<(String, u64)>,

    /// Records tagged by more than one search
    pub multi_search_records: u64,

    /// Latest runs, newest first (empty for stores without run history)
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from a store
///
/// # Arguments
///
/// * `store` - The storage backend to query
///
/// # Returns
///
/// * `Ok(CorpusStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(store: &dyn Store) -> Result<CorpusStatistics, HarvestError> {
    let total_records = store.count()?;
    let search_counts = store.search_counts()?;
    let multi_search_records = store.multi_search_count()?;
    let recent_runs = store.recent_runs(RECENT_RUNS)?;

    Ok(CorpusStatistics {
        total_records,
        search_counts,
        multi_search_records,
        recent_runs,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CorpusStatistics) {
    println!("=== Corpus Statistics ===\n");

    println!("Overview:");
    println!("  Total records: {}", stats.total_records);
    println!("  Distinct searches: {}", stats.search_counts.len());
    println!(
        "  Records found by several searches: {}",
        stats.multi_search_records
    );
    println!();

    if !stats.search_counts.is_empty() {
        println!("Records by Search:");
        for (query, count) in &stats.search_counts {
            let percentage = if stats.total_records > 0 {
                (*count as f64 / stats.total_records as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", query, count, percentage);
        }
        println!();
    }

    if !stats.recent_runs.is_empty() {
        println!("Recent Runs ({}):", stats.recent_runs.len());
        for run in &stats.recent_runs {
            let marker = match run.status {
                RunStatus::Completed => "ok",
                RunStatus::Degraded => "degraded",
                RunStatus::Failed => "FAILED",
            };
            println!(
                "  [{}] {} {} - {} pages, {} links, {} new, {} tagged, {} skipped",
                marker,
                run.started_at,
                run.query,
                run.total_pages,
                run.links_collected,
                run.new_records,
                run.tagged_records,
                run.skipped_items
            );
        }
        println!();
    }
}
