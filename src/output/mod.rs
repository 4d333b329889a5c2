//! Output module for operator-facing summaries
//!
//! This module handles:
//! - Corpus statistics (records, searches, recent runs)
//! - Printing single scraped records as JSON

pub mod stats;

pub use stats::{load_statistics, print_statistics, CorpusStatistics};

use crate::storage::JobRecord;
use crate::HarvestError;

/// Renders a record as pretty-printed JSON, the same shape the flat-file
/// corpus stores
pub fn record_to_json(record: &JobRecord) -> Result<String, HarvestError> {
    serde_json::to_string_pretty(record)
        .map_err(|e| HarvestError::Storage(crate::storage::StorageError::Serialization(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Field;

    #[test]
    fn test_record_to_json() {
        let mut record = JobRecord::new("https://www.dice.com/job-detail/1");
        record.title = Field::from("Engineer");

        let json = record_to_json(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["title"], "Engineer");
        assert_eq!(value["company"], "N/A");
        assert_eq!(value["url"], "https://www.dice.com/job-detail/1");
    }
}
