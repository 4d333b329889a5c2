//! Dice-Harvest: an incremental job-listing crawler
//!
//! This crate discovers the result pages of a job search, collects the unique
//! detail links across those pages, reconciles them against the records that
//! are already stored, fetches only the unknown ones and persists everything
//! with periodic checkpoints.

pub mod config;
pub mod crawler;
pub mod ingest;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Dice-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store backend unreachable: {0}")]
    StoreUnavailable(String),

    #[error("Detail fetcher backend unreachable: {0}")]
    FetcherUnavailable(String),

    #[error("Checkpoint failed for query '{query}' with {pending} unflushed records: {source}")]
    Checkpoint {
        query: String,
        pending: usize,
        source: storage::StorageError,
    },

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        from: state::IngestPhase,
        to: state::IngestPhase,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised while building search URLs or canonicalizing identifiers
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Search keyword cannot be empty")]
    EmptyKeyword,

    #[error("Unknown workplace type: {0}")]
    UnknownWorkplace(String),
}

/// Failure of a single page load or detail fetch
///
/// These never abort a run on their own; the pipeline turns them into a
/// skipped page or a skipped identifier.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Expected markup '{selector}' not found on {url}")]
    MissingMarkup { url: String, selector: String },
}

impl FetchError {
    /// Classifies a reqwest error the way the fetcher reports it
    pub fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Http {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

/// Result type alias for Dice-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for page and detail fetches
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{IngestOrchestrator, RunReport};
pub use state::IngestPhase;
pub use storage::{JobRecord, Store};
pub use url::{canonicalize_identifier, SearchQuery, WorkplaceType};
