//! State module for tracking ingest progress
//!
//! - `IngestPhase`: the phase an ingest run is in (discovering, collecting,
//!   reconciling, tagging, fetching, flushing, done)

mod phase;

pub use phase::IngestPhase;
