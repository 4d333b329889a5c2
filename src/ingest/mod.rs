//! Incremental ingest pipeline
//!
//! This module ties the crawler and the store together:
//! - Reconciliation of collected links against the corpus
//! - The pending batch of not yet durable changes
//! - Atomic checkpoints of that batch
//! - The per-query control loop and its run report

mod batch;
mod checkpoint;
mod orchestrator;
mod planner;
mod report;

pub use batch::PendingBatch;
pub use checkpoint::{CheckpointWriter, FlushReport};
pub use orchestrator::{IngestOrchestrator, IngestSettings};
pub use planner::{plan, Plan};
pub use report::RunReport;
