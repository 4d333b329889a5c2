/// Phase definitions for one ingest run
///
/// A run moves through these phases strictly in order, except that
/// `FetchingNew` and `Flushing` alternate at every checkpoint boundary.
use std::fmt;

/// Represents the current phase of an ingest run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestPhase {
    /// Run created, nothing done yet
    Idle,

    /// Reading the total result-page count
    DiscoveringPages,

    /// Walking result pages and gathering detail links
    CollectingLinks,

    /// Splitting collected links into known and new
    Reconciling,

    /// Queueing the query tag onto records that already exist
    TaggingExisting,

    /// Fetching detail records for new links
    FetchingNew,

    /// Writing the pending batch through the checkpoint writer
    Flushing,

    /// Run finished; everything accumulated has been flushed
    Done,
}

impl IngestPhase {
    /// Returns true if `next` may follow this phase
    pub fn can_transition_to(&self, next: IngestPhase) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::DiscoveringPages)
                | (Self::DiscoveringPages, Self::CollectingLinks)
                | (Self::CollectingLinks, Self::Reconciling)
                | (Self::Reconciling, Self::TaggingExisting)
                | (Self::TaggingExisting, Self::FetchingNew)
                | (Self::FetchingNew, Self::Flushing)
                | (Self::Flushing, Self::FetchingNew)
                | (Self::Flushing, Self::Done)
        )
    }
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::DiscoveringPages => "discovering_pages",
            Self::CollectingLinks => "collecting_links",
            Self::Reconciling => "reconciling",
            Self::TaggingExisting => "tagging_existing",
            Self::FetchingNew => "fetching_new",
            Self::Flushing => "flushing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}
