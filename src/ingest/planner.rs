//! Reconciliation of collected links against the stored corpus

use std::collections::{BTreeSet, HashSet};

/// What a run has to do with the identifiers it collected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Plan {
    /// Unknown identifiers; their detail pages must be fetched
    pub to_fetch: BTreeSet<String>,
    /// Known identifiers; they only gain the query tag
    pub to_tag: BTreeSet<String>,
}

/// Splits `collected` into known and unknown identifiers
///
/// The two output sets are disjoint and together equal `collected`.
pub fn plan(collected: &BTreeSet<String>, known: &HashSet<String>) -> Plan {
    let (to_tag, to_fetch) = collected
        .iter()
        .cloned()
        .partition(|id| known.contains(id));

    Plan { to_fetch, to_tag }
}
