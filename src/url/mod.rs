//! URL handling module for Dice-Harvest
//!
//! This module builds search URLs and query tokens, and canonicalizes detail
//! links into the identifiers that key the corpus.

mod normalize;
mod search;

pub use normalize::canonicalize_identifier;
pub use search::{page_url, token_from_url, SearchQuery, WorkplaceType};
