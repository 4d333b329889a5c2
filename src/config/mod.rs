//! Configuration module for Dice-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use dice_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Searches configured: {}", config.searches.len());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    Config, CrawlerConfig, OutputConfig, SearchEntry, SourceConfig, StoreBackend,
    UserAgentConfig,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

use crate::url::{SearchQuery, WorkplaceType};
use crate::QueryError;

impl Config {
    /// Expands every `[[search]]` entry into concrete queries
    ///
    /// Each entry yields the product of its locations and workplaces; an
    /// empty list stands for a single "any" value, and an explicit `"any"`
    /// item mixes the unfiltered search in with specific ones. Order is
    /// stable: locations outermost, then workplaces, then entries in file order.
    pub fn search_queries(&self) -> Result<Vec<SearchQuery>, QueryError> {
        let mut queries = Vec::new();

        for entry in &self.searches {
            let locations: Vec<Option<&str>> = if entry.locations.is_empty() {
                vec![None]
            } else {
                entry
                    .locations
                    .iter()
                    .map(|l| (!SearchEntry::is_any(l)).then_some(l.as_str()))
                    .collect()
            };

            let workplaces: Vec<Option<WorkplaceType>> = if entry.workplaces.is_empty() {
                vec![None]
            } else {
                entry
                    .workplaces
                    .iter()
                    .map(|w| {
                        if SearchEntry::is_any(w) {
                            Ok(None)
                        } else {
                            w.parse::<WorkplaceType>().map(Some)
                        }
                    })
                    .collect::<Result<_, _>>()?
            };

            for location in &locations {
                for workplace in &workplaces {
                    queries.push(SearchQuery::new(&entry.keyword, *location, *workplace)?);
                }
            }
        }

        Ok(queries)
    }
}
