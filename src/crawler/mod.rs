//! Crawler module for listing and detail pages
//!
//! This module contains everything that talks to the job site, including:
//! - HTTP page loading behind the `PageLoader` trait
//! - HTML parsing of pagination, result links and detail pages
//! - Result-page discovery (`PageLister`)
//! - Detail-link collection across pages (`LinkCollector`)
//! - Detail-record fetching behind the `DetailFetcher` trait

mod detail;
mod fetcher;
mod links;
mod pager;
mod parser;

pub use detail::{DetailFetcher, HttpDetailFetcher};
pub use fetcher::{build_http_client, HttpPageLoader, PageLoader};
pub use links::{LinkCollection, LinkCollector};
pub use pager::{PageCount, PageLister};
pub use parser::{
    extract_detail_links, find_total_pages, parse_job_detail, parse_total_pages,
    DETAIL_LINK_SELECTOR, PAGINATION_SELECTOR,
};
