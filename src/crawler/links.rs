//! Detail-link collection across result pages

use crate::crawler::fetcher::PageLoader;
use crate::crawler::parser::extract_detail_links;
use crate::url::{page_url, token_from_url};
use crate::{FetchError, FetchResult};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Unique identifiers gathered for one search
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkCollection {
    /// Canonical detail URLs, deduplicated across pages
    pub identifiers: BTreeSet<String>,
    /// 1-based indices of pages that could not be loaded or parsed
    pub failed_pages: Vec<u32>,
    /// Number of pages attempted
    pub pages_attempted: u32,
}

/// Walks result pages 1..=N and merges their detail links
pub struct LinkCollector<'a, L: PageLoader> {
    loader: &'a L,
    page_timeout: Duration,
    page_delay: Duration,
}

impl<'a, L: PageLoader> LinkCollector<'a, L> {
    /// # Arguments
    ///
    /// * `loader` - Page source
    /// * `page_timeout` - Upper bound on a single page load
    /// * `page_delay` - Pause after every page attempt, successful or not
    pub fn new(loader: &'a L, page_timeout: Duration, page_delay: Duration) -> Self {
        Self {
            loader,
            page_timeout,
            page_delay,
        }
    }

    /// Collects the unique detail identifiers of every result page
    ///
    /// A page that fails to load or lacks the result markup is logged and
    /// skipped; the collection never fails as a whole.
    pub async fn collect(&self, search_url: &Url, total_pages: u32) -> LinkCollection {
        let token = token_from_url(search_url).unwrap_or_default();
        let mut collection = LinkCollection::default();

        for page in 1..=total_pages {
            let url = page_url(search_url, page);
            collection.pages_attempted += 1;

            match self.load_page(&url).await {
                Ok(links) => {
                    let found = links.len();
                    let before = collection.identifiers.len();
                    collection.identifiers.extend(links);
                    tracing::info!(
                        "Page {}/{} of query '{}': {} links, {} new",
                        page,
                        total_pages,
                        token,
                        found,
                        collection.identifiers.len() - before
                    );
                }
                Err(e) => {
                    tracing::warn!("Skipping page {} of query '{}': {}", page, token, e);
                    collection.failed_pages.push(page);
                }
            }

            tokio::time::sleep(self.page_delay).await;
        }

        tracing::info!(
            "Collected {} unique links for query '{}' ({} of {} pages failed)",
            collection.identifiers.len(),
            token,
            collection.failed_pages.len(),
            total_pages
        );

        collection
    }

    async fn load_page(&self, url: &Url) -> FetchResult<Vec<String>> {
        let html = tokio::time::timeout(self.page_timeout, self.loader.load(url.as_str()))
            .await
            .map_err(|_| FetchError::Timeout {
                url: url.to_string(),
            })??;

        extract_detail_links(&html, url)
    }
}
