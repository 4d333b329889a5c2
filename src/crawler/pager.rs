//! Result-page discovery

use crate::crawler::fetcher::PageLoader;
use crate::crawler::parser::find_total_pages;
use crate::url::token_from_url;
use std::time::Duration;
use url::Url;

/// Number of result pages for a search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCount {
    /// Always at least 1
    pub total: u32,
    /// True when the count could not be read and fell back to 1
    pub degraded: bool,
}

impl PageCount {
    fn fallback() -> Self {
        Self {
            total: 1,
            degraded: true,
        }
    }
}

/// Reads the total page count from the first results page
pub struct PageLister<'a, L: PageLoader> {
    loader: &'a L,
    timeout: Duration,
}

impl<'a, L: PageLoader> PageLister<'a, L> {
    pub fn new(loader: &'a L, timeout: Duration) -> Self {
        Self { loader, timeout }
    }

    /// Determines how many result pages a search has
    ///
    /// Never fails: a load error, a timeout, or a missing or unreadable
    /// pagination indicator all yield a degraded count of 1.
    pub async fn total_pages(&self, search_url: &Url) -> PageCount {
        let token = token_from_url(search_url).unwrap_or_default();

        let html = match tokio::time::timeout(self.timeout, self.loader.load(search_url.as_str()))
            .await
        {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                tracing::warn!(
                    "Could not load first page for query '{}', assuming 1 page: {}",
                    token,
                    e
                );
                return PageCount::fallback();
            }
            Err(_) => {
                tracing::warn!(
                    "First page for query '{}' timed out after {:?}, assuming 1 page",
                    token,
                    self.timeout
                );
                return PageCount::fallback();
            }
        };

        match find_total_pages(&html) {
            Some(total) => {
                tracing::info!("Query '{}' has {} result pages", token, total);
                PageCount {
                    total,
                    degraded: false,
                }
            }
            None => {
                tracing::warn!(
                    "No pagination indicator for query '{}', assuming 1 page",
                    token
                );
                PageCount::fallback()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::test_support::StaticLoader;

    fn search_url() -> Url {
        Url::parse("https://www.dice.com/jobs?q=rust").unwrap()
    }

    #[tokio::test]
    async fn test_reads_total_from_indicator() {
        let loader = StaticLoader::new().with_page(
            "https://www.dice.com/jobs?q=rust",
            r#"<section aria-label="Page 1 of 4"></section>"#,
        );
        let count = PageLister::new(&loader, Duration::from_secs(1))
            .total_pages(&search_url())
            .await;
        assert_eq!(
            count,
            PageCount {
                total: 4,
                degraded: false
            }
        );
    }

    #[tokio::test]
    async fn test_missing_indicator_degrades_to_one() {
        let loader =
            StaticLoader::new().with_page("https://www.dice.com/jobs?q=rust", "<p>no results</p>");
        let count = PageLister::new(&loader, Duration::from_secs(1))
            .total_pages(&search_url())
            .await;
        assert_eq!(count.total, 1);
        assert!(count.degraded);
    }

    #[tokio::test]
    async fn test_load_error_degrades_to_one() {
        let loader = StaticLoader::new();
        let count = PageLister::new(&loader, Duration::from_secs(1))
            .total_pages(&search_url())
            .await;
        assert_eq!(count.total, 1);
        assert!(count.degraded);
    }

    #[tokio::test]
    async fn test_timeout_degrades_to_one() {
        let loader = StaticLoader::new()
            .with_page(
                "https://www.dice.com/jobs?q=rust",
                r#"<section aria-label="Page 1 of 4"></section>"#,
            )
            .with_latency(Duration::from_secs(5));
        let count = PageLister::new(&loader, Duration::from_millis(50))
            .total_pages(&search_url())
            .await;
        assert_eq!(count.total, 1);
        assert!(count.degraded);
    }
}
