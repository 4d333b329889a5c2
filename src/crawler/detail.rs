//! Detail-page fetching

use crate::crawler::fetcher::get_html;
use crate::crawler::parser::parse_job_detail;
use crate::storage::JobRecord;
use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::Client;

/// Fetches the full record behind one identifier
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    /// Checks that the backend is reachable before any work starts
    async fn probe(&self) -> FetchResult<()> {
        Ok(())
    }

    /// Fetches and parses one detail page
    ///
    /// The returned record has no `searches`; the caller tags it.
    async fn fetch(&self, identifier: &str) -> FetchResult<JobRecord>;
}

/// `DetailFetcher` that GETs the identifier URL and scrapes the page
#[derive(Clone)]
pub struct HttpDetailFetcher {
    client: Client,
    probe_url: String,
}

impl HttpDetailFetcher {
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `probe_url` - URL requested by `probe`, normally the site's base URL
    pub fn new(client: Client, probe_url: impl Into<String>) -> Self {
        Self {
            client,
            probe_url: probe_url.into(),
        }
    }
}

#[async_trait]
impl DetailFetcher for HttpDetailFetcher {
    /// Any HTTP response, even an error status, means the site is reachable
    async fn probe(&self) -> FetchResult<()> {
        self.client
            .get(&self.probe_url)
            .send()
            .await
            .map(|response| {
                tracing::debug!(
                    "Probe of {} returned HTTP {}",
                    self.probe_url,
                    response.status()
                );
            })
            .map_err(|e| FetchError::from_reqwest(&self.probe_url, e))
    }

    async fn fetch(&self, identifier: &str) -> FetchResult<JobRecord> {
        tracing::debug!("Fetching detail page {}", identifier);
        let html = get_html(&self.client, identifier).await?;
        Ok(parse_job_detail(&html, identifier))
    }
}
