//! HTTP page loading
//!
//! This module handles all listing-page requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - The `PageLoader` trait the pager and link collector load through
//! - Error classification into `FetchError`

use crate::config::UserAgentConfig;
use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Loads one page and returns its HTML
///
/// The pipeline only ever sees HTML; whether a page was fetched over plain
/// HTTP or rendered in a browser is up to the implementation.
#[async_trait]
pub trait PageLoader: Send + Sync {
    async fn load(&self, url: &str) -> FetchResult<String>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Overall per-request timeout
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use dice_harvest::config::UserAgentConfig;
/// use dice_harvest::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "DiceHarvest".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "ops@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(20)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL and returns the body of a 2xx response
///
/// Shared by the page loader and the detail fetcher.
pub(crate) async fn get_html(client: &Client, url: &str) -> FetchResult<String> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(url, e))
}

/// `PageLoader` over a plain reqwest client
#[derive(Clone)]
pub struct HttpPageLoader {
    client: Client,
}

impl HttpPageLoader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageLoader for HttpPageLoader {
    async fn load(&self, url: &str) -> FetchResult<String> {
        tracing::debug!("Loading page {}", url);
        get_html(&self.client, url).await
    }
}
