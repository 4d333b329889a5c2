use serde::Deserialize;

/// Main configuration structure for Dice-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub source: SourceConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "search")]
    pub searches: Vec<SearchEntry>,
}

/// Crawler pacing and checkpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Delay after every result-page load (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Delay after every detail fetch attempt (milliseconds)
    #[serde(rename = "item-delay-ms", default = "default_item_delay_ms")]
    pub item_delay_ms: u64,

    /// Number of successful fetches between checkpoints
    #[serde(rename = "checkpoint-interval", default = "default_checkpoint_interval")]
    pub checkpoint_interval: usize,

    /// Upper bound on a single page load or detail fetch (seconds)
    #[serde(rename = "page-timeout-secs", default = "default_page_timeout_secs")]
    pub page_timeout_secs: u64,

    /// Consecutive checkpoint failures before the warning escalates to an error
    #[serde(rename = "max-flush-failures", default = "default_max_flush_failures")]
    pub max_flush_failures: u32,

    /// Attempts made at the final checkpoint of a run
    #[serde(rename = "final-flush-attempts", default = "default_final_flush_attempts")]
    pub final_flush_attempts: u32,
}

fn default_page_delay_ms() -> u64 {
    2000
}

fn default_item_delay_ms() -> u64 {
    1000
}

fn default_checkpoint_interval() -> usize {
    25
}

fn default_page_timeout_secs() -> u64 {
    20
}

fn default_max_flush_failures() -> u32 {
    3
}

fn default_final_flush_attempts() -> u32 {
    3
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            item_delay_ms: default_item_delay_ms(),
            checkpoint_interval: default_checkpoint_interval(),
            page_timeout_secs: default_page_timeout_secs(),
            max_flush_failures: default_max_flush_failures(),
            final_flush_attempts: default_final_flush_attempts(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

/// The listing site being crawled
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Search endpoint that query parameters are appended to
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,
}

fn default_base_url() -> String {
    "https://www.dice.com/jobs".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
        }
    }
}

/// Which persistence backend the corpus lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Json,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Persistence backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Path to the flat-file JSON corpus
    #[serde(rename = "json-path", default = "default_json_path")]
    pub json_path: String,
}

fn default_database_path() -> String {
    "./dice_jobs.db".to_string()
}

fn default_json_path() -> String {
    "./dice_job_data.json".to_string()
}

/// One search block; expands to every location/workplace combination
#[derive(Debug, Clone, Deserialize)]
pub struct SearchEntry {
    /// Free-text search keyword
    pub keyword: String,

    /// Locations to search in; empty means anywhere
    #[serde(default)]
    pub locations: Vec<String>,

    /// Workplace types (remote, hybrid, onsite); empty means any
    #[serde(default)]
    pub workplaces: Vec<String>,
}

impl SearchEntry {
    /// List value that leaves the location or workplace filter off
    pub const ANY: &'static str = "any";

    pub fn is_any(value: &str) -> bool {
        value.trim().eq_ignore_ascii_case(Self::ANY)
    }
}
