use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, SearchEntry, SourceConfig, StoreBackend, UserAgentConfig,
};
use crate::url::WorkplaceType;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_source_config(&config.source)?;
    validate_output_config(&config.output)?;
    validate_searches(&config.searches)?;
    Ok(())
}

/// Validates pacing, timeout and checkpoint settings
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.checkpoint_interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint_interval must be >= 1, got {}",
            config.checkpoint_interval
        )));
    }

    if config.page_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "page_delay_ms must be >= 100ms, got {}ms",
            config.page_delay_ms
        )));
    }

    if config.item_delay_ms < 100 {
        return Err(ConfigError::Validation(format!(
            "item_delay_ms must be >= 100ms, got {}ms",
            config.item_delay_ms
        )));
    }

    if config.page_timeout_secs < 1 || config.page_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "page_timeout_secs must be between 1 and 300, got {}",
            config.page_timeout_secs
        )));
    }

    if config.final_flush_attempts < 1 {
        return Err(ConfigError::Validation(
            "final_flush_attempts must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    validate_email(&config.contact_email)?;

    Ok(())
}

/// Validates the search endpoint
fn validate_source_config(config: &SourceConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must use http or https, got '{}'",
            config.base_url
        )));
    }

    if url.query().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url must not carry a query string, got '{}'",
            config.base_url
        )));
    }

    Ok(())
}

/// Validates output configuration for the selected backend
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    match config.backend {
        StoreBackend::Sqlite if config.database_path.is_empty() => Err(ConfigError::Validation(
            "database_path cannot be empty for the sqlite backend".to_string(),
        )),
        StoreBackend::Json if config.json_path.is_empty() => Err(ConfigError::Validation(
            "json_path cannot be empty for the json backend".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Validates search entries
fn validate_searches(searches: &[SearchEntry]) -> Result<(), ConfigError> {
    if searches.is_empty() {
        return Err(ConfigError::Validation(
            "at least one [[search]] entry is required".to_string(),
        ));
    }

    for entry in searches {
        if entry.keyword.trim().is_empty() {
            return Err(ConfigError::Validation(
                "search keyword cannot be empty".to_string(),
            ));
        }

        for location in &entry.locations {
            if location.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "search '{}' has an empty location",
                    entry.keyword
                )));
            }
        }

        for workplace in entry.workplaces.iter().filter(|w| !SearchEntry::is_any(w)) {
            workplace.parse::<WorkplaceType>().map_err(|_| {
                ConfigError::Validation(format!(
                    "search '{}' has unknown workplace '{}' (expected remote, hybrid, onsite or any)",
                    entry.keyword, workplace
                ))
            })?;
        }
    }

    Ok(())
}

/// Basic email validation
fn validate_email(email: &str) -> Result<(), ConfigError> {
    if email.is_empty() {
        return Err(ConfigError::Validation(
            "contact_email cannot be empty".to_string(),
        ));
    }

    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(ConfigError::Validation(format!(
            "Invalid email format: '{}'",
            email
        )));
    }

    if !parts[1].contains('.') {
        return Err(ConfigError::Validation(format!(
            "Invalid email domain: '{}'",
            email
        )));
    }

    Ok(())
}
