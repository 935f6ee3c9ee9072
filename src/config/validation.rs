use crate::config::types::CrawlConfig;
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates a crawl configuration
pub fn validate(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_start_url(&config.start_url)?;
    validate_selector("selector", &config.selector)?;
    if let Some(next_selector) = &config.next_selector {
        validate_selector("next_selector", next_selector)?;
    }
    validate_limits(config)?;
    Ok(())
}

/// Validates the start URL: must parse and use HTTP or HTTPS
fn validate_start_url(start_url: &str) -> Result<(), ConfigError> {
    if start_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "start_url cannot be empty".to_string(),
        ));
    }

    let url = Url::parse(start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start_url '{}': {}", start_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start_url '{}' must use HTTP or HTTPS",
            start_url
        )));
    }

    Ok(())
}

/// Validates that a selector is non-empty and syntactically valid CSS
fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", field)));
    }

    Selector::parse(selector).map_err(|e| {
        ConfigError::Validation(format!("{} '{}' is not a valid CSS selector: {}", field, selector, e))
    })?;

    Ok(())
}

/// Validates page limit, timeout, and user agent
fn validate_limits(config: &CrawlConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeout_secs must be > 0".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}
