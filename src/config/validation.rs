use crate::config::types::{Config, CrawlerConfig, OutputConfig, SiteConfig};
use crate::url::extract_authority;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = validate_http_url(&config.url, "site url")?;
    let authority = extract_authority(&url)
        .ok_or_else(|| ConfigError::InvalidUrl(format!("Site url '{}' has no host", config.url)))?;

    if config.product_pattern.trim().is_empty() {
        return Err(ConfigError::Validation(
            "product_pattern cannot be empty".to_string(),
        ));
    }

    if let Some(seed) = &config.seed {
        validate_http_url(seed, "seed")?;

        if !seed.contains(&authority) {
            return Err(ConfigError::Validation(format!(
                "Seed '{}' must belong to the site domain '{}'",
                seed, authority
            )));
        }
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.busy_retry_delay_ms < 10 {
        return Err(ConfigError::Validation(format!(
            "busy_retry_delay_ms must be >= 10ms, got {}ms",
            config.busy_retry_delay_ms
        )));
    }

    if config.max_busy_retries == Some(0) {
        return Err(ConfigError::Validation(
            "max_busy_retries must be >= 1 when set".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.request_timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout_secs must be between 1 and 300, got {}",
            config.request_timeout_secs
        )));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.records_path.as_deref() == Some("") {
        return Err(ConfigError::Validation(
            "records_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Parses a URL and requires an HTTP(S) scheme
fn validate_http_url(value: &str, what: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", what, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use an HTTP or HTTPS scheme",
            what, value
        )));
    }

    Ok(url)
}
