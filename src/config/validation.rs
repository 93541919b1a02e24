use crate::config::types::{CacheConfig, Config, FetcherConfig, MonitorConfig, RetryConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_fetcher_config(&config.fetcher)?;
    validate_retry_config(&config.retry)?;
    validate_cache_config(&config.cache)?;
    validate_monitor_config(&config.monitor)?;
    Ok(())
}

fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    for fallback in &config.fallback_urls {
        validate_http_url("fallback_urls", fallback)?;
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    let timeouts = [
        ("form_timeout_ms", config.form_timeout_ms),
        ("alternate_timeout_ms", config.alternate_timeout_ms),
        ("token_page_timeout_ms", config.token_page_timeout_ms),
        ("token_submit_timeout_ms", config.token_submit_timeout_ms),
        ("fallback_timeout_ms", config.fallback_timeout_ms),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{} must be > 0", name)));
        }
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} '{}' must use HTTP or HTTPS",
            field, value
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    // One delay between each of the three attempts
    if config.backoff_ms.len() < 2 {
        return Err(ConfigError::Validation(format!(
            "backoff_ms needs at least 2 delays, got {}",
            config.backoff_ms.len()
        )));
    }
    Ok(())
}

fn validate_cache_config(config: &CacheConfig) -> Result<(), ConfigError> {
    if config.ttl_hours == 0 {
        return Err(ConfigError::Validation(
            "ttl_hours must be >= 1".to_string(),
        ));
    }

    if config.max_entries == 0 {
        return Err(ConfigError::Validation(
            "max_entries must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_monitor_config(config: &MonitorConfig) -> Result<(), ConfigError> {
    if config.failure_threshold == 0 {
        return Err(ConfigError::Validation(
            "failure_threshold must be >= 1".to_string(),
        ));
    }
    Ok(())
}
