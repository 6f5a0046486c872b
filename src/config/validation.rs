use crate::config::types::{Config, FetchConfig, SchedulerConfig, SiteConfig, StorageConfig};
use crate::ConfigError;
use url::Url;

/// Largest accepted crawl interval (one year)
pub const MAX_INTERVAL_HOURS: i64 = 24 * 365;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_fetch_config(&config.fetch)?;
    validate_scheduler_config(&config.scheduler)?;
    validate_storage_config(&config.storage)?;
    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.listing_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid listing_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "listing_url must use http or https, got '{}'",
            config.listing_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "listing_url has no host: '{}'",
            config.listing_url
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("article_timeout_secs", config.article_timeout_secs),
        ("listing_crawl_timeout_secs", config.listing_crawl_timeout_secs),
        ("control_timeout_secs", config.control_timeout_secs),
    ] {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be >= 1, got 0",
                name
            )));
        }
    }

    Ok(())
}

fn validate_scheduler_config(config: &SchedulerConfig) -> Result<(), ConfigError> {
    if config.poll_interval_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "poll_interval_secs must be >= 1, got {}",
            config.poll_interval_secs
        )));
    }

    if config.default_interval_hours < 1 || config.default_interval_hours > MAX_INTERVAL_HOURS {
        return Err(ConfigError::Validation(format!(
            "default_interval_hours must be between 1 and {}, got {}",
            MAX_INTERVAL_HOURS, config.default_interval_hours
        )));
    }

    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
