use crate::config::types::{Config, CrawlerConfig, HttpConfig, OutputConfig};
use crate::crawler::parse_nameserver;
use crate::ConfigError;
use reqwest::Method;

/// Upper bound for the number of requests in flight
const MAX_CONCURRENCY: usize = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_http_config(&config.http)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    Method::from_bytes(config.request_method.as_bytes())
        .map_err(|_| ConfigError::InvalidMethod(config.request_method.clone()))?;

    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.dispatch_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "dispatch_interval_ms must be >= 1ms".to_string(),
        ));
    }

    if config.stat_interval_ms < 1 {
        return Err(ConfigError::Validation(
            "stat_interval_ms must be >= 1ms".to_string(),
        ));
    }

    if config.spawn_delay_max_us > 0 && config.spawn_delay_min_us > config.spawn_delay_max_us {
        return Err(ConfigError::Validation(format!(
            "spawn_delay_min_us ({}) cannot exceed spawn_delay_max_us ({})",
            config.spawn_delay_min_us, config.spawn_delay_max_us
        )));
    }

    if let Some(code) = config
        .redirect_codes
        .iter()
        .find(|code| !(300..=399).contains(*code))
    {
        return Err(ConfigError::Validation(format!(
            "redirect code {} is not a 3xx status",
            code
        )));
    }

    if config.bonus_respawn > 100 {
        return Err(ConfigError::Validation(format!(
            "bonus_respawn must be a percentage (0-100), got {}",
            config.bonus_respawn
        )));
    }

    Ok(())
}

/// Validates HTTP client configuration
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs == 0 || config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "timeouts must be at least one second".to_string(),
        ));
    }

    if let Some(resolver) = &config.dns_resolver {
        validate_resolver_address(resolver)?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.needs_directory() && config.destination.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "destination cannot be empty when mode is {:?} or broken_urls is set",
            config.mode
        )));
    }

    Ok(())
}

/// Accepts `1.1.1.1`, `1.1.1.1:53`, `::1` and `[::1]:53`
fn validate_resolver_address(address: &str) -> Result<(), ConfigError> {
    if parse_nameserver(address).is_some() {
        return Ok(());
    }

    Err(ConfigError::Validation(format!(
        "dns_resolver must be an IP address with optional port, got '{}'",
        address
    )))
}
