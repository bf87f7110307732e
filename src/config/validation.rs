use crate::config::types::{
    Config, ExtractConfig, FetchConfig, HarvestConfig, SiteConfig, StorageConfig,
};
use crate::ConfigError;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_storage_config(&config.storage)?;
    validate_harvest_config(&config.harvest)?;
    validate_site_config(&config.site)?;
    validate_fetch_config(&config.fetch)?;
    validate_extract_config(&config.extract)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.writer_queue < 1 {
        return Err(ConfigError::Validation(
            "writer_queue must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.goal_total < 1 {
        return Err(ConfigError::Validation(
            "goal_total must be >= 1".to_string(),
        ));
    }

    if config.workers < 1 || config.workers > 256 {
        return Err(ConfigError::Validation(format!(
            "workers must be between 1 and 256, got {}",
            config.workers
        )));
    }

    if config.page_size < 1 {
        return Err(ConfigError::Validation(
            "page_size must be >= 1".to_string(),
        ));
    }

    if config.progress_every < 1 {
        return Err(ConfigError::Validation(
            "progress_every must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let root = Url::parse(&config.root)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid site root '{}': {}", config.root, e)))?;

    if root.scheme() != "http" && root.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Site root '{}' must use HTTP or HTTPS",
            config.root
        )));
    }

    root.join(&config.listing_path).map_err(|e| {
        ConfigError::InvalidUrl(format!(
            "Invalid listing path '{}': {}",
            config.listing_path, e
        ))
    })?;

    if config.page_param.trim().is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    validate_selector(&config.link_selector)?;

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(
            "max_attempts must be >= 1".to_string(),
        ));
    }

    if config.attempt_timeout_ms < 1 {
        return Err(ConfigError::Validation(
            "attempt_timeout_ms must be >= 1".to_string(),
        ));
    }

    // A zero base would make every retry delay identical
    if config.backoff_base_ms < 1 {
        return Err(ConfigError::Validation(
            "backoff_base_ms must be >= 1".to_string(),
        ));
    }

    if config.jitter_min_ms > config.jitter_max_ms {
        return Err(ConfigError::Validation(format!(
            "jitter_min_ms ({}) cannot exceed jitter_max_ms ({})",
            config.jitter_min_ms, config.jitter_max_ms
        )));
    }

    if config.identities.is_empty() {
        return Err(ConfigError::Validation(
            "identities must contain at least one User-Agent".to_string(),
        ));
    }

    if config.identities.iter().any(|identity| identity.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "identities cannot contain empty strings".to_string(),
        ));
    }

    Ok(())
}

fn validate_extract_config(config: &ExtractConfig) -> Result<(), ConfigError> {
    validate_selector(&config.title_selector)?;
    validate_selector(&config.fallback_selector)?;
    validate_selector(&config.paragraph_selector)?;

    if config.content_selectors.is_empty() {
        return Err(ConfigError::Validation(
            "content_selectors must name at least one container".to_string(),
        ));
    }

    for selector in config.content_selectors.iter().chain(&config.noise_selectors) {
        validate_selector(selector)?;
    }

    if let Some(selector) = &config.published_selector {
        validate_selector(selector)?;
    }

    if config.min_body_chars < 1 {
        return Err(ConfigError::Validation(
            "min_body_chars must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Parses a CSS selector, mapping failures to a configuration error
pub fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    parse_selector(selector).map(|_| ())
}
