use crate::config::types::{Config, CrawlerConfig, Credentials, SiteConfig};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    if let Some(credentials) = &config.credentials {
        validate_credentials(credentials)?;
    }
    Ok(())
}

/// Validates site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url must use http or https, got '{}'",
            url.scheme()
        )));
    }

    for (name, segment) in [
        ("gallery-path", &config.gallery_path),
        ("favorites-path", &config.favorites_path),
        ("scraps-path", &config.scraps_path),
    ] {
        validate_path_segment(name, segment)?;
    }

    if !config.submission_prefix.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "submission-prefix must start with '/', got '{}'",
            config.submission_prefix
        )));
    }

    if config.next_page_label.trim().is_empty() {
        return Err(ConfigError::Validation(
            "next-page-label cannot be empty".to_string(),
        ));
    }

    if config.download_label.trim().is_empty() {
        return Err(ConfigError::Validation(
            "download-label cannot be empty".to_string(),
        ));
    }

    if config.user_agent.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.requests_per_second < 1 || config.requests_per_second > 100 {
        return Err(ConfigError::Validation(format!(
            "requests-per-second must be between 1 and 100, got {}",
            config.requests_per_second
        )));
    }

    if config.max_concurrent_downloads < 1 || config.max_concurrent_downloads > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-downloads must be between 1 and 64, got {}",
            config.max_concurrent_downloads
        )));
    }

    Ok(())
}

/// Validates login credentials: both fields or neither
fn validate_credentials(credentials: &Credentials) -> Result<(), ConfigError> {
    if credentials.username.is_empty() != credentials.password.is_empty() {
        return Err(ConfigError::Validation(
            "credentials need both username and password".to_string(),
        ));
    }

    if credentials.username.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "username '{}' cannot contain path separators",
            credentials.username
        )));
    }

    Ok(())
}

/// Validates a single listing path segment
fn validate_path_segment(name: &str, segment: &str) -> Result<(), ConfigError> {
    if segment.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    if segment.contains('/') {
        return Err(ConfigError::Validation(format!(
            "{} must be a single path segment, got '{}'",
            name, segment
        )));
    }

    Ok(())
}
