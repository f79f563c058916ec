use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use gallery_mirror::config::load_config;
///
/// let config = load_config(Path::new("config.toml")).unwrap();
/// println!("Rate: {}/s", config.crawler.requests_per_second);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    // Read the configuration file
    let content = std::fs::read_to_string(path)?;

    // Parse TOML
    let config: Config = toml::from_str(&content)?;

    // Validate the configuration
    validate(&config)?;

    Ok(config)
}

/// Loads the configuration file if it exists, otherwise returns defaults
///
/// A missing file is not an error: every setting has a default and
/// credentials are only needed once the site asks for a login.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!("No config file at {}, using defaults", path.display());
        Ok(Config::default())
    }
}

/// Computes a SHA-256 hash of the configuration file content
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
///
/// When the file does not exist the defaults are returned with a `None` hash.
pub fn load_config_with_hash(path: &Path) -> Result<(Config, Option<String>), ConfigError> {
    let config = load_or_default(path)?;
    let hash = if path.exists() {
        Some(compute_config_hash(path)?)
    } else {
        None
    };
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[site]
base-url = "https://gallery.example.com/"
submission-prefix = "/art/"

[crawler]
requests-per-second = 5
max-concurrent-downloads = 8
fast-scan = false
favorites = true

[credentials]
username = "alice"
password = "hunter2"

[paths]
download-directory = "/tmp/mirror"
"#;

        let file = create_temp_config(config_content);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.site.base_url, "https://gallery.example.com/");
        assert_eq!(config.site.submission_prefix, "/art/");
        assert_eq!(config.site.download_label, "Download");
        assert_eq!(config.crawler.requests_per_second, 5);
        assert_eq!(config.crawler.max_concurrent_downloads, 8);
        assert!(!config.crawler.fast_scan);
        assert!(config.crawler.gallery);
        assert!(config.crawler.favorites);
        assert!(!config.crawler.scraps);
        assert_eq!(config.credentials.unwrap().username, "alice");
        assert_eq!(
            config.paths.download_directory,
            std::path::PathBuf::from("/tmp/mirror")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = create_temp_config("");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.crawler.requests_per_second, 3);
        assert!(config.crawler.fast_scan);
        assert!(config.credentials.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, hash) = load_config_with_hash(&dir.path().join("config.toml")).unwrap();
        assert!(hash.is_none());
        assert_eq!(config.site.next_page_label, "Next");
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let config_content = "this is not valid TOML {{{";
        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let config_content = r#"
[crawler]
requests-per-second = 0
"#;

        let file = create_temp_config(config_content);
        let result = load_config(file.path());
        assert!(matches!(result.unwrap_err(), ConfigError::Validation(_)));
    }

    #[test]
    fn test_config_hash_tracks_content() {
        let file = create_temp_config("[crawler]\nfast-scan = true\n");
        let other = create_temp_config("[crawler]\nfast-scan = false\n");

        let hash = compute_config_hash(file.path()).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, compute_config_hash(file.path()).unwrap());
        assert_ne!(hash, compute_config_hash(other.path()).unwrap());

        let (_, loaded_hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(loaded_hash, Some(hash));
    }
}
