//! Configuration module for Gallery-Mirror
//!
//! This module handles loading, parsing, and validating the TOML configuration
//! file, and resolving the config and download directories.
//!
//! # Example
//!
//! ```no_run
//! use gallery_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Fast scan enabled: {}", config.crawler.fast_scan);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_config_directory, default_download_directory, Config, CrawlerConfig, Credentials,
    PathsConfig, SiteConfig, CONFIG_FILE_NAME, LEDGER_FILE_NAME,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, load_or_default};
pub use validation::validate;
