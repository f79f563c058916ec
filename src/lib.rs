//! Gallery-Mirror: an incremental gallery downloader
//!
//! This crate walks an artist's paginated listings on a gallery site, discovers
//! submission pages, and downloads each submission's image exactly once across
//! runs, keeping a SQLite ledger of what has already been mirrored.

pub mod config;
pub mod crawler;
pub mod download;
pub mod output;
pub mod session;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Gallery-Mirror operations
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Size mismatch for {url}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    #[error("Cannot derive a local filename from {url}")]
    InvalidFilename { url: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Cookie store error at {path}: {message}")]
    CookieStore { path: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Gallery-Mirror operations
pub type Result<T> = std::result::Result<T, MirrorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Coordinator, ListingKind, PendingImage};
pub use download::{DownloadOutcome, DownloadWorkerPool};
pub use storage::{LedgerEntry, SqliteLedger};
pub use crate::url::{natural_cmp, page_key, sort_naturally};
