//! Storage traits and error types
//!
//! This module defines the trait interface for ledger backends and
//! associated error types.

use crate::storage::LedgerEntry;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Ledger lock poisoned")]
    Poisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for ledger backend implementations
///
/// Every method is atomic with respect to its own row and takes `&self`, so a
/// single ledger can be shared between concurrent download tasks without
/// external locking.
pub trait Ledger: Send + Sync {
    /// Returns true iff an entry with a non-empty filename exists for `page_key`
    ///
    /// Callers treat an error as "not downloaded".
    fn is_downloaded(&self, page_key: &str) -> StorageResult<bool>;

    /// Inserts or fully replaces the entry for `entry.page_key`
    fn record(&self, entry: &LedgerEntry) -> StorageResult<()>;

    /// Gets the entry for `page_key`, if any
    fn get(&self, page_key: &str) -> StorageResult<Option<LedgerEntry>>;

    /// Counts all entries
    fn count_entries(&self) -> StorageResult<u64>;

    /// Counts entries that confirm a completed download
    fn count_downloaded(&self) -> StorageResult<u64>;
}
