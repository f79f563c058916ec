//! Storage module for the download ledger
//!
//! This module handles all database operations for the mirror, including:
//! - SQLite database initialization and schema migration
//! - Checking whether a submission page has already been mirrored
//! - Recording completed downloads

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteLedger;
pub use traits::{Ledger, StorageError, StorageResult};

use crate::MirrorError;
use chrono::{DateTime, Utc};
use std::path::Path;

/// Opens or creates the ledger database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteLedger)` - Successfully initialized ledger
/// * `Err(MirrorError)` - Failed to open or create the ledger
pub fn open_ledger(path: &Path) -> Result<SqliteLedger, MirrorError> {
    SqliteLedger::new(path)
}

/// One row of the ledger: a submission page and the image saved for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Canonical path of the submission page
    pub page_key: String,
    /// Resolved direct download URL
    pub image_url: String,
    /// Upstream last-modified time, when known
    pub last_modified: Option<DateTime<Utc>>,
    /// Local file name under the download directory
    pub filename: String,
}

impl LedgerEntry {
    /// Returns true if this entry confirms a completed download
    pub fn is_downloaded(&self) -> bool {
        !self.filename.is_empty()
    }

    /// Serializes `last_modified` for the `last_modified` column
    pub fn last_modified_to_db(&self) -> Option<String> {
        self.last_modified.map(|ts| ts.to_rfc3339())
    }

    /// Parses a `last_modified` column value
    ///
    /// Unparseable values (for example HTTP dates written by older tools)
    /// read back as unknown.
    pub fn last_modified_from_db(value: Option<&str>) -> Option<DateTime<Utc>> {
        let value = value?.trim();
        if value.is_empty() {
            return None;
        }
        DateTime::parse_from_rfc3339(value)
            .or_else(|_| DateTime::parse_from_rfc2822(value))
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_last_modified_roundtrip() {
        let entry = LedgerEntry {
            page_key: "/view/1/".to_string(),
            image_url: "https://cdn.example.com/1.png".to_string(),
            last_modified: Some(Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap()),
            filename: "1.png".to_string(),
        };
        let stored = entry.last_modified_to_db();
        assert_eq!(
            LedgerEntry::last_modified_from_db(stored.as_deref()),
            entry.last_modified
        );
    }

    #[test]
    fn test_last_modified_accepts_http_dates() {
        let parsed = LedgerEntry::last_modified_from_db(Some("Thu, 01 Jan 2015 00:00:00 GMT"));
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_last_modified_unknown() {
        assert_eq!(LedgerEntry::last_modified_from_db(None), None);
        assert_eq!(LedgerEntry::last_modified_from_db(Some("")), None);
        assert_eq!(LedgerEntry::last_modified_from_db(Some("garbage")), None);
    }

    #[test]
    fn test_is_downloaded_requires_filename() {
        let mut entry = LedgerEntry {
            page_key: "/view/1/".to_string(),
            image_url: "https://cdn.example.com/1.png".to_string(),
            last_modified: None,
            filename: String::new(),
        };
        assert!(!entry.is_downloaded());
        entry.filename = "1.png".to_string();
        assert!(entry.is_downloaded());
    }
}
