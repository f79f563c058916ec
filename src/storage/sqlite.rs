//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Ledger trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Ledger, StorageError, StorageResult};
use crate::storage::LedgerEntry;
use crate::MirrorError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// SQLite ledger backend
///
/// The connection sits behind a mutex, so each ledger operation runs as one
/// serialized statement and concurrent writers to the same key resolve as
/// last-write-wins.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Creates a new SqliteLedger instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteLedger)` - Successfully opened/created database
    /// * `Err(MirrorError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, MirrorError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(5000))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory ledger
    pub fn new_in_memory() -> Result<Self, MirrorError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

impl Ledger for SqliteLedger {
    fn is_downloaded(&self, page_key: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let filename: Option<Option<String>> = conn
            .query_row(
                "SELECT filename FROM image_urls WHERE page_url = ?1 LIMIT 1",
                params![page_key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(matches!(filename, Some(Some(name)) if !name.is_empty()))
    }

    fn record(&self, entry: &LedgerEntry) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO image_urls (page_url, image_url, last_modified, filename)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                entry.page_key,
                entry.image_url,
                entry.last_modified_to_db(),
                entry.filename
            ],
        )?;
        Ok(())
    }

    fn get(&self, page_key: &str) -> StorageResult<Option<LedgerEntry>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT page_url, image_url, last_modified, filename
             FROM image_urls WHERE page_url = ?1 LIMIT 1",
        )?;

        let entry = stmt
            .query_row(params![page_key], |row| {
                let last_modified: Option<String> = row.get(2)?;
                Ok(LedgerEntry {
                    page_key: row.get(0)?,
                    image_url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    last_modified: LedgerEntry::last_modified_from_db(last_modified.as_deref()),
                    filename: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                })
            })
            .optional()?;

        Ok(entry)
    }

    fn count_entries(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM image_urls", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_downloaded(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM image_urls WHERE filename IS NOT NULL AND filename != ''",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}
