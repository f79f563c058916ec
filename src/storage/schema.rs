//! Database schema definitions and migrations
//!
//! This module contains the SQL schema for the Gallery-Mirror ledger.

use rusqlite::Connection;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per mirrored submission page
CREATE TABLE IF NOT EXISTS image_urls (
    page_url TEXT PRIMARY KEY UNIQUE,
    image_url TEXT,
    last_modified TEXT,
    filename TEXT
);
"#;

/// Initializes the database schema and applies migrations
///
/// Ledgers created by older tools have no `filename` column; it is added
/// with NULL values, which reads as "not yet confirmed downloaded".
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;

    if !has_column(conn, "image_urls", "filename")? {
        tracing::info!("Migrating ledger: adding filename column");
        conn.execute_batch("ALTER TABLE image_urls ADD COLUMN filename TEXT;")?;
    }

    Ok(())
}

fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names.iter().any(|name| name == column))
}
