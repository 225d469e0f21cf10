//! Database schema definitions and creation
//!
//! This module defines the SQLite schema of the validator_state table and
//! the pragmas applied to connections used for export.

use crate::error::{DbError, DbResult};
use regex::Regex;
use rusqlite::Connection;
use std::sync::LazyLock;

/// Default table holding validator/epoch/distance rows
pub const DEFAULT_TABLE: &str = "validator_state";

/// Table names are interpolated into SQL, so only plain identifiers are allowed
static TABLE_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid table name regex")
});

/// SQLite pragmas for export reads
const READ_PRAGMAS: &str = r#"
PRAGMA cache_size = -64000;      -- 64MB cache
PRAGMA temp_store = MEMORY;
PRAGMA query_only = ON;
"#;

/// SQLite pragmas for bulk seeding
const WRITE_PRAGMAS: &str = r#"
PRAGMA synchronous = OFF;
PRAGMA temp_store = MEMORY;
"#;

/// Check that a table name is a plain SQL identifier
pub fn is_valid_table_name(name: &str) -> bool {
    TABLE_NAME_REGEX.is_match(name)
}

/// Validate a table name, returning it on success
pub fn validate_table_name(name: &str) -> DbResult<&str> {
    if is_valid_table_name(name) {
        Ok(name)
    } else {
        Err(DbError::InvalidTableName(name.to_string()))
    }
}

/// Create the validator_state table (no-op if it already exists)
pub fn create_table(conn: &Connection, table: &str) -> DbResult<()> {
    let table = validate_table_name(table)?;
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {table} (validator_idx INTEGER, epoch INTEGER, distance INT)"
        ),
        [],
    )?;
    Ok(())
}

/// Create the index used by the ordered page reads
pub fn create_order_index(conn: &Connection, table: &str) -> DbResult<()> {
    let table = validate_table_name(table)?;
    conn.execute(
        &format!("CREATE INDEX IF NOT EXISTS idx_{table}_order ON {table}(validator_idx, epoch)"),
        [],
    )?;
    Ok(())
}

/// Apply read-only settings for an export connection
pub fn optimize_for_reads(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(READ_PRAGMAS)?;
    Ok(())
}

/// Apply write settings for seeding a database
pub fn optimize_for_writes(conn: &Connection) -> DbResult<()> {
    conn.execute_batch(WRITE_PRAGMAS)?;
    Ok(())
}

/// Check whether a table exists
pub fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}
