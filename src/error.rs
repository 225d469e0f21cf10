//! Error types for visit-export
//!
//! This module defines the error hierarchy that covers:
//! - SQLite access errors (opening the store, queries)
//! - Integrity errors (the source table is not a dense validator x epoch grid)
//! - Configuration and CLI errors
//! - Chunk file write errors
//!
//! Every error is fatal for an export run. Nothing is retried and chunk
//! files written before a failure are left on disk.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the exporter
#[derive(Error, Debug)]
pub enum ExportError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    /// Source table failed the integrity check
    #[error("Integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Failed to write a chunk file
    #[error("Failed to write chunk '{path}': {source}")]
    ChunkWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors (output directory, stdout, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExportError {
    /// Check if this error came from the dense cross-product check
    pub fn is_integrity(&self) -> bool {
        matches!(self, ExportError::Integrity(_))
    }
}

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLite error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Failed to open the database file
    #[error("Failed to open database at '{path}': {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// Table name is not a plain SQL identifier
    #[error("Invalid table name '{0}'")]
    InvalidTableName(String),

    /// A count query returned a negative or oversized value
    #[error("Unexpected count {value} for {what}")]
    BadCount { what: String, value: i64 },
}

/// Source table integrity errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// total rows != distinct validators * distinct epochs
    #[error(
        "table is not a dense validator x epoch grid: {total_rows} rows, \
         but {validators} validators x {epochs} epochs = {expected}"
    )]
    NotDenseCrossProduct {
        total_rows: u64,
        validators: u64,
        epochs: u64,
        expected: u64,
    },

    /// A page came back with fewer rows than the plan requires
    #[error("chunk {index} at offset {offset}: expected {expected} rows, source returned {got}")]
    ShortPage {
        index: u64,
        offset: u64,
        expected: u64,
        got: u64,
    },

    /// Rows written at the end of the run differ from the counted total
    #[error("exported {written} rows, but the table holds {total_rows}")]
    RowCountMismatch { written: u64, total_rows: u64 },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid validators-per-chunk
    #[error("Invalid validators per chunk {count}: must be between 1 and {max}")]
    InvalidChunkSize { count: u64, max: u64 },

    /// Invalid table name
    #[error("Invalid table name '{name}': must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidTableName { name: String },

    /// Input database does not exist
    #[error("Input database '{path}' does not exist")]
    MissingDatabase { path: PathBuf },

    /// Output path error
    #[error("Invalid output path '{path}': {reason}")]
    InvalidOutputPath { path: PathBuf, reason: String },

    /// Invalid generator parameter
    #[error("Invalid value {value} for {name}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: u64,
        reason: String,
    },
}

/// Result type alias for ExportError
pub type Result<T> = std::result::Result<T, ExportError>;

/// Result type alias for DbError
pub type DbResult<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_message() {
        let err = IntegrityError::NotDenseCrossProduct {
            total_rows: 5,
            validators: 3,
            epochs: 2,
            expected: 6,
        };
        let msg = err.to_string();
        assert!(msg.contains("5 rows"));
        assert!(msg.contains("3 validators x 2 epochs = 6"));

        let short = IntegrityError::ShortPage {
            index: 1,
            offset: 2,
            expected: 2,
            got: 0,
        };
        assert!(short.to_string().contains("expected 2 rows, source returned 0"));
    }

    #[test]
    fn test_error_conversion() {
        let integrity = IntegrityError::NotDenseCrossProduct {
            total_rows: 1,
            validators: 1,
            epochs: 0,
            expected: 0,
        };
        let err: ExportError = integrity.into();
        assert!(err.is_integrity());

        let db_err: ExportError = DbError::InvalidTableName("x y".into()).into();
        assert!(matches!(db_err, ExportError::Database(_)));
        assert!(!db_err.is_integrity());
    }
}
