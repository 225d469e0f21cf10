//! Read access to the validator_state table
//!
//! The exporter only needs three queries: distinct counts per column, the
//! total row count, and ordered pages. They sit behind [`RecordSource`] so
//! the export pipeline can run against any store.

use crate::db::schema::{self, validate_table_name};
use crate::error::{DbError, DbResult};
use crate::types::{Column, ValidatorEpochRecord};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::debug;

/// Read-only source of validator/epoch records
pub trait RecordSource {
    /// Count distinct values in a column
    fn count_distinct(&self, column: Column) -> DbResult<u64>;

    /// Count all rows
    fn count_all(&self) -> DbResult<u64>;

    /// Fetch up to `limit` rows ordered by (validator_idx, epoch), skipping `offset` rows
    fn fetch_page(&self, offset: u64, limit: u64) -> DbResult<Vec<ValidatorEpochRecord>>;
}

/// SQLite-backed record source
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    /// Open an existing database file read-only
    pub fn open_readonly<P: AsRef<Path>>(path: P, table: &str) -> DbResult<Self> {
        let path = path.as_ref();
        let table = validate_table_name(table)?.to_string();

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| DbError::OpenFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        schema::optimize_for_reads(&conn)?;

        if !schema::table_exists(&conn, &table)? {
            return Err(DbError::OpenFailed {
                path: path.to_path_buf(),
                reason: format!("no table named '{}'", table),
            });
        }

        debug!(path = %path.display(), table = %table, "Opened source database");
        Ok(Self { conn, table })
    }

    /// Wrap an already open connection (e.g. an in-memory database)
    pub fn from_connection(conn: Connection, table: &str) -> DbResult<Self> {
        let table = validate_table_name(table)?.to_string();
        Ok(Self { conn, table })
    }

    fn count_query(&self, sql: &str, what: &str) -> DbResult<u64> {
        let value: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        u64::try_from(value).map_err(|_| DbError::BadCount {
            what: what.to_string(),
            value,
        })
    }
}

impl RecordSource for SqliteStore {
    fn count_distinct(&self, column: Column) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(DISTINCT {}) FROM {}", column, self.table);
        self.count_query(&sql, column.as_str())
    }

    fn count_all(&self) -> DbResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        self.count_query(&sql, "rows")
    }

    fn fetch_page(&self, offset: u64, limit: u64) -> DbResult<Vec<ValidatorEpochRecord>> {
        let sql = format!(
            "SELECT validator_idx, epoch, distance FROM {} \
             ORDER BY validator_idx, epoch LIMIT ?1 OFFSET ?2",
            self.table
        );
        let mut stmt = self.conn.prepare_cached(&sql)?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let rows = stmt
            .query_map(params![limit, offset], ValidatorEpochRecord::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema::{create_table, DEFAULT_TABLE};
    use crate::db::writer::insert_records;
    use tempfile::tempdir;

    fn store_with(records: &[ValidatorEpochRecord]) -> SqliteStore {
        let mut conn = Connection::open_in_memory().unwrap();
        create_table(&conn, DEFAULT_TABLE).unwrap();
        insert_records(&mut conn, DEFAULT_TABLE, records).unwrap();
        SqliteStore::from_connection(conn, DEFAULT_TABLE).unwrap()
    }

    #[test]
    fn test_counts() {
        let store = store_with(&[
            ValidatorEpochRecord::new(2, 10, 1),
            ValidatorEpochRecord::new(2, 11, 2),
            ValidatorEpochRecord::new(5, 10, 3),
            ValidatorEpochRecord::new(5, 11, 4),
        ]);

        assert_eq!(store.count_all().unwrap(), 4);
        assert_eq!(store.count_distinct(Column::ValidatorIdx).unwrap(), 2);
        assert_eq!(store.count_distinct(Column::Epoch).unwrap(), 2);
        assert_eq!(store.count_distinct(Column::Distance).unwrap(), 4);
    }

    #[test]
    fn test_fetch_page_ordering() {
        // Inserted out of order on purpose
        let store = store_with(&[
            ValidatorEpochRecord::new(9, 2, 0),
            ValidatorEpochRecord::new(1, 2, 0),
            ValidatorEpochRecord::new(9, 1, 0),
            ValidatorEpochRecord::new(1, 1, 0),
        ]);

        let all = store.fetch_page(0, 100).unwrap();
        let keys: Vec<(i64, i64)> = all.iter().map(|r| (r.validator_idx, r.epoch)).collect();
        assert_eq!(keys, vec![(1, 1), (1, 2), (9, 1), (9, 2)]);

        let page = store.fetch_page(1, 2).unwrap();
        assert_eq!(page, all[1..3].to_vec());

        assert!(store.fetch_page(4, 2).unwrap().is_empty());
    }

    #[test]
    fn test_fetch_page_is_stable() {
        let store = store_with(&[
            ValidatorEpochRecord::new(3, 1, 5),
            ValidatorEpochRecord::new(3, 2, 6),
            ValidatorEpochRecord::new(1, 1, 7),
        ]);
        assert_eq!(store.fetch_page(0, 3).unwrap(), store.fetch_page(0, 3).unwrap());
    }

    #[test]
    fn test_open_missing_file() {
        let dir = tempdir().unwrap();
        let result = SqliteStore::open_readonly(dir.path().join("nope.db"), DEFAULT_TABLE);
        assert!(matches!(result, Err(DbError::OpenFailed { .. })));
    }

    #[test]
    fn test_open_missing_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute("CREATE TABLE other (x INTEGER)", [])
            .unwrap();

        let result = SqliteStore::open_readonly(&path, DEFAULT_TABLE);
        assert!(matches!(result, Err(DbError::OpenFailed { .. })));
    }

    #[test]
    fn test_rejects_bad_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            SqliteStore::from_connection(conn, "x; DROP TABLE y"),
            Err(DbError::InvalidTableName(_))
        ));
    }
}
