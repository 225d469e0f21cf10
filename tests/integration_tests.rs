//! Integration tests for visit-export
//!
//! These tests build SQLite databases in temporary directories and run the
//! full export against them.

use rusqlite::Connection;
use std::path::Path;
use tempfile::tempdir;
use visit_export::config::{ExportConfig, SeedConfig};
use visit_export::db::{create_table, insert_records, DEFAULT_TABLE};
use visit_export::export::{export_database, read_chunks};
use visit_export::generate::{seed_database, SyntheticConfig};
use visit_export::{ExportError, ValidatorEpochRecord};

fn create_db(path: &Path, records: &[ValidatorEpochRecord]) {
    let mut conn = Connection::open(path).unwrap();
    create_table(&conn, DEFAULT_TABLE).unwrap();
    insert_records(&mut conn, DEFAULT_TABLE, records).unwrap();
}

fn grid(validators: &[i64], epochs: &[i64]) -> Vec<ValidatorEpochRecord> {
    let mut rows = Vec::new();
    for &v in validators {
        for &e in epochs {
            rows.push(ValidatorEpochRecord::new(v, e, (v + e) % 65));
        }
    }
    rows
}

#[test]
fn test_single_chunk_round_trip() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("foo.db");
    let out = dir.path().join("data");

    let expected = grid(&[1, 2, 3], &[10, 11]);
    // Insert in reverse to check the export orders by validator
    let mut shuffled = expected.clone();
    shuffled.reverse();
    create_db(&db, &shuffled);

    let stats = export_database(&ExportConfig::new(&db, &out, 1000), None).unwrap();
    assert_eq!(stats.chunks_written, 1);
    assert_eq!(stats.plan.rows_per_chunk, 2000);

    let text = std::fs::read_to_string(out.join("data0.json")).unwrap();
    assert!(text.starts_with("var data = ["));
    assert!(text.ends_with("]\n"));
    assert!(!out.join("data1.json").exists());

    let chunks = read_chunks(&out).unwrap();
    assert_eq!(chunks, vec![expected]);
}

#[test]
fn test_multi_chunk_boundaries() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("foo.db");
    let out = dir.path().join("data");

    let rows = grid(&[0, 1, 2, 3, 4], &[7, 8]);
    create_db(&db, &rows);

    let stats = export_database(&ExportConfig::new(&db, &out, 2), None).unwrap();
    assert_eq!(stats.plan.rows_per_chunk, 4);
    assert_eq!(stats.chunks_written, 3);
    assert_eq!(stats.files.len(), 3);

    let chunks = read_chunks(&out).unwrap();
    let sizes: Vec<_> = chunks.iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![4, 4, 2]);
    assert_eq!(chunks.concat(), rows);
}

#[test]
fn test_empty_table_writes_no_files() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("foo.db");
    let out = dir.path().join("data");
    create_db(&db, &[]);

    let stats = export_database(&ExportConfig::new(&db, &out, 1000), None).unwrap();
    assert_eq!(stats.plan.total_rows, 0);
    assert_eq!(stats.chunks_written, 0);
    assert!(!out.join("data0.json").exists());
}

#[test]
fn test_missing_epoch_row_is_fatal() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("foo.db");
    let out = dir.path().join("data");

    let mut rows = grid(&[1, 2, 3], &[10, 11]);
    rows.remove(3);
    create_db(&db, &rows);

    let err = export_database(&ExportConfig::new(&db, &out, 1), None).unwrap_err();
    assert!(matches!(err, ExportError::Integrity(_)));
    assert!(!out.exists());
}

#[test]
fn test_source_is_not_modified() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("foo.db");
    let out = dir.path().join("data");
    create_db(&db, &grid(&[5, 6], &[1, 2, 3]));
    let before = std::fs::read(&db).unwrap();

    export_database(&ExportConfig::new(&db, &out, 1), None).unwrap();

    assert_eq!(std::fs::read(&db).unwrap(), before);
}

#[test]
fn test_seeded_database_partitions_exactly() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("seed.db");
    let out = dir.path().join("data");

    let seed = SeedConfig {
        db_path: db.clone(),
        table: DEFAULT_TABLE.to_string(),
        batch_size: 100,
        synthetic: SyntheticConfig {
            validators: 57,
            epochs: 6,
            seed: Some(3),
        },
    };
    assert_eq!(seed_database(&seed).unwrap(), 57 * 6);

    let stats = export_database(&ExportConfig::new(&db, &out, 10), None).unwrap();
    assert_eq!(stats.chunks_written, 6);

    let chunks = read_chunks(&out).unwrap();
    let last = chunks.last().unwrap();
    assert_eq!(last.len(), 7 * 6);
    for chunk in &chunks[..chunks.len() - 1] {
        assert_eq!(chunk.len(), 60);
    }

    // Concatenation equals the table in (validator_idx, epoch) order
    let conn = Connection::open(&db).unwrap();
    let table: Vec<ValidatorEpochRecord> = conn
        .prepare("SELECT validator_idx, epoch, distance FROM validator_state ORDER BY validator_idx, epoch")
        .unwrap()
        .query_map([], ValidatorEpochRecord::from_row)
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    assert_eq!(chunks.concat(), table);

    // No validator is split across chunk files
    for pair in chunks.windows(2) {
        let end = pair[0].last().unwrap().validator_idx;
        let start = pair[1].first().unwrap().validator_idx;
        assert!(end < start);
    }
}

#[test]
fn test_reexport_overwrites_chunks() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("foo.db");
    let out = dir.path().join("data");
    std::fs::create_dir_all(&out).unwrap();
    std::fs::write(out.join("data0.json"), "garbage").unwrap();

    let rows = grid(&[1], &[1, 2]);
    create_db(&db, &rows);

    export_database(&ExportConfig::new(&db, &out, 1), None).unwrap();
    assert_eq!(read_chunks(&out).unwrap(), vec![rows]);
}
