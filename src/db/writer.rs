//! Batched inserts into the validator_state table
//!
//! Used to register observed attestation distances and to seed databases
//! with synthetic data. Inserts are grouped into transactions with a
//! cached prepared statement.

use crate::db::schema::validate_table_name;
use crate::error::DbResult;
use crate::types::ValidatorEpochRecord;
use rusqlite::{params, Connection, Transaction};
use tracing::debug;

/// Register a single attestation distance for `validator_idx` at `epoch`
pub fn register_attestation(
    conn: &Connection,
    table: &str,
    record: &ValidatorEpochRecord,
) -> DbResult<()> {
    let table = validate_table_name(table)?;
    conn.execute(
        &format!("INSERT INTO {table} (validator_idx, epoch, distance) VALUES (?1, ?2, ?3)"),
        params![record.validator_idx, record.epoch, record.distance],
    )?;
    Ok(())
}

/// Insert all records inside one transaction
pub fn insert_records(
    conn: &mut Connection,
    table: &str,
    records: &[ValidatorEpochRecord],
) -> DbResult<u64> {
    let table = validate_table_name(table)?;
    let tx = conn.transaction()?;
    let written = write_batch(&tx, table, records)?;
    tx.commit()?;
    Ok(written)
}

/// Insert records from an iterator, committing every `batch_size` rows
pub fn insert_batched<I>(
    conn: &mut Connection,
    table: &str,
    records: I,
    batch_size: usize,
) -> DbResult<u64>
where
    I: IntoIterator<Item = ValidatorEpochRecord>,
{
    let table = validate_table_name(table)?;
    let batch_size = batch_size.max(1);
    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0u64;
    let mut batches = 0u64;

    for record in records {
        batch.push(record);
        if batch.len() >= batch_size {
            total += insert_records(conn, table, &batch)?;
            batches += 1;
            batch.clear();
        }
    }

    if !batch.is_empty() {
        total += insert_records(conn, table, &batch)?;
        batches += 1;
    }

    debug!(rows = total, batches, "Inserted records");
    Ok(total)
}

fn write_batch(
    tx: &Transaction<'_>,
    table: &str,
    records: &[ValidatorEpochRecord],
) -> DbResult<u64> {
    let mut stmt = tx.prepare_cached(&format!(
        "INSERT INTO {table} (validator_idx, epoch, distance) VALUES (?1, ?2, ?3)"
    ))?;

    for record in records {
        stmt.execute(params![record.validator_idx, record.epoch, record.distance])?;
    }

    Ok(records.len() as u64)
}
