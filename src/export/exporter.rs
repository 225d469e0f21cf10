//! Export pipeline: count -> check -> paginate -> write chunks
//!
//! Reads the whole table in (validator_idx, epoch) order, one page per
//! chunk file, and writes `data0.json`, `data1.json`, ... into the output
//! directory. The table must be a dense validator x epoch grid; if it is
//! not, chunk boundaries would not line up with validators, so the export
//! stops before touching the output directory.

use crate::config::{ExportConfig, MAX_VALIDATORS_PER_CHUNK};
use crate::db::{RecordSource, SqliteStore};
use crate::error::{ConfigError, IntegrityError, Result};
use crate::export::chunk::{chunk_count, compute_chunk_size, write_chunk};
use crate::types::{Column, MAX_DISTANCE};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Progress callback type, called with (chunks_written, total_chunks)
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send>;

/// Shape of the table and the chunking derived from it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportPlan {
    pub total_rows: u64,
    pub validators: u64,
    pub epochs: u64,
    pub validators_per_chunk: u64,
    pub rows_per_chunk: u64,
    pub chunks: u64,
}

impl ExportPlan {
    /// (chunk index, row offset) of every chunk, in order
    pub fn chunk_offsets(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        (0..self.chunks).map(move |i| (i, i * self.rows_per_chunk))
    }

    /// Rows the chunk starting at `offset` must hold
    pub fn rows_at(&self, offset: u64) -> u64 {
        self.rows_per_chunk.min(self.total_rows.saturating_sub(offset))
    }
}

/// Statistics from an export run
#[derive(Debug, Clone)]
pub struct ExportStats {
    pub plan: ExportPlan,
    pub chunks_written: u64,
    pub rows_written: u64,
    pub bytes_written: u64,
    pub files: Vec<PathBuf>,
    pub duration: Duration,
}

/// Fail unless `total_rows == validators * epochs`
pub fn check_dense(
    total_rows: u64,
    validators: u64,
    epochs: u64,
) -> std::result::Result<(), IntegrityError> {
    match validators.checked_mul(epochs) {
        Some(expected) if expected == total_rows => Ok(()),
        expected => Err(IntegrityError::NotDenseCrossProduct {
            total_rows,
            validators,
            epochs,
            expected: expected.unwrap_or(u64::MAX),
        }),
    }
}

/// Count the table, check it is dense, and size the chunks
pub fn plan_export<S: RecordSource + ?Sized>(
    source: &S,
    validators_per_chunk: u64,
) -> Result<ExportPlan> {
    if validators_per_chunk == 0 {
        return Err(ConfigError::InvalidChunkSize {
            count: 0,
            max: MAX_VALIDATORS_PER_CHUNK,
        }
        .into());
    }

    let total_rows = source.count_all()?;
    let validators = source.count_distinct(Column::ValidatorIdx)?;
    let epochs = source.count_distinct(Column::Epoch)?;

    check_dense(total_rows, validators, epochs)?;

    let rows_per_chunk = compute_chunk_size(validators_per_chunk, epochs);
    let chunks = chunk_count(total_rows, rows_per_chunk);

    Ok(ExportPlan {
        total_rows,
        validators,
        epochs,
        validators_per_chunk,
        rows_per_chunk,
        chunks,
    })
}

/// Export every row of `source` into chunk files under `config.output_dir`
pub fn export_all<S: RecordSource + ?Sized>(
    source: &S,
    config: &ExportConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<ExportStats> {
    let start = Instant::now();
    let plan = plan_export(source, config.validators_per_chunk)?;

    info!(
        "For {} validators and {} per json, we need {} jsons ({} total entries)",
        plan.validators, plan.validators_per_chunk, plan.chunks, plan.total_rows
    );

    fs::create_dir_all(&config.output_dir)?;

    let mut out_of_range = 0u64;
    let mut stats = ExportStats {
        plan,
        chunks_written: 0,
        rows_written: 0,
        bytes_written: 0,
        files: Vec::new(),
        duration: Duration::ZERO,
    };

    for (index, offset) in plan.chunk_offsets() {
        info!(
            "Writing entries {} to {}",
            offset,
            offset.saturating_add(plan.rows_per_chunk)
        );

        let records = source.fetch_page(offset, plan.rows_per_chunk)?;
        let expected = plan.rows_at(offset);
        if (records.len() as u64) < expected {
            return Err(IntegrityError::ShortPage {
                index,
                offset,
                expected,
                got: records.len() as u64,
            }
            .into());
        }

        let bad = records.iter().filter(|r| !r.distance_in_range()).count() as u64;
        if bad > 0 {
            debug!(index, rows = bad, "Chunk holds distances outside 0..={}", MAX_DISTANCE);
            out_of_range += bad;
        }

        let written = write_chunk(&config.output_dir, index, &records)?;
        debug!(
            index,
            path = %written.path.display(),
            rows = written.rows,
            "Chunk complete"
        );

        stats.chunks_written += 1;
        stats.rows_written += written.rows;
        stats.bytes_written += written.bytes;
        stats.files.push(written.path);

        if let Some(ref callback) = progress_callback {
            callback(stats.chunks_written, plan.chunks);
        }
    }

    if stats.rows_written != plan.total_rows {
        return Err(IntegrityError::RowCountMismatch {
            written: stats.rows_written,
            total_rows: plan.total_rows,
        }
        .into());
    }

    if out_of_range > 0 {
        warn!(rows = out_of_range, "Exported distances outside 0..={}", MAX_DISTANCE);
    }

    stats.duration = start.elapsed();

    info!(
        chunks = stats.chunks_written,
        rows = stats.rows_written,
        "Export complete"
    );

    Ok(stats)
}

/// Open the configured database read-only and export it
pub fn export_database(
    config: &ExportConfig,
    progress_callback: Option<ProgressCallback>,
) -> Result<ExportStats> {
    config.validate()?;
    let store = SqliteStore::open_readonly(&config.db_path, &config.table)?;
    export_all(&store, config, progress_callback)
}
