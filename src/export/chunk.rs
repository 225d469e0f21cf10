//! Chunk sizing, naming and serialization
//!
//! A chunk file holds one JavaScript statement assigning a JSON array of
//! records to a variable, so the browser can load it with a script tag:
//!
//! ```text
//! var data = [{"validator_idx": 0, "epoch": 12, "distance": 3}, ...]
//! ```

use crate::error::{ExportError, Result};
use crate::types::ValidatorEpochRecord;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Chunk file name prefix (`data0.json`, `data1.json`, ...)
pub const FILE_PREFIX: &str = "data";

/// Chunk file extension
pub const FILE_EXTENSION: &str = "json";

/// JavaScript variable each chunk assigns to
pub const JS_VARIABLE: &str = "data";

/// Rows per chunk: every validator contributes one row per epoch
pub fn compute_chunk_size(validators_per_chunk: u64, epochs_per_validator: u64) -> u64 {
    validators_per_chunk.saturating_mul(epochs_per_validator)
}

/// Number of chunk files needed to cover `total_rows`
pub fn chunk_count(total_rows: u64, rows_per_chunk: u64) -> u64 {
    if rows_per_chunk == 0 {
        return 0;
    }
    total_rows.div_ceil(rows_per_chunk)
}

/// File name for a chunk index
pub fn chunk_file_name(index: u64) -> String {
    format!("{FILE_PREFIX}{index}.{FILE_EXTENSION}")
}

/// Full path for a chunk index inside `output_dir`
pub fn chunk_path(output_dir: &Path, index: u64) -> PathBuf {
    output_dir.join(chunk_file_name(index))
}

/// Single-line JSON with `", "` and `": "` separators
#[derive(Debug, Clone, Copy, Default)]
pub struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

/// Render records as `var data = <json array>\n`
pub fn render_chunk(records: &[ValidatorEpochRecord]) -> Result<Vec<u8>> {
    let mut out = format!("var {JS_VARIABLE} = ").into_bytes();
    // ~50 bytes per rendered record
    out.reserve(records.len().saturating_mul(50));

    let mut ser = serde_json::Serializer::with_formatter(&mut out, SpacedFormatter);
    records.serialize(&mut ser)?;

    out.push(b'\n');
    Ok(out)
}

/// Parse the text of a chunk file back into records
pub fn parse_chunk(text: &str) -> Result<Vec<ValidatorEpochRecord>> {
    let prefix = format!("var {JS_VARIABLE} = ");
    let body = text.strip_prefix(prefix.as_str()).unwrap_or(text);
    Ok(serde_json::from_str(body.trim_end())?)
}

/// A chunk file that has been written and flushed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenChunk {
    pub index: u64,
    pub path: PathBuf,
    pub rows: u64,
    pub bytes: u64,
}

/// Write one chunk file, replacing any existing file with the same name
pub fn write_chunk(
    output_dir: &Path,
    index: u64,
    records: &[ValidatorEpochRecord],
) -> Result<WrittenChunk> {
    let path = chunk_path(output_dir, index);
    let contents = render_chunk(records)?;

    let write = |path: &Path| -> std::io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        writer.write_all(&contents)?;
        writer.flush()?;
        Ok(())
    };

    write(&path).map_err(|source| ExportError::ChunkWrite {
        path: path.clone(),
        source,
    })?;

    debug!(index, rows = records.len(), bytes = contents.len(), "Wrote chunk");

    Ok(WrittenChunk {
        index,
        path,
        rows: records.len() as u64,
        bytes: contents.len() as u64,
    })
}

/// Read every chunk in `output_dir` in index order, stopping at the first gap
pub fn read_chunks(output_dir: &Path) -> Result<Vec<Vec<ValidatorEpochRecord>>> {
    let mut chunks = Vec::new();
    for index in 0.. {
        let path = chunk_path(output_dir, index);
        if !path.exists() {
            break;
        }
        let text = fs::read_to_string(&path)?;
        chunks.push(parse_chunk(&text)?);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_compute_chunk_size() {
        assert_eq!(compute_chunk_size(1000, 10), 10_000);
        assert_eq!(compute_chunk_size(2, 2), 4);
        assert_eq!(compute_chunk_size(5, 0), 0);
        assert_eq!(compute_chunk_size(u64::MAX, 2), u64::MAX);
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(10, 4), 3);
        assert_eq!(chunk_count(8, 4), 2);
        assert_eq!(chunk_count(0, 4), 0);
        assert_eq!(chunk_count(0, 0), 0);
    }

    #[test]
    fn test_chunk_file_name() {
        assert_eq!(chunk_file_name(0), "data0.json");
        assert_eq!(chunk_file_name(12), "data12.json");
    }

    #[test]
    fn test_render_chunk_format() {
        let records = vec![
            ValidatorEpochRecord::new(1, 5, 9),
            ValidatorEpochRecord::new(1, 6, 0),
        ];
        let text = String::from_utf8(render_chunk(&records).unwrap()).unwrap();

        assert!(text.starts_with("var data = ["));
        assert!(text.ends_with("]\n"));
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains(r#""validator_idx": 1"#));
        assert_eq!(parse_chunk(&text).unwrap(), records);
    }

    #[test]
    fn test_render_chunk_separators() {
        let records = vec![
            ValidatorEpochRecord::new(1, 5, 9),
            ValidatorEpochRecord::new(2, 5, 64),
        ];
        let text = String::from_utf8(render_chunk(&records).unwrap()).unwrap();
        assert_eq!(
            text,
            "var data = [{\"validator_idx\": 1, \"epoch\": 5, \"distance\": 9}, \
             {\"validator_idx\": 2, \"epoch\": 5, \"distance\": 64}]\n"
        );

        let empty = String::from_utf8(render_chunk(&[]).unwrap()).unwrap();
        assert_eq!(empty, "var data = []\n");
    }

    #[test]
    fn test_write_chunk_overwrites() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("data0.json"), "stale contents that are longer").unwrap();

        let records = vec![ValidatorEpochRecord::new(3, 1, 2)];
        let written = write_chunk(dir.path(), 0, &records).unwrap();

        assert_eq!(written.rows, 1);
        assert_eq!(written.path, dir.path().join("data0.json"));
        let text = fs::read_to_string(&written.path).unwrap();
        assert_eq!(text.len() as u64, written.bytes);
        assert_eq!(parse_chunk(&text).unwrap(), records);
    }

    #[test]
    fn test_write_chunk_missing_dir() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("does/not/exist");
        let err = write_chunk(&missing, 0, &[]).unwrap_err();
        assert!(matches!(err, ExportError::ChunkWrite { .. }));
    }

    #[test]
    fn test_read_chunks_stops_at_gap() {
        let dir = tempdir().unwrap();
        write_chunk(dir.path(), 0, &[ValidatorEpochRecord::new(0, 0, 0)]).unwrap();
        write_chunk(dir.path(), 1, &[ValidatorEpochRecord::new(1, 0, 0)]).unwrap();
        write_chunk(dir.path(), 3, &[ValidatorEpochRecord::new(3, 0, 0)]).unwrap();

        let chunks = read_chunks(dir.path()).unwrap();
        assert_eq!(chunks.len(), 2);
    }
}
