//! Chunked export of the validator_state table
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │   SQLite (validator_state)   │
//! └──────────────┬───────────────┘
//!                │ COUNT(*), COUNT(DISTINCT ..)
//!                ▼
//! ┌──────────────────────────────┐
//! │  plan_export                 │
//! │  - dense grid check          │
//! │  - rows/chunk = V x epochs   │
//! └──────────────┬───────────────┘
//!                │ ORDER BY validator_idx, epoch
//!                │ LIMIT rows/chunk OFFSET n
//!                ▼
//! ┌──────────────────────────────┐
//! │  write_chunk                 │
//! │  var data = [...]\n          │
//! └──────────────┬───────────────┘
//!                ▼
//!     data0.json, data1.json, ...
//! ```

pub mod chunk;
pub mod exporter;

pub use chunk::{
    compute_chunk_size, parse_chunk, read_chunks, render_chunk, write_chunk, WrittenChunk,
};
pub use exporter::{
    check_dense, export_all, export_database, plan_export, ExportPlan, ExportStats,
    ProgressCallback,
};
