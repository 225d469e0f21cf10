//! visit-export - Validator distance exporter for browser visualization
//!
//! Reads validator/epoch/distance rows from a SQLite database and writes
//! them as a sequence of JavaScript-includable JSON files, each holding
//! every epoch of a fixed block of validators.
//!
//! # Features
//!
//! - **Deterministic chunks**: rows are paged in (validator_idx, epoch)
//!   order, so concatenating `data0.json`, `data1.json`, ... reproduces
//!   the table exactly.
//!
//! - **Integrity check**: the table must be a dense validator x epoch
//!   grid; anything else aborts the run before a file is written.
//!
//! - **Activity tracking**: inclusion distances per validator and epoch
//!   from observed attestations, dumped into the table the exporter reads.
//!
//! - **Synthetic data**: a generator for ad-hoc visualization input and
//!   for seeding dense test databases.
//!
//! # Example
//!
//! ```bash
//! # Export ../foo.db into ./data with 1000 validators per file
//! visit-export
//!
//! # Seed a database and export it in blocks of 250 validators
//! visit-export seed-db foo.db --validators 5000 --epochs 32 --seed 1
//! visit-export --db foo.db -o ./data -n 250
//!
//! # Random items for the visualization page
//! visit-export generate > items.js
//! ```

pub mod activity;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod generate;
pub mod progress;
pub mod types;

pub use activity::ActivityTracker;
pub use config::{CliArgs, ExportConfig, SeedConfig};
pub use db::{RecordSource, SqliteStore};
pub use error::{ExportError, Result};
pub use export::{export_all, export_database, ExportPlan, ExportStats};
pub use types::{Column, ValidatorEpochRecord};
