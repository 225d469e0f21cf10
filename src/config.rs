//! Configuration types for visit-export
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::db::schema::{is_valid_table_name, DEFAULT_TABLE};
use crate::error::ConfigError;
use crate::generate::{SyntheticConfig, DEFAULT_EPOCHS, DEFAULT_VALIDATORS};
use clap::Parser;
use std::path::PathBuf;

/// Default source database
pub const DEFAULT_DB_PATH: &str = "../foo.db";

/// Default directory for chunk files
pub const DEFAULT_OUTPUT_DIR: &str = "./data";

/// Default number of validators per chunk file
pub const DEFAULT_VALIDATORS_PER_CHUNK: u64 = 1000;

/// Upper bound for validators per chunk
pub const MAX_VALIDATORS_PER_CHUNK: u64 = 1_000_000;

/// Export validator distances from SQLite into chunked JS files
#[derive(Parser, Debug, Clone)]
#[command(
    name = "visit-export",
    version,
    about = "Export validator/epoch distances from SQLite into chunked JS-includable JSON files",
    long_about = "Reads every row of the validator_state table ordered by validator index and\n\
                  writes them as data0.json, data1.json, ... each holding all epochs of a\n\
                  fixed number of validators as `var data = [...]`.\n\n\
                  The table must be a dense validator x epoch grid; the export aborts otherwise.",
    after_help = "EXAMPLES:\n    \
        visit-export\n    \
        visit-export --db foo.db --output-dir ./data --validators-per-chunk 500\n    \
        visit-export generate --seed 7 > items.js\n    \
        visit-export seed-db foo.db --validators 5000 --epochs 32",
    args_conflicts_with_subcommands = true
)]
pub struct CliArgs {
    /// Subcommand (generate, seed-db)
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Source SQLite database
    #[arg(long, default_value = DEFAULT_DB_PATH, value_name = "FILE")]
    pub db: PathBuf,

    /// Directory for chunk files (created if absent)
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Validators per chunk file
    #[arg(
        short = 'n',
        long,
        default_value_t = DEFAULT_VALIDATORS_PER_CHUNK,
        value_name = "NUM"
    )]
    pub validators_per_chunk: u64,

    /// Source table name
    #[arg(long, default_value = DEFAULT_TABLE, value_name = "NAME")]
    pub table: String,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

/// Subcommands
#[derive(clap::Subcommand, Debug, Clone)]
pub enum Command {
    /// Print synthetic records as a JavaScript array literal (`var items = [...]`)
    Generate {
        /// Validator iterations (indices are random and may repeat)
        #[arg(long, default_value_t = DEFAULT_VALIDATORS, value_name = "NUM")]
        validators: u64,

        /// Consecutive epochs per validator
        #[arg(long, default_value_t = DEFAULT_EPOCHS, value_name = "NUM")]
        epochs: u64,

        /// RNG seed for reproducible output
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,
    },

    /// Write a dense synthetic validator x epoch table into a SQLite database
    SeedDb {
        /// SQLite database to create or append to
        #[arg(value_name = "FILE")]
        db: PathBuf,

        /// Number of validators (indices 0..N)
        #[arg(long, default_value_t = DEFAULT_VALIDATORS, value_name = "NUM")]
        validators: u64,

        /// Consecutive epochs per validator
        #[arg(long, default_value_t = DEFAULT_EPOCHS, value_name = "NUM")]
        epochs: u64,

        /// RNG seed for reproducible output
        #[arg(long, value_name = "SEED")]
        seed: Option<u64>,

        /// Rows per insert transaction
        #[arg(short = 'b', long, default_value = "10000", value_name = "NUM")]
        batch_size: usize,

        /// Target table name
        #[arg(long, default_value = DEFAULT_TABLE, value_name = "NAME")]
        table: String,
    },
}

/// Validated export configuration
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Source database path
    pub db_path: PathBuf,

    /// Directory for chunk files
    pub output_dir: PathBuf,

    /// Validators per chunk file
    pub validators_per_chunk: u64,

    /// Source table
    pub table: String,

    /// Show progress indicator
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl ExportConfig {
    /// Configuration with default table and no progress output
    pub fn new(
        db_path: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        validators_per_chunk: u64,
    ) -> Self {
        Self {
            db_path: db_path.into(),
            output_dir: output_dir.into(),
            validators_per_chunk,
            table: DEFAULT_TABLE.to_string(),
            show_progress: false,
            verbose: false,
        }
    }

    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        let config = Self {
            db_path: args.db,
            output_dir: args.output_dir,
            validators_per_chunk: args.validators_per_chunk,
            table: args.table,
            show_progress: !args.quiet,
            verbose: args.verbose,
        };
        config.validate()?;

        if !config.db_path.exists() {
            return Err(ConfigError::MissingDatabase {
                path: config.db_path,
            });
        }

        Ok(config)
    }

    /// Validate everything except the existence of the source database
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_validators_per_chunk(self.validators_per_chunk)?;

        if !is_valid_table_name(&self.table) {
            return Err(ConfigError::InvalidTableName {
                name: self.table.clone(),
            });
        }

        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(ConfigError::InvalidOutputPath {
                path: self.output_dir.clone(),
                reason: "exists and is not a directory".to_string(),
            });
        }

        Ok(())
    }
}

/// Validated seed-db configuration
#[derive(Debug, Clone)]
pub struct SeedConfig {
    pub db_path: PathBuf,
    pub table: String,
    pub batch_size: usize,
    pub synthetic: SyntheticConfig,
}

impl SeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_table_name(&self.table) {
            return Err(ConfigError::InvalidTableName {
                name: self.table.clone(),
            });
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "batch_size",
                value: 0,
                reason: "must be at least 1".to_string(),
            });
        }
        self.synthetic.validate()
    }
}

fn validate_validators_per_chunk(count: u64) -> Result<(), ConfigError> {
    if count == 0 || count > MAX_VALIDATORS_PER_CHUNK {
        return Err(ConfigError::InvalidChunkSize {
            count,
            max: MAX_VALIDATORS_PER_CHUNK,
        });
    }
    Ok(())
}
