//! visit-export - Validator distance exporter
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, BufWriter};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use visit_export::config::{CliArgs, Command, ExportConfig, SeedConfig};
use visit_export::export::{export_database, ProgressCallback};
use visit_export::generate::{generate_items, seed_database, write_items_js, SyntheticConfig};
use visit_export::progress::{print_header, print_summary, ProgressReporter};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    match args.command.clone() {
        Some(Command::Generate {
            validators,
            epochs,
            seed,
        }) => run_generate(SyntheticConfig {
            validators,
            epochs,
            seed,
        }),
        Some(Command::SeedDb {
            db,
            validators,
            epochs,
            seed,
            batch_size,
            table,
        }) => run_seed(SeedConfig {
            db_path: db,
            table,
            batch_size,
            synthetic: SyntheticConfig {
                validators,
                epochs,
                seed,
            },
        }),
        None => {
            let config = ExportConfig::from_args(args).context("Invalid configuration")?;
            run_export(config)
        }
    }
}

/// Export the database into chunk files
fn run_export(config: ExportConfig) -> Result<()> {
    if config.show_progress {
        print_header(
            &config.db_path.display().to_string(),
            &config.output_dir.display().to_string(),
            config.validators_per_chunk,
        );
    }

    let progress = if config.show_progress {
        Some(ProgressReporter::new())
    } else {
        None
    };

    let callback: Option<ProgressCallback> = progress.as_ref().map(|p| {
        let bar = p.bar();
        Box::new(move |done: u64, total: u64| {
            bar.set_length(total);
            bar.set_position(done);
        }) as ProgressCallback
    });

    if let Some(ref p) = progress {
        p.set_status("Reading source table...");
    }

    let result = export_database(&config, callback);

    if let Some(ref p) = progress {
        match &result {
            Ok(_) => p.finish("done"),
            Err(_) => p.finish_and_clear(),
        }
    }

    let stats = result.context("Export failed")?;

    if config.show_progress {
        print_summary(&stats, &config.output_dir);
    }

    info!(
        chunks = stats.chunks_written,
        rows = stats.rows_written,
        "Wrote {}",
        config.output_dir.display()
    );

    Ok(())
}

/// Print random items as a JavaScript literal on stdout
fn run_generate(config: SyntheticConfig) -> Result<()> {
    config.validate().context("Invalid generator parameters")?;

    let stdout = io::stdout();
    write_items_js(BufWriter::new(stdout.lock()), generate_items(&config))
        .context("Failed to write items")?;

    Ok(())
}

/// Fill a database with a dense synthetic grid
fn run_seed(config: SeedConfig) -> Result<()> {
    let rows = seed_database(&config)
        .with_context(|| format!("Failed to seed {}", config.db_path.display()))?;

    info!(rows, "Seeded {}", config.db_path.display());
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("visit_export=debug,warn")
    } else {
        EnvFilter::new("visit_export=info,warn")
    };

    // stdout carries generated data, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
