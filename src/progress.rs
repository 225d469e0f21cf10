//! Progress reporting for the exporter
//!
//! Provides a chunk progress bar using indicatif and styled header/summary
//! output using console.

use crate::export::ExportStats;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Progress reporter that displays chunk writes
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);

        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks {msg}")
                .expect("Invalid progress template")
                .progress_chars("=> "),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A cloneable handle for use inside an export progress callback
    pub fn bar(&self) -> ProgressBar {
        self.bar.clone()
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the export
pub fn print_summary(stats: &ExportStats, output_dir: &Path) {
    let duration_secs = stats.duration.as_secs_f64();
    let rate = if duration_secs > 0.0 {
        stats.rows_written as f64 / duration_secs
    } else {
        0.0
    };

    println!();
    println!("{}", style("Export Complete").green().bold());
    println!("{}", style("─".repeat(50)).dim());
    println!(
        "  {} {}",
        style("Validators:").bold(),
        format_number(stats.plan.validators)
    );
    println!(
        "  {} {}",
        style("Epochs:").bold(),
        format_number(stats.plan.epochs)
    );
    println!(
        "  {} {}",
        style("Rows:").bold(),
        format_number(stats.rows_written)
    );
    println!(
        "  {} {} ({} rows each)",
        style("Chunks:").bold(),
        format_number(stats.chunks_written),
        format_number(stats.plan.rows_per_chunk)
    );
    println!(
        "  {} {:.1}s ({:.0} rows/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    println!(
        "  {} {} ({})",
        style("Output:").bold(),
        output_dir.display(),
        format_size(stats.bytes_written, BINARY)
    );
    println!();
}

/// Print a header at the start of the export
pub fn print_header(db: &str, output: &str, validators_per_chunk: u64) {
    println!();
    println!(
        "{} {}",
        style("visit-export").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Source:").bold(), db);
    println!("  {} {}", style("Output:").bold(), output);
    println!(
        "  {} {}",
        style("Validators/chunk:").bold(),
        format_number(validators_per_chunk)
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }
}
