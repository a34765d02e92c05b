//! Output module for user-facing reports
//!
//! This module handles:
//! - Printing the summary at the end of every run
//! - Building and printing the `--status` report from persisted state

mod status;

pub use status::{format_status, load_status, print_status, StatusReport};

use crate::crawler::RunSummary;

/// Renders a run summary as the block printed after a run
pub fn format_summary(title: &str, summary: &RunSummary) -> String {
    let mut lines = vec![
        format!("=== {} ===", title),
        format!("  Collected: {}", summary.collected),
        format!("  Skipped (already collected): {}", summary.skipped),
        format!("  Failed: {}", summary.failed),
    ];
    if summary.retried_ok > 0 || summary.retry_exhausted > 0 {
        lines.push(format!("  Re-collected by retry: {}", summary.retried_ok));
        lines.push(format!(
            "  Left for inspection: {}",
            summary.retry_exhausted
        ));
    }
    lines.push(format!("  Pages walked: {}", summary.pages));
    lines.push(format!(
        "  Elapsed: {:.1}s",
        summary.elapsed.as_secs_f64()
    ));
    if summary.early_exit {
        lines.push("  Stopped early: consecutive duplicates".to_string());
    }
    if summary.interrupted {
        lines.push("  Interrupted: progress saved, resume with the same command".to_string());
    }
    lines.join("\n")
}

/// Prints a run summary to stdout
pub fn print_summary(title: &str, summary: &RunSummary) {
    println!("\n{}", format_summary(title, summary));
}
