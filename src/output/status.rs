//! Status report built from the persisted state
//!
//! This module reads the checkpoint, the dedup index and the record store
//! without taking the run lock, so `--status` works while a run is active.

use crate::config::Config;
use crate::state::CrawlStatus;
use crate::storage::{CheckpointStore, CrawlStats, Cursor, DedupIndex, FailedItem, RecordSink, SqliteSink};
use crate::Result;
use chrono::{DateTime, Utc};
use std::fmt::Write as _;

/// Snapshot of everything a user needs to decide what to run next
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub status: CrawlStatus,
    pub cursor: Cursor,
    pub stats: CrawlStats,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Failed items a retry run will still attempt
    pub retry_eligible: Vec<FailedItem>,
    /// Failed items past the attempt bound
    pub exhausted: Vec<FailedItem>,
    pub max_attempts: u32,
    pub fingerprints: usize,
    /// Records in the store; None when no store exists yet
    pub collected: Option<usize>,
}

/// Loads the status report
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(StatusReport)` - Successfully loaded the report
/// * `Err(SweepError)` - The record store exists but could not be read
pub fn load_status(config: &Config) -> Result<StatusReport> {
    let state = CheckpointStore::new(config.checkpoint_path()).load();
    let dedup = DedupIndex::load(config.dedup_path());
    let max_attempts = config.retry.max_attempts;

    let database = config.database_path();
    let collected = if database.exists() {
        let sink = SqliteSink::open(&database, &config.output.directory)?;
        Some(sink.count()?)
    } else {
        None
    };

    Ok(StatusReport {
        status: state.status,
        cursor: state.cursor,
        stats: state.stats.clone(),
        started_at: state.started_at,
        updated_at: state.updated_at,
        retry_eligible: state.retry_eligible(max_attempts),
        exhausted: state.exhausted(max_attempts).into_iter().cloned().collect(),
        max_attempts,
        fingerprints: dedup.len(),
        collected,
    })
}

fn push_failed(out: &mut String, items: &[FailedItem]) {
    for item in items {
        let _ = writeln!(
            out,
            "  - {} {} [{} attempt(s), {}]: {}",
            item.notice_number,
            item.notice_name.as_deref().unwrap_or(""),
            item.attempts,
            item.timestamp.format("%Y-%m-%d %H:%M"),
            item.reason
        );
    }
}

/// Renders the report as the text `--status` prints
pub fn format_status(report: &StatusReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Crawl Status ===\n");

    let _ = writeln!(out, "Checkpoint:");
    let _ = writeln!(out, "  Status: {}", report.status);
    let _ = writeln!(
        out,
        "  Cursor: page {}, item {}",
        report.cursor.page, report.cursor.item_index
    );
    if let Some(started) = report.started_at {
        let _ = writeln!(out, "  Started: {}", started.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(updated) = report.updated_at {
        let _ = writeln!(out, "  Updated: {}", updated.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    let _ = writeln!(
        out,
        "  Last walk: {} page(s), {} collected, {} skipped, {} failed",
        report.stats.pages_crawled,
        report.stats.collected,
        report.stats.skipped,
        report.stats.failed
    );
    out.push('\n');

    let _ = writeln!(out, "Stores:");
    let _ = writeln!(out, "  Known fingerprints: {}", report.fingerprints);
    match report.collected {
        Some(count) => {
            let _ = writeln!(out, "  Records stored: {}", count);
        }
        None => {
            let _ = writeln!(out, "  Records stored: (no database yet)");
        }
    }
    out.push('\n');

    let _ = writeln!(
        out,
        "Failed items awaiting retry ({}):",
        report.retry_eligible.len()
    );
    push_failed(&mut out, &report.retry_eligible);

    if !report.exhausted.is_empty() {
        let _ = writeln!(
            out,
            "\nFailed items past {} attempt(s), left for inspection ({}):",
            report.max_attempts,
            report.exhausted.len()
        );
        push_failed(&mut out, &report.exhausted);
    }
    out
}

/// Prints the report to stdout
pub fn print_status(report: &StatusReport) {
    print!("{}", format_status(report));
}
