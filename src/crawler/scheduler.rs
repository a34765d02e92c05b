//! Scheduled mode
//!
//! Repeats a resumable normal crawl every `interval-minutes` until the run
//! is cancelled. A failed run is logged and the schedule carries on.

use crate::config::Config;
use crate::crawler::{run_normal_crawl, RunOptions, RunSummary, StartMode};
use chrono::Local;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Runs normal crawls on a fixed interval until `cancel` fires
///
/// Returns the summaries of every run that finished.
pub async fn run_scheduled(
    config: &Config,
    config_hash: Option<&str>,
    cancel: CancellationToken,
) -> Vec<RunSummary> {
    let interval = Duration::from_secs(config.scheduler.interval_minutes.max(1) * 60);
    info!(
        interval_minutes = config.scheduler.interval_minutes,
        "Scheduler started"
    );

    let mut summaries = Vec::new();
    let mut run_number = 0u64;

    loop {
        run_number += 1;
        let started = Instant::now();
        info!(run = run_number, "Scheduled run starting");

        let options = RunOptions {
            mode: StartMode::Resume,
            config_hash: config_hash.map(str::to_string),
            cancel: cancel.clone(),
        };
        match run_normal_crawl(config, options).await {
            Ok(summary) => {
                info!(run = run_number, "Scheduled run finished: {}", summary);
                let interrupted = summary.interrupted;
                summaries.push(summary);
                if interrupted {
                    break;
                }
            }
            Err(e) => error!(run = run_number, "Scheduled run failed: {}", e),
        }

        if cancel.is_cancelled() {
            break;
        }

        let next_start = started + interval;
        let next_local = Local::now()
            + chrono::Duration::from_std(next_start.saturating_duration_since(Instant::now()))
                .unwrap_or_else(|_| chrono::Duration::zero());
        info!("Next run at {}", next_local.format("%Y-%m-%d %H:%M:%S"));

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep_until(next_start) => {}
        }
    }

    info!(runs = summaries.len(), "Scheduler stopped");
    summaries
}
