//! Crawler module for collecting notices
//!
//! This module contains the crawl orchestration core:
//! - The list walk with resume, caps and early exit (`CrawlOrchestrator`)
//! - The per-item deep crawl through detail, modal and popup (`DeepCrawler`)
//! - The search-based replay of failed items (`RetryCoordinator`)
//! - Scheduled repetition of the normal crawl
//!
//! `run_normal_crawl` and `run_retry_failed` are the entry points. They
//! take the run lock, check the site, launch the browser and open the
//! stores; the orchestrator and retry coordinator themselves only see a
//! `NavigationCapability` and a `CrawlStores`.

mod coordinator;
mod deep_crawl;
mod retry;
mod scheduler;
mod stores;
mod summary;

pub use coordinator::CrawlOrchestrator;
pub use deep_crawl::{build_record, DeepCrawler, ItemFailure};
pub use retry::{RetryCoordinator, SEARCH_SOURCE_PAGE};
pub use scheduler::run_scheduled;
pub use stores::CrawlStores;
pub use summary::RunSummary;

use crate::config::Config;
use crate::navigation::{check_reachable, ChromeNavigator};
use crate::storage::RunLock;
use crate::{Result, SweepError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Where a normal crawl starts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StartMode {
    /// Continue an interrupted walk at its cursor, or start over if the last
    /// walk completed
    #[default]
    Resume,
    /// Start at page 1; the failed queue and dedup index are kept
    Fresh,
}

/// Per-run inputs besides the configuration
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub mode: StartMode,
    /// Digest of the configuration file, stored in the checkpoint
    pub config_hash: Option<String>,
    pub cancel: CancellationToken,
}

/// Sleeps for `millis` unless cancelled first; returns false on cancellation
pub(crate) async fn pause(cancel: &CancellationToken, millis: u64) -> bool {
    if millis == 0 {
        return !cancel.is_cancelled();
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(Duration::from_millis(millis)) => true,
    }
}

/// Takes the lock and checks the site; nothing is touched if this fails
async fn start_run(config: &Config) -> Result<RunLock> {
    let lock = RunLock::acquire(config.lock_path())?;

    if config.site.reachability_check {
        check_reachable(&config.site.list_url, config.navigation_timeout())
            .await
            .map_err(|e| SweepError::Fatal(format!("Site check failed: {}", e)))?;
    }
    Ok(lock)
}

fn launch_browser(config: &Config) -> Result<ChromeNavigator> {
    ChromeNavigator::launch(
        config.site.headless,
        config.navigation_timeout(),
        config.element_timeout(),
    )
    .map_err(|e| SweepError::Fatal(format!("Browser unavailable: {}", e)))
}

/// Walks the notice list, collecting every notice not seen before
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `options` - Start mode, configuration digest and cancellation token
///
/// # Returns
///
/// * `Ok(RunSummary)` - The walk ended (completed, capped or interrupted)
/// * `Err(SweepError)` - A run-level failure; item failures never end up here
pub async fn run_normal_crawl(config: &Config, options: RunOptions) -> Result<RunSummary> {
    let _lock = start_run(config).await?;
    let mut browser = launch_browser(config)?;
    let mut stores = CrawlStores::open(config)?;

    info!(list = %config.site.list_url, mode = ?options.mode, "Normal crawl starting");
    CrawlOrchestrator::new(config, &mut browser, &mut stores, options.cancel)
        .run(options.mode, options.config_hash.as_deref())
        .await
}

/// Re-collects queued failures through the site's search
///
/// Leaves the pagination cursor untouched, so a following normal crawl
/// resumes exactly where it would have.
pub async fn run_retry_failed(config: &Config, cancel: CancellationToken) -> Result<RunSummary> {
    let _lock = start_run(config).await?;
    let mut stores = CrawlStores::open(config)?;

    let max_attempts = config.retry.max_attempts;
    if stores.state.retry_eligible(max_attempts).is_empty() {
        info!("No failed items eligible for retry");
        return Ok(RunSummary {
            retry_exhausted: stores.state.exhausted(max_attempts).len() as u64,
            ..Default::default()
        });
    }

    let mut browser = launch_browser(config)?;
    info!(list = %config.site.list_url, "Retry run starting");
    RetryCoordinator::new(config, &mut browser, &mut stores, cancel)
        .run()
        .await
}
