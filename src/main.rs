//! Notice-Sweep main entry point
//!
//! This is the command-line interface for the Notice-Sweep notice collector.

use anyhow::{Context, Result};
use clap::Parser;
use notice_sweep::config::{load_config_with_hash, Config};
use notice_sweep::crawler::{run_normal_crawl, run_retry_failed, run_scheduled, RunOptions, StartMode};
use notice_sweep::output::{load_status, print_status, print_summary};
use notice_sweep::storage::{break_lock, CheckpointStore, DedupIndex};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Exit code after a run stopped by Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// Notice-Sweep: a resumable procurement-notice collector
///
/// Notice-Sweep walks the paginated notice list of a procurement site,
/// opens each new notice's detail, modal and contact popup, and stores the
/// merged records. Interrupted runs resume where they stopped, and failed
/// notices can be retried on their own.
#[derive(Parser, Debug)]
#[command(name = "notice-sweep")]
#[command(version)]
#[command(about = "A resumable procurement-notice collector", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "notice-sweep.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Explicit log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", conflicts_with_all = ["verbose", "quiet"])]
    log_level: Option<String>,

    /// Start a fresh walk from page 1 (failed queue and dedup index are kept)
    #[arg(long)]
    fresh: bool,

    /// Retry the queued failed items instead of walking the list
    #[arg(long, conflicts_with_all = ["fresh", "scheduled"])]
    retry_failed: bool,

    /// Repeat the normal crawl every `interval-minutes` until interrupted
    #[arg(long)]
    scheduled: bool,

    /// Validate config and show what would run without starting a browser
    #[arg(long)]
    dry_run: bool,

    /// Show checkpoint, failed queue and store counts, then exit
    #[arg(long, conflicts_with_all = ["dry_run", "retry_failed", "scheduled"])]
    status: bool,

    /// Delete the checkpoint (cursor and failed queue) before starting
    ///
    /// The crawl then starts at page 1. Combined with --reset-dedup or
    /// --break-lock the program exits after the maintenance instead.
    #[arg(long, conflicts_with_all = ["retry_failed", "status", "dry_run"])]
    clear_checkpoint: bool,

    /// Forget every collected fingerprint, then exit
    #[arg(long)]
    reset_dedup: bool,

    /// Remove a lock left behind by a run that no longer exists, then exit
    #[arg(long)]
    break_lock: bool,

    /// Override `[crawler] max-pages`
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override `[crawler] max-items`
    #[arg(long, value_name = "N")]
    max_items: Option<u32>,

    /// Override `[output] directory`
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

impl Cli {
    /// Lock and dedup maintenance run alone; a cleared checkpoint is followed by the crawl
    fn exits_after_maintenance(&self) -> bool {
        self.break_lock || self.reset_dedup
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet, cli.log_level.as_deref());

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", &config_hash[..12]);

    apply_overrides(&mut config, &cli);

    if cli.break_lock || cli.clear_checkpoint || cli.reset_dedup {
        handle_maintenance(&config, &cli)?;
        if cli.exits_after_maintenance() {
            return Ok(ExitCode::SUCCESS);
        }
    }
    if cli.status {
        print_status(&load_status(&config)?);
        return Ok(ExitCode::SUCCESS);
    }
    if cli.dry_run {
        handle_dry_run(&config, &cli);
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let interrupted = if cli.retry_failed {
        let summary = run_retry_failed(&config, cancel).await?;
        print_summary("Retry Summary", &summary);
        summary.interrupted
    } else if cli.scheduled {
        let summaries = run_scheduled(&config, Some(&config_hash), cancel.clone()).await;
        if let Some(last) = summaries.last() {
            print_summary("Last Scheduled Run", last);
        }
        cancel.is_cancelled()
    } else {
        let options = RunOptions {
            mode: if cli.fresh {
                StartMode::Fresh
            } else {
                StartMode::Resume
            },
            config_hash: Some(config_hash),
            cancel,
        };
        let summary = run_normal_crawl(&config, options).await?;
        print_summary("Crawl Summary", &summary);
        summary.interrupted
    };

    Ok(if interrupted {
        ExitCode::from(EXIT_INTERRUPTED)
    } else {
        ExitCode::SUCCESS
    })
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` wins over the flags when it is set.
fn setup_logging(verbose: u8, quiet: bool, level: Option<&str>) {
    let filter = if let Ok(filter) = EnvFilter::try_from_default_env() {
        filter
    } else if let Some(level) = level {
        EnvFilter::new(format!("notice_sweep={},warn", level.to_lowercase()))
    } else if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("notice_sweep=info,warn"),
            1 => EnvFilter::new("notice_sweep=debug,info"),
            2 => EnvFilter::new("notice_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = max_pages;
    }
    if let Some(max_items) = cli.max_items {
        config.crawler.max_items = max_items;
    }
    if let Some(dir) = &cli.output_dir {
        config.output.directory = dir.display().to_string();
    }
}

/// Cancels the run on the first Ctrl-C; a second one exits immediately
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        tracing::warn!("Interrupt received, finishing the current item and saving progress");
        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::error!("Second interrupt, exiting without saving");
            std::process::exit(i32::from(EXIT_INTERRUPTED));
        }
    });
}

/// Handles --break-lock, --clear-checkpoint and --reset-dedup
fn handle_maintenance(config: &Config, cli: &Cli) -> Result<()> {
    if cli.break_lock {
        if break_lock(&config.lock_path())? {
            println!("✓ Removed lock {}", config.lock_path().display());
        } else {
            println!("No lock at {}", config.lock_path().display());
        }
    }
    if cli.clear_checkpoint {
        if CheckpointStore::new(config.checkpoint_path()).clear()? {
            println!("✓ Cleared checkpoint {}", config.checkpoint_path().display());
        } else {
            println!("No checkpoint at {}", config.checkpoint_path().display());
        }
    }
    if cli.reset_dedup {
        let mut dedup = DedupIndex::load(config.dedup_path());
        let forgotten = dedup.len();
        dedup.reset()?;
        println!("✓ Forgot {} fingerprint(s)", forgotten);
    }
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &Config, cli: &Cli) {
    println!("=== Notice-Sweep Dry Run ===\n");

    println!("Site:");
    println!("  List URL: {}", config.site.list_url);
    println!("  Reachability check: {}", config.site.reachability_check);
    println!("  Headless browser: {}", config.site.headless);

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", cap(config.crawler.max_pages));
    println!("  Max items: {}", cap(config.crawler.max_items));
    println!(
        "  Timeouts: navigation {}ms, element {}ms",
        config.crawler.navigation_timeout_ms, config.crawler.element_timeout_ms
    );
    println!(
        "  Transient retries: {}, dismissal attempts: {}",
        config.crawler.transient_retries, config.crawler.dismiss_attempts
    );
    if !config.crawler.required_fields.is_empty() {
        println!(
            "  Required fields: {}",
            config.crawler.required_fields.join(", ")
        );
    }
    println!("  Retry bound: {} attempt(s)", config.retry.max_attempts);

    println!("\nState:");
    println!("  Checkpoint: {}", config.checkpoint_path().display());
    println!("  Dedup index: {}", config.dedup_path().display());

    println!("\nOutput:");
    println!("  Database: {}", config.database_path().display());
    println!("  Formats: {}", config.output.formats.join(", "));

    let state = CheckpointStore::new(config.checkpoint_path()).load();
    let dedup = DedupIndex::load(config.dedup_path());

    println!("\n✓ Configuration is valid");
    if cli.retry_failed {
        println!(
            "✓ Would retry {} failed item(s)",
            state.retry_eligible(config.retry.max_attempts).len()
        );
    } else if !cli.fresh && state.status.resumes_at_cursor() {
        println!(
            "✓ Would resume at page {}, item {} ({} known fingerprints)",
            state.cursor.page,
            state.cursor.item_index,
            dedup.len()
        );
    } else {
        println!(
            "✓ Would walk from page 1 ({} known fingerprints)",
            dedup.len()
        );
    }
    if cli.scheduled {
        println!(
            "✓ Would repeat every {} minute(s)",
            config.scheduler.interval_minutes
        );
    }
}

fn cap(value: u32) -> String {
    if value == 0 {
        "unlimited".to_string()
    } else {
        value.to_string()
    }
}
