//! Notice-Sweep: a resumable procurement-notice collector
//!
//! This crate walks the paginated notice listing of a JavaScript-rendered
//! procurement site, opens each notice's nested detail views to reach deeply
//! embedded fields, and persists the resulting records so that an
//! interrupted session can resume without re-collecting anything.

pub mod config;
pub mod crawler;
pub mod extract;
pub mod navigation;
pub mod output;
pub mod record;
pub mod state;
pub mod storage;

use thiserror::Error;

/// Main error type for Notice-Sweep operations
///
/// Only run-level failures surface as `SweepError`. Per-item problems are
/// caught at the item boundary and recorded in the failed-item queue.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Navigation error: {0}")]
    Navigation(#[from] NavError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Fatal: {0}")]
    Fatal(String),

    #[error("Invalid deep-crawl transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::DeepCrawlState,
        to: state::DeepCrawlState,
    },
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },
}

/// Errors reported by a navigation backend
///
/// Timeouts and missing elements are transient: the page may simply not
/// have finished rendering. Everything else is treated as persistent.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavError {
    #[error("Timed out after {waited_ms}ms waiting for '{locator}'")]
    Timeout { locator: String, waited_ms: u64 },

    #[error("Element not found: '{0}'")]
    ElementNotFound(String),

    #[error("Navigation failed: {0}")]
    Failed(String),
}

impl NavError {
    /// Returns true if retrying the same step in place may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ElementNotFound(_))
    }
}

/// Result type alias for Notice-Sweep operations
pub type Result<T> = std::result::Result<T, SweepError>;

/// Result type alias for navigation operations
pub type NavResult<T> = std::result::Result<T, NavError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{run_normal_crawl, run_retry_failed, RunOptions, RunSummary, StartMode};
pub use record::{Fingerprint, NoticeField, Record};
pub use state::{CrawlStatus, DeepCrawlState};
