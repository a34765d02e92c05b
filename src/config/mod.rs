//! Configuration module for Notice-Sweep
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use notice_sweep::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Listing: {}", config.site.list_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, RetryConfig, SchedulerConfig, SiteConfig, SiteLayout,
    StateConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;

use std::path::PathBuf;
use std::time::Duration;

impl Config {
    /// Path of the checkpoint document
    pub fn checkpoint_path(&self) -> PathBuf {
        PathBuf::from(&self.state.directory).join(&self.state.checkpoint_file)
    }

    /// Path of the deduplication index document
    pub fn dedup_path(&self) -> PathBuf {
        PathBuf::from(&self.state.directory).join(&self.state.dedup_file)
    }

    /// Path of the single-writer lock file
    pub fn lock_path(&self) -> PathBuf {
        PathBuf::from(&self.state.directory).join(".run.lock")
    }

    /// Path of the SQLite record store
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(&self.output.directory).join(&self.output.database_file)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.crawler.navigation_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.crawler.element_timeout_ms)
    }

    /// Returns true if the given export format is enabled
    pub fn exports(&self, format: &str) -> bool {
        self.output
            .formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}
