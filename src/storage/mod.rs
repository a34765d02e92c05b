//! Storage module for persisting crawl state and records
//!
//! This module handles everything the crawler writes to disk:
//! - The checkpoint (cursor, failed-item queue, status) with atomic replace
//! - The deduplication index of collected fingerprints
//! - The single-writer run lock
//! - The SQLite record store and its JSON/CSV exports

mod atomic;
mod checkpoint;
mod dedup;
mod lock;
mod schema;
mod sink;

pub use atomic::{temp_path, write_atomic};
pub use checkpoint::{CheckpointState, CheckpointStore, CrawlStats, Cursor, FailedItem};
pub use dedup::DedupIndex;
pub use lock::{break_lock, RunLock};
pub use sink::{RecordSink, SqliteSink, CSV_EXPORT, JSON_EXPORT};

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("State directory is locked by another run ({holder}); remove {path} if that run is gone")]
    Locked { path: String, holder: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
