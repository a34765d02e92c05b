//! Checkpoint document and its store
//!
//! The checkpoint holds the pagination cursor, the failed-item queue, the
//! crawl status and running counters. It is rewritten atomically after
//! every page and every item outcome.

use crate::state::CrawlStatus;
use crate::storage::atomic::write_atomic;
use crate::storage::StorageResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Position of the orchestrator in the list walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// 1-based list page being processed
    pub page: u32,
    /// Number of candidates on `page` already handled
    #[serde(default)]
    pub item_index: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            page: 1,
            item_index: 0,
        }
    }
}

/// A notice whose collection failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    #[serde(rename = "id")]
    pub notice_number: String,
    #[serde(default)]
    pub notice_name: Option<String>,
    pub reason: String,
    pub attempts: u32,
    pub timestamp: DateTime<Utc>,
}

/// Running counters of the crawl
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlStats {
    pub pages_crawled: u64,
    pub collected: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// The persisted checkpoint document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointState {
    pub status: CrawlStatus,
    pub cursor: Cursor,
    pub failed_items: Vec<FailedItem>,
    pub stats: CrawlStats,
    pub config_hash: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CheckpointState {
    /// Records a failure, bumping the attempt count if the item is already queued
    ///
    /// Returns the item's attempt count after this failure.
    pub fn record_failure(
        &mut self,
        notice_number: &str,
        notice_name: Option<&str>,
        reason: &str,
    ) -> u32 {
        let now = Utc::now();
        if let Some(item) = self
            .failed_items
            .iter_mut()
            .find(|item| item.notice_number == notice_number)
        {
            item.attempts += 1;
            item.reason = reason.to_string();
            item.timestamp = now;
            if let Some(name) = notice_name {
                item.notice_name = Some(name.to_string());
            }
            return item.attempts;
        }

        self.failed_items.push(FailedItem {
            notice_number: notice_number.to_string(),
            notice_name: notice_name.map(str::to_string),
            reason: reason.to_string(),
            attempts: 1,
            timestamp: now,
        });
        1
    }

    /// Removes an item from the failed queue
    pub fn remove_failed(&mut self, notice_number: &str) -> Option<FailedItem> {
        let position = self
            .failed_items
            .iter()
            .position(|item| item.notice_number == notice_number)?;
        Some(self.failed_items.remove(position))
    }

    pub fn is_failed(&self, notice_number: &str) -> bool {
        self.failed_items
            .iter()
            .any(|item| item.notice_number == notice_number)
    }

    /// Failed items a retry run should still attempt
    pub fn retry_eligible(&self, max_attempts: u32) -> Vec<FailedItem> {
        self.failed_items
            .iter()
            .filter(|item| item.attempts <= max_attempts)
            .cloned()
            .collect()
    }

    /// Failed items left for manual inspection
    pub fn exhausted(&self, max_attempts: u32) -> Vec<&FailedItem> {
        self.failed_items
            .iter()
            .filter(|item| item.attempts > max_attempts)
            .collect()
    }

    /// Starts a walk at page 1, keeping the failed queue
    pub fn restart(&mut self, config_hash: Option<&str>) {
        let now = Utc::now();
        self.status = CrawlStatus::InProgress;
        self.cursor = Cursor::default();
        self.stats = CrawlStats::default();
        self.config_hash = config_hash.map(str::to_string);
        self.started_at = Some(now);
        self.updated_at = Some(now);
        self.finished_at = None;
    }

    /// Continues a walk at the saved cursor
    pub fn resume(&mut self, config_hash: Option<&str>) {
        if let (Some(saved), Some(current)) = (self.config_hash.as_deref(), config_hash) {
            if saved != current {
                warn!("Configuration changed since the checkpoint was written");
            }
        }
        self.status = CrawlStatus::InProgress;
        self.config_hash = config_hash.map(str::to_string).or(self.config_hash.take());
        self.started_at.get_or_insert_with(Utc::now);
        self.updated_at = Some(Utc::now());
        self.finished_at = None;
    }

    /// Sets the status, stamping `finished_at` for terminal statuses
    pub fn mark(&mut self, status: CrawlStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = Some(now);
        if matches!(
            status,
            CrawlStatus::Completed | CrawlStatus::Failed | CrawlStatus::Paused
        ) {
            self.finished_at = Some(now);
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }
}

/// Loads and saves the checkpoint document
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Loads the checkpoint, falling back to an empty one
    ///
    /// This never fails: a missing file is a first run, and an unreadable
    /// one is moved aside to `<file>.corrupt` with a warning.
    pub fn load(&self) -> CheckpointState {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No checkpoint found");
                return CheckpointState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Failed to read checkpoint: {}", e);
                return CheckpointState::default();
            }
        };

        match serde_json::from_str::<CheckpointState>(&content) {
            Ok(state) => {
                info!(
                    page = state.cursor.page,
                    failed = state.failed_items.len(),
                    status = %state.status,
                    "Loaded checkpoint"
                );
                state
            }
            Err(e) => {
                warn!(path = %self.path.display(), "Checkpoint is corrupt, starting empty: {}", e);
                set_aside(&self.path);
                CheckpointState::default()
            }
        }
    }

    /// Atomically replaces the saved checkpoint
    pub fn save(&self, state: &CheckpointState) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(state)?;
        write_atomic(&self.path, &json)?;
        debug!(page = state.cursor.page, item = state.cursor.item_index, "Checkpoint saved");
        Ok(())
    }

    /// Deletes the checkpoint; returns false if there was none
    pub fn clear(&self) -> StorageResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!(path = %self.path.display(), "Checkpoint cleared");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// Renames an unreadable state document to `<file>.corrupt`
pub(crate) fn set_aside(path: &Path) {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    if let Err(e) = fs::rename(path, PathBuf::from(name)) {
        warn!(path = %path.display(), "Failed to set corrupt file aside: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::atomic::temp_path;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("crawler_checkpoint.json"))
    }

    #[test]
    fn test_load_missing_returns_empty() {
        let dir = TempDir::new().unwrap();
        let state = store(&dir).load();
        assert_eq!(state, CheckpointState::default());
        assert_eq!(state.cursor.page, 1);
        assert_eq!(state.status, CrawlStatus::Initialized);
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut state = CheckpointState::default();
        state.restart(Some("abc"));
        state.cursor = Cursor {
            page: 4,
            item_index: 7,
        };
        state.record_failure("2024-005", Some("Road Repair"), "modal never opened");
        store.save(&state).unwrap();

        let loaded = store.load();
        assert_eq!(loaded, state);
        assert_eq!(loaded.status, CrawlStatus::InProgress);
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut state = CheckpointState::default();
        state.record_failure("2024-005", None, "timeout");
        store.save(&state).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(value["cursor"]["page"], 1);
        let item = &value["failed_items"][0];
        assert_eq!(item["id"], "2024-005");
        assert_eq!(item["reason"], "timeout");
        assert_eq!(item["attempts"], 1);
        assert!(item["timestamp"].is_string());
    }

    #[test]
    fn test_interrupted_save_keeps_previous_state() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let mut first = CheckpointState::default();
        first.cursor.page = 3;
        store.save(&first).unwrap();

        // Simulate a crash mid-write: a half-written temp file is left behind
        fs::write(temp_path(store.path()), b"{\"cursor\": {\"pa").unwrap();
        assert_eq!(store.load().cursor.page, 3);

        // And a write that fails outright
        fs::remove_file(temp_path(store.path())).unwrap();
        fs::create_dir(temp_path(store.path())).unwrap();
        let mut second = first.clone();
        second.cursor.page = 9;
        assert!(store.save(&second).is_err());

        assert_eq!(store.load().cursor.page, 3);
    }

    #[test]
    fn test_corrupt_checkpoint_is_set_aside() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(store.path(), "not json").unwrap();

        let state = store.load();
        assert_eq!(state, CheckpointState::default());
        assert!(!store.exists());
        assert!(dir.path().join("crawler_checkpoint.json.corrupt").exists());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.save(&CheckpointState::default()).unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.exists());
        assert!(!store.clear().unwrap());
    }

    #[test]
    fn test_failure_queue_bookkeeping() {
        let mut state = CheckpointState::default();
        assert_eq!(state.record_failure("A", None, "timeout"), 1);
        assert_eq!(state.record_failure("B", Some("Bridge"), "popup"), 1);
        assert_eq!(state.record_failure("A", Some("Alley"), "modal"), 2);

        assert_eq!(state.failed_items.len(), 2);
        assert_eq!(state.failed_items[0].notice_number, "A");
        assert_eq!(state.failed_items[0].reason, "modal");
        assert_eq!(state.failed_items[0].notice_name.as_deref(), Some("Alley"));

        assert_eq!(state.retry_eligible(1).len(), 1);
        assert_eq!(state.exhausted(1).len(), 1);

        let removed = state.remove_failed("A").unwrap();
        assert_eq!(removed.attempts, 2);
        assert!(!state.is_failed("A"));
        assert!(state.is_failed("B"));
        assert!(state.remove_failed("A").is_none());
    }

    #[test]
    fn test_restart_keeps_failed_queue() {
        let mut state = CheckpointState::default();
        state.cursor.page = 12;
        state.stats.collected = 40;
        state.record_failure("A", None, "timeout");
        state.mark(CrawlStatus::Completed);

        state.restart(None);
        assert_eq!(state.cursor, Cursor::default());
        assert_eq!(state.stats, CrawlStats::default());
        assert_eq!(state.failed_items.len(), 1);
        assert_eq!(state.status, CrawlStatus::InProgress);
        assert!(state.finished_at.is_none());
    }

    #[test]
    fn test_loads_older_documents_with_missing_keys() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        fs::write(
            store.path(),
            r#"{"cursor": {"page": 5}, "failed_items": [{"id": "X", "reason": "r", "attempts": 2, "timestamp": "2024-05-01T00:00:00Z"}]}"#,
        )
        .unwrap();

        let state = store.load();
        assert_eq!(state.cursor.page, 5);
        assert_eq!(state.cursor.item_index, 0);
        assert_eq!(state.failed_items[0].attempts, 2);
        assert_eq!(state.status, CrawlStatus::Initialized);
    }
}
