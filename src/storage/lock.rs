//! Single-writer run lock
//!
//! Only one process may mutate a state directory at a time. The lock is a
//! file created exclusively at run start and removed when the guard drops.

use crate::storage::{StorageError, StorageResult};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Guard holding the run lock
#[derive(Debug)]
pub struct RunLock {
    path: PathBuf,
}

impl RunLock {
    /// Takes the lock, failing with `StorageError::Locked` if another run holds it
    pub fn acquire(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let holder = fs::read_to_string(&path)
                    .unwrap_or_default()
                    .trim()
                    .replace('\n', ", ");
                return Err(StorageError::Locked {
                    path: path.display().to_string(),
                    holder,
                });
            }
            Err(e) => return Err(e.into()),
        };

        writeln!(file, "pid={}", std::process::id())?;
        writeln!(file, "started_at={}", Utc::now().to_rfc3339())?;
        debug!(path = %path.display(), "Run lock acquired");

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RunLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), "Failed to release run lock: {}", e);
        } else {
            debug!(path = %self.path.display(), "Run lock released");
        }
    }
}

/// Removes a stale lock left by a crashed run; returns false if there was none
pub fn break_lock(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path) {
        Ok(()) => {
            info!(path = %path.display(), "Removed stale run lock");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_acquire_is_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".run.lock");

        let lock = RunLock::acquire(&path).unwrap();
        match RunLock::acquire(&path) {
            Err(StorageError::Locked { holder, .. }) => {
                assert!(holder.contains(&format!("pid={}", std::process::id())));
            }
            other => panic!("expected Locked, got {:?}", other),
        }

        drop(lock);
        assert!(!path.exists());
        assert!(RunLock::acquire(&path).is_ok());
    }

    #[test]
    fn test_break_lock() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".run.lock");
        fs::write(&path, "pid=1\n").unwrap();

        assert!(break_lock(&path).unwrap());
        assert!(!break_lock(&path).unwrap());
        assert!(RunLock::acquire(&path).is_ok());
    }
}
