//! Persisted set of fingerprints of collected notices

use crate::record::Fingerprint;
use crate::storage::atomic::write_atomic;
use crate::storage::checkpoint::set_aside;
use crate::storage::StorageResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Serialize)]
struct DedupDocument<'a> {
    fingerprints: Vec<&'a Fingerprint>,
}

/// Accepted on-disk shapes: the current document or a bare array
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredDedup {
    Document { fingerprints: Vec<Fingerprint> },
    Bare(Vec<Fingerprint>),
}

/// The deduplication index
///
/// Fingerprints are only ever added; `reset` is the one way to forget them.
#[derive(Debug)]
pub struct DedupIndex {
    path: PathBuf,
    seen: HashSet<Fingerprint>,
    dirty: bool,
}

impl DedupIndex {
    /// Loads the index from `path`, starting empty if it is absent or unreadable
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<StoredDedup>(&content) {
                Ok(StoredDedup::Document { fingerprints }) | Ok(StoredDedup::Bare(fingerprints)) => {
                    fingerprints.into_iter().collect()
                }
                Err(e) => {
                    warn!(path = %path.display(), "Dedup index is corrupt, starting empty: {}", e);
                    set_aside(&path);
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                warn!(path = %path.display(), "Failed to read dedup index: {}", e);
                HashSet::new()
            }
        };

        info!(entries = seen.len(), "Loaded dedup index");
        Self {
            path,
            seen,
            dirty: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.contains(fingerprint)
    }

    /// Adds a fingerprint; returns false if it was already present
    pub fn insert(&mut self, fingerprint: Fingerprint) -> bool {
        let added = self.seen.insert(fingerprint);
        self.dirty |= added;
        added
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Atomically writes the index if it changed since the last save
    pub fn save(&mut self) -> StorageResult<()> {
        if !self.dirty && self.path.exists() {
            return Ok(());
        }

        let mut fingerprints: Vec<&Fingerprint> = self.seen.iter().collect();
        fingerprints.sort();
        let json = serde_json::to_vec_pretty(&DedupDocument { fingerprints })?;
        write_atomic(&self.path, &json)?;

        self.dirty = false;
        debug!(entries = self.seen.len(), "Dedup index saved");
        Ok(())
    }

    /// Forgets every fingerprint and deletes the file
    pub fn reset(&mut self) -> StorageResult<()> {
        self.seen.clear();
        self.dirty = false;
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        info!(path = %self.path.display(), "Dedup index reset");
        Ok(())
    }
}
