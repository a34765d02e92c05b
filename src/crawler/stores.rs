use crate::config::Config;
use crate::record::{Fingerprint, Record};
use crate::storage::{
    CheckpointState, CheckpointStore, DedupIndex, RecordSink, SqliteSink, StorageResult,
};
use crate::Result;
use tracing::debug;

/// Everything a run persists, opened at start and flushed at the end
///
/// Passed explicitly into the orchestrator and the retry coordinator; the
/// two never hold it at the same time.
pub struct CrawlStores {
    checkpoint: CheckpointStore,
    pub state: CheckpointState,
    pub dedup: DedupIndex,
    pub sink: Box<dyn RecordSink + Send>,
    save_interval: u32,
    unsaved_outcomes: u32,
    export_json: bool,
    export_csv: bool,
}

impl CrawlStores {
    /// Loads the checkpoint and dedup index and opens the SQLite record store
    pub fn open(config: &Config) -> Result<Self> {
        let sink = SqliteSink::open(&config.database_path(), &config.output.directory)?;
        Ok(Self::with_sink(config, Box::new(sink)))
    }

    /// Loads the checkpoint and dedup index around an existing sink
    pub fn with_sink(config: &Config, sink: Box<dyn RecordSink + Send>) -> Self {
        let checkpoint = CheckpointStore::new(config.checkpoint_path());
        let state = checkpoint.load();
        let dedup = DedupIndex::load(config.dedup_path());
        debug!(fingerprints = dedup.len(), "Dedup index loaded");

        Self {
            checkpoint,
            state,
            dedup,
            sink,
            save_interval: config.state.save_interval.max(1),
            unsaved_outcomes: 0,
            export_json: config.exports("json"),
            export_csv: config.exports("csv"),
        }
    }

    /// Persists a collected record and indexes `fingerprint`
    ///
    /// `fingerprint` is the key the dedup gate checked for this item, taken
    /// from the list row rather than the merged record. The record reaches
    /// the sink before the fingerprint is indexed, so a crash in between
    /// re-collects the notice rather than losing it.
    pub fn commit(&mut self, record: &Record, fingerprint: Fingerprint) -> StorageResult<()> {
        self.sink.append(record)?;
        self.dedup.insert(fingerprint);
        Ok(())
    }

    /// Writes the checkpoint and any new fingerprints now
    pub fn save(&mut self) -> Result<()> {
        self.state.touch();
        self.checkpoint.save(&self.state)?;
        self.dedup.save()?;
        self.unsaved_outcomes = 0;
        Ok(())
    }

    /// Counts an item outcome, saving once `save-interval` outcomes have piled up
    pub fn outcome_recorded(&mut self) -> Result<()> {
        self.unsaved_outcomes += 1;
        if self.unsaved_outcomes >= self.save_interval {
            self.save()?;
        }
        Ok(())
    }

    /// Saves state and writes the configured exports
    pub fn flush(&mut self) -> Result<()> {
        self.save()?;
        if self.export_json {
            self.sink.flush_to_json()?;
        }
        if self.export_csv {
            self.sink.flush_to_csv()?;
        }
        Ok(())
    }
}
