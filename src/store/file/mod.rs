//! File Store
//!
//! Durable key-value store backed by an append-only log.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────┐
//! │ Entry 1                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Op     │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! ├─────────────────────────────────────────┤
//! │ Entry 2                                 │
//! │ ┌─────────┬─────────┬────────┬────────┐ │
//! │ │ LSN (8) │ CRC (4) │Len (4) │ Op     │ │
//! │ └─────────┴─────────┴────────┴────────┘ │
//! └─────────────────────────────────────────┘
//! ```
//!
//! `Op` is the bincode encoding of a `LogOp`. On open the log is replayed
//! into an in-memory index (last operation per key wins); a torn tail is
//! truncated and CRC failures are skipped. Every write is a single entry,
//! which makes each key update atomic.

mod entry;
mod reader;
mod recovery;
mod writer;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{Config, SyncStrategy};
use crate::error::Result;
use super::KvStore;

pub use entry::{LogEntry, LogOp, HEADER_SIZE};
pub use recovery::{LogRecovery, RecoveryResult};
use writer::LogWriter;

/// Log-structured file store
///
/// ## Concurrency:
/// - Writes are serialized by the `log` mutex (writer + entry accounting)
/// - Reads only take the `index` read lock
/// - Lock order is always `log` → `index`
pub struct FileStore {
    log: Mutex<LogState>,

    /// Live contents: key → value
    index: RwLock<BTreeMap<String, Vec<u8>>>,

    /// Stale entries tolerated before compaction (0 disables it)
    compact_threshold: usize,

    /// What replay found when the store was opened
    recovery: RecoveryResult,
}

struct LogState {
    writer: LogWriter,

    /// Entries physically present in the log, live or not
    entries: usize,
}

impl FileStore {
    /// Open or create a store log at `path`
    ///
    /// On startup:
    /// 1. Create the parent directory if needed
    /// 2. Replay the log (truncating a torn tail)
    /// 3. Reopen the log for appending after the last valid entry
    pub fn open(path: &Path, sync_strategy: SyncStrategy, compact_threshold: usize) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut index = BTreeMap::new();
        let recovery = if path.exists() {
            let (entries, result) = LogRecovery::recover(path)?;
            for entry in entries {
                match entry.op {
                    LogOp::Put { key, value } => {
                        index.insert(key, value);
                    }
                    LogOp::Delete { key } => {
                        index.remove(&key);
                    }
                }
            }
            if result.entries_recovered > 0 || result.entries_corrupted > 0 {
                info!(
                    path = %path.display(),
                    recovered = result.entries_recovered,
                    corrupted = result.entries_corrupted,
                    last_lsn = result.last_lsn,
                    live_keys = index.len(),
                    "store log replayed"
                );
            }
            result
        } else {
            RecoveryResult::default()
        };

        let writer = LogWriter::open(path, sync_strategy, recovery.last_lsn + 1)?;
        let entries = (recovery.entries_recovered + recovery.entries_corrupted) as usize;

        Ok(Self {
            log: Mutex::new(LogState { writer, entries }),
            index: RwLock::new(index),
            compact_threshold,
            recovery,
        })
    }

    /// Open the store described by `config`
    pub fn open_with_config(config: &Config) -> Result<Self> {
        Self::open(&config.store_path, config.sync_strategy, config.compact_threshold)
    }

    /// Rewrite the log so it holds exactly one entry per live key
    ///
    /// The compacted log is written to a sibling file, synced, then renamed
    /// over the live log, so a crash leaves either the old or the new log.
    /// Compactions triggered by writes log their failures instead of
    /// failing the write; this call reports them.
    pub fn compact(&self) -> Result<()> {
        let mut log = self.log.lock();
        self.compact_locked(&mut log)
    }

    /// Force buffered entries to disk
    pub fn sync(&self) -> Result<()> {
        self.log.lock().writer.sync()
    }

    /// Statistics from the replay performed at open
    pub fn recovery(&self) -> &RecoveryResult {
        &self.recovery
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Entries in the log that no longer hold a live value
    pub fn stale_entries(&self) -> usize {
        let log = self.log.lock();
        log.entries.saturating_sub(self.index.read().len())
    }

    /// All live keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        self.index.read().keys().cloned().collect()
    }

    pub fn path(&self) -> PathBuf {
        self.log.lock().writer.path().to_path_buf()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn apply(&self, op: LogOp) -> Result<()> {
        let mut log = self.log.lock();
        log.writer.append(op.clone())?;
        log.entries += 1;

        {
            let mut index = self.index.write();
            match op {
                LogOp::Put { key, value } => {
                    index.insert(key, value);
                }
                LogOp::Delete { key } => {
                    index.remove(&key);
                }
            }
        }

        // The write above is durable; a failed compaction only leaves the
        // log longer than it needs to be.
        let stale = log.entries.saturating_sub(self.index.read().len());
        if self.compact_threshold > 0 && stale > self.compact_threshold {
            if let Err(e) = self.compact_locked(&mut log) {
                warn!(stale, error = %e, "store log compaction failed");
            }
        }

        Ok(())
    }

    fn compact_locked(&self, log: &mut LogState) -> Result<()> {
        let path = log.writer.path().to_path_buf();
        let tmp_path = path.with_extension("compact");
        let before = log.entries;

        let snapshot: Vec<(String, Vec<u8>)> = self
            .index
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let bulk = SyncStrategy::EveryNEntries { count: usize::MAX };
        let mut compacted = LogWriter::create(&tmp_path, bulk, log.writer.next_lsn())?;
        for (key, value) in &snapshot {
            compacted.append(LogOp::Put {
                key: key.clone(),
                value: value.clone(),
            })?;
        }

        log.writer.sync()?;
        compacted.rename(&path)?;
        compacted.set_sync_strategy(log.writer.sync_strategy());

        log.writer = compacted;
        log.entries = snapshot.len();

        debug!(
            path = %path.display(),
            before,
            after = log.entries,
            "compacted store log"
        );
        Ok(())
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.index.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        self.apply(LogOp::Put {
            key: key.to_string(),
            value: value.to_vec(),
        })
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.apply(LogOp::Delete {
            key: key.to_string(),
        })
    }
}
