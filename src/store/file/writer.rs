//! Log Writer
//!
//! Handles appending entries to the store log file.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::SyncStrategy;
use crate::error::Result;
use super::entry::{LogEntry, LogOp};

/// Appends entries to the store log file
pub struct LogWriter {
    path: PathBuf,
    writer: BufWriter<File>,

    /// LSN the next appended entry receives
    next_lsn: u64,

    sync_strategy: SyncStrategy,

    /// Entries written since the last fsync
    unsynced: usize,
}

impl LogWriter {
    /// Open or create a log file, appending after existing content
    pub fn open(path: &Path, sync_strategy: SyncStrategy, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Create a fresh, empty log file at `path`
    pub fn create(path: &Path, sync_strategy: SyncStrategy, next_lsn: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn,
            sync_strategy,
            unsynced: 0,
        })
    }

    /// Append an operation; returns the LSN it was logged under
    ///
    /// The entry is handed to the OS before returning and fsynced according
    /// to the sync strategy. If any of that fails the file is cut back to its
    /// length before the call, so a failed append never reappears on replay.
    pub fn append(&mut self, op: LogOp) -> Result<u64> {
        let lsn = self.next_lsn;
        let bytes = LogEntry::new(lsn, op).serialize()?;
        let start = self.writer.get_ref().metadata()?.len();

        if let Err(e) = self.write_entry(&bytes) {
            if let Err(rollback) = self.rollback(start) {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "failed to roll back store log after append error"
                );
            }
            return Err(e);
        }

        self.next_lsn += 1;
        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.unsynced = 0;
        Ok(())
    }

    /// Move the log file to `to`, keeping this writer attached to it
    ///
    /// The containing directory is fsynced so the rename survives power loss.
    pub fn rename(&mut self, to: &Path) -> Result<()> {
        self.sync()?;
        fs::rename(&self.path, to)?;
        sync_parent_dir(to)?;
        self.path = to.to_path_buf();
        Ok(())
    }

    pub fn set_sync_strategy(&mut self, sync_strategy: SyncStrategy) {
        self.sync_strategy = sync_strategy;
    }

    /// LSN the next appended entry receives
    pub fn next_lsn(&self) -> u64 {
        self.next_lsn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sync_strategy(&self) -> SyncStrategy {
        self.sync_strategy
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn write_entry(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer.write_all(bytes)?;
        self.writer.flush()?;
        self.unsynced += 1;

        let due = match self.sync_strategy {
            SyncStrategy::EveryWrite => true,
            SyncStrategy::EveryNEntries { count } => self.unsynced >= count,
        };
        if due {
            self.sync()?;
        }
        Ok(())
    }

    /// Discard whatever a failed append left buffered or on disk
    fn rollback(&mut self, len: u64) -> Result<()> {
        let file = OpenOptions::new().append(true).open(&self.path)?;
        let failed = std::mem::replace(&mut self.writer, BufWriter::new(file));
        // into_parts hands back the file without flushing the stale buffer
        let (_file, _unwritten) = failed.into_parts();

        let file = self.writer.get_ref();
        file.set_len(len)?;
        file.sync_data()?;
        Ok(())
    }
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> Result<()> {
    Ok(())
}
