//! Log Recovery
//!
//! Rebuilds store contents by replaying the log after a restart or crash.

use std::fs::OpenOptions;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use super::entry::LogEntry;
use super::reader::{LogReader, ReadOutcome};

/// Handles log recovery after crash
pub struct LogRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether the log was truncated (partial write removed)
    pub was_truncated: bool,

    /// Length of the valid prefix of the log in bytes
    pub valid_len: u64,
}

impl LogRecovery {
    /// Recover entries from a log file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Skip entries that fail their CRC
    /// 3. Truncate a partial write at the end
    /// 4. Return all valid entries in order
    ///
    /// An entry header that cannot be a partial write fails with
    /// `StoreCorruption` and leaves the file untouched.
    pub fn recover(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult)> {
        let (entries, mut result, torn) = Self::scan(path)?;

        if torn {
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            result.was_truncated = true;
            warn!(
                path = %path.display(),
                valid_len = result.valid_len,
                "truncated partial write at end of store log"
            );
        }

        Ok((entries, result))
    }

    /// Verify integrity of a log file without modifying it
    ///
    /// `was_truncated` reports whether `recover` would cut a torn tail.
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        let (_, mut result, torn) = Self::scan(path)?;
        result.was_truncated = torn;
        Ok(result)
    }

    fn scan(path: &Path) -> Result<(Vec<LogEntry>, RecoveryResult, bool)> {
        let mut reader = LogReader::open(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();

        let torn = loop {
            match reader.next_entry()? {
                ReadOutcome::Entry(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = result.last_lsn.max(entry.lsn);
                    entries.push(entry);
                }
                ReadOutcome::Corrupt { lsn } => {
                    result.entries_corrupted += 1;
                    warn!(lsn, "skipping corrupted store log entry");
                }
                ReadOutcome::TornTail => break true,
                ReadOutcome::End => break false,
            }
        };

        result.valid_len = reader.position();
        debug!(
            recovered = result.entries_recovered,
            corrupted = result.entries_corrupted,
            last_lsn = result.last_lsn,
            torn,
            "scanned store log"
        );

        Ok((entries, result, torn))
    }
}
