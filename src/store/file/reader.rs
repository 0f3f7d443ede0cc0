//! Log Reader
//!
//! Handles reading entries from the store log file.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::{PartdirError, Result};
use super::entry::{EntryHeader, LogEntry, HEADER_SIZE, MAX_PAYLOAD_SIZE};

/// What the reader found at its current position
#[derive(Debug)]
pub enum ReadOutcome {
    /// A well-formed entry
    Entry(LogEntry),

    /// A complete entry whose CRC or payload did not check out; skipped
    Corrupt { lsn: u64 },

    /// The file ends inside an entry (interrupted append)
    TornTail,

    /// Clean end of file
    End,
}

/// Reads entries from the store log sequentially
pub struct LogReader {
    reader: BufReader<File>,

    /// Offset of the first byte not yet consumed
    position: u64,
}

impl LogReader {
    /// Open a log file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Offset just past the last entry consumed
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Read the next entry from the log
    ///
    /// The position only advances over complete entries, so after a
    /// `TornTail` it marks where the valid prefix ends. A header whose
    /// length is out of range is `StoreCorruption`, not a torn tail.
    pub fn next_entry(&mut self) -> Result<ReadOutcome> {
        let mut header_buf = [0u8; HEADER_SIZE];
        let filled = read_full(&mut self.reader, &mut header_buf)?;
        if filled == 0 {
            return Ok(ReadOutcome::End);
        }
        if filled < HEADER_SIZE {
            return Ok(ReadOutcome::TornTail);
        }

        let header = EntryHeader::parse(&header_buf)?;
        if header.len > MAX_PAYLOAD_SIZE {
            // An interrupted append never leaves a complete header with an
            // impossible length, and nothing after it can be located.
            return Err(PartdirError::StoreCorruption(format!(
                "entry at offset {} declares {} payload bytes (max {})",
                self.position, header.len, MAX_PAYLOAD_SIZE
            )));
        }

        let mut payload = vec![0u8; header.len as usize];
        let filled = read_full(&mut self.reader, &mut payload)?;
        if filled < payload.len() {
            return Ok(ReadOutcome::TornTail);
        }

        self.position += (HEADER_SIZE + payload.len()) as u64;

        match LogEntry::from_parts(&header, &payload) {
            Ok(entry) => Ok(ReadOutcome::Entry(entry)),
            Err(_) => Ok(ReadOutcome::Corrupt { lsn: header.lsn }),
        }
    }
}

/// Fill `buf` as far as the file allows; returns bytes read
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
