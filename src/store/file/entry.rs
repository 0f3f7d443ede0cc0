//! Log entry definitions
//!
//! Defines the structure of individual store log entries.

use serde::{Deserialize, Serialize};

use crate::error::{PartdirError, Result};

/// Header size: LSN (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// Largest payload a well-formed entry can carry
pub(crate) const MAX_PAYLOAD_SIZE: u32 = 1024 * 1024;

/// A single entry in the store log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The key-level operation this entry records
    pub op: LogOp,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogOp {
    /// Store a value under a key
    Put { key: String, value: Vec<u8> },

    /// Remove a key
    Delete { key: String },
}

impl LogEntry {
    pub fn new(lsn: u64, op: LogOp) -> Self {
        Self { lsn, op }
    }

    /// Serialize to `[lsn][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = bincode::serialize(&self.op)?;
        if payload.len() > MAX_PAYLOAD_SIZE as usize {
            return Err(PartdirError::Store(format!(
                "log payload too large: {} bytes (max {})",
                payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }

        let crc = crc32fast::hash(&payload);

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&self.lsn.to_le_bytes());
        bytes.extend_from_slice(&crc.to_le_bytes());
        bytes.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Deserialize a full entry (header + payload), verifying the CRC
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let header = EntryHeader::parse(bytes)?;
        let payload = bytes.get(HEADER_SIZE..).unwrap_or_default();

        if payload.len() != header.len as usize {
            return Err(PartdirError::StoreCorruption(format!(
                "entry {} declares {} payload bytes, found {}",
                header.lsn,
                header.len,
                payload.len()
            )));
        }

        Self::from_parts(&header, payload)
    }

    /// Build an entry from an already parsed header and its payload
    pub(crate) fn from_parts(header: &EntryHeader, payload: &[u8]) -> Result<Self> {
        let actual = crc32fast::hash(payload);
        if actual != header.crc {
            return Err(PartdirError::StoreCorruption(format!(
                "CRC mismatch in entry {}: stored {:#010x}, computed {:#010x}",
                header.lsn, header.crc, actual
            )));
        }

        let op: LogOp = bincode::deserialize(payload)?;
        Ok(Self { lsn: header.lsn, op })
    }
}

/// Fixed-size prefix of every entry
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryHeader {
    pub lsn: u64,
    pub crc: u32,
    pub len: u32,
}

impl EntryHeader {
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(PartdirError::StoreCorruption(format!(
                "incomplete entry header: expected {} bytes, got {}",
                HEADER_SIZE,
                bytes.len()
            )));
        }

        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);

        Ok(Self {
            lsn: u64::from_le_bytes(lsn),
            crc: u32::from_le_bytes(crc),
            len: u32::from_le_bytes(len),
        })
    }
}
