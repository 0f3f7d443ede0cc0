//! Record codec
//!
//! Fixed-size encoding of `PartitionRecord` values.

use crate::error::{PartdirError, Result};
use super::PartitionRecord;

/// Encoded size: Id (1) + Padding (7) + Offset (8) + Size (8)
pub const RECORD_SIZE: usize = 24;

const OFFSET_POS: usize = 8;
const SIZE_POS: usize = 16;

/// Encode a record into its stored form
pub fn encode(record: &PartitionRecord) -> [u8; RECORD_SIZE] {
    let mut buf = [0u8; RECORD_SIZE];
    buf[0] = record.id;
    buf[OFFSET_POS..SIZE_POS].copy_from_slice(&record.offset.to_le_bytes());
    buf[SIZE_POS..RECORD_SIZE].copy_from_slice(&record.size.to_le_bytes());
    buf
}

/// Decode a stored value
///
/// Any length other than `RECORD_SIZE` is a corrupt record. Padding bytes
/// are not inspected.
pub fn decode(bytes: &[u8]) -> Result<PartitionRecord> {
    if bytes.len() != RECORD_SIZE {
        return Err(PartdirError::CorruptRecord(format!(
            "expected {} bytes, got {}",
            RECORD_SIZE,
            bytes.len()
        )));
    }

    let mut offset = [0u8; 8];
    offset.copy_from_slice(&bytes[OFFSET_POS..SIZE_POS]);
    let mut size = [0u8; 8];
    size.copy_from_slice(&bytes[SIZE_POS..RECORD_SIZE]);

    Ok(PartitionRecord {
        id: bytes[0],
        offset: u64::from_le_bytes(offset),
        size: u64::from_le_bytes(size),
    })
}
