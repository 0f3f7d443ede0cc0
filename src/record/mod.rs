//! Record Module
//!
//! Partition descriptors as stored and as handed to callers.
//!
//! ## Stored Layout (24 bytes, little endian)
//! ```text
//! ┌────────┬──────────────┬──────────────┬──────────────┐
//! │ Id (1) │ Padding (7)  │ Offset (8)   │  Size (8)    │
//! └────────┴──────────────┴──────────────┴──────────────┘
//! ```
//!
//! Device identity is kept once per directory and stamped onto records on
//! the way out; it is never part of the stored value.

mod codec;

pub use codec::{decode, encode, RECORD_SIZE};

/// Longest device name accepted from the static base region
pub const MAX_DEVICE_NAME_LEN: usize = 32;

/// One named contiguous byte range, as persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionRecord {
    /// Partition identifier (uniqueness is a convention)
    pub id: u8,

    /// Start offset from the beginning of the flash device
    pub offset: u64,

    /// Total size in bytes
    pub size: u64,
}

impl PartitionRecord {
    pub fn new(id: u8, offset: u64, size: u64) -> Self {
        Self { id, offset, size }
    }

    /// First byte past the end of the range
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }
}

/// Identity of the flash device the directory describes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub device_id: u8,
    pub device_name: String,
}

impl DeviceIdentity {
    pub fn new(device_id: u8, device_name: impl Into<String>) -> Self {
        Self {
            device_id,
            device_name: device_name.into(),
        }
    }
}

/// A partition record stamped with its device identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub id: u8,
    pub offset: u64,
    pub size: u64,
    pub device_id: u8,
    pub device_name: String,
}

impl Partition {
    /// Stamp `record` with `device`
    pub fn stamped(record: PartitionRecord, device: &DeviceIdentity) -> Self {
        Self {
            id: record.id,
            offset: record.offset,
            size: record.size,
            device_id: device.device_id,
            device_name: device.device_name.clone(),
        }
    }

    /// The persisted part of this partition
    pub fn record(&self) -> PartitionRecord {
        PartitionRecord::new(self.id, self.offset, self.size)
    }
}
