//! Slot Directory Module
//!
//! Maps the dense index space `[0, count)` onto store keys.
//!
//! ## Key Layout
//! ```text
//! partitions/cnt   → count (1 byte)
//! partitions/0     → record (24 bytes)
//! partitions/1     → record (24 bytes)
//! ...
//! partitions/N-1   → record (24 bytes)
//! ```
//!
//! An index below `count` whose key is missing is a *hole*: it was claimed
//! but holds no committed record (deleted, or an append was interrupted).

mod table;

pub use table::SlotDirectory;

use crate::record::PartitionRecord;

/// Key holding the number of claimed indices
pub const COUNT_KEY: &str = "partitions/cnt";

/// Prefix shared by all per-index record keys
pub const SLOT_KEY_PREFIX: &str = "partitions/";

/// Store key for the record at `index`
pub fn slot_key(index: u8) -> String {
    format!("{}{}", SLOT_KEY_PREFIX, index)
}

/// State of a claimed index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// A committed record
    Occupied(PartitionRecord),

    /// Claimed by `count` but no record committed
    Hole,
}

impl Slot {
    pub fn record(&self) -> Option<&PartitionRecord> {
        match self {
            Slot::Occupied(record) => Some(record),
            Slot::Hole => None,
        }
    }

    pub fn is_hole(&self) -> bool {
        matches!(self, Slot::Hole)
    }
}

/// Result of resolving an index against the claimed range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotRead {
    Occupied(PartitionRecord),
    Hole,
    /// `index >= count`
    OutOfRange,
}

impl SlotRead {
    /// The claimed slot, or `None` when out of range
    pub fn slot(self) -> Option<Slot> {
        match self {
            SlotRead::Occupied(record) => Some(Slot::Occupied(record)),
            SlotRead::Hole => Some(Slot::Hole),
            SlotRead::OutOfRange => None,
        }
    }
}
