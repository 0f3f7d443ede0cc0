//! Slot directory implementation
//!
//! Store-level reads and writes of the count and per-index records.

use crate::error::{PartdirError, Result};
use crate::record::{self, PartitionRecord};
use crate::store::KvStore;
use super::{slot_key, SlotRead, COUNT_KEY};

/// Translates between the claimed index space and store keys
///
/// Holds no state of its own: every call goes to the store.
pub struct SlotDirectory<S> {
    store: S,
}

impl<S: KvStore> SlotDirectory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Persisted count; an uninitialized directory is empty, not an error
    pub fn read_count(&self) -> Result<u8> {
        match self.store.get(COUNT_KEY)? {
            None => Ok(0),
            Some(bytes) => match bytes.as_slice() {
                [count] => Ok(*count),
                other => Err(PartdirError::CorruptRecord(format!(
                    "{}: expected 1 byte, got {}",
                    COUNT_KEY,
                    other.len()
                ))),
            },
        }
    }

    /// Resolve `index` against the persisted count
    pub fn read_slot(&self, index: u8) -> Result<SlotRead> {
        let count = self.read_count()?;
        self.read_slot_within(index, count)
    }

    /// Resolve `index` against a count the caller already knows
    pub fn read_slot_within(&self, index: u8, count: u8) -> Result<SlotRead> {
        if index >= count {
            return Ok(SlotRead::OutOfRange);
        }

        match self.read_raw_slot(index)? {
            Some(record) => Ok(SlotRead::Occupied(record)),
            None => Ok(SlotRead::Hole),
        }
    }

    /// Read the record stored under `index` without a range check
    pub fn read_raw_slot(&self, index: u8) -> Result<Option<PartitionRecord>> {
        let key = slot_key(index);
        match self.store.get(&key)? {
            None => Ok(None),
            Some(bytes) => record::decode(&bytes).map(Some).map_err(|e| match e {
                PartdirError::CorruptRecord(msg) => {
                    PartdirError::CorruptRecord(format!("{}: {}", key, msg))
                }
                other => other,
            }),
        }
    }

    /// Whether anything is stored under `index`'s key, well-formed or not
    pub fn slot_exists(&self, index: u8) -> Result<bool> {
        Ok(self.store.get(&slot_key(index))?.is_some())
    }

    /// Overwrite the record at `index`
    ///
    /// No range check: the caller must own the index (`index < count`) or be
    /// in the middle of extending the count.
    pub fn write_slot(&self, index: u8, record: &PartitionRecord) -> Result<()> {
        self.store.put(&slot_key(index), &record::encode(record))
    }

    /// Overwrite the persisted count
    pub fn write_count(&self, count: u8) -> Result<()> {
        self.store.put(COUNT_KEY, &[count])
    }

    /// Remove the record at `index`, leaving a hole if the index is claimed
    pub fn clear_slot(&self, index: u8) -> Result<()> {
        self.store.delete(&slot_key(index))
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }
}
