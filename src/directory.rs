//! Directory Module
//!
//! The public partition directory API, composed from the slot directory
//! and the shadow cache.
//!
//! ## Responsibilities
//! - Hydrate the shadow cache from the store at startup
//! - Serve lookups by index and by id
//! - Order store writes so an interrupted append leaves a hole, never a
//!   lost record
//! - Heal holes by reusing them before growing the count

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::cache::ShadowCache;
use crate::config::Config;
use crate::error::{PartdirError, Result};
use crate::record::{DeviceIdentity, Partition, PartitionRecord};
use crate::slots::{Slot, SlotDirectory, SlotRead};
use crate::store::{FileStore, KvStore};

/// The dynamic partition directory
///
/// ## Concurrency Model: Single Writer
///
/// - **Writes** (`append`, `upsert_by_id`, `set_at_index`, `delete`) take
///   `&mut self`, so one owner serializes them.
/// - **Reads** take `&self`.
/// - There is no internal lock. Sharing a directory between threads means
///   wrapping the whole value in one mutex.
///
/// ## Durability Ordering
/// Every write reaches the store before the shadow cache. `append` persists
/// `count + 1` before the new record: a crash between the two leaves a
/// claimed hole that the next `upsert_by_id` fills.
pub struct Directory<S> {
    /// Store-level view of the index space
    slots: SlotDirectory<S>,

    /// RAM mirror of committed count and slot states
    cache: ShadowCache,

    /// Identity stamped onto every returned partition
    device: DeviceIdentity,
}

impl<S: KvStore> Directory<S> {
    /// Hydrate a directory from `store`
    ///
    /// On startup:
    /// 1. Validate the configuration and pick up the base region identity
    /// 2. Read the persisted count and check it against the capacity
    ///    (which `validate` keeps below the static region count)
    /// 3. Resolve every claimed index into the shadow cache
    /// 4. Reclaim stray records stored beyond the count
    pub fn open(store: S, config: &Config) -> Result<Self> {
        config.validate()?;
        let device = config.base_region()?.identity();

        let mut directory = Self {
            slots: SlotDirectory::new(store),
            cache: ShadowCache::new(config.capacity()),
            device,
        };
        directory.hydrate()?;

        Ok(directory)
    }

    /// Rebuild the shadow cache from the store
    ///
    /// Needed only when the store was modified behind the directory's back.
    pub fn reload(&mut self) -> Result<()> {
        self.hydrate()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Partition at `index`
    ///
    /// `NotFound` if the index is not claimed or is a hole.
    pub fn get_by_index(&self, index: u8) -> Result<Partition> {
        if !self.cache.contains(index) {
            return Err(PartdirError::NotFound);
        }

        match self.slots.read_slot_within(index, self.cache.count())? {
            SlotRead::Occupied(record) => Ok(self.stamp(record)),
            SlotRead::Hole | SlotRead::OutOfRange => Err(PartdirError::NotFound),
        }
    }

    /// First partition (by ascending index) whose id is `id`
    pub fn get_by_id(&self, id: u8) -> Result<Partition> {
        self.find_index(id)?
            .map(|(_, record)| self.stamp(record))
            .ok_or(PartdirError::NotFound)
    }

    /// All committed partitions with their indices, ascending
    pub fn partitions(&self) -> Result<Vec<(u8, Partition)>> {
        let count = self.cache.count();
        let mut partitions = Vec::with_capacity(count as usize);

        for index in 0..count {
            if let SlotRead::Occupied(record) = self.slots.read_slot_within(index, count)? {
                partitions.push((index, self.stamp(record)));
            }
        }

        Ok(partitions)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Overwrite the slot at `index`, hole or not
    ///
    /// Never extends the directory: `NotFound` if `index >= count`.
    pub fn set_at_index(&mut self, index: u8, record: PartitionRecord) -> Result<()> {
        if !self.cache.contains(index) {
            return Err(PartdirError::NotFound);
        }

        self.commit_slot(index, record)
    }

    /// Write `record` over the partition with the same id
    ///
    /// Falls back to the first hole in the claimed range, then to `append`.
    /// Returns the index written.
    pub fn upsert_by_id(&mut self, record: PartitionRecord) -> Result<u8> {
        let count = self.cache.count();
        let mut first_hole = None;

        for index in 0..count {
            match self.slots.read_slot_within(index, count)? {
                SlotRead::Occupied(existing) if existing.id == record.id => {
                    self.commit_slot(index, record)?;
                    return Ok(index);
                }
                SlotRead::Hole if first_hole.is_none() => first_hole = Some(index),
                _ => {}
            }
        }

        match first_hole {
            Some(index) => {
                debug!(index, id = record.id, "filling hole");
                self.commit_slot(index, record)?;
                Ok(index)
            }
            None => self.append(record),
        }
    }

    /// Claim a new index at the end of the directory and store `record`
    ///
    /// Steps:
    /// 1. Persist `count + 1`
    /// 2. Persist the record at index `count`
    ///
    /// If step 2 never completes the index stays claimed as a hole.
    /// Returns the new index, or `Full` at capacity.
    pub fn append(&mut self, record: PartitionRecord) -> Result<u8> {
        if self.cache.is_full() {
            return Err(PartdirError::Full {
                capacity: self.cache.capacity(),
            });
        }

        let index = self.cache.count();

        // Step 1: claim the index
        self.slots.write_count(index + 1)?;
        self.cache.set_count(index + 1);

        // Step 2: commit the record
        self.commit_slot(index, record)?;

        debug!(index, id = record.id, count = index + 1, "appended partition");
        Ok(index)
    }

    /// Remove the record at `index`, leaving a hole
    ///
    /// The count never shrinks.
    pub fn delete(&mut self, index: u8) -> Result<()> {
        if !self.cache.contains(index) {
            return Err(PartdirError::NotFound);
        }

        self.slots.clear_slot(index)?;
        self.cache.set_slot(index, Slot::Hole);

        debug!(index, "deleted partition");
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of claimed indices (holes included)
    pub fn count(&self) -> u8 {
        self.cache.count()
    }

    /// Maximum number of claimed indices
    pub fn capacity(&self) -> u8 {
        self.cache.capacity()
    }

    /// Claimed indices holding a record, per the shadow cache
    pub fn occupied(&self) -> usize {
        self.cache.occupied()
    }

    /// Claimed indices without a record, per the shadow cache
    pub fn holes(&self) -> Vec<u8> {
        self.cache.holes()
    }

    /// Cached state of every claimed index
    pub fn slots(&self) -> Vec<(u8, Slot)> {
        self.cache.claimed().collect()
    }

    /// Identity stamped onto returned partitions
    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Ids stored at more than one index, with those indices
    ///
    /// Duplicates are accepted (lookups return the lowest index), but they
    /// usually mean a caller appended where it meant to upsert.
    pub fn duplicate_ids(&self) -> BTreeMap<u8, Vec<u8>> {
        self.cache.duplicate_ids()
    }

    pub fn store(&self) -> &S {
        self.slots.store()
    }

    /// Give up the directory and return the underlying store
    pub fn into_store(self) -> S {
        self.slots.into_store()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn hydrate(&mut self) -> Result<()> {
        let capacity = self.cache.capacity();
        let count = self.slots.read_count()?;

        if count > capacity {
            return Err(PartdirError::InvariantViolation(format!(
                "persisted count {} exceeds directory capacity {}",
                count, capacity
            )));
        }

        let mut cache = ShadowCache::new(capacity);
        cache.set_count(count);

        for index in 0..count {
            match self.slots.read_slot_within(index, count)? {
                SlotRead::Occupied(record) => cache.set_slot(index, Slot::Occupied(record)),
                SlotRead::Hole => {
                    debug!(index, "claimed index is a hole");
                }
                SlotRead::OutOfRange => {}
            }
        }

        // Nothing may live beyond the count; an older write ordering could
        // leave a record there, and a later append would resurrect it.
        for index in count..capacity {
            if self.slots.slot_exists(index)? {
                warn!(index, count, "reclaiming stray record beyond claimed range");
                self.slots.clear_slot(index)?;
            }
        }

        self.cache = cache;

        info!(
            count,
            occupied = self.cache.occupied(),
            holes = self.cache.holes().len(),
            capacity,
            "partition directory hydrated"
        );
        Ok(())
    }

    /// Write a record to the store, then mirror it in the cache
    fn commit_slot(&mut self, index: u8, record: PartitionRecord) -> Result<()> {
        self.slots.write_slot(index, &record)?;
        self.cache.set_slot(index, Slot::Occupied(record));

        if let Some(other) = self.cache.other_index_with_id(index, record.id) {
            warn!(
                id = record.id,
                index,
                other,
                "partition id stored at more than one index"
            );
        }

        Ok(())
    }

    /// First claimed index holding a record with `id`
    fn find_index(&self, id: u8) -> Result<Option<(u8, PartitionRecord)>> {
        let count = self.cache.count();

        for index in 0..count {
            if let SlotRead::Occupied(record) = self.slots.read_slot_within(index, count)? {
                if record.id == id {
                    return Ok(Some((index, record)));
                }
            }
        }

        Ok(None)
    }

    fn stamp(&self, record: PartitionRecord) -> Partition {
        Partition::stamped(record, &self.device)
    }
}

impl Directory<FileStore> {
    /// Open the file store described by `config` and hydrate from it
    pub fn open_file(config: &Config) -> Result<Self> {
        let store = FileStore::open_with_config(config)?;
        Self::open(store, config)
    }
}
