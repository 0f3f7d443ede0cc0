//! Shadow cache implementation

use std::collections::BTreeMap;

use crate::slots::Slot;

/// In-memory mirror of the claimed count and slot states
#[derive(Debug, Clone)]
pub struct ShadowCache {
    count: u8,

    /// One entry per possible index; only `[0, count)` is meaningful
    slots: Vec<Slot>,
}

impl ShadowCache {
    /// Create an empty cache for a directory of `capacity` slots
    pub fn new(capacity: u8) -> Self {
        Self {
            count: 0,
            slots: vec![Slot::Hole; capacity as usize],
        }
    }

    pub fn count(&self) -> u8 {
        self.count
    }

    pub fn capacity(&self) -> u8 {
        self.slots.len() as u8
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() <= self.count as usize
    }

    /// Whether `index` is inside the claimed range
    pub fn contains(&self, index: u8) -> bool {
        index < self.count
    }

    /// Record a committed count; newly claimed indices start as holes
    pub fn set_count(&mut self, count: u8) {
        let count = count.min(self.capacity());
        for index in self.count..count {
            self.slots[index as usize] = Slot::Hole;
        }
        self.count = count;
    }

    /// Record a committed slot state
    pub fn set_slot(&mut self, index: u8, slot: Slot) {
        if let Some(entry) = self.slots.get_mut(index as usize) {
            *entry = slot;
        }
    }

    /// Claimed indices with their cached state, ascending
    pub fn claimed(&self) -> impl Iterator<Item = (u8, Slot)> + '_ {
        self.slots
            .iter()
            .take(self.count as usize)
            .enumerate()
            .map(|(i, slot)| (i as u8, *slot))
    }

    /// Number of claimed indices holding a record
    pub fn occupied(&self) -> usize {
        self.claimed().filter(|(_, slot)| !slot.is_hole()).count()
    }

    /// Claimed indices that are holes, ascending
    pub fn holes(&self) -> Vec<u8> {
        self.claimed()
            .filter(|(_, slot)| slot.is_hole())
            .map(|(i, _)| i)
            .collect()
    }

    /// Index of another claimed slot caching a record with `id`
    pub fn other_index_with_id(&self, index: u8, id: u8) -> Option<u8> {
        self.claimed()
            .find(|(i, slot)| *i != index && slot.record().map(|r| r.id) == Some(id))
            .map(|(i, _)| i)
    }

    /// Ids cached at more than one index, with those indices
    pub fn duplicate_ids(&self) -> BTreeMap<u8, Vec<u8>> {
        let mut by_id: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
        for (index, slot) in self.claimed() {
            if let Some(record) = slot.record() {
                by_id.entry(record.id).or_default().push(index);
            }
        }
        by_id.retain(|_, indices| indices.len() > 1);
        by_id
    }
}
