//! Tests for Directory
//!
//! These tests verify:
//! - Lookups by index and by id (bounds, holes, first match wins)
//! - Append ordering, capacity and the monotonic count
//! - Overwrites by index and upserts by id (hole reuse before append)
//! - Delete producing holes without shrinking the count
//! - Hydration from an existing store and boot-time invariants
//! - Duplicate id detection

use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use partdir::slots::{slot_key, Slot, COUNT_KEY};
use partdir::store::{KvStore, MemoryStore};
use partdir::{Config, Directory, PartdirError, PartitionRecord, StaticRegion};

// =============================================================================
// Helper Functions
// =============================================================================

const DEVICE_ID: u8 = 1;
const DEVICE_NAME: &str = "TEST_FLASH";

/// Config with `max` dynamic slots over `max + 1` static regions
fn test_config(max: u8) -> Config {
    let regions = (0..=max)
        .map(|i| StaticRegion::new(200 + i, DEVICE_ID, DEVICE_NAME, 0x10000 * i as u64, 0x10000))
        .collect();

    Config::builder()
        .static_regions(regions)
        .base_region_id(200 + max)
        .max_partitions(max)
        .build()
}

fn setup_directory(max: u8) -> (MemoryStore, Directory<MemoryStore>) {
    let store = MemoryStore::new();
    let directory = Directory::open(store.clone(), &test_config(max)).unwrap();
    (store, directory)
}

fn reopen(store: &MemoryStore, max: u8) -> Directory<MemoryStore> {
    Directory::open(store.clone(), &test_config(max)).unwrap()
}

fn record(id: u8, offset: u64, size: u64) -> PartitionRecord {
    PartitionRecord::new(id, offset, size)
}

// =============================================================================
// Empty Directory Tests
// =============================================================================

#[test]
fn test_empty_directory() {
    let (store, directory) = setup_directory(9);

    assert_eq!(directory.count(), 0);
    assert_eq!(directory.capacity(), 9);
    assert_eq!(directory.occupied(), 0);
    assert!(directory.holes().is_empty());
    assert!(store.is_empty(), "hydration must not write an empty store");
}

#[test]
fn test_empty_directory_lookups_not_found() {
    let (_store, directory) = setup_directory(9);

    assert!(matches!(directory.get_by_index(0), Err(PartdirError::NotFound)));
    assert!(matches!(directory.get_by_id(0), Err(PartdirError::NotFound)));
}

#[test]
fn test_device_identity_from_base_region() {
    let (_store, directory) = setup_directory(4);

    assert_eq!(directory.device().device_id, DEVICE_ID);
    assert_eq!(directory.device().device_name, DEVICE_NAME);
}

// =============================================================================
// Append Tests
// =============================================================================

#[test]
fn test_two_appends_then_lookups() {
    let (_store, mut directory) = setup_directory(9);

    directory.append(record(0, 0xD000, 0x1000)).unwrap();
    directory.append(record(1, 0xE000, 0x1000)).unwrap();

    let first = directory.get_by_index(0).unwrap();
    assert_eq!(first.record(), record(0, 0xD000, 0x1000));
    assert_eq!(first.device_id, DEVICE_ID);
    assert_eq!(first.device_name, DEVICE_NAME);

    let second = directory.get_by_id(1).unwrap();
    assert_eq!(second.record(), record(1, 0xE000, 0x1000));

    assert!(matches!(directory.get_by_index(5), Err(PartdirError::NotFound)));
}

#[test]
fn test_append_returns_new_index_and_grows_count() {
    let (_store, mut directory) = setup_directory(9);

    for i in 0..5u8 {
        let old_count = directory.count();
        let index = directory.append(record(i, 0x1000 * i as u64, 0x1000)).unwrap();

        assert_eq!(index, old_count);
        assert_eq!(directory.count(), old_count + 1);
    }
}

#[test]
fn test_append_round_trip_at_last_index() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(3, 0x100, 0x200)).unwrap();

    let r = record(42, 0xDEAD_0000, 0xBEEF);
    directory.append(r).unwrap();

    let got = directory.get_by_index(directory.count() - 1).unwrap();
    assert_eq!(got.record(), r);
}

#[test]
fn test_append_persists_count_and_record() {
    let (store, mut directory) = setup_directory(9);

    directory.append(record(0, 0xD000, 0x1000)).unwrap();

    assert_eq!(store.get(COUNT_KEY).unwrap(), Some(vec![1]));
    assert!(store.contains_key(&slot_key(0)));
}

#[test]
fn test_append_until_full() {
    let (_store, mut directory) = setup_directory(9);

    for i in 0..9u8 {
        directory.append(record(i, 0x1000 * i as u64, 0x1000)).unwrap();
    }

    let result = directory.append(record(9, 0x9000, 0x1000));

    assert!(matches!(result, Err(PartdirError::Full { capacity: 9 })));
    assert_eq!(directory.count(), 9);
}

#[test]
fn test_full_survives_reopen() {
    let (store, mut directory) = setup_directory(3);
    for i in 0..3u8 {
        directory.append(record(i, 0, 1)).unwrap();
    }
    drop(directory);

    let mut directory = reopen(&store, 3);

    assert_eq!(directory.count(), 3);
    assert!(matches!(directory.append(record(3, 0, 1)), Err(PartdirError::Full { .. })));
}

#[test]
fn test_full_directory_with_holes_still_accepts_upsert() {
    let (_store, mut directory) = setup_directory(2);
    directory.append(record(0, 0, 1)).unwrap();
    directory.append(record(1, 0, 1)).unwrap();
    directory.delete(0).unwrap();

    assert!(matches!(directory.append(record(2, 0, 1)), Err(PartdirError::Full { .. })));
    assert_eq!(directory.upsert_by_id(record(2, 0, 1)).unwrap(), 0);
}

// =============================================================================
// Lookup Tests
// =============================================================================

#[test]
fn test_get_by_index_out_of_range_for_any_state() {
    let (_store, mut directory) = setup_directory(9);

    for i in 0..4u8 {
        directory.append(record(i, 0, 1)).unwrap();
        for index in directory.count()..=u8::MAX {
            assert!(matches!(directory.get_by_index(index), Err(PartdirError::NotFound)));
        }
    }

    directory.delete(1).unwrap();
    for index in directory.count()..=u8::MAX {
        assert!(matches!(directory.get_by_index(index), Err(PartdirError::NotFound)));
    }
}

#[test]
fn test_get_by_id_skips_holes() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(5, 0x100, 0x10)).unwrap();
    directory.append(record(6, 0x200, 0x10)).unwrap();
    directory.delete(0).unwrap();

    assert!(matches!(directory.get_by_id(5), Err(PartdirError::NotFound)));
    assert_eq!(directory.get_by_id(6).unwrap().offset, 0x200);
}

#[test]
fn test_get_by_id_reads_store_not_cache() {
    let (store, mut directory) = setup_directory(9);
    directory.append(record(1, 0x100, 0x10)).unwrap();

    // Out-of-band removal is visible without a reload
    store.delete(&slot_key(0)).unwrap();

    assert!(matches!(directory.get_by_id(1), Err(PartdirError::NotFound)));
    assert!(matches!(directory.get_by_index(0), Err(PartdirError::NotFound)));
}

#[test]
fn test_partitions_lists_occupied_in_order() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(10, 0x100, 0x10)).unwrap();
    directory.append(record(11, 0x200, 0x10)).unwrap();
    directory.append(record(12, 0x300, 0x10)).unwrap();
    directory.delete(1).unwrap();

    let partitions = directory.partitions().unwrap();
    let summary: Vec<(u8, u8)> = partitions.iter().map(|(i, p)| (*i, p.id)).collect();

    assert_eq!(summary, vec![(0, 10), (2, 12)]);
}

// =============================================================================
// Set At Index Tests
// =============================================================================

#[test]
fn test_set_at_index_overwrites() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(0, 0xD000, 0x1000)).unwrap();

    directory.set_at_index(0, record(0, 0x20000, 0x2000)).unwrap();

    assert_eq!(directory.get_by_index(0).unwrap().record(), record(0, 0x20000, 0x2000));
    assert_eq!(directory.count(), 1);
}

#[test]
fn test_set_at_index_cannot_extend() {
    let (store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();

    let result = directory.set_at_index(1, record(1, 0, 1));

    assert!(matches!(result, Err(PartdirError::NotFound)));
    assert_eq!(directory.count(), 1);
    assert!(!store.contains_key(&slot_key(1)));
}

#[test]
fn test_set_at_index_fills_hole() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();
    directory.delete(0).unwrap();

    directory.set_at_index(0, record(7, 0x700, 0x10)).unwrap();

    assert_eq!(directory.get_by_index(0).unwrap().id, 7);
    assert!(directory.holes().is_empty());
}

// =============================================================================
// Upsert Tests
// =============================================================================

#[test]
fn test_upsert_existing_id_overwrites_in_place() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(0, 0xD000, 0x1000)).unwrap();
    directory.append(record(1, 0xE000, 0x1000)).unwrap();

    let index = directory.upsert_by_id(record(0, 0x30000, 0x40000)).unwrap();

    assert_eq!(index, 0);
    assert_eq!(directory.count(), 2);
    assert_eq!(directory.get_by_index(0).unwrap().record(), record(0, 0x30000, 0x40000));
}

#[test]
fn test_upsert_new_id_appends_without_holes() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();

    let index = directory.upsert_by_id(record(5, 0x500, 0x10)).unwrap();

    assert_eq!(index, 1);
    assert_eq!(directory.count(), 2);
}

#[test]
fn test_upsert_prefers_match_over_earlier_hole() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();
    directory.append(record(1, 0, 1)).unwrap();
    directory.delete(0).unwrap();

    let index = directory.upsert_by_id(record(1, 0x100, 0x10)).unwrap();

    assert_eq!(index, 1);
    assert_eq!(directory.holes(), vec![0]);
}

#[test]
fn test_upsert_fills_first_hole() {
    let (_store, mut directory) = setup_directory(9);
    for i in 0..4u8 {
        directory.append(record(i, 0, 1)).unwrap();
    }
    directory.delete(3).unwrap();
    directory.delete(1).unwrap();

    let index = directory.upsert_by_id(record(9, 0x900, 0x10)).unwrap();

    assert_eq!(index, 1);
    assert_eq!(directory.count(), 4);
    assert_eq!(directory.holes(), vec![3]);
}

#[test]
fn test_repeated_delete_insert_does_not_grow_count() {
    let (_store, mut directory) = setup_directory(4);
    directory.append(record(0, 0, 1)).unwrap();
    directory.append(record(1, 0, 1)).unwrap();

    for round in 0..50u8 {
        directory.delete(1).unwrap();
        directory.upsert_by_id(record(100 + round, 0, 1)).unwrap();
    }

    assert_eq!(directory.count(), 2);
    assert_eq!(directory.get_by_index(1).unwrap().id, 149);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_creates_hole_and_keeps_count() {
    let (store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();
    directory.append(record(1, 0, 1)).unwrap();

    directory.delete(0).unwrap();

    assert!(matches!(directory.get_by_index(0), Err(PartdirError::NotFound)));
    assert_eq!(directory.count(), 2);
    assert_eq!(directory.holes(), vec![0]);
    assert_eq!(directory.occupied(), 1);
    assert!(!store.contains_key(&slot_key(0)));
    assert_eq!(store.get(COUNT_KEY).unwrap(), Some(vec![2]));
}

#[test]
fn test_deleted_index_reused_by_upsert_with_fresh_id() {
    let (_store, mut directory) = setup_directory(9);
    for i in 0..3u8 {
        directory.append(record(i, 0, 1)).unwrap();
    }

    directory.delete(1).unwrap();
    let index = directory.upsert_by_id(record(77, 0x7700, 0x100)).unwrap();

    assert_eq!(index, 1);
    assert_eq!(directory.count(), 3);
    assert_eq!(directory.get_by_index(1).unwrap().id, 77);
}

#[test]
fn test_delete_out_of_range_not_found() {
    let (_store, mut directory) = setup_directory(9);
    assert!(matches!(directory.delete(0), Err(PartdirError::NotFound)));
}

#[test]
fn test_delete_hole_is_idempotent() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();

    directory.delete(0).unwrap();
    directory.delete(0).unwrap();

    assert_eq!(directory.count(), 1);
    assert_eq!(directory.holes(), vec![0]);
}

#[test]
fn test_count_never_decreases() {
    let (_store, mut directory) = setup_directory(6);
    let mut counts = vec![directory.count()];

    directory.append(record(1, 0, 1)).unwrap();
    counts.push(directory.count());
    directory.append(record(2, 0, 1)).unwrap();
    counts.push(directory.count());
    directory.delete(0).unwrap();
    counts.push(directory.count());
    directory.upsert_by_id(record(3, 0, 1)).unwrap();
    counts.push(directory.count());
    directory.delete(1).unwrap();
    counts.push(directory.count());
    directory.set_at_index(1, record(4, 0, 1)).unwrap();
    counts.push(directory.count());
    directory.upsert_by_id(record(5, 0, 1)).unwrap();
    counts.push(directory.count());
    directory.delete(2).unwrap();
    counts.push(directory.count());

    assert!(counts.windows(2).all(|w| w[1] >= w[0]), "counts: {:?}", counts);
    assert_eq!(counts, vec![0, 1, 2, 2, 2, 2, 2, 3, 3]);
}

// =============================================================================
// Hydration Tests
// =============================================================================

#[test]
fn test_reopen_restores_state() {
    let (store, mut directory) = setup_directory(9);
    directory.append(record(0, 0xD000, 0x1000)).unwrap();
    directory.append(record(1, 0xE000, 0x1000)).unwrap();
    directory.append(record(2, 0xF000, 0x1000)).unwrap();
    directory.delete(1).unwrap();
    drop(directory);

    let directory = reopen(&store, 9);

    assert_eq!(directory.count(), 3);
    assert_eq!(directory.holes(), vec![1]);
    assert_eq!(directory.slots()[0], (0, Slot::Occupied(record(0, 0xD000, 0x1000))));
    assert_eq!(directory.get_by_id(2).unwrap().offset, 0xF000);
}

#[test]
fn test_hydrate_rejects_count_above_capacity() {
    let store = MemoryStore::new();
    store.put(COUNT_KEY, &[5]).unwrap();

    let result = Directory::open(store, &test_config(4));

    assert!(matches!(result, Err(PartdirError::InvariantViolation(_))));
}

#[test]
fn test_hydrate_surfaces_corrupt_record() {
    let store = MemoryStore::new();
    store.put(COUNT_KEY, &[1]).unwrap();
    store.put(&slot_key(0), &[1, 2, 3]).unwrap();

    let result = Directory::open(store, &test_config(4));

    assert!(matches!(result, Err(PartdirError::CorruptRecord(_))));
}

#[test]
fn test_hydrate_reclaims_stray_records_beyond_count() {
    let (store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();
    drop(directory);

    // Record written without its count (older record-then-count ordering)
    store.put(&slot_key(1), &partdir::record::encode(&record(1, 0, 1))).unwrap();

    let mut directory = reopen(&store, 9);

    assert!(!store.contains_key(&slot_key(1)));
    assert_eq!(directory.count(), 1);
    directory.append(record(2, 0x200, 0x10)).unwrap();
    assert_eq!(directory.get_by_index(1).unwrap().id, 2);
}

#[test]
fn test_reload_picks_up_out_of_band_changes() {
    let (store, mut directory) = setup_directory(9);
    directory.append(record(0, 0, 1)).unwrap();

    store.put(COUNT_KEY, &[2]).unwrap();
    directory.reload().unwrap();

    assert_eq!(directory.count(), 2);
    assert_eq!(directory.holes(), vec![1]);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_open_rejects_capacity_not_below_static_regions() {
    let mut config = test_config(4);
    config.max_partitions = Some(5);

    let result = Directory::open(MemoryStore::new(), &config);

    assert!(matches!(result, Err(PartdirError::InvariantViolation(_))));
}

#[test]
fn test_open_rejects_missing_base_region() {
    let mut config = test_config(4);
    config.base_region_id = 1;

    let result = Directory::open(MemoryStore::new(), &config);

    assert!(matches!(result, Err(PartdirError::Config(_))));
}

#[test]
fn test_open_rejects_long_device_name() {
    let mut config = test_config(4);
    for region in &mut config.static_regions {
        region.device_name = "x".repeat(33);
    }

    let result = Directory::open(MemoryStore::new(), &config);

    assert!(matches!(result, Err(PartdirError::Config(_))));
}

#[test]
fn test_default_config_capacity() {
    let config = Config::default();

    assert_eq!(config.static_regions.len(), 5);
    assert_eq!(config.capacity(), 4);
    config.validate().unwrap();
}

// =============================================================================
// Duplicate Id Tests
// =============================================================================

#[test]
fn test_duplicate_ids_accepted_first_match_wins() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(3, 0x100, 0x10)).unwrap();
    directory.append(record(3, 0x200, 0x10)).unwrap();

    assert_eq!(directory.get_by_id(3).unwrap().offset, 0x100);
    assert_eq!(directory.count(), 2);
}

#[test]
fn test_duplicate_ids_are_flagged() {
    // Duplicate ids are a latent risk: only the lowest index is reachable by id.
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(3, 0x100, 0x10)).unwrap();
    directory.append(record(4, 0x200, 0x10)).unwrap();
    directory.append(record(3, 0x300, 0x10)).unwrap();

    let duplicates = directory.duplicate_ids();

    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates.get(&3), Some(&vec![0, 2]));
}

#[test]
fn test_upsert_updates_only_first_duplicate() {
    let (_store, mut directory) = setup_directory(9);
    directory.append(record(3, 0x100, 0x10)).unwrap();
    directory.append(record(3, 0x200, 0x10)).unwrap();

    directory.upsert_by_id(record(3, 0x900, 0x10)).unwrap();

    assert_eq!(directory.get_by_index(0).unwrap().offset, 0x900);
    assert_eq!(directory.get_by_index(1).unwrap().offset, 0x200);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_shared_directory_behind_external_lock() {
    let (_store, directory) = setup_directory(9);
    let directory = Arc::new(Mutex::new(directory));
    let mut handles = Vec::new();

    for t in 0..3u8 {
        let directory = Arc::clone(&directory);
        handles.push(thread::spawn(move || {
            for i in 0..3u8 {
                let id = t * 10 + i;
                directory.lock().upsert_by_id(record(id, id as u64, 1)).unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let directory = directory.lock();
    assert_eq!(directory.count(), 9);
    assert!(directory.duplicate_ids().is_empty());
    for t in 0..3u8 {
        for i in 0..3u8 {
            assert!(directory.get_by_id(t * 10 + i).is_ok());
        }
    }
}
