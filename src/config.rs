//! Configuration for partdir
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{PartdirError, Result};
use crate::record::{DeviceIdentity, MAX_DEVICE_NAME_LEN};

/// Upper bound on the directory size when none is configured
pub const DEFAULT_MAX_PARTITIONS: u8 = 10;

/// Main configuration for a partition directory
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Path of the log file backing a `FileStore`
    pub store_path: PathBuf,

    /// Sync strategy: how often to fsync the store log
    pub sync_strategy: SyncStrategy,

    /// Stale log entries tolerated before the file store compacts itself
    pub compact_threshold: usize,

    // -------------------------------------------------------------------------
    // Directory Configuration
    // -------------------------------------------------------------------------
    /// Explicit directory capacity; derived from the static table when unset
    pub max_partitions: Option<u8>,

    // -------------------------------------------------------------------------
    // Static Flash Map
    // -------------------------------------------------------------------------
    /// Statically configured regions, one of which holds the directory itself
    pub static_regions: Vec<StaticRegion>,

    /// Id of the static region that supplies the device identity
    pub base_region_id: u8,
}

/// Store sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

/// One entry of the statically compiled flash map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRegion {
    pub id: u8,
    pub device_id: u8,
    pub device_name: String,
    pub offset: u64,
    pub size: u64,
}

impl StaticRegion {
    pub fn new(id: u8, device_id: u8, device_name: impl Into<String>, offset: u64, size: u64) -> Self {
        Self {
            id,
            device_id,
            device_name: device_name.into(),
            offset,
            size,
        }
    }

    /// Device identity this region lives on
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.device_id, self.device_name.clone())
    }
}

/// Region ids of the default single-flash layout
pub mod region_ids {
    pub const BOOT: u8 = 0;
    pub const IMAGE_0: u8 = 1;
    pub const IMAGE_1: u8 = 2;
    pub const SCRATCH: u8 = 3;
    pub const STORAGE: u8 = 4;
}

/// Default flash layout: bootloader, two image slots, scratch, storage
pub fn default_static_regions() -> Vec<StaticRegion> {
    const DEV: &str = "FLASH_CTRL";
    vec![
        StaticRegion::new(region_ids::BOOT, 0, DEV, 0x0000_0000, 0x0000_C000),
        StaticRegion::new(region_ids::IMAGE_0, 0, DEV, 0x0000_C000, 0x0006_7000),
        StaticRegion::new(region_ids::IMAGE_1, 0, DEV, 0x0007_3000, 0x0006_7000),
        StaticRegion::new(region_ids::SCRATCH, 0, DEV, 0x000D_A000, 0x0001_E000),
        StaticRegion::new(region_ids::STORAGE, 0, DEV, 0x000F_8000, 0x0000_8000),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("./partdir_data/partitions.log"),
            sync_strategy: SyncStrategy::EveryWrite,
            compact_threshold: 256,
            max_partitions: None,
            static_regions: default_static_regions(),
            base_region_id: region_ids::STORAGE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Number of dynamic partitions the directory may hold
    pub fn capacity(&self) -> u8 {
        match self.max_partitions {
            Some(n) => n,
            None => {
                let room = self.static_regions.len().saturating_sub(1);
                room.min(DEFAULT_MAX_PARTITIONS as usize) as u8
            }
        }
    }

    /// The static region holding the directory's own data
    pub fn base_region(&self) -> Result<&StaticRegion> {
        self.static_regions
            .iter()
            .find(|r| r.id == self.base_region_id)
            .ok_or_else(|| {
                PartdirError::Config(format!(
                    "base region {} is not in the static flash map",
                    self.base_region_id
                ))
            })
    }

    /// Check the configuration before a directory is hydrated from it
    ///
    /// The dynamic pool must stay strictly smaller than the static map so the
    /// region that stores the directory never becomes a dynamic entry.
    pub fn validate(&self) -> Result<()> {
        let base = self.base_region()?;

        if base.device_name.len() > MAX_DEVICE_NAME_LEN {
            return Err(PartdirError::Config(format!(
                "device name {:?} exceeds {} bytes",
                base.device_name, MAX_DEVICE_NAME_LEN
            )));
        }

        if self.capacity() == 0 {
            return Err(PartdirError::Config(
                "directory capacity must be at least 1".to_string(),
            ));
        }

        if self.capacity() as usize >= self.static_regions.len() {
            return Err(PartdirError::InvariantViolation(format!(
                "{} dynamic partitions requested but only {} static regions configured",
                self.capacity(),
                self.static_regions.len()
            )));
        }

        if let SyncStrategy::EveryNEntries { count: 0 } = self.sync_strategy {
            return Err(PartdirError::Config(
                "sync interval must be at least 1 entry".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the path of the store log file
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    /// Set the store sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    /// Set how many stale log entries trigger a compaction
    pub fn compact_threshold(mut self, entries: usize) -> Self {
        self.config.compact_threshold = entries;
        self
    }

    /// Set the directory capacity explicitly
    pub fn max_partitions(mut self, count: u8) -> Self {
        self.config.max_partitions = Some(count);
        self
    }

    /// Replace the static flash map
    pub fn static_regions(mut self, regions: Vec<StaticRegion>) -> Self {
        self.config.static_regions = regions;
        self
    }

    /// Select the static region that supplies the device identity
    pub fn base_region_id(mut self, id: u8) -> Self {
        self.config.base_region_id = id;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
