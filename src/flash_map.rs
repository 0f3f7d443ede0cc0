//! Flash Map
//!
//! Region lookup over the static flash map and the dynamic directory.
//! A dynamic partition overrides the static region that shares its id.

use std::collections::BTreeMap;

use crate::config::{Config, StaticRegion};
use crate::directory::Directory;
use crate::error::{PartdirError, Result};
use crate::record::Partition;
use crate::store::KvStore;

/// Where a resolved area came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AreaSource {
    /// The dynamic directory, with the index it was found at
    Dynamic { index: u8 },

    /// The statically compiled map
    Static,
}

/// A resolved flash area
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashArea {
    pub source: AreaSource,
    pub partition: Partition,
}

impl From<&StaticRegion> for Partition {
    fn from(region: &StaticRegion) -> Self {
        Partition {
            id: region.id,
            offset: region.offset,
            size: region.size,
            device_id: region.device_id,
            device_name: region.device_name.clone(),
        }
    }
}

/// Static regions plus the dynamic directory layered over them
pub struct FlashMap<S> {
    directory: Directory<S>,
    static_regions: Vec<StaticRegion>,
}

impl<S: KvStore> FlashMap<S> {
    /// Hydrate the directory from `store` and attach the static map from `config`
    pub fn open(store: S, config: &Config) -> Result<Self> {
        let directory = Directory::open(store, config)?;
        Ok(Self {
            directory,
            static_regions: config.static_regions.clone(),
        })
    }

    /// Resolve `id`: dynamic partition first, then the static region
    pub fn find(&self, id: u8) -> Result<FlashArea> {
        for (index, partition) in self.directory.partitions()? {
            if partition.id == id {
                return Ok(FlashArea {
                    source: AreaSource::Dynamic { index },
                    partition,
                });
            }
        }

        self.static_regions
            .iter()
            .find(|region| region.id == id)
            .map(|region| FlashArea {
                source: AreaSource::Static,
                partition: region.into(),
            })
            .ok_or(PartdirError::NotFound)
    }

    /// The effective map, one area per id, ordered by id
    pub fn areas(&self) -> Result<Vec<FlashArea>> {
        let mut areas: BTreeMap<u8, FlashArea> = self
            .static_regions
            .iter()
            .map(|region| {
                (
                    region.id,
                    FlashArea {
                        source: AreaSource::Static,
                        partition: region.into(),
                    },
                )
            })
            .collect();

        // Reverse so the lowest index wins for duplicate ids
        for (index, partition) in self.directory.partitions()?.into_iter().rev() {
            areas.insert(
                partition.id,
                FlashArea {
                    source: AreaSource::Dynamic { index },
                    partition,
                },
            );
        }

        Ok(areas.into_values().collect())
    }

    pub fn static_regions(&self) -> &[StaticRegion] {
        &self.static_regions
    }

    pub fn directory(&self) -> &Directory<S> {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut Directory<S> {
        &mut self.directory
    }

    pub fn into_directory(self) -> Directory<S> {
        self.directory
    }
}
