//! # partdir
//!
//! A dynamic partition directory for flash devices:
//! - Named byte ranges that can be created, resized and moved at runtime
//! - Layered on any durable, atomic-per-key key-value store
//! - Crash-tolerant appends (an interrupted append leaves a reusable hole)
//! - RAM shadow cache for bounds checks without store round-trips
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Flash Map                            │
//! │           (dynamic partitions over static regions)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Directory                             │
//! │     get_by_index / get_by_id / set / upsert / append        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Slot     │          │   Shadow    │
//!   │  Directory  │          │    Cache    │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │  KV Store   │
//!   │ (mem / log) │
//!   └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod record;
pub mod store;
pub mod slots;
pub mod cache;
pub mod directory;
pub mod flash_map;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{PartdirError, Result};
pub use config::{Config, StaticRegion, SyncStrategy};
pub use directory::Directory;
pub use flash_map::{AreaSource, FlashArea, FlashMap};
pub use record::{DeviceIdentity, Partition, PartitionRecord};
pub use store::{FileStore, KvStore, MemoryStore};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of partdir
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
