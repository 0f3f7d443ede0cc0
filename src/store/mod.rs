//! Store Module
//!
//! The persistent key-value layer the partition directory is built on.
//!
//! ## Responsibilities
//! - Durable, atomic-per-key `get` / `put` / `delete`
//! - No cross-key transactions (callers order their writes)
//! - Failures are reported verbatim; retry policy is the caller's
//!
//! ## Adapters
//! - `MemoryStore`: shared in-memory map, clones see the same contents
//! - `FileStore`: append-only log with CRC framing and replay on open

mod memory;
mod file;

use std::sync::Arc;

use crate::error::Result;

pub use memory::MemoryStore;
pub use file::{FileStore, LogEntry, LogOp, LogRecovery, RecoveryResult, HEADER_SIZE};

/// Durable key-value store consumed by the directory
///
/// Implementations synchronize internally; every method takes `&self`.
pub trait KvStore {
    /// Fetch the value stored under `key`, `None` if absent
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Remove `key`; removing an absent key is not an error
    fn delete(&self, key: &str) -> Result<()>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}

impl<S: KvStore + ?Sized> KvStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        (**self).put(key, value)
    }

    fn delete(&self, key: &str) -> Result<()> {
        (**self).delete(key)
    }
}
