//! Shadow Cache Module
//!
//! RAM mirror of the persisted directory.
//!
//! ## Responsibilities
//! - Hold the claimed count so bounds checks skip the store
//! - Track which claimed indices are holes
//! - Only ever reflect state the store has already committed
//!
//! The directory writes to the store first and updates this cache only
//! after the store reports success.

mod table;

pub use table::ShadowCache;
