//! Convenient imports for datacache.
//!
//! ```
//! use datacache::prelude::*;
//!
//! let cache: DataCache<&str, u32> = DataCache::new();
//! cache.add(vec!["key"], 1, true)?;
//! # Ok::<(), datacache::Error>(())
//! ```

// Main entry point
pub use crate::cache::{DataCache, DataCacheBuilder};

// Error handling
pub use datacache_core::{Error, Result};

// Configuration and lifecycle
pub use datacache_core::{CacheKey, LifecycleState, StoreConfig};

// Loader types
pub use datacache_core::{LoadEntry, LoadOutcome, Loader, RecordHandler};

// Store and records
pub use datacache_storage::{
    LifecycleReport, LockedRecord, Record, Store, StoreReadGuard, StoreWriteGuard,
};
