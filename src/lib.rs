//! # datacache
//!
//! In-process concurrent keyed record store with multi-key aliasing.
//!
//! A record holds one payload and is reachable through any number of keys
//! (aliases). Lookups hand back the record already locked, so the caller
//! can read and mutate it without racing other threads, and deletion waits
//! for whoever still holds the record.
//!
//! ## Quick Start
//!
//! ```
//! use datacache::prelude::*;
//!
//! let cache: DataCache<String, u64> = DataCache::new();
//!
//! // One record, two aliases
//! cache.add(vec!["id:7".to_string(), "name:bob".to_string()], 100, true)?;
//!
//! // Lookups return the record locked
//! let mut rec = cache.get(&"name:bob".to_string())?;
//! *rec.payload_mut()? += 1;
//! rec.unlock();
//!
//! assert_eq!(cache.payload(&"id:7".to_string())?, 101);
//!
//! // Deleting the record removes every alias
//! cache.delete_rec(&"id:7".to_string())?;
//! assert!(!cache.contains_key(&"name:bob".to_string())?);
//! # Ok::<(), datacache::Error>(())
//! ```
//!
//! ## Layers
//!
//! - [`datacache_core`] - error type, configuration, lifecycle state, loader types
//! - [`datacache_concurrency`] - the non-reentrant per-record lock
//! - [`datacache_storage`] - the store, records and lock guards
//!
//! This crate ties them together behind [`DataCache`].

#![warn(missing_docs)]

mod cache;

pub mod prelude;

// Re-export main entry points
pub use cache::{DataCache, DataCacheBuilder};
pub use datacache_core::{Error, Result};

// Re-export the layers for callers that need the lower-level pieces
pub use datacache_concurrency;
pub use datacache_core;
pub use datacache_storage;
