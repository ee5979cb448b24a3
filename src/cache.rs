//! Main cache entry point for datacache.
//!
//! This module provides the `DataCache` handle and its builder.

use datacache_core::{CacheKey, LoadOutcome, Loader, RecordHandler, Result, StoreConfig};
use datacache_storage::{LifecycleReport, Store};
use std::ops::Deref;
use std::sync::Arc;

/// A shared handle to a record store.
///
/// Cloning the handle is cheap; every clone refers to the same store. All
/// store operations are available through `Deref`.
///
/// # Example
///
/// ```
/// use datacache::prelude::*;
///
/// let cache: DataCache<String, u64> = DataCache::builder()
///     .name("users")
///     .loader(|| {
///         LoadOutcome::ok(vec![
///             LoadEntry::new(["id:1".to_string(), "name:alice".to_string()], 30),
///             LoadEntry::new(["id:2".to_string()], 41),
///         ])
///     })
///     .build_loaded()?;
///
/// assert_eq!(cache.count()?, 2);
/// assert_eq!(cache.payload(&"name:alice".to_string())?, 30);
/// # Ok::<(), datacache::Error>(())
/// ```
pub struct DataCache<K, V> {
    store: Arc<Store<K, V>>,
}

impl<K: CacheKey, V> DataCache<K, V> {
    /// Create an empty cache with default settings and no callbacks.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for cache configuration.
    pub fn builder() -> DataCacheBuilder<K, V> {
        DataCacheBuilder::new()
    }

    /// Wrap an existing store.
    pub fn from_store(store: Store<K, V>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// The shared store behind this handle.
    pub fn store(&self) -> &Arc<Store<K, V>> {
        &self.store
    }

    /// Number of live handles to this cache, including this one.
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.store)
    }
}

impl<K, V> Clone for DataCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<K, V> Deref for DataCache<K, V> {
    type Target = Store<K, V>;

    fn deref(&self) -> &Store<K, V> {
        &self.store
    }
}

impl<K: CacheKey, V> Default for DataCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey, V> std::fmt::Debug for DataCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCache")
            .field("store", &*self.store)
            .finish()
    }
}

/// Builder for cache configuration.
///
/// # Example
///
/// ```
/// use datacache::prelude::*;
///
/// // Empty cache, populated by hand
/// let cache: DataCache<&str, u32> = DataCache::builder()
///     .name("sessions")
///     .capacity(1024)
///     .build();
/// cache.add(vec!["s:1"], 7, true)?;
///
/// // Callbacks registered now, run later through `load` / `iterate`
/// let cache: DataCache<&str, u32> = DataCache::builder()
///     .loader(|| LoadOutcome::ok(vec![LoadEntry::new(["a"], 1)]))
///     .iterator(|v: &mut u32| *v += 1)
///     .build();
/// cache.load_and_iterate(true, true)?;
/// assert_eq!(cache.payload(&"a")?, 2);
/// # Ok::<(), datacache::Error>(())
/// ```
pub struct DataCacheBuilder<K, V> {
    config: StoreConfig,
    loader: Option<Loader<K, V>>,
    iterator: Option<RecordHandler<V>>,
}

impl<K: CacheKey, V> DataCacheBuilder<K, V> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            loader: None,
            iterator: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the store name attached to its log events.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    /// Set the number of key slots to reserve up front.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.initial_capacity = capacity;
        self
    }

    /// Register the one-shot bulk loader.
    pub fn loader<F>(mut self, loader: F) -> Self
    where
        F: FnOnce() -> LoadOutcome<K, V> + Send + 'static,
    {
        self.loader = Some(Box::new(loader));
        self
    }

    /// Register the one-shot per-record iteration handler.
    pub fn iterator<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&mut V) + Send + 'static,
    {
        self.iterator = Some(Box::new(handler));
        self
    }

    /// Build an unloaded cache. Callbacks run when `load` / `iterate` is
    /// called on it.
    pub fn build(self) -> DataCache<K, V> {
        DataCache::from_store(Store::with_config(self.config, self.loader, self.iterator))
    }

    /// Build the cache and immediately run whichever callbacks were
    /// registered, as one combined pass.
    pub fn build_loaded(self) -> Result<DataCache<K, V>> {
        let cache = self.build();
        let LifecycleReport { loaded, visited } = cache.load_and_iterate(false, false)?;
        tracing::debug!(store = %cache.name(), loaded, visited, "cache ready");
        Ok(cache)
    }
}

impl<K: CacheKey, V> Default for DataCacheBuilder<K, V> {
    fn default() -> Self {
        Self::new()
    }
}
