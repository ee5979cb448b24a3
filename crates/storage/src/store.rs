//! Store with two-level locking
//!
//! [`Store`] maps keys to shared records behind a coarse reader/writer lock.
//! Record payloads sit behind each record's own lock.
//!
//! # Lock modes
//!
//! - Shared (`read`): point lookups, payload reads, membership tests and
//!   active-flag toggles. Toggles only need shared mode because the key set
//!   does not change and the record lock serializes writers of one record.
//! - Exclusive (`write`): anything that changes the key set, whole-store
//!   traversal, counter access and lifecycle transitions.
//!
//! # Two forms of every operation
//!
//! Each operation on [`Store`] takes and releases the lock it needs. The
//! same operation also exists on the guards returned by [`Store::read`] and
//! [`Store::write`]; those assume the lock is already held, which the guard
//! proves, so several structural changes can be composed under one
//! acquisition:
//!
//! ```
//! use datacache_storage::Store;
//!
//! let store: Store<String, u32> = Store::new();
//! {
//!     let mut tx = store.write();
//!     tx.add(vec!["id:1".to_string()], 1, true).unwrap();
//!     tx.re_add(&"id:1".to_string(), "name:alice".to_string()).unwrap();
//! } // both changes become visible together
//! assert_eq!(store.count().unwrap(), 1);
//! ```
//!
//! # Deadlocks
//!
//! Neither lock is reentrant and every acquisition blocks:
//! - calling a `Store` method while holding one of its guards deadlocks;
//! - locking, toggling or deleting a record the calling thread holds
//!   deadlocks (debug builds panic instead);
//! - a thread holding a record must not wait for any store lock while
//!   another thread may be deleting that record: the deleter waits for the
//!   record while holding the exclusive lock, and a pending writer also
//!   blocks new readers.

use crate::lifecycle::LifecycleHooks;
use crate::record::LockedRecord;
use crate::table::RecordTable;
use datacache_core::{CacheKey, LifecycleState, Loader, RecordHandler, Result, StoreConfig};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Concurrent keyed record store with multi-key aliasing.
///
/// # Thread Safety
///
/// `Store<K, V>` is `Send + Sync` for `K: Send + Sync` and `V: Send`; share
/// it through an `Arc`.
pub struct Store<K, V> {
    name: String,
    table: RwLock<RecordTable<K, V>>,
    /// Taken only while the exclusive store lock is held
    pub(crate) hooks: Mutex<LifecycleHooks<K, V>>,
}

impl<K: CacheKey, V> Store<K, V> {
    /// Create an unloaded store with default configuration and no callbacks
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default(), None, None)
    }

    /// Create an unloaded store with the given loader and iteration handler
    pub fn create(loader: Option<Loader<K, V>>, iterator: Option<RecordHandler<V>>) -> Self {
        Self::with_config(StoreConfig::default(), loader, iterator)
    }

    /// Create an unloaded store from a configuration and optional callbacks
    pub fn with_config(
        config: StoreConfig,
        loader: Option<Loader<K, V>>,
        iterator: Option<RecordHandler<V>>,
    ) -> Self {
        tracing::debug!(
            store = %config.name,
            capacity = config.initial_capacity,
            has_loader = loader.is_some(),
            has_iterator = iterator.is_some(),
            "store created"
        );
        Self {
            name: config.name,
            table: RwLock::new(RecordTable::with_capacity(config.initial_capacity)),
            hooks: Mutex::new(LifecycleHooks { loader, iterator }),
        }
    }

    /// Name given in the store's configuration
    pub fn name(&self) -> &str {
        &self.name
    }

    // ========================================================================
    // Lock primitives
    // ========================================================================

    /// Take the shared store lock. Blocks while a writer holds it.
    pub fn read(&self) -> StoreReadGuard<'_, K, V> {
        StoreReadGuard {
            table: self.table.read(),
        }
    }

    /// Take the exclusive store lock. Blocks while anyone else holds it.
    pub fn write(&self) -> StoreWriteGuard<'_, K, V> {
        StoreWriteGuard {
            store: self,
            table: self.table.write(),
        }
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> LifecycleState {
        self.table.read().state
    }

    // ========================================================================
    // Insertion
    // ========================================================================

    /// Add one record reachable through every key in `keys`.
    ///
    /// With `fail_if_exists`, fails with `KeyExists` and changes nothing if
    /// any key already resolves. Without it, such keys are moved onto the
    /// new record. Returns the record count after the insert.
    pub fn add(&self, keys: Vec<K>, payload: V, fail_if_exists: bool) -> Result<usize> {
        self.write().add(keys, payload, fail_if_exists)
    }

    /// Add one record, moving any key that already resolves onto it
    pub fn force_add(&self, keys: Vec<K>, payload: V) -> Result<usize> {
        self.write().force_add(keys, payload)
    }

    /// Like [`Store::add`], also returning the new record already locked
    pub fn add_and_get(
        &self,
        keys: Vec<K>,
        payload: V,
        fail_if_exists: bool,
    ) -> Result<(usize, LockedRecord<K, V>)> {
        self.write().add_and_get(keys, payload, fail_if_exists)
    }

    /// Like [`Store::force_add`], also returning the new record already locked
    pub fn force_add_and_get(&self, keys: Vec<K>, payload: V) -> Result<(usize, LockedRecord<K, V>)> {
        self.write().force_add_and_get(keys, payload)
    }

    /// Make `new_key` an alias of the record behind `existing`.
    ///
    /// The record counter does not change.
    pub fn re_add(&self, existing: &K, new_key: K) -> Result<usize> {
        self.write().re_add(existing, new_key)
    }

    /// Like [`Store::re_add`], also returning the record already locked
    pub fn re_add_and_get(&self, existing: &K, new_key: K) -> Result<(usize, LockedRecord<K, V>)> {
        self.write().re_add_and_get(existing, new_key)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Look up `key` and return its record locked.
    ///
    /// The caller releases it with [`LockedRecord::unlock`] or by dropping
    /// the handle.
    pub fn get(&self, key: &K) -> Result<LockedRecord<K, V>> {
        self.read().get(key)
    }

    /// Copy of the payload behind `key`; the record is locked only for the
    /// duration of the copy
    pub fn payload(&self, key: &K) -> Result<V>
    where
        V: Clone,
    {
        self.read().payload(key)
    }

    /// Whether `key` resolves to a record. Never touches a record lock.
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.read().contains_key(key)
    }

    /// Set the active flag of the record behind `key`.
    ///
    /// Must not be called by a thread holding that record.
    pub fn update_rec_state(&self, key: &K, active: bool) -> Result<()> {
        self.read().update_rec_state(key, active)
    }

    /// Number of key slots (aliases) in the store
    pub fn len_keys(&self) -> Result<usize> {
        self.read().len_keys()
    }

    // ========================================================================
    // Deletion
    // ========================================================================

    /// Remove a single alias. Sibling aliases keep the record alive.
    ///
    /// If `key` was the record's last alias, the record is unlinked as by
    /// [`Store::delete_rec`]: the call waits for any holder and the record
    /// counter is decremented.
    pub fn delete_key(&self, key: &K) -> Result<()> {
        self.write().delete_key(key)
    }

    /// Remove the record behind `key` together with all of its aliases.
    ///
    /// Waits for any thread currently holding the record to release it
    /// before unlinking. Returns the remaining record count.
    pub fn delete_rec(&self, key: &K) -> Result<usize> {
        self.write().delete_rec(key)
    }

    /// Remove every record. Returns how many were removed.
    pub fn delete_cache(&self) -> Result<usize> {
        self.write().delete_cache()
    }

    /// Remove every record and reject all later operations with `NilStore`.
    ///
    /// Returns how many records were removed; closing twice removes none.
    pub fn close(&self) -> usize {
        self.write().close()
    }

    // ========================================================================
    // Counter
    // ========================================================================

    /// Number of distinct records
    pub fn count(&self) -> Result<usize> {
        self.write().count()
    }

    /// Overwrite the record counter, returning the new value
    pub fn set_count(&self, count: usize) -> Result<usize> {
        self.write().set_count(count)
    }
}

impl<K: CacheKey, V> Default for Store<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: CacheKey, V> std::fmt::Debug for Store<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("state", &table.state)
            .field("count", &table.count().unwrap_or(0))
            .field("keys", &table.len_keys().unwrap_or(0))
            .finish()
    }
}

/// Shared store lock held by the caller.
///
/// Exposes the operations that need only shared mode.
pub struct StoreReadGuard<'a, K, V> {
    table: RwLockReadGuard<'a, RecordTable<K, V>>,
}

impl<'a, K: CacheKey, V> StoreReadGuard<'a, K, V> {
    /// See [`Store::get`]
    pub fn get(&self, key: &K) -> Result<LockedRecord<K, V>> {
        self.table.get(key)
    }

    /// See [`Store::payload`]
    pub fn payload(&self, key: &K) -> Result<V>
    where
        V: Clone,
    {
        self.table.payload(key)
    }

    /// See [`Store::contains_key`]
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.table.contains_key(key)
    }

    /// See [`Store::update_rec_state`]
    pub fn update_rec_state(&self, key: &K, active: bool) -> Result<()> {
        self.table.update_rec_state(key, active)
    }

    /// See [`Store::len_keys`]
    pub fn len_keys(&self) -> Result<usize> {
        self.table.len_keys()
    }

    /// Release the shared store lock
    pub fn unlock(self) {}
}

/// Exclusive store lock held by the caller.
///
/// Exposes every operation; changes made through one guard become visible
/// to other threads together when it is released.
pub struct StoreWriteGuard<'a, K, V> {
    pub(crate) store: &'a Store<K, V>,
    pub(crate) table: RwLockWriteGuard<'a, RecordTable<K, V>>,
}

impl<'a, K: CacheKey, V> StoreWriteGuard<'a, K, V> {
    /// See [`Store::add`]
    pub fn add(&mut self, keys: Vec<K>, payload: V, fail_if_exists: bool) -> Result<usize> {
        self.table.insert(keys, payload, fail_if_exists)?;
        self.table.count()
    }

    /// See [`Store::force_add`]
    pub fn force_add(&mut self, keys: Vec<K>, payload: V) -> Result<usize> {
        self.add(keys, payload, false)
    }

    /// See [`Store::add_and_get`]
    pub fn add_and_get(
        &mut self,
        keys: Vec<K>,
        payload: V,
        fail_if_exists: bool,
    ) -> Result<(usize, LockedRecord<K, V>)> {
        let record = self.table.insert(keys, payload, fail_if_exists)?;
        // Nobody else can reach the record before the store lock is released.
        let locked = record.lock();
        Ok((self.table.count()?, locked))
    }

    /// See [`Store::force_add_and_get`]
    pub fn force_add_and_get(&mut self, keys: Vec<K>, payload: V) -> Result<(usize, LockedRecord<K, V>)> {
        self.add_and_get(keys, payload, false)
    }

    /// See [`Store::re_add`]
    pub fn re_add(&mut self, existing: &K, new_key: K) -> Result<usize> {
        self.table.alias(existing, new_key)?;
        self.table.count()
    }

    /// See [`Store::re_add_and_get`]
    pub fn re_add_and_get(&mut self, existing: &K, new_key: K) -> Result<(usize, LockedRecord<K, V>)> {
        let record = self.table.alias(existing, new_key)?;
        let locked = record.lock();
        Ok((self.table.count()?, locked))
    }

    /// See [`Store::get`]
    pub fn get(&self, key: &K) -> Result<LockedRecord<K, V>> {
        self.table.get(key)
    }

    /// See [`Store::payload`]
    pub fn payload(&self, key: &K) -> Result<V>
    where
        V: Clone,
    {
        self.table.payload(key)
    }

    /// See [`Store::contains_key`]
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.table.contains_key(key)
    }

    /// See [`Store::update_rec_state`]
    pub fn update_rec_state(&self, key: &K, active: bool) -> Result<()> {
        self.table.update_rec_state(key, active)
    }

    /// See [`Store::len_keys`]
    pub fn len_keys(&self) -> Result<usize> {
        self.table.len_keys()
    }

    /// See [`Store::delete_key`]
    pub fn delete_key(&mut self, key: &K) -> Result<()> {
        self.table.delete_key(key)
    }

    /// See [`Store::delete_rec`]
    pub fn delete_rec(&mut self, key: &K) -> Result<usize> {
        self.table.delete_rec(key)
    }

    /// See [`Store::delete_cache`]
    pub fn delete_cache(&mut self) -> Result<usize> {
        let removed = self.table.delete_all()?;
        tracing::debug!(store = %self.store.name, removed, "store emptied");
        Ok(removed)
    }

    /// See [`Store::close`]
    pub fn close(&mut self) -> usize {
        if self.table.state.is_closed() {
            return 0;
        }
        let removed = self.table.unlink_all();
        self.table.state.close();
        *self.store.hooks.lock() = LifecycleHooks::default();
        tracing::debug!(store = %self.store.name, removed, "store closed");
        removed
    }

    /// See [`Store::count`]
    pub fn count(&self) -> Result<usize> {
        self.table.count()
    }

    /// See [`Store::set_count`]
    pub fn set_count(&mut self, count: usize) -> Result<usize> {
        self.table.set_count(count)
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> LifecycleState {
        self.table.state
    }

    /// Release the exclusive store lock
    pub fn unlock(self) {}
}
