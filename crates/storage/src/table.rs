//! Key → record table
//!
//! Everything the store lock protects: the alias slots, the record counter
//! and the lifecycle state. Methods here assume the caller holds the store
//! lock in the right mode (`&self` for shared, `&mut self` for exclusive);
//! the store's guards are the only way to reach them.
//!
//! # Invariants
//!
//! - Alias symmetry: `slots[k]` is record `r` iff `k` is in `r.keys()`.
//! - A record is unlinked only after [`Record::rendezvous`], so no thread
//!   that locked it through a lookup is still inside its critical section.
//! - `count` is the number of distinct linked records, unless overwritten
//!   by `set_count` or by a bulk load (which sets it to the entry count).

use crate::record::{KeyList, LockedRecord, Record};
use datacache_core::{CacheKey, Error, LifecycleState, Result};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

pub(crate) struct RecordTable<K, V> {
    slots: FxHashMap<K, Arc<Record<K, V>>>,
    count: usize,
    pub(crate) state: LifecycleState,
}

impl<K: CacheKey, V> RecordTable<K, V> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            count: 0,
            state: LifecycleState::Unloaded,
        }
    }

    // ========================================================================
    // Shared-lock operations
    // ========================================================================

    #[inline]
    pub(crate) fn ensure_open(&self) -> Result<()> {
        self.state.ensure_open()
    }

    #[inline]
    pub(crate) fn lookup(&self, key: &K) -> Result<&Arc<Record<K, V>>> {
        self.ensure_open()?;
        self.slots.get(key).ok_or_else(|| Error::key_not_found(key))
    }

    pub(crate) fn contains_key(&self, key: &K) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.slots.contains_key(key))
    }

    /// Lock the record behind `key` and hand it out still locked
    pub(crate) fn get(&self, key: &K) -> Result<LockedRecord<K, V>> {
        let record = self.lookup(key)?;
        tracing::trace!(key = ?key, "record lookup");
        Ok(record.lock())
    }

    pub(crate) fn payload(&self, key: &K) -> Result<V>
    where
        V: Clone,
    {
        let record = self.lookup(key)?;
        let locked = record.lock();
        let payload = locked.payload().cloned();
        payload
    }

    pub(crate) fn update_rec_state(&self, key: &K, active: bool) -> Result<()> {
        let record = self.lookup(key)?;
        let mut locked = record.lock();
        locked.set_active(active)
    }

    pub(crate) fn len_keys(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.slots.len())
    }

    /// Every linked record exactly once, regardless of alias count
    pub(crate) fn records(&self) -> Vec<Arc<Record<K, V>>> {
        let mut seen = FxHashSet::default();
        self.slots
            .values()
            .filter(|record| seen.insert(Arc::as_ptr(record) as usize))
            .cloned()
            .collect()
    }

    // ========================================================================
    // Exclusive-lock operations
    // ========================================================================

    pub(crate) fn count(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.count)
    }

    pub(crate) fn set_count(&mut self, count: usize) -> Result<usize> {
        self.ensure_open()?;
        self.count = count;
        Ok(self.count)
    }

    /// Link a new record under `keys`.
    ///
    /// With `fail_if_exists`, any key that already resolves rejects the whole
    /// insert before anything changes. Without it, such keys are detached
    /// from their current record first.
    pub(crate) fn insert(
        &mut self,
        keys: Vec<K>,
        payload: V,
        fail_if_exists: bool,
    ) -> Result<Arc<Record<K, V>>> {
        self.ensure_open()?;
        let keys = dedup_keys(keys);
        if keys.is_empty() {
            return Err(Error::InvalidPayload(
                "a record needs at least one key".to_string(),
            ));
        }

        if fail_if_exists {
            if let Some(key) = keys.iter().find(|key| self.slots.contains_key(*key)) {
                return Err(Error::key_exists(key));
            }
        } else {
            for key in &keys {
                self.detach_alias(key);
            }
        }

        let record = Record::new(keys.clone(), payload);
        for key in keys {
            self.slots.insert(key, Arc::clone(&record));
        }
        self.count += 1;
        tracing::trace!(keys = ?record.keys(), count = self.count, "record linked");
        Ok(record)
    }

    /// Map `new_key` onto the record behind `existing`
    pub(crate) fn alias(&mut self, existing: &K, new_key: K) -> Result<Arc<Record<K, V>>> {
        let record = Arc::clone(self.lookup(existing)?);

        if let Some(current) = self.slots.get(&new_key) {
            if Arc::ptr_eq(current, &record) {
                return Ok(record);
            }
            return Err(Error::key_exists(&new_key));
        }

        record.push_key(new_key.clone());
        self.slots.insert(new_key, Arc::clone(&record));
        Ok(record)
    }

    /// Remove one alias. The record survives through its other aliases; if
    /// `key` was its last one it is unlinked.
    pub(crate) fn delete_key(&mut self, key: &K) -> Result<()> {
        self.ensure_open()?;
        if !self.detach_alias(key) {
            return Err(Error::key_not_found(key));
        }
        Ok(())
    }

    /// Unlink the record behind `key` with every one of its aliases
    pub(crate) fn delete_rec(&mut self, key: &K) -> Result<usize> {
        let record = Arc::clone(self.lookup(key)?);
        self.unlink(&record);
        Ok(self.count)
    }

    /// Unlink every record. Returns how many were removed.
    pub(crate) fn delete_all(&mut self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.unlink_all())
    }

    pub(crate) fn unlink_all(&mut self) -> usize {
        let records = self.records();
        for record in &records {
            record.rendezvous();
            record.take_keys();
        }
        self.slots.clear();
        self.count = 0;
        records.len()
    }

    /// Detach `key` from whatever record it resolves to.
    ///
    /// Returns false if `key` was not mapped.
    fn detach_alias(&mut self, key: &K) -> bool {
        let Some(record) = self.slots.remove(key) else {
            return false;
        };
        let last = record.key_count() == 1;
        if last {
            // The record becomes unreachable; wait out any holder before its
            // alias list changes.
            record.rendezvous();
        }
        record.remove_key(key);
        if last {
            self.count = self.count.saturating_sub(1);
            tracing::trace!(key = ?key, count = self.count, "record unlinked with its last alias");
        }
        true
    }

    /// Rendezvous with any holder, then drop every alias of `record`
    fn unlink(&mut self, record: &Arc<Record<K, V>>) {
        record.rendezvous();
        for key in record.take_keys() {
            self.slots.remove(&key);
        }
        self.count = self.count.saturating_sub(1);
        tracing::trace!(count = self.count, "record unlinked");
    }
}

/// Drop repeated keys, keeping first occurrences in order
fn dedup_keys<K: CacheKey>(keys: Vec<K>) -> KeyList<K> {
    let mut out = KeyList::with_capacity(keys.len());
    for key in keys {
        if !out.contains(&key) {
            out.push(key);
        }
    }
    out
}
