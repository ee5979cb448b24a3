//! Bulk load and iteration
//!
//! The loader and the iteration handler registered at creation each run at
//! most once, guarded by the store's
//! [`LifecycleState`](datacache_core::LifecycleState). Both run under the
//! exclusive store lock and are meant for start-up, before the store sees
//! concurrent traffic.
//!
//! [`Store::aux_iterate`] is the general-purpose traversal: repeatable,
//! with the record lock taken around every handler call. It holds the
//! exclusive store lock for the whole pass and so stalls every other
//! operation on the store; keep it off hot paths.

use crate::record::LockedRecord;
use crate::store::{Store, StoreWriteGuard};
use datacache_core::{CacheKey, Error, Loader, RecordHandler, Result};

/// Callbacks registered at store creation
pub(crate) struct LifecycleHooks<K, V> {
    pub(crate) loader: Option<Loader<K, V>>,
    pub(crate) iterator: Option<RecordHandler<V>>,
}

impl<K, V> Default for LifecycleHooks<K, V> {
    fn default() -> Self {
        Self {
            loader: None,
            iterator: None,
        }
    }
}

/// What a combined load-and-iterate pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    /// Records linked by the loader
    pub loaded: usize,
    /// Records handed to the iteration handler
    pub visited: usize,
}

impl<'a, K: CacheKey, V> StoreWriteGuard<'a, K, V> {
    /// See [`Store::load`]
    pub fn load(&mut self, require_loader: bool) -> Result<usize> {
        self.table.state.begin_load()?;
        self.run_loader(require_loader)
    }

    /// See [`Store::iterate`]
    pub fn iterate(&mut self, require_iterator: bool) -> Result<usize> {
        self.table.state.begin_iterate()?;
        self.run_iterator(require_iterator)
    }

    /// See [`Store::load_and_iterate`]
    pub fn load_and_iterate(
        &mut self,
        require_loader: bool,
        require_iterator: bool,
    ) -> Result<LifecycleReport> {
        self.table.state.begin_load_and_iterate()?;
        let loaded = self.run_loader(require_loader)?;
        let visited = self.run_iterator(require_iterator)?;
        Ok(LifecycleReport { loaded, visited })
    }

    /// See [`Store::aux_iterate`]
    pub fn aux_iterate<F>(&mut self, mut handler: F) -> Result<usize>
    where
        F: FnMut(&mut LockedRecord<K, V>),
    {
        self.table.ensure_open()?;
        let records = self.table.records();
        for record in &records {
            let mut locked = record.lock();
            handler(&mut locked);
        }
        Ok(records.len())
    }

    fn run_loader(&mut self, require_loader: bool) -> Result<usize> {
        let loader = self.store.hooks.lock().loader.take();
        let Some(loader) = loader else {
            if require_loader {
                return Err(Error::MissingLoader);
            }
            tracing::debug!(store = %self.store.name(), "no loader registered, nothing to load");
            return Ok(0);
        };

        let outcome = loader();
        if !outcome.success {
            tracing::warn!(store = %self.store.name(), "loader reported failure");
            return Err(Error::LoaderFailed);
        }
        if outcome.entries.iter().any(|entry| entry.keys.is_empty()) {
            return Err(Error::InvalidPayload(
                "loader produced a record without keys".to_string(),
            ));
        }

        let loaded = outcome.entries.len();
        for entry in outcome.entries {
            self.table.insert(entry.keys, entry.payload, false)?;
        }
        // The counter reflects the loaded set, not what was there before.
        self.table.set_count(loaded)?;
        tracing::debug!(
            store = %self.store.name(),
            loaded,
            keys = self.table.len_keys()?,
            "store loaded"
        );
        Ok(loaded)
    }

    fn run_iterator(&mut self, require_iterator: bool) -> Result<usize> {
        let handler = self.store.hooks.lock().iterator.take();
        let Some(mut handler) = handler else {
            if require_iterator {
                return Err(Error::MissingIterator);
            }
            return Ok(0);
        };

        // No other thread can reach the records yet, so these locks are
        // uncontended; they are taken only to reach the payloads.
        let records = self.table.records();
        for record in &records {
            let mut locked = record.lock();
            handler(&mut locked.state_mut()?.payload);
        }
        tracing::debug!(store = %self.store.name(), visited = records.len(), "store iterated");
        Ok(records.len())
    }
}

impl<K: CacheKey, V> Store<K, V> {
    /// Run the registered loader once, linking one record per entry.
    ///
    /// The record counter is then set to the number of entries, replacing
    /// whatever it held. Entries sharing a key are still linked in order,
    /// later ones taking that key over.
    ///
    /// Fails with `AlreadyLoaded` on any later call. Without a registered
    /// loader this succeeds with nothing loaded, unless `require_loader` is
    /// set (`MissingLoader`). A loader reporting failure yields
    /// `LoaderFailed`. Returns the number of records loaded.
    pub fn load(&self, require_loader: bool) -> Result<usize> {
        self.write().load(require_loader)
    }

    /// Apply the registered iteration handler once to every record's
    /// payload, one call per record regardless of alias count.
    ///
    /// Fails with `AlreadyLoaded` once the iteration has run. Must be called
    /// before the store is shared with other threads. Returns the number of
    /// records visited.
    pub fn iterate(&self, require_iterator: bool) -> Result<usize> {
        self.write().iterate(require_iterator)
    }

    /// [`Store::load`] followed by [`Store::iterate`] under a single lock
    /// acquisition and a single one-shot guard
    pub fn load_and_iterate(
        &self,
        require_loader: bool,
        require_iterator: bool,
    ) -> Result<LifecycleReport> {
        self.write().load_and_iterate(require_loader, require_iterator)
    }

    /// Apply `handler` to every record while holding its lock.
    ///
    /// Repeatable, but holds the exclusive store lock for the entire pass.
    /// The handler must not call back into this store.
    pub fn aux_iterate<F>(&self, handler: F) -> Result<usize>
    where
        F: FnMut(&mut LockedRecord<K, V>),
    {
        self.write().aux_iterate(handler)
    }

    /// Whether the one-shot load has been consumed
    pub fn is_loaded(&self) -> bool {
        self.lifecycle().is_loaded()
    }
}
