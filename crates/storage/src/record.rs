//! Records and locked record handles
//!
//! A [`Record`] is one cache entry: a payload, an active flag, and the list
//! of aliases it is reachable through. Records are shared through `Arc`
//! between every alias slot of the store and every live [`LockedRecord`], so
//! a record unlinked from the store remains valid for whoever still holds a
//! handle to it.
//!
//! # Locking
//!
//! - `payload` and `active` sit behind the record's own [`RecordLock`].
//! - The alias list is only modified while the store's exclusive lock is
//!   held; its inner `RwLock` exists so holders can read it without the
//!   store lock.

use datacache_concurrency::{RecordLock, RecordLockGuard};
use datacache_core::{CacheKey, Error, Result};
use parking_lot::RwLock;
use smallvec::SmallVec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Inline capacity for alias lists; most records have a handful of aliases
pub(crate) type KeyList<K> = SmallVec<[K; 4]>;

/// State guarded by the record lock
#[derive(Debug)]
pub(crate) struct RecordState<V> {
    pub(crate) payload: V,
    pub(crate) active: bool,
}

/// A single cache entry
pub struct Record<K, V> {
    /// Aliases, in insertion order. Written only under the store write lock.
    keys: RwLock<KeyList<K>>,
    /// Payload and active flag
    state: RecordLock<RecordState<V>>,
    /// Number of live locked handles; informational only
    refs: AtomicUsize,
}

impl<K: CacheKey, V> Record<K, V> {
    pub(crate) fn new(keys: KeyList<K>, payload: V) -> Arc<Self> {
        Arc::new(Self {
            keys: RwLock::new(keys),
            state: RecordLock::new(RecordState {
                payload,
                active: true,
            }),
            refs: AtomicUsize::new(0),
        })
    }

    /// Snapshot of the record's aliases.
    ///
    /// Empty once the record has been unlinked from its store.
    pub fn keys(&self) -> Vec<K> {
        self.keys.read().to_vec()
    }

    /// Number of aliases currently pointing at this record
    pub fn key_count(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether the record is still reachable from its store
    pub fn is_linked(&self) -> bool {
        !self.keys.read().is_empty()
    }

    /// Whether some thread currently holds the record lock
    pub fn is_locked(&self) -> bool {
        self.state.is_locked()
    }

    /// Number of [`LockedRecord`] handles currently holding this record
    pub fn outstanding_refs(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    /// Acquire the record lock, blocking until it is available.
    ///
    /// Record locks are not reentrant: locking a record the calling thread
    /// already holds deadlocks (and panics in debug builds).
    pub fn lock(self: &Arc<Self>) -> LockedRecord<K, V> {
        let guard = self.state.lock();
        self.refs.fetch_add(1, Ordering::AcqRel);
        LockedRecord {
            record: Arc::clone(self),
            guard: Some(guard),
        }
    }

    /// Wait out any current holder without taking the lock
    pub(crate) fn rendezvous(&self) {
        self.state.rendezvous();
    }

    pub(crate) fn push_key(&self, key: K) {
        self.keys.write().push(key);
    }

    /// Remove `key` from the alias list, returning how many aliases remain
    pub(crate) fn remove_key(&self, key: &K) -> usize {
        let mut keys = self.keys.write();
        keys.retain(|k| k != key);
        keys.len()
    }

    pub(crate) fn take_keys(&self) -> KeyList<K> {
        std::mem::take(&mut *self.keys.write())
    }
}

impl<K: CacheKey, V> std::fmt::Debug for Record<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("keys", &*self.keys.read())
            .field("locked", &self.is_locked())
            .field("refs", &self.outstanding_refs())
            .finish()
    }
}

/// A record handed out while its lock is held.
///
/// Returned by lookups (`get`) and by the `*_and_get` insertion variants.
/// The lock is released by [`LockedRecord::unlock`] or on drop. Calling
/// `unlock` on a handle that no longer holds the lock is a no-op, and
/// accessors on such a handle fail with [`Error::NilRecord`].
///
/// # Example
///
/// ```
/// use datacache_storage::Store;
///
/// let store: Store<&str, u32> = Store::new();
/// store.add(vec!["id:1", "name:alice"], 10, true).unwrap();
///
/// let mut rec = store.get(&"name:alice").unwrap();
/// *rec.payload_mut().unwrap() += 1;
/// rec.unlock();
///
/// assert_eq!(store.payload(&"id:1").unwrap(), 11);
/// ```
pub struct LockedRecord<K: CacheKey, V> {
    record: Arc<Record<K, V>>,
    guard: Option<RecordLockGuard<RecordState<V>>>,
}

impl<K: CacheKey, V> LockedRecord<K, V> {
    /// Whether this handle currently holds the record lock
    pub fn is_held(&self) -> bool {
        self.guard.is_some()
    }

    /// Release the record lock.
    ///
    /// Returns false, without doing anything, if the handle was not holding
    /// it.
    pub fn unlock(&mut self) -> bool {
        if !self.is_held() {
            tracing::warn!(keys = ?self.record.keys(), "record already unlocked");
            return false;
        }
        self.release();
        true
    }

    /// Re-acquire the record lock after [`LockedRecord::unlock`].
    ///
    /// Does nothing if the handle is already held. The record may have been
    /// unlinked from its store in the meantime; see [`Record::is_linked`].
    pub fn relock(&mut self) {
        if self.is_held() {
            return;
        }
        self.guard = Some(self.record.state.lock());
        self.record.refs.fetch_add(1, Ordering::AcqRel);
    }

    /// The shared record behind this handle
    pub fn record(&self) -> &Arc<Record<K, V>> {
        &self.record
    }

    /// Snapshot of the record's aliases
    pub fn keys(&self) -> Vec<K> {
        self.record.keys()
    }

    /// Borrow the payload
    pub fn payload(&self) -> Result<&V> {
        Ok(&self.state()?.payload)
    }

    /// Mutably borrow the payload
    pub fn payload_mut(&mut self) -> Result<&mut V> {
        Ok(&mut self.state_mut()?.payload)
    }

    /// Replace the payload, returning the previous one
    pub fn replace_payload(&mut self, payload: V) -> Result<V> {
        Ok(std::mem::replace(&mut self.state_mut()?.payload, payload))
    }

    /// Read the active flag
    pub fn is_active(&self) -> Result<bool> {
        Ok(self.state()?.active)
    }

    /// Set the active flag
    pub fn set_active(&mut self, active: bool) -> Result<()> {
        self.state_mut()?.active = active;
        Ok(())
    }

    fn state(&self) -> Result<&RecordState<V>> {
        self.guard.as_deref().ok_or(Error::NilRecord)
    }

    pub(crate) fn state_mut(&mut self) -> Result<&mut RecordState<V>> {
        self.guard.as_deref_mut().ok_or(Error::NilRecord)
    }

    fn release(&mut self) {
        if self.guard.take().is_some() {
            self.record.refs.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl<K: CacheKey, V> Drop for LockedRecord<K, V> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<K: CacheKey, V: std::fmt::Debug> std::fmt::Debug for LockedRecord<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut s = f.debug_struct("LockedRecord");
        s.field("keys", &self.keys()).field("held", &self.is_held());
        if let Some(state) = self.guard.as_deref() {
            s.field("payload", &state.payload)
                .field("active", &state.active);
        }
        s.finish()
    }
}
