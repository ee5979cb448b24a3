//! Record lock
//!
//! Fine-grained mutual exclusion for a single record, independent of the
//! store lock. A successful lookup hands the caller a record that is already
//! locked, and the caller releases it whenever it is done, possibly long
//! after the store lock has been dropped. The guard therefore owns a
//! reference to the mutex instead of borrowing it.
//!
//! ## Reentrancy
//!
//! The lock is not reentrant. A thread that locks a record it already holds
//! deadlocks. With `debug_assertions` enabled the lock remembers its owning
//! thread and panics on such an attempt so the bug shows up as a stack trace
//! instead of a hang. Release builds carry no owner bookkeeping.
//!
//! ## Rendezvous
//!
//! [`RecordLock::rendezvous`] blocks until the lock can be taken and then
//! releases it immediately. The store calls it before unlinking a record:
//! any thread holding the record from an earlier lookup finishes first.

use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Tracks which thread currently holds a [`RecordLock`].
///
/// Compiled down to nothing without `debug_assertions`.
#[derive(Debug, Default)]
struct Owner {
    #[cfg(debug_assertions)]
    thread: Mutex<Option<std::thread::ThreadId>>,
}

impl Owner {
    #[inline]
    fn assert_not_held_by_current_thread(&self) {
        #[cfg(debug_assertions)]
        {
            let current = std::thread::current().id();
            if *self.thread.lock() == Some(current) {
                panic!(
                    "record lock re-acquired by the thread that already holds it ({:?}); \
                     record locks are not reentrant",
                    current
                );
            }
        }
    }

    #[inline]
    fn claim(&self) {
        #[cfg(debug_assertions)]
        {
            *self.thread.lock() = Some(std::thread::current().id());
        }
    }

    #[inline]
    fn release(&self) {
        #[cfg(debug_assertions)]
        {
            *self.thread.lock() = None;
        }
    }

    #[cfg(debug_assertions)]
    fn is_current_thread(&self) -> bool {
        *self.thread.lock() == Some(std::thread::current().id())
    }
}

/// Non-reentrant mutex guarding one record's mutable state.
///
/// # Example
///
/// ```
/// use datacache_concurrency::RecordLock;
///
/// let lock = RecordLock::new(1u32);
/// let mut guard = lock.lock();
/// *guard += 1;
/// assert!(lock.is_locked());
/// drop(guard);
/// assert!(!lock.is_locked());
/// ```
pub struct RecordLock<T> {
    data: Arc<Mutex<T>>,
    owner: Arc<Owner>,
}

impl<T> RecordLock<T> {
    /// Create a new unlocked record lock
    pub fn new(value: T) -> Self {
        Self {
            data: Arc::new(Mutex::new(value)),
            owner: Arc::new(Owner::default()),
        }
    }

    /// Acquire the lock, blocking until it is available.
    ///
    /// # Panics
    ///
    /// With `debug_assertions`, panics if the calling thread already holds
    /// this lock. Without them, that situation deadlocks.
    pub fn lock(&self) -> RecordLockGuard<T> {
        self.owner.assert_not_held_by_current_thread();
        let guard = self.data.lock_arc();
        self.owner.claim();
        RecordLockGuard {
            guard,
            owner: Arc::clone(&self.owner),
        }
    }

    /// Acquire the lock only if it is free right now
    pub fn try_lock(&self) -> Option<RecordLockGuard<T>> {
        let guard = self.data.try_lock_arc()?;
        self.owner.claim();
        Some(RecordLockGuard {
            guard,
            owner: Arc::clone(&self.owner),
        })
    }

    /// Check whether some thread currently holds the lock
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.data.is_locked()
    }

    /// Check whether the calling thread holds the lock.
    ///
    /// Only tracked with `debug_assertions`; always false otherwise.
    pub fn is_held_by_current_thread(&self) -> bool {
        #[cfg(debug_assertions)]
        {
            self.owner.is_current_thread()
        }
        #[cfg(not(debug_assertions))]
        {
            false
        }
    }

    /// Block until every current holder has released the lock, then return
    /// without holding it.
    ///
    /// # Panics
    ///
    /// With `debug_assertions`, panics if the calling thread holds the lock.
    pub fn rendezvous(&self) {
        if self.data.is_locked() {
            tracing::debug!("waiting for record holder before unlink");
        }
        drop(self.lock());
    }
}

impl<T: Default> Default for RecordLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> std::fmt::Debug for RecordLock<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLock")
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Owned guard over a [`RecordLock`].
///
/// Releases the lock on drop. The guard is tied to the thread that took it
/// and cannot be sent elsewhere.
pub struct RecordLockGuard<T> {
    guard: ArcMutexGuard<RawMutex, T>,
    owner: Arc<Owner>,
}

impl<T> Deref for RecordLockGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for RecordLockGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for RecordLockGuard<T> {
    fn drop(&mut self) {
        // Owner is cleared before the mutex itself is released.
        self.owner.release();
    }
}
