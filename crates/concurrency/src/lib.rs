//! Concurrency primitives for datacache
//!
//! This crate provides the record-level lock used underneath the store's
//! coarse reader/writer lock:
//! - RecordLock: non-reentrant mutex handing out owned guards
//! - RecordLockGuard: guard that can outlive the borrow it came from
//! - Rendezvous: blocking acquire-then-release used before unlinking
//! - Debug-only owner tracking that turns same-thread relocking into a panic

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod record_lock;

pub use record_lock::{RecordLock, RecordLockGuard};
