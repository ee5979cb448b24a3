//! Storage layer for datacache
//!
//! This crate implements the in-memory record store:
//! - Store: key → record map behind a reader/writer lock
//! - Record: shared entry with its own non-reentrant lock
//! - Aliasing: several keys resolving to one record
//! - One-shot bulk load and iteration, plus repeatable traversal
//! - Lock primitives for composing operations under one acquisition

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lifecycle;
pub mod record;
pub mod store;
mod table;

pub use lifecycle::LifecycleReport;
pub use record::{LockedRecord, Record};
pub use store::{Store, StoreReadGuard, StoreWriteGuard};
