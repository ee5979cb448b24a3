//! Core types for datacache
//!
//! This crate defines the vocabulary shared by the storage layer and the
//! facade:
//! - [`Error`]: the failure taxonomy returned by every store operation
//! - [`CacheKey`]: bounds a key type must satisfy to alias a record
//! - [`LifecycleState`]: the one-shot load/iterate state machine
//! - [`LoadEntry`] / [`LoadOutcome`]: what a bulk loader hands back
//! - [`StoreConfig`]: per-store configuration

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod load;
pub mod types;

pub use config::StoreConfig;
pub use error::{Error, Result};
pub use lifecycle::LifecycleState;
pub use load::{LoadEntry, LoadOutcome, Loader, RecordHandler};
pub use types::CacheKey;
