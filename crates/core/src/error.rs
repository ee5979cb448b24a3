//! Error types for datacache
//!
//! Every store operation reports failure through [`Error`]. Errors are plain
//! values: the store never retries internally, and lock acquisition never
//! fails (it blocks). Re-acquiring a lock already held by the same thread is
//! a programming error, not a variant here.

use thiserror::Error;

/// All datacache errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The store has been closed; no further operations are accepted
    #[error("store is closed")]
    NilStore,

    /// The record handle no longer holds its record lock
    #[error("record is not held by this handle")]
    NilRecord,

    /// The record cannot be stored (for example, an empty alias set)
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A key already resolves to a record
    #[error("key {key} exists")]
    KeyExists {
        /// Debug rendering of the offending key
        key: String,
    },

    /// The key does not resolve to any record
    #[error("key {key} not found")]
    KeyNotFound {
        /// Debug rendering of the missing key
        key: String,
    },

    /// The one-shot load/iterate sequence has already run
    #[error("load-time sequence already executed")]
    AlreadyLoaded,

    /// A loader was required but none was registered
    #[error("no loader registered")]
    MissingLoader,

    /// An iteration handler was required but none was registered
    #[error("no iteration handler registered")]
    MissingIterator,

    /// The registered loader reported failure
    #[error("loader reported failure")]
    LoaderFailed,
}

/// Result type for datacache operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a [`Error::KeyExists`] from any debuggable key.
    pub fn key_exists(key: &impl std::fmt::Debug) -> Self {
        Error::KeyExists {
            key: format!("{:?}", key),
        }
    }

    /// Build a [`Error::KeyNotFound`] from any debuggable key.
    pub fn key_not_found(key: &impl std::fmt::Debug) -> Self {
        Error::KeyNotFound {
            key: format!("{:?}", key),
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KeyNotFound { .. })
    }

    /// Check if this error was caused by a key collision.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::KeyExists { .. })
    }

    /// Check if this error comes from the load/iterate lifecycle.
    pub fn is_lifecycle(&self) -> bool {
        matches!(
            self,
            Error::AlreadyLoaded
                | Error::MissingLoader
                | Error::MissingIterator
                | Error::LoaderFailed
        )
    }
}
