//! Bulk loader and iteration handler types
//!
//! A store is created with two optional callbacks: a loader that produces
//! the initial records, and a handler applied to every payload once the
//! store is populated. Both run at most once per store.

/// One record produced by a loader: its aliases and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadEntry<K, V> {
    /// Every alias the record is reachable through
    pub keys: Vec<K>,
    /// The record's payload
    pub payload: V,
}

impl<K, V> LoadEntry<K, V> {
    /// Create a new entry
    pub fn new(keys: impl IntoIterator<Item = K>, payload: V) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            payload,
        }
    }
}

/// What a loader hands back: a success flag and the entries to link.
///
/// A failed outcome aborts the load with `Error::LoaderFailed`; its entries
/// are discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOutcome<K, V> {
    /// Whether the loader succeeded
    pub success: bool,
    /// Records to link into the store
    pub entries: Vec<LoadEntry<K, V>>,
}

impl<K, V> LoadOutcome<K, V> {
    /// A successful outcome carrying `entries`
    pub fn ok(entries: Vec<LoadEntry<K, V>>) -> Self {
        Self {
            success: true,
            entries,
        }
    }

    /// A failed outcome
    pub fn failed() -> Self {
        Self {
            success: false,
            entries: Vec::new(),
        }
    }
}

impl<K, V> FromIterator<LoadEntry<K, V>> for LoadOutcome<K, V> {
    fn from_iter<I: IntoIterator<Item = LoadEntry<K, V>>>(iter: I) -> Self {
        Self::ok(iter.into_iter().collect())
    }
}

/// Bulk loader callback. Invoked at most once.
pub type Loader<K, V> = Box<dyn FnOnce() -> LoadOutcome<K, V> + Send>;

/// Per-record iteration handler, applied to each payload during the
/// one-shot iteration.
pub type RecordHandler<V> = Box<dyn FnMut(&mut V) + Send>;
