//! Key bounds shared by the storage layer

use std::fmt::Debug;
use std::hash::Hash;

/// A value usable as a record alias.
///
/// Keys are hashed into the store's slot map and also kept, cloned, in each
/// record's alias list. `Debug` is used to render keys into error messages.
/// Implemented for every type meeting the bounds.
///
/// # Examples
///
/// ```
/// use datacache_core::CacheKey;
///
/// fn assert_key<K: CacheKey>() {}
/// assert_key::<String>();
/// assert_key::<u64>();
/// assert_key::<(u32, &'static str)>();
/// ```
pub trait CacheKey: Eq + Hash + Clone + Debug {}

impl<T> CacheKey for T where T: Eq + Hash + Clone + Debug {}
