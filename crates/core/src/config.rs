//! Store configuration

use serde::{Deserialize, Serialize};

/// Default number of key slots reserved up front
pub const DEFAULT_INITIAL_CAPACITY: usize = 64;

/// Configuration for a single store instance.
///
/// # Example
///
/// ```
/// use datacache_core::StoreConfig;
///
/// let config = StoreConfig::named("users").with_initial_capacity(4096);
/// assert_eq!(config.name, "users");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Name attached to log events emitted by the store
    pub name: String,
    /// Number of key slots to pre-allocate
    pub initial_capacity: usize,
}

impl StoreConfig {
    /// Default configuration with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the number of pre-allocated key slots
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: "datacache".to_string(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}
