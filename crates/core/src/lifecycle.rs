//! One-shot load/iterate lifecycle
//!
//! A store starts `Unloaded`. The bulk loader may run once, moving it to
//! `Loaded`; the bulk iteration may run once after that (or instead of it),
//! moving it to `Iterated`. `Closed` is terminal and rejects everything.
//!
//! ```text
//!   Unloaded ──load──▶ Loaded ──iterate──▶ Iterated
//!      │                                      ▲
//!      ├──────────── iterate ─────────────────┤
//!      └────────── load_and_iterate ──────────┘
//!
//!   any ──close──▶ Closed
//! ```
//!
//! The state lives inside the store's lock-protected table, so every
//! transition happens under the exclusive store lock.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LifecycleState {
    /// Nothing has been loaded yet
    #[default]
    Unloaded,
    /// The bulk load has run; the bulk iteration may still run
    Loaded,
    /// The bulk iteration has run; the one-shot sequence is over
    Iterated,
    /// The store has been closed
    Closed,
}

impl LifecycleState {
    /// Check if the store has been closed
    pub fn is_closed(&self) -> bool {
        matches!(self, LifecycleState::Closed)
    }

    /// Check if the bulk load has already been consumed
    pub fn is_loaded(&self) -> bool {
        matches!(self, LifecycleState::Loaded | LifecycleState::Iterated)
    }

    /// Fail with [`Error::NilStore`] once closed
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::NilStore)
        } else {
            Ok(())
        }
    }

    /// Consume the load slot: `Unloaded → Loaded`
    pub fn begin_load(&mut self) -> Result<()> {
        match self {
            LifecycleState::Unloaded => {
                *self = LifecycleState::Loaded;
                Ok(())
            }
            LifecycleState::Closed => Err(Error::NilStore),
            LifecycleState::Loaded | LifecycleState::Iterated => Err(Error::AlreadyLoaded),
        }
    }

    /// Consume the iteration slot: `Unloaded | Loaded → Iterated`
    pub fn begin_iterate(&mut self) -> Result<()> {
        match self {
            LifecycleState::Unloaded | LifecycleState::Loaded => {
                *self = LifecycleState::Iterated;
                Ok(())
            }
            LifecycleState::Closed => Err(Error::NilStore),
            LifecycleState::Iterated => Err(Error::AlreadyLoaded),
        }
    }

    /// Consume both slots at once: `Unloaded → Iterated`
    pub fn begin_load_and_iterate(&mut self) -> Result<()> {
        match self {
            LifecycleState::Unloaded => {
                *self = LifecycleState::Iterated;
                Ok(())
            }
            LifecycleState::Closed => Err(Error::NilStore),
            LifecycleState::Loaded | LifecycleState::Iterated => Err(Error::AlreadyLoaded),
        }
    }

    /// Move to `Closed`. Returns false if already closed.
    pub fn close(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        *self = LifecycleState::Closed;
        true
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Unloaded => "unloaded",
            LifecycleState::Loaded => "loaded",
            LifecycleState::Iterated => "iterated",
            LifecycleState::Closed => "closed",
        };
        f.write_str(name)
    }
}
