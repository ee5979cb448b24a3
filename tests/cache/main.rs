//! Cache Integration Tests
//!
//! Tests for the datacache facade: CRUD, aliasing, lifecycle, locking
//! behaviour across threads and counter invariants.


mod aliasing;
mod concurrency;
