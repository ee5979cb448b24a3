//! Aliasing Tests
//!
//! Tests for multi-key records:
//! - re-adding aliases
//! - forced displacement of existing aliases
//! - the u1/e1/u2 walkthrough

use crate::common::*;
use std::sync::Arc;

#[test]
fn test_alias_walkthrough() {
    let cache = create_cache();

    assert_eq!(cache.add(keys(&["u1", "e1"]), User::new("A"), true).unwrap(), 1);

    let err = cache.add(keys(&["u1"]), User::new("B"), true).unwrap_err();
    assert!(matches!(err, Error::KeyExists { .. }));
    assert_eq!(cache.count().unwrap(), 1);

    cache.re_add(&key("u1"), key("u2")).unwrap();
    assert_eq!(cache.get(&key("u2")).unwrap().payload().unwrap().name, "A");
    assert_eq!(cache.count().unwrap(), 1);

    assert_eq!(cache.delete_rec(&key("e1")).unwrap(), 0);
    for k in ["u1", "e1", "u2"] {
        assert!(cache.get(&key(k)).unwrap_err().is_not_found());
    }
    assert_eq!(cache.len_keys().unwrap(), 0);
}

#[test]
fn test_aliases_share_one_record() {
    let cache = create_cache();
    cache.add(keys(&["id:1", "mail:a"]), User::new("a"), true).unwrap();
    cache.re_add(&key("mail:a"), key("name:a")).unwrap();

    let first = cache.get(&key("id:1")).unwrap();
    let record = Arc::clone(first.record());
    drop(first);
    let second = cache.get(&key("name:a")).unwrap();
    assert!(Arc::ptr_eq(&record, second.record()));
    assert_eq!(second.keys(), keys(&["id:1", "mail:a", "name:a"]));
}

#[test]
fn test_re_add_missing_source() {
    let cache = create_cache();
    let err = cache.re_add(&key("nope"), key("alias")).unwrap_err();
    assert!(err.is_not_found());
    assert!(!cache.contains_key(&key("alias")).unwrap());
}

#[test]
fn test_re_add_onto_other_record_fails() {
    let cache = create_cache();
    cache.add(keys(&["a"]), User::new("a"), true).unwrap();
    cache.add(keys(&["b"]), User::new("b"), true).unwrap();

    assert!(cache.re_add(&key("a"), key("b")).unwrap_err().is_conflict());
    assert_eq!(cache.payload(&key("b")).unwrap().name, "b");

    // Re-adding an alias the record already has is a no-op.
    assert_eq!(cache.re_add(&key("a"), key("a")).unwrap(), 2);
    assert_eq!(cache.get(&key("a")).unwrap().keys(), keys(&["a"]));
}

#[test]
fn test_re_add_and_get_is_locked() {
    let cache = create_cache();
    cache.add(keys(&["a"]), User::new("a"), true).unwrap();

    let (count, rec) = cache.re_add_and_get(&key("a"), key("b")).unwrap();
    assert_eq!(count, 1);
    assert!(rec.record().is_locked());
    assert_eq!(rec.keys(), keys(&["a", "b"]));
}

#[test]
fn test_force_add_moves_existing_aliases() {
    let cache = create_cache();
    cache.add(keys(&["u1", "e1", "p1"]), User::new("old"), true).unwrap();

    let count = cache.force_add(keys(&["x1", "e1"]), User::new("new")).unwrap();
    assert_eq!(count, 2);

    assert_eq!(cache.payload(&key("e1")).unwrap().name, "new");
    assert_eq!(cache.payload(&key("u1")).unwrap().name, "old");
    // Only the displaced key left the old record.
    assert_eq!(cache.get(&key("p1")).unwrap().keys(), keys(&["u1", "p1"]));
    assert_eq!(cache.get(&key("x1")).unwrap().keys(), keys(&["x1", "e1"]));
}

#[test]
fn test_force_add_orphaning_old_record() {
    let cache = create_cache();
    cache.add(keys(&["u1"]), User::new("old"), true).unwrap();

    let (count, rec) = cache.force_add_and_get(keys(&["u1"]), User::new("new")).unwrap();
    assert_eq!(count, 1);
    assert_eq!(rec.payload().unwrap().name, "new");
    drop(rec);
    assert_eq!(cache.len_keys().unwrap(), 1);
}

#[test]
fn test_unchecked_add_matches_force_add() {
    let cache = create_cache();
    cache.add(keys(&["a", "b"]), User::new("first"), true).unwrap();
    cache.add(keys(&["b", "c"]), User::new("second"), false).unwrap();

    assert_eq!(cache.count().unwrap(), 2);
    assert_eq!(cache.payload(&key("a")).unwrap().name, "first");
    assert_eq!(cache.payload(&key("b")).unwrap().name, "second");
}

#[test]
fn test_duplicate_keys_in_one_add() {
    let cache = create_cache();
    cache.add(keys(&["a", "a", "b"]), User::new("dup"), true).unwrap();
    assert_eq!(cache.len_keys().unwrap(), 2);
    assert_eq!(cache.get(&key("b")).unwrap().keys(), keys(&["a", "b"]));
}

#[test]
fn test_delete_last_alias_unlinks_record() {
    let cache = create_cache();
    cache.add(keys(&["a", "b"]), User::new("x"), true).unwrap();
    cache.add(keys(&["c"]), User::new("y"), true).unwrap();

    cache.delete_key(&key("a")).unwrap();
    assert_eq!(cache.count().unwrap(), 2);
    cache.delete_key(&key("b")).unwrap();
    assert_eq!(cache.count().unwrap(), 1);
}
