//! Concurrency Tests
//!
//! Tests for thread safety:
//! - a held record delays its deletion on every unlink path
//! - *_and_get handles block concurrent lookups
//! - concurrent mutation of one record through the record lock
//! - mixed readers and writers

use crate::common::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const HOLD: Duration = Duration::from_millis(50);

/// Thread A holds "k" for 50ms; thread B deletes it meanwhile. B must not
/// return before A unlocks, and A sees a whole record for its entire hold.
#[test]
fn test_delete_waits_for_holder() {
    let cache = create_cache();
    cache.add(keys(&["k", "k2"]), User::new("held"), true).unwrap();

    let released = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(2));

    let holder = {
        let cache = cache.clone();
        let released = Arc::clone(&released);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            let mut rec = cache.get(&key("k")).unwrap();
            barrier.wait();

            let start = Instant::now();
            while start.elapsed() < HOLD {
                assert_eq!(rec.keys(), keys(&["k", "k2"]));
                assert_eq!(rec.payload().unwrap().name, "held");
                thread::sleep(Duration::from_millis(5));
            }
            released.store(true, Ordering::SeqCst);
            rec.unlock();
        })
    };

    let deleter = {
        let cache = cache.clone();
        let released = Arc::clone(&released);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            let remaining = cache.delete_rec(&key("k")).unwrap();
            assert!(released.load(Ordering::SeqCst), "delete returned before holder unlocked");
            remaining
        })
    };

    holder.join().unwrap();
    assert_eq!(deleter.join().unwrap(), 0);

    assert!(cache.get(&key("k")).unwrap_err().is_not_found());
    assert!(cache.get(&key("k2")).unwrap_err().is_not_found());
}

/// Hold `k` on another thread for 50ms and run `op` meanwhile. Asserts that
/// `op` does not return before the holder unlocks and that the holder sees
/// the record unchanged for its whole hold.
fn assert_waits_for_holder<R>(cache: &UserCache, k: &str, op: impl FnOnce(&UserCache) -> R) -> R {
    let released = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(2));

    let holder = {
        let cache = cache.clone();
        let released = Arc::clone(&released);
        let barrier = Arc::clone(&barrier);
        let k = key(k);
        thread::spawn(move || {
            let mut rec = cache.get(&k).unwrap();
            let aliases = rec.keys();
            let payload = rec.payload().unwrap().clone();
            barrier.wait();

            let start = Instant::now();
            while start.elapsed() < HOLD {
                assert_eq!(rec.keys(), aliases);
                assert_eq!(rec.payload().unwrap(), &payload);
                thread::sleep(Duration::from_millis(5));
            }
            released.store(true, Ordering::SeqCst);
            rec.unlock();
        })
    };

    barrier.wait();
    let out = op(cache);
    assert!(released.load(Ordering::SeqCst), "returned before holder unlocked");
    holder.join().unwrap();
    out
}

#[test]
fn test_delete_cache_waits_for_holder() {
    let cache = create_cache();
    cache.add(keys(&["k", "k2"]), User::new("held"), true).unwrap();
    cache.add(keys(&["other"]), User::new("free"), true).unwrap();

    let removed = assert_waits_for_holder(&cache, "k", |c| c.delete_cache().unwrap());
    assert_eq!(removed, 2);
    assert_eq!(cache.count().unwrap(), 0);
    assert_eq!(cache.len_keys().unwrap(), 0);
}

#[test]
fn test_close_waits_for_holder() {
    let cache = create_cache();
    cache.add(keys(&["k"]), User::new("held"), true).unwrap();

    let removed = assert_waits_for_holder(&cache, "k", |c| c.close());
    assert_eq!(removed, 1);
    assert_eq!(cache.get(&key("k")).unwrap_err(), Error::NilStore);
}

#[test]
fn test_force_add_orphaning_held_record_waits_for_holder() {
    let cache = create_cache();
    cache.add(keys(&["k"]), User::new("held"), true).unwrap();

    let count = assert_waits_for_holder(&cache, "k", |c| {
        c.force_add(keys(&["k"]), User::new("replacement")).unwrap()
    });
    assert_eq!(count, 1);
    assert_eq!(cache.payload(&key("k")).unwrap().name, "replacement");
}

#[test]
fn test_delete_last_alias_waits_for_holder() {
    let cache = create_cache();
    cache.add(keys(&["k"]), User::new("held"), true).unwrap();
    cache.add(keys(&["other"]), User::new("free"), true).unwrap();

    assert_waits_for_holder(&cache, "k", |c| c.delete_key(&key("k")).unwrap());
    assert!(cache.get(&key("k")).unwrap_err().is_not_found());
    assert_eq!(cache.count().unwrap(), 1);
}

#[test]
fn test_add_and_get_blocks_concurrent_get() {
    let cache = create_cache();
    let (_, mut rec) = cache.add_and_get(keys(&["k"]), User::new("fresh"), true).unwrap();

    let acquired = Arc::new(AtomicBool::new(false));
    let reader = {
        let cache = cache.clone();
        let acquired = Arc::clone(&acquired);
        thread::spawn(move || {
            let rec = cache.get(&key("k")).unwrap();
            acquired.store(true, Ordering::SeqCst);
            let visits = rec.payload().unwrap().visits;
            visits
        })
    };

    thread::sleep(HOLD);
    assert!(!acquired.load(Ordering::SeqCst), "get returned while record was held");

    rec.payload_mut().unwrap().visits = 9;
    rec.unlock();

    assert_eq!(reader.join().unwrap(), 9);
    assert!(acquired.load(Ordering::SeqCst));
}

#[test]
fn test_record_lock_serializes_updates() {
    const THREADS: usize = 8;
    const INCREMENTS: u32 = 200;

    let cache = create_cache();
    cache.add(keys(&["counter", "alias"]), User::new("c"), true).unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            let k = if t % 2 == 0 { "counter" } else { "alias" };
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..INCREMENTS {
                    let mut rec = cache.get(&key(k)).unwrap();
                    rec.payload_mut().unwrap().visits += 1;
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(
        cache.payload(&key("counter")).unwrap().visits,
        THREADS as u32 * INCREMENTS
    );
}

#[test]
fn test_concurrent_adds_and_reads() {
    const WRITERS: usize = 4;
    const READERS: usize = 4;
    const PER_WRITER: usize = 250;

    let cache = create_cache();
    let barrier = Arc::new(Barrier::new(WRITERS + READERS));

    let writers: Vec<_> = (0..WRITERS)
        .map(|w| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_WRITER {
                    let id = format!("id:{}:{}", w, i);
                    let mail = format!("mail:{}:{}", w, i);
                    cache.add(vec![id, mail], User::new("w"), true).unwrap();
                }
            })
        })
        .collect();

    let readers: Vec<_> = (0..READERS)
        .map(|r| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..PER_WRITER {
                    let id = format!("id:{}:{}", r % WRITERS, i);
                    // Either not there yet or fully linked under both aliases.
                    if let Ok(rec) = cache.get(&id) {
                        assert_eq!(rec.keys().len(), 2);
                    }
                }
            })
        })
        .collect();

    for h in writers.into_iter().chain(readers) {
        h.join().unwrap();
    }

    assert_eq!(cache.count().unwrap(), WRITERS * PER_WRITER);
    assert_eq!(cache.len_keys().unwrap(), 2 * WRITERS * PER_WRITER);
}

#[test]
fn test_concurrent_delete_of_same_record() {
    let cache = create_cache();
    cache.add(keys(&["a", "b", "c"]), User::new("x"), true).unwrap();

    let barrier = Arc::new(Barrier::new(3));
    let handles: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|k| {
            let cache = cache.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                cache.delete_rec(&key(k)).is_ok()
            })
        })
        .collect();

    let successes = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(cache.count().unwrap(), 0);
}

#[cfg(debug_assertions)]
#[test]
#[should_panic(expected = "not reentrant")]
fn test_relocking_held_record_panics_in_debug() {
    let cache = create_cache();
    cache.add(keys(&["a", "b"]), User::new("x"), true).unwrap();

    let _held = cache.get(&key("a")).unwrap();
    let _again = cache.get(&key("b"));
}
