//! Tests for the cache overlay in front of a store
//!
//! These tests verify:
//! - Read-through and write-through with the policy enabled
//! - Expiry measured on a controllable clock
//! - A disabled policy never reads or fills the cache
//! - Writes and deletes invalidate cached entries under any policy
//! - Concurrent fills never leave a stale value behind
//! - The cache stays within its configured capacity

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ordkv::cache::{CachePolicy, ManualClock};
use ordkv::config::StoreOptions;
use ordkv::{Database, ScanFrom, ScanMode};
use tempfile::TempDir;

fn open(temp: &TempDir) -> (Database, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let db = Database::open_with_clock(temp.path(), 0, StoreOptions::default(), clock.clone())
        .unwrap();
    (db, clock)
}

#[test]
fn test_write_through_serves_reads_from_cache() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);
    let policy = CachePolicy::enabled(0);

    db.set(&policy, b"k", b"v").unwrap();
    let reads = db.store().stats().reads();

    assert_eq!(db.get(&policy, b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.get(&policy, b"K").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.store().stats().reads(), reads);
    assert_eq!(db.cache().stats().hits(), 2);
}

#[test]
fn test_read_through_fills_cache() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);

    db.set(&CachePolicy::disabled(), b"k", b"v").unwrap();
    assert!(db.cache().is_empty());

    let policy = CachePolicy::enabled(0);
    assert_eq!(db.get(&policy, b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.store().stats().reads(), 1);

    assert_eq!(db.get(&policy, b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.store().stats().reads(), 1);

    // Absent keys are not cached
    assert_eq!(db.get(&policy, b"missing").unwrap(), None);
    assert_eq!(db.cache().len(), 1);
}

#[test]
fn test_entries_expire() {
    let temp = TempDir::new().unwrap();
    let (db, clock) = open(&temp);
    let policy = CachePolicy::enabled(1);

    db.set(&policy, b"k", b"v").unwrap();
    assert_eq!(db.get(&policy, b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.store().stats().reads(), 0);

    clock.advance(Duration::from_secs(2));

    // Expired entry falls through to the store, which still has the value
    assert_eq!(db.get(&policy, b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.store().stats().reads(), 1);
    assert_eq!(db.cache().stats().expirations(), 1);
}

#[test]
fn test_zero_expiry_never_expires() {
    let temp = TempDir::new().unwrap();
    let (db, clock) = open(&temp);
    let policy = CachePolicy::enabled(0);

    db.set(&policy, b"k", b"v").unwrap();
    clock.advance(Duration::from_secs(365 * 24 * 3600));

    assert_eq!(db.get(&policy, b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.store().stats().reads(), 0);
}

#[test]
fn test_disabled_policy_skips_cache() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);
    let policy = CachePolicy::disabled();

    db.set(&policy, b"k", b"v").unwrap();
    db.get(&policy, b"k").unwrap();
    db.iterate(&policy, &ScanFrom::First, 10, ScanMode::Keys).unwrap();

    assert!(db.cache().is_empty());
    assert_eq!(db.cache().stats().misses(), 0);
    assert_eq!(db.store().stats().reads(), 1);
}

#[test]
fn test_delete_invalidates() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);
    let policy = CachePolicy::enabled(0);

    db.set(&policy, b"k", b"v").unwrap();
    db.delete(&policy, b"K").unwrap();

    assert!(db.cache().is_empty());
    assert_eq!(db.get(&policy, b"k").unwrap(), None);
}

#[test]
fn test_append_invalidates() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);
    let policy = CachePolicy::enabled(0);

    db.set(&policy, b"k", b"ab").unwrap();
    db.append(&policy, b"k", b"cd").unwrap();

    assert!(db.cache().is_empty());
    assert_eq!(db.get(&policy, b"k").unwrap(), Some(b"abcd".to_vec()));
}

#[test]
fn test_iterate_populates_cache() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);
    let off = CachePolicy::disabled();
    let on = CachePolicy::enabled(0);

    db.set(&off, b"a", b"1").unwrap();
    db.set(&off, b"b", b"2").unwrap();
    db.set(&off, b"c", b"3").unwrap();

    let items = db.iterate(&on, &ScanFrom::First, 2, ScanMode::Keys).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].key, b"a".to_vec());
    assert_eq!(items[0].value, None);

    // Cached even in keys-only mode
    assert_eq!(db.cache().len(), 2);
    assert_eq!(db.get(&on, b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(db.store().stats().reads(), 0);
}

#[test]
fn test_cache_shared_across_policies() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);

    // One connection fills the cache, another with the cache on reads it
    db.set(&CachePolicy::enabled(0), b"k", b"v").unwrap();
    assert_eq!(db.get(&CachePolicy::enabled(5), b"k").unwrap(), Some(b"v".to_vec()));
    assert_eq!(db.store().stats().reads(), 0);
}

#[test]
fn test_disabled_writes_invalidate_cached_entry() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);
    let on = CachePolicy::enabled(0);
    let off = CachePolicy::disabled();

    db.set(&on, b"k", b"v1").unwrap();
    db.delete(&off, b"k").unwrap();
    assert_eq!(db.get(&on, b"k").unwrap(), None);

    db.set(&on, b"k", b"v1").unwrap();
    db.set(&off, b"K", b"v2").unwrap();
    assert_eq!(db.get(&on, b"k").unwrap(), Some(b"v2".to_vec()));

    db.append(&off, b"k", b"3").unwrap();
    assert_eq!(db.get(&on, b"k").unwrap(), Some(b"v23".to_vec()));
}

#[test]
fn test_concurrent_fill_never_caches_stale_value() {
    let temp = TempDir::new().unwrap();
    let (db, _clock) = open(&temp);
    let db = Arc::new(db);
    let on = CachePolicy::enabled(0);

    db.set(&on, b"k", b"00000").unwrap();

    // Writes through a disabled policy drop the cached copy, so the reader
    // keeps taking the miss-and-fill path while values change under it
    let writer = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            for i in 1..=2000u32 {
                let policy = if i % 2 == 0 {
                    CachePolicy::enabled(0)
                } else {
                    CachePolicy::disabled()
                };
                db.set(&policy, b"k", format!("{:05}", i).as_bytes()).unwrap();
            }
        })
    };

    let reader = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            let on = CachePolicy::enabled(0);
            let mut last = 0u32;
            for _ in 0..4000 {
                let value = db.get(&on, b"k").unwrap().unwrap();
                let seen: u32 = String::from_utf8(value).unwrap().parse().unwrap();
                assert!(seen >= last, "read went back from {} to {}", last, seen);
                last = seen;
            }
        })
    };

    writer.join().unwrap();
    reader.join().unwrap();

    assert_eq!(db.store().get(b"k").unwrap(), Some(b"02000".to_vec()));
    assert_eq!(db.get(&on, b"k").unwrap(), Some(b"02000".to_vec()));
}

#[test]
fn test_cache_capacity_bounds_entries() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new());
    let options = StoreOptions {
        cache_capacity: 2,
        ..Default::default()
    };
    let db = Database::open_with_clock(temp.path(), 0, options, clock.clone()).unwrap();

    db.set(&CachePolicy::enabled(1), b"a", b"1").unwrap();
    db.set(&CachePolicy::enabled(0), b"b", b"2").unwrap();
    clock.advance(Duration::from_secs(2));

    // "a" has expired, so it goes before live "b"
    db.set(&CachePolicy::enabled(0), b"c", b"3").unwrap();
    assert_eq!(db.cache().len(), 2);
    assert_eq!(db.cache().stats().evictions(), 0);

    // Both remaining entries are live; the oldest write is evicted
    db.set(&CachePolicy::enabled(0), b"d", b"4").unwrap();
    assert_eq!(db.cache().len(), 2);
    assert_eq!(db.cache().stats().evictions(), 1);
    assert_eq!(db.cache().get(b"b"), None);

    // Evicted keys are still served by the store
    let on = CachePolicy::enabled(0);
    assert_eq!(db.get(&on, b"b").unwrap(), Some(b"2".to_vec()));
    assert!(db.cache().len() <= 2);
}
