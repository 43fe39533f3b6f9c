//! Tests for point operations
//!
//! These tests verify:
//! - Put/get/delete round trips and idempotent deletes
//! - Comparator-equal keys address the same entry
//! - Append under both append modes

use std::sync::Arc;
use std::thread;

use ordkv::config::{AppendMode, StoreOptions};
use ordkv::Store;
use tempfile::TempDir;

use super::open_store;

#[test]
fn test_put_get_delete() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    assert_eq!(store.get(b"missing").unwrap(), None);

    store.put(b"key", b"value").unwrap();
    assert_eq!(store.get(b"key").unwrap(), Some(b"value".to_vec()));

    store.put(b"key", b"other").unwrap();
    assert_eq!(store.get(b"key").unwrap(), Some(b"other".to_vec()));

    store.delete(b"key").unwrap();
    assert_eq!(store.get(b"key").unwrap(), None);

    // Deleting again, or deleting a key that never existed, succeeds
    store.delete(b"key").unwrap();
    store.delete(b"never").unwrap();
}

#[test]
fn test_empty_value_is_a_value() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    store.put(b"k", b"").unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(Vec::new()));
}

#[test]
fn test_case_insensitive_keys_share_an_entry() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    store.put(b"Apple", b"1").unwrap();
    assert_eq!(store.get(b"apple").unwrap(), Some(b"1".to_vec()));
    assert_eq!(store.get(b"APPLE").unwrap(), Some(b"1".to_vec()));

    store.put(b"APPLE", b"2").unwrap();
    assert_eq!(store.get(b"Apple").unwrap(), Some(b"2".to_vec()));

    store.delete(b"aPpLe").unwrap();
    assert_eq!(store.get(b"apple").unwrap(), None);
}

#[test]
fn test_reads_see_flushed_data() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    store.put(b"a", b"1").unwrap();
    store.put(b"b", b"2").unwrap();
    store.flush().unwrap();
    store.delete(b"a").unwrap();

    assert_eq!(store.sstable_count(), 1);
    assert_eq!(store.get(b"a").unwrap(), None);
    assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
}

#[test]
fn test_append() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    // Absent key: append behaves like put
    store.append(b"log", b"abc").unwrap();
    assert_eq!(store.get(b"log").unwrap(), Some(b"abc".to_vec()));

    store.append(b"log", b"def").unwrap();
    assert_eq!(store.get(b"log").unwrap(), Some(b"abcdef".to_vec()));

    // Empty existing value: append behaves like put
    store.put(b"empty", b"").unwrap();
    store.append(b"empty", b"x").unwrap();
    assert_eq!(store.get(b"empty").unwrap(), Some(b"x".to_vec()));

    // Existing value in an SSTable
    store.flush().unwrap();
    store.append(b"LOG", b"!").unwrap();
    assert_eq!(store.get(b"log").unwrap(), Some(b"abcdef!".to_vec()));
}

#[test]
fn test_append_read_then_write_mode() {
    let temp = TempDir::new().unwrap();
    let options = StoreOptions {
        append_mode: AppendMode::ReadThenWrite,
        ..Default::default()
    };
    let store = Store::open(temp.path(), 0, options).unwrap();

    store.append(b"k", b"1").unwrap();
    store.append(b"k", b"2").unwrap();
    assert_eq!(store.get(b"k").unwrap(), Some(b"12".to_vec()));
}

#[test]
fn test_serialized_append_loses_no_updates() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(open_store(temp.path()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..50 {
                    store.append(b"counter", b"x").unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.get(b"counter").unwrap().unwrap().len(), 200);
}

#[test]
fn test_stats_count_operations() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    store.put(b"a", b"1").unwrap();
    store.delete(b"b").unwrap();
    store.get(b"a").unwrap();

    assert_eq!(store.stats().writes(), 2);
    assert_eq!(store.stats().reads(), 1);
    assert_eq!(store.stats().scans(), 0);
}
