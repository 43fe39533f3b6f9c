//! Tests for opening, recovery and maintenance
//!
//! These tests verify:
//! - Data survives close and reopen, and WAL replay after an unclean stop
//! - The comparator recorded in a store directory is enforced
//! - Size-triggered flush, full compaction and the repair stub

use std::fs;

use ordkv::comparator::ComparatorKind;
use ordkv::config::StoreOptions;
use ordkv::{OrdError, ScanFrom, Store};
use tempfile::TempDir;

use super::{open_store, pairs};

#[test]
fn test_store_directory_layout() {
    let temp = TempDir::new().unwrap();
    let store = Store::open(temp.path(), 3, StoreOptions::default()).unwrap();

    assert_eq!(store.db_id(), 3);
    assert_eq!(store.path(), temp.path().join("3"));
    assert!(store.path().join("wal.log").exists());
    assert!(store.path().join("sstables").is_dir());

    let recorded = fs::read_to_string(store.path().join("COMPARATOR")).unwrap();
    assert_eq!(recorded.trim(), ComparatorKind::CaseInsensitive.build().name());
}

#[test]
fn test_reopen_after_close() {
    let temp = TempDir::new().unwrap();
    {
        let store = open_store(temp.path());
        store.put(b"a", b"1").unwrap();
        store.put(b"b", b"2").unwrap();
        store.delete(b"a").unwrap();
        store.close().unwrap();
    }

    let store = open_store(temp.path());
    assert_eq!(store.get(b"a").unwrap(), None);
    assert_eq!(store.get(b"b").unwrap(), Some(b"2".to_vec()));
    assert_eq!(store.memtable_entry_count(), 0);
}

#[test]
fn test_wal_replay_after_unclean_stop() {
    let temp = TempDir::new().unwrap();
    {
        let store = open_store(temp.path());
        store.put(b"x", b"1").unwrap();
        store.append(b"x", b"2").unwrap();
        // Dropped without close: entries live only in the WAL
        assert_eq!(store.sstable_count(), 0);
    }

    let store = open_store(temp.path());
    assert_eq!(store.get(b"x").unwrap(), Some(b"12".to_vec()));
    assert_eq!(store.sstable_count(), 1);
}

#[test]
fn test_comparator_mismatch_fails_open() {
    let temp = TempDir::new().unwrap();
    open_store(temp.path()).close().unwrap();

    let options = StoreOptions {
        comparator: ComparatorKind::Bytewise,
        ..Default::default()
    };
    let result = Store::open(temp.path(), 0, options);
    assert!(matches!(result, Err(OrdError::OpenFailed { .. })));

    // The comparator it was created with still opens it
    open_store(temp.path());
}

#[test]
fn test_open_failure_is_reported() {
    let temp = TempDir::new().unwrap();
    // A file where the store directory should be
    fs::write(temp.path().join("0"), b"not a directory").unwrap();

    let result = Store::open(temp.path(), 0, StoreOptions::default());
    assert!(matches!(result, Err(OrdError::OpenFailed { .. })));
}

#[test]
fn test_size_triggered_flush() {
    let temp = TempDir::new().unwrap();
    let options = StoreOptions {
        write_buffer_size: 256,
        ..Default::default()
    };
    let store = Store::open(temp.path(), 0, options).unwrap();

    for i in 0..20 {
        store
            .put(format!("key{:02}", i).as_bytes(), &[b'v'; 32])
            .unwrap();
    }

    assert!(store.sstable_count() >= 1);
    assert!(store.memtable_size() < 256);
    assert_eq!(store.scan(&ScanFrom::First, 100).unwrap().len(), 20);
}

#[test]
fn test_sstable_limit_triggers_compaction() {
    let temp = TempDir::new().unwrap();
    let options = StoreOptions {
        max_open_files: 2,
        ..Default::default()
    };
    let store = Store::open(temp.path(), 0, options).unwrap();

    for i in 0..3 {
        store.put(format!("k{}", i).as_bytes(), b"v").unwrap();
        store.flush().unwrap();
    }

    assert_eq!(store.sstable_count(), 1);
    assert_eq!(store.scan(&ScanFrom::First, 10).unwrap().len(), 3);
}

#[test]
fn test_compact() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    store.put(b"a", b"1").unwrap();
    store.put(b"b", b"1").unwrap();
    store.flush().unwrap();
    store.put(b"a", b"2").unwrap();
    store.delete(b"b").unwrap();
    store.flush().unwrap();
    store.put(b"c", b"3").unwrap();
    assert_eq!(store.sstable_count(), 2);

    store.compact().unwrap();

    assert_eq!(store.sstable_count(), 1);
    assert_eq!(store.memtable_entry_count(), 0);
    assert_eq!(
        store.scan(&ScanFrom::First, 10).unwrap(),
        pairs(&[("a", "2"), ("c", "3")])
    );
}

#[test]
fn test_compact_empty_store() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    store.compact().unwrap();
    assert_eq!(store.sstable_count(), 0);
}

#[test]
fn test_repair_not_implemented() {
    let temp = TempDir::new().unwrap();
    let store = open_store(temp.path());

    assert!(matches!(store.repair(), Err(OrdError::NotImplemented(_))));
}
