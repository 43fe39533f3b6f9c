//! Tests for MemTable
//!
//! These tests verify:
//! - Basic put/get/delete with tombstones
//! - Size tracking for flush triggers
//! - Comparator ordering and key identity
//! - Bounded range reads in both directions
//! - Concurrent readers alongside a writer

use std::ops::Bound;
use std::sync::Arc;
use std::thread;

use ordkv::comparator::ComparatorKind;
use ordkv::cursor::Direction;
use ordkv::memtable::{MemTable, MemTableEntry};

fn case_insensitive() -> MemTable {
    MemTable::new(ComparatorKind::CaseInsensitive.build())
}

fn keys(entries: &[(Vec<u8>, MemTableEntry)]) -> Vec<String> {
    entries
        .iter()
        .map(|(k, _)| String::from_utf8_lossy(k).into_owned())
        .collect()
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_put_get_delete() {
    let table = case_insensitive();
    assert!(table.is_empty());
    assert_eq!(table.get(b"key"), None);

    table.put(b"key".to_vec(), b"value".to_vec());
    assert_eq!(table.get(b"key"), Some(MemTableEntry::Value(b"value".to_vec())));

    table.put(b"key".to_vec(), b"other".to_vec());
    assert_eq!(table.get(b"key"), Some(MemTableEntry::Value(b"other".to_vec())));
    assert_eq!(table.entry_count(), 1);

    table.delete(b"key".to_vec());
    assert_eq!(table.get(b"key"), Some(MemTableEntry::Tombstone));
    assert_eq!(table.entry_count(), 1);
}

#[test]
fn test_delete_absent_key_records_tombstone() {
    let table = case_insensitive();
    table.delete(b"ghost".to_vec());
    assert_eq!(table.get(b"ghost"), Some(MemTableEntry::Tombstone));
}

#[test]
fn test_clear() {
    let table = case_insensitive();
    table.put(b"a".to_vec(), b"1".to_vec());
    table.clear();
    assert!(table.is_empty());
    assert_eq!(table.size(), 0);
}

// =============================================================================
// Size Tracking
// =============================================================================

#[test]
fn test_size_tracks_overwrites_and_tombstones() {
    let table = case_insensitive();

    assert_eq!(table.put(b"key".to_vec(), b"12345".to_vec()), 8);
    assert_eq!(table.put(b"key".to_vec(), b"1".to_vec()), 4);
    assert_eq!(table.delete(b"key".to_vec()), 3);
    assert_eq!(table.size(), 3);

    assert!(table.should_flush(3));
    assert!(!table.should_flush(4));
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn test_case_insensitive_order() {
    let table = case_insensitive();
    for key in ["Banana", "apple", "APPLE2"] {
        table.put(key.as_bytes().to_vec(), b"v".to_vec());
    }

    let ordered: Vec<String> = table
        .iter()
        .map(|(k, _)| String::from_utf8(k).unwrap())
        .collect();
    assert_eq!(ordered, vec!["apple", "APPLE2", "Banana"]);
}

#[test]
fn test_bytewise_order() {
    let table = MemTable::new(ComparatorKind::Bytewise.build());
    for key in ["Banana", "apple", "APPLE2"] {
        table.put(key.as_bytes().to_vec(), b"v".to_vec());
    }

    let ordered: Vec<String> = table
        .iter()
        .map(|(k, _)| String::from_utf8(k).unwrap())
        .collect();
    assert_eq!(ordered, vec!["APPLE2", "Banana", "apple"]);
}

#[test]
fn test_equal_keys_share_one_slot_with_latest_spelling() {
    let table = case_insensitive();
    table.put(b"apple".to_vec(), b"1".to_vec());
    table.put(b"APPLE".to_vec(), b"2".to_vec());

    assert_eq!(table.entry_count(), 1);
    assert_eq!(table.get(b"Apple"), Some(MemTableEntry::Value(b"2".to_vec())));

    let (key, _) = table.iter().next().unwrap();
    assert_eq!(key, b"APPLE".to_vec());
    assert_eq!(table.size(), 6);
}

// =============================================================================
// Range Reads
// =============================================================================

fn populated() -> MemTable {
    let table = case_insensitive();
    for key in ["a", "b", "c", "d", "e"] {
        table.put(key.as_bytes().to_vec(), key.to_uppercase().into_bytes());
    }
    table
}

#[test]
fn test_range_forward() {
    let table = populated();

    let got = table.range(Bound::Included(&b"b"[..]), Direction::Forward, 2);
    assert_eq!(keys(&got), vec!["b", "c"]);

    let got = table.range(Bound::Excluded(&b"b"[..]), Direction::Forward, 10);
    assert_eq!(keys(&got), vec!["c", "d", "e"]);

    let got = table.range(Bound::Included(&b"bb"[..]), Direction::Forward, 1);
    assert_eq!(keys(&got), vec!["c"]);

    let got = table.range(Bound::Unbounded, Direction::Forward, 1);
    assert_eq!(keys(&got), vec!["a"]);
}

#[test]
fn test_range_backward() {
    let table = populated();

    let got = table.range(Bound::Included(&b"C"[..]), Direction::Backward, 10);
    assert_eq!(keys(&got), vec!["c", "b", "a"]);

    let got = table.range(Bound::Excluded(&b"c"[..]), Direction::Backward, 1);
    assert_eq!(keys(&got), vec!["b"]);

    let got = table.range(Bound::Unbounded, Direction::Backward, 2);
    assert_eq!(keys(&got), vec!["e", "d"]);
}

#[test]
fn test_range_includes_tombstones() {
    let table = populated();
    table.delete(b"c".to_vec());

    let got = table.range(Bound::Included(&b"c"[..]), Direction::Forward, 1);
    assert_eq!(got, vec![(b"c".to_vec(), MemTableEntry::Tombstone)]);
}

#[test]
fn test_range_past_end_is_empty() {
    let table = populated();
    assert!(table.range(Bound::Included(&b"z"[..]), Direction::Forward, 10).is_empty());
    assert!(table.range(Bound::Excluded(&b"a"[..]), Direction::Backward, 10).is_empty());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_readers_with_writer() {
    let table = Arc::new(case_insensitive());
    for i in 0..100 {
        table.put(format!("key{:03}", i).into_bytes(), b"v".to_vec());
    }

    let writer = {
        let table = Arc::clone(&table);
        thread::spawn(move || {
            for i in 100..200 {
                table.put(format!("key{:03}", i).into_bytes(), b"v".to_vec());
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let table = Arc::clone(&table);
            thread::spawn(move || {
                for i in 0..100 {
                    let key = format!("KEY{:03}", i);
                    assert!(table.get(key.as_bytes()).is_some());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(table.entry_count(), 200);
}
