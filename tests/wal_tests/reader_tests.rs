//! Tests for WAL Reader
//!
//! These tests verify:
//! - Sequential reads and clean EOF
//! - Position tracking
//! - Partial frames surface as corruption, then the iterator stops

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use ordkv::config::WalSyncStrategy;
use ordkv::wal::{Operation, WalEntry, WalReader, WalWriter};
use ordkv::OrdError;
use tempfile::TempDir;

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn write_entries(path: &PathBuf, count: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(Operation::Put {
                key: format!("key{}", i).into_bytes(),
                value: format!("value{}", i).into_bytes(),
            })
            .unwrap();
    }
}

#[test]
fn test_read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), 0);
}

#[test]
fn test_read_missing_file_fails() {
    let (_temp, wal_path) = setup_temp_wal();
    assert!(matches!(WalReader::open(&wal_path), Err(OrdError::Io(_))));
}

#[test]
fn test_read_in_order_and_track_position() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, 3);

    let mut reader = WalReader::open(&wal_path).unwrap();
    let mut expected_pos = 0;
    for lsn in 1..=3 {
        let entry = reader.next_entry().unwrap().unwrap();
        assert_eq!(entry.lsn, lsn);
        expected_pos += entry.serialized_size().unwrap() as u64;
        assert_eq!(reader.position(), expected_pos);
    }
    assert!(reader.next_entry().unwrap().is_none());
    assert_eq!(reader.position(), std::fs::metadata(&wal_path).unwrap().len());
}

#[test]
fn test_partial_tail_is_corruption() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, 2);

    let torn = WalEntry::new(3, Operation::Delete { key: b"key0".to_vec() })
        .serialize()
        .unwrap();
    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&torn[..torn.len() / 2]).unwrap();
    drop(file);

    let results: Vec<_> = WalReader::open(&wal_path).unwrap().entries().collect();
    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    assert!(matches!(results[2], Err(OrdError::WalCorruption(_))));
}

#[test]
fn test_iterator_stops_after_error() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut file = File::create(&wal_path).unwrap();
    file.write_all(&[0xFF; 5]).unwrap();
    drop(file);

    let mut entries = WalReader::open(&wal_path).unwrap().entries();
    assert!(entries.next().unwrap().is_err());
    assert!(entries.next().is_none());
}
