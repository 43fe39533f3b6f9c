//! Range Iteration Protocol
//!
//! Types shared by every bounded scan: where it starts, which way it walks,
//! how many entries it may return, and whether values are included.
//!
//! A scan never persists a cursor. To resume, the caller reissues a scan
//! starting at the last key it saw.

use std::fmt;
use std::str::FromStr;

use crate::cursor::{Cursor, Direction};
use crate::error::{OrdError, Result};

/// Upper bound on entries returned by one scan
pub const MAX_SCAN_COUNT: usize = 0xFFFF;

/// Where a scan starts and which way it walks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanFrom {
    /// First key >= the given key, ascending
    Forward(Vec<u8>),
    /// Last key <= the given key, descending
    Backward(Vec<u8>),
    /// Smallest key, ascending
    First,
    /// Largest key, descending
    Last,
}

impl ScanFrom {
    pub fn direction(&self) -> Direction {
        match self {
            ScanFrom::Forward(_) | ScanFrom::First => Direction::Forward,
            ScanFrom::Backward(_) | ScanFrom::Last => Direction::Backward,
        }
    }

    /// Position `cursor` at the scan's first entry
    pub(crate) fn position(&self, cursor: &mut Cursor) -> Result<()> {
        match self {
            ScanFrom::Forward(key) => cursor.seek(key),
            ScanFrom::Backward(key) => cursor.seek_for_prev(key),
            ScanFrom::First => cursor.seek_to_first(),
            ScanFrom::Last => cursor.seek_to_last(),
        }
    }
}

/// What each scanned entry carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Keys,
    KeysAndValues,
}

impl FromStr for ScanMode {
    type Err = OrdError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("keys") {
            Ok(ScanMode::Keys)
        } else if s.eq_ignore_ascii_case("keysandvalues") {
            Ok(ScanMode::KeysAndValues)
        } else {
            Err(OrdError::InvalidArgument(format!(
                "unknown iteration mode '{}', expected keys or keysandvalues",
                s
            )))
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanMode::Keys => f.write_str("keys"),
            ScanMode::KeysAndValues => f.write_str("keysandvalues"),
        }
    }
}

/// One scanned entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanItem {
    pub key: Vec<u8>,
    /// Present in `KeysAndValues` mode
    pub value: Option<Vec<u8>>,
}

impl ScanItem {
    /// Project a (key, value) pair according to `mode`
    pub fn project(key: Vec<u8>, value: Vec<u8>, mode: ScanMode) -> Self {
        match mode {
            ScanMode::Keys => Self { key, value: None },
            ScanMode::KeysAndValues => Self {
                key,
                value: Some(value),
            },
        }
    }
}

/// Validate a requested count: `1..=MAX_SCAN_COUNT`
pub fn check_count(count: i64) -> Result<usize> {
    if count < 1 || count > MAX_SCAN_COUNT as i64 {
        return Err(OrdError::InvalidArgument(format!(
            "iteration count {} out of range 1..={}",
            count, MAX_SCAN_COUNT
        )));
    }
    Ok(count as usize)
}

/// Drain up to `count` entries from a positioned cursor
pub(crate) fn collect(cursor: &mut Cursor, count: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let direction = cursor.direction();
    let mut out = Vec::with_capacity(count.min(1024));
    while out.len() < count {
        let Some((key, value)) = cursor.current() else {
            break;
        };
        out.push((key.to_vec(), value.to_vec()));
        match direction {
            Direction::Forward => cursor.next()?,
            Direction::Backward => cursor.prev()?,
        }
    }
    Ok(out)
}
