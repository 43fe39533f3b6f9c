//! Key Comparators
//!
//! The total order over byte-string keys used by every layer of a store:
//! memtable ordering, SSTable index search, and cursor positioning.
//!
//! A comparator is chosen once when a store is created. Its name is written
//! into the store directory and checked on every later open, because the
//! physical order of persisted data depends on it.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A total order over byte-string keys
pub trait KeyComparator: Send + Sync {
    /// Compare two keys
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// Stable name persisted alongside the store's files
    fn name(&self) -> &str;
}

/// Shared comparator handle
pub type SharedComparator = Arc<dyn KeyComparator>;

/// ASCII case-insensitive compare with a length tie-break.
///
/// Bytes are compared case-folded up to the shorter length; if that prefix is
/// equal, the shorter key sorts first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaseInsensitiveComparator;

impl KeyComparator for CaseInsensitiveComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let n = a.len().min(b.len());
        for (x, y) in a[..n].iter().zip(&b[..n]) {
            match x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        a.len().cmp(&b.len())
    }

    fn name(&self) -> &str {
        "strncasecmp"
    }
}

/// Plain byte-wise compare (shorter key first on equal prefix)
#[derive(Debug, Clone, Copy, Default)]
pub struct BytewiseComparator;

impl KeyComparator for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &str {
        "memcmp"
    }
}

/// Built-in comparator selection for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComparatorKind {
    /// Case-insensitive with length tie-break
    #[default]
    CaseInsensitive,

    /// Raw byte order
    Bytewise,
}

impl ComparatorKind {
    /// Build the comparator this kind names
    pub fn build(self) -> SharedComparator {
        match self {
            ComparatorKind::CaseInsensitive => Arc::new(CaseInsensitiveComparator),
            ComparatorKind::Bytewise => Arc::new(BytewiseComparator),
        }
    }
}

impl fmt::Display for ComparatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.build().name())
    }
}

/// A key bundled with the comparator that orders it.
///
/// Lets comparator-ordered keys live in std ordered collections. All keys
/// inside one collection must share the same comparator.
#[derive(Clone)]
pub struct OrderedKey {
    bytes: Vec<u8>,
    comparator: SharedComparator,
}

impl OrderedKey {
    pub fn new(bytes: Vec<u8>, comparator: SharedComparator) -> Self {
        Self { bytes, comparator }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for OrderedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OrderedKey")
            .field(&String::from_utf8_lossy(&self.bytes))
            .finish()
    }
}

impl PartialEq for OrderedKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedKey {}

impl PartialOrd for OrderedKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.comparator.compare(&self.bytes, &other.bytes)
    }
}
