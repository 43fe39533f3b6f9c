//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency, ordered by the
//! store's comparator.

use std::collections::BTreeMap;
use std::ops::Bound;

use parking_lot::RwLock;

use crate::comparator::{ComparatorKind, OrderedKey, SharedComparator};
use crate::cursor::Direction;

use super::MemTableEntry;

/// Map plus its approximate byte size, guarded together
#[derive(Default)]
struct Inner {
    data: BTreeMap<OrderedKey, MemTableEntry>,
    size: usize,
}

/// In-memory table for recent writes
pub struct MemTable {
    inner: RwLock<Inner>,
    comparator: SharedComparator,
}

impl MemTable {
    /// Create a new empty MemTable ordered by `comparator`
    pub fn new(comparator: SharedComparator) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            comparator,
        }
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &[u8]) -> Option<MemTableEntry> {
        let lookup = self.ordered(key.to_vec());
        self.inner.read().data.get(&lookup).cloned()
    }

    /// Put a key-value pair (write lock), returning the new approximate size
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Value(value))
    }

    /// Delete a key (write lock, inserts tombstone), returning the new size
    pub fn delete(&self, key: Vec<u8>) -> usize {
        self.insert(key, MemTableEntry::Tombstone)
    }

    fn insert(&self, key: Vec<u8>, entry: MemTableEntry) -> usize {
        let added = key.len() + entry.value_len();
        let key = self.ordered(key);

        let mut inner = self.inner.write();
        // Remove first so the most recent spelling of an equal key is kept
        if let Some((old_key, old_entry)) = inner.data.remove_entry(&key) {
            inner.size -= old_key.as_bytes().len() + old_entry.value_len();
        }
        inner.data.insert(key, entry);
        inner.size += added;
        inner.size
    }

    /// Get approximate size in bytes
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    /// Get entry count (tombstones included)
    pub fn entry_count(&self) -> usize {
        self.inner.read().data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    /// Check if should flush (size >= limit)
    pub fn should_flush(&self, size_limit: usize) -> bool {
        self.size() >= size_limit
    }

    /// Snapshot of all entries in key order (for flush)
    pub fn iter(&self) -> MemTableIterator {
        let inner = self.inner.read();
        let entries: Vec<_> = inner
            .data
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), v.clone()))
            .collect();
        MemTableIterator {
            entries: entries.into_iter(),
        }
    }

    /// Up to `limit` entries starting at `from`, walking in `direction`
    ///
    /// `Bound::Unbounded` starts at the first key (forward) or the last key
    /// (backward).
    pub fn range(
        &self,
        from: Bound<&[u8]>,
        direction: Direction,
        limit: usize,
    ) -> Vec<(Vec<u8>, MemTableEntry)> {
        let from = match from {
            Bound::Included(k) => Bound::Included(self.ordered(k.to_vec())),
            Bound::Excluded(k) => Bound::Excluded(self.ordered(k.to_vec())),
            Bound::Unbounded => Bound::Unbounded,
        };

        let inner = self.inner.read();
        let pick = |(k, v): (&OrderedKey, &MemTableEntry)| (k.as_bytes().to_vec(), v.clone());
        match direction {
            Direction::Forward => inner
                .data
                .range((from, Bound::Unbounded))
                .take(limit)
                .map(pick)
                .collect(),
            Direction::Backward => inner
                .data
                .range((Bound::Unbounded, from))
                .rev()
                .take(limit)
                .map(pick)
                .collect(),
        }
    }

    /// Clear all entries (after successful flush)
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        inner.data.clear();
        inner.size = 0;
    }

    /// The comparator ordering this table
    pub fn comparator(&self) -> &SharedComparator {
        &self.comparator
    }

    fn ordered(&self, key: Vec<u8>) -> OrderedKey {
        OrderedKey::new(key, self.comparator.clone())
    }
}

impl Default for MemTable {
    fn default() -> Self {
        Self::new(ComparatorKind::default().build())
    }
}

/// Iterator over a snapshot of MemTable entries
pub struct MemTableIterator {
    entries: std::vec::IntoIter<(Vec<u8>, MemTableEntry)>,
}

impl Iterator for MemTableIterator {
    type Item = (Vec<u8>, MemTableEntry);

    fn next(&mut self) -> Option<Self::Item> {
        self.entries.next()
    }
}
