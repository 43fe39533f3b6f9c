//! Block Cache
//!
//! Byte-bounded LRU of decoded SSTable values, shared by all tables of a
//! store. Entries are keyed by (table id, entry offset); table ids are never
//! reused, so entries of compacted-away tables simply age out.

use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

struct Inner {
    entries: LruCache<(u64, u64), Arc<Vec<u8>>>,
    bytes: usize,
}

/// Shared LRU cache of SSTable values
pub struct BlockCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl BlockCache {
    /// Create a cache holding at most `capacity` value bytes
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                bytes: 0,
            }),
            capacity,
        }
    }

    /// Look up a value, marking it most recently used
    pub fn get(&self, table_id: u64, offset: u64) -> Option<Arc<Vec<u8>>> {
        self.inner.lock().entries.get(&(table_id, offset)).cloned()
    }

    /// Insert a value, evicting least recently used entries past capacity
    pub fn insert(&self, table_id: u64, offset: u64, value: Arc<Vec<u8>>) {
        if value.len() > self.capacity {
            return;
        }

        let mut inner = self.inner.lock();
        inner.bytes += value.len();
        if let Some(old) = inner.entries.put((table_id, offset), value) {
            inner.bytes -= old.len();
        }
        while inner.bytes > self.capacity {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => inner.bytes -= evicted.len(),
                None => break,
            }
        }
    }

    /// Bytes currently cached
    pub fn size(&self) -> usize {
        self.inner.lock().bytes
    }

    /// Entries currently cached
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
