//! Shared expiring cache

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use crate::comparator::{OrderedKey, SharedComparator};

use super::{CacheEntry, CacheStats, Clock, SystemClock};

/// Expiring key-value overlay for one database
///
/// Holds at most `capacity` entries. Inserting into a full cache first drops
/// every expired entry, then evicts the least recently written ones.
///
/// ## Concurrency:
/// - `slots`: RwLock; a lookup that finds an expired entry upgrades to a
///   write to drop it
/// - `stats`: atomics
pub struct ExpiringCache {
    slots: RwLock<Slots>,
    capacity: usize,
    comparator: SharedComparator,
    clock: Arc<dyn Clock>,
    stats: CacheStats,
}

struct Slot {
    entry: CacheEntry,
    written: u64,
}

/// Entries by key, plus their keys in write order
#[derive(Default)]
struct Slots {
    entries: BTreeMap<OrderedKey, Slot>,
    by_write: BTreeMap<u64, OrderedKey>,
    next_write: u64,
}

impl Slots {
    fn remove(&mut self, key: &OrderedKey) -> bool {
        match self.entries.remove(key) {
            Some(slot) => {
                self.by_write.remove(&slot.written);
                true
            }
            None => false,
        }
    }

    /// Drop every entry expired at `now`; returns how many went
    fn purge_expired(&mut self, now: Instant) -> usize {
        let expired: Vec<u64> = self
            .entries
            .values()
            .filter(|slot| slot.entry.is_expired(now))
            .map(|slot| slot.written)
            .collect();

        for written in &expired {
            if let Some(key) = self.by_write.remove(written) {
                self.entries.remove(&key);
            }
        }
        expired.len()
    }

    fn evict_oldest(&mut self) -> bool {
        match self.by_write.pop_first() {
            Some((_, key)) => {
                self.entries.remove(&key);
                true
            }
            None => false,
        }
    }
}

impl ExpiringCache {
    /// Empty cache on the system clock
    pub fn new(comparator: SharedComparator, capacity: usize) -> Self {
        Self::with_clock(comparator, capacity, Arc::new(SystemClock))
    }

    /// Empty cache on a caller-supplied clock
    pub fn with_clock(comparator: SharedComparator, capacity: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: RwLock::new(Slots::default()),
            capacity,
            comparator,
            clock,
            stats: CacheStats::new(),
        }
    }

    /// Live value for `key`; an expired entry is removed and reported absent
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let lookup = self.key(key);
        let now = self.clock.now();

        {
            let slots = self.slots.read();
            match slots.entries.get(&lookup) {
                None => {
                    self.stats.record_miss();
                    return None;
                }
                Some(slot) if !slot.entry.is_expired(now) => {
                    self.stats.record_hit();
                    return Some(slot.entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Expired: re-check under the write lock, a writer may have refreshed it
        let mut slots = self.slots.write();
        match slots.entries.get(&lookup) {
            Some(slot) if !slot.entry.is_expired(now) => {
                self.stats.record_hit();
                Some(slot.entry.value.clone())
            }
            Some(_) => {
                slots.remove(&lookup);
                self.stats.record_expiration();
                self.stats.record_miss();
                None
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Insert or replace `key`, visible for `ttl` (forever when `None`)
    ///
    /// A zero-capacity cache stores nothing.
    pub fn insert(&self, key: &[u8], value: Vec<u8>, ttl: Option<Duration>) {
        if self.capacity == 0 {
            return;
        }

        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|d| now + d),
        };
        let key = self.key(key);

        let mut slots = self.slots.write();
        // Remove first so the newest spelling of the key is kept
        slots.remove(&key);

        if slots.entries.len() >= self.capacity {
            let purged = slots.purge_expired(now);
            for _ in 0..purged {
                self.stats.record_expiration();
            }
        }
        while slots.entries.len() >= self.capacity && slots.evict_oldest() {
            self.stats.record_eviction();
        }

        let written = slots.next_write;
        slots.next_write += 1;
        slots.by_write.insert(written, key.clone());
        slots.entries.insert(key, Slot { entry, written });
        self.stats.record_insert();
    }

    /// Drop `key` if cached
    pub fn remove(&self, key: &[u8]) {
        let key = self.key(key);
        self.slots.write().remove(&key);
    }

    /// Number of entries, expired ones included
    pub fn len(&self) -> usize {
        self.slots.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut slots = self.slots.write();
        slots.entries.clear();
        slots.by_write.clear();
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    fn key(&self, key: &[u8]) -> OrderedKey {
        OrderedKey::new(key.to_vec(), self.comparator.clone())
    }
}
