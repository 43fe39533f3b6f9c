//! Database Module
//!
//! One logical database: an ordered [`Store`] plus the [`ExpiringCache`]
//! shared by all of its connections.
//!
//! Every operation takes the calling connection's [`CachePolicy`]. With the
//! policy enabled reads go through the cache and writes go to the store first,
//! then the cache. With it disabled reads skip the cache, but writes still
//! drop the key from it so other connections never read a value the store no
//! longer holds.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::{CachePolicy, Clock, ExpiringCache, SystemClock};
use crate::config::StoreOptions;
use crate::error::Result;
use crate::scan::{ScanFrom, ScanItem, ScanMode};
use crate::store::Store;

/// A store and its shared cache
///
/// ## Concurrency:
/// - `coherence` pairs each store access with its cache update. Writers hold
///   it exclusively across the store write and the cache change; cache fills
///   hold it shared across the store read and the insert, so a fill can never
///   cache a value older than a write that finished before it.
pub struct Database {
    store: Store,
    cache: ExpiringCache,
    coherence: RwLock<()>,
}

impl Database {
    /// Open database `db_id` under `base_dir`
    pub fn open(base_dir: &Path, db_id: usize, options: StoreOptions) -> Result<Self> {
        Self::open_with_clock(base_dir, db_id, options, Arc::new(SystemClock))
    }

    /// Open with a caller-supplied clock for cache expiry
    pub fn open_with_clock(
        base_dir: &Path,
        db_id: usize,
        options: StoreOptions,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let capacity = options.cache_capacity;
        let store = Store::open(base_dir, db_id, options)?;
        let cache = ExpiringCache::with_clock(store.comparator().clone(), capacity, clock);
        Ok(Self {
            store,
            cache,
            coherence: RwLock::new(()),
        })
    }

    /// Read `key`; a cache miss falls through to the store and fills the cache
    pub fn get(&self, policy: &CachePolicy, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if !policy.enabled {
            return self.store.get(key);
        }

        if let Some(value) = self.cache.get(key) {
            return Ok(Some(value));
        }

        let _fill = self.coherence.read();
        let value = self.store.get(key)?;
        if let Some(value) = &value {
            self.cache.insert(key, value.clone(), policy.expiry);
        }
        Ok(value)
    }

    /// Write `key`; the store is written before the cache
    pub fn set(&self, policy: &CachePolicy, key: &[u8], value: &[u8]) -> Result<()> {
        let _write = self.coherence.write();
        self.store.put(key, value)?;
        if policy.enabled {
            self.cache.insert(key, value.to_vec(), policy.expiry);
        } else {
            self.cache.remove(key);
        }
        Ok(())
    }

    /// Delete `key`; deleting an absent key succeeds
    pub fn delete(&self, _policy: &CachePolicy, key: &[u8]) -> Result<()> {
        let _write = self.coherence.write();
        self.store.delete(key)?;
        self.cache.remove(key);
        Ok(())
    }

    /// Append `suffix` to the stored value
    ///
    /// The appended value is not written into the cache. Any cached copy of
    /// `key` is dropped, so the next cached read reloads it from the store.
    pub fn append(&self, _policy: &CachePolicy, key: &[u8], suffix: &[u8]) -> Result<()> {
        let _write = self.coherence.write();
        self.store.append(key, suffix)?;
        self.cache.remove(key);
        Ok(())
    }

    /// Bounded scan; with the policy enabled every returned pair is cached
    pub fn iterate(
        &self,
        policy: &CachePolicy,
        from: &ScanFrom,
        count: usize,
        mode: ScanMode,
    ) -> Result<Vec<ScanItem>> {
        if !policy.enabled {
            let entries = self.store.scan(from, count)?;
            return Ok(entries
                .into_iter()
                .map(|(key, value)| ScanItem::project(key, value, mode))
                .collect());
        }

        let _fill = self.coherence.read();
        let entries = self.store.scan(from, count)?;

        Ok(entries
            .into_iter()
            .map(|(key, value)| {
                self.cache.insert(&key, value.clone(), policy.expiry);
                ScanItem::project(key, value, mode)
            })
            .collect())
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    pub fn compact(&self) -> Result<()> {
        self.store.compact()
    }

    pub fn repair(&self) -> Result<()> {
        self.store.repair()
    }

    /// Drop the cache, then close the store
    pub fn close(self) -> Result<()> {
        let Self { store, cache, .. } = self;
        drop(cache);
        store.close()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }
}
