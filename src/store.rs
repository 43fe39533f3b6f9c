//! Store Module
//!
//! One ordered, persistent byte-string store per logical database.
//!
//! ## Responsibilities
//! - Own the store directory `<base>/<db_id>` and the comparator contract
//! - Coordinate WAL, MemTable, and Storage
//! - Point reads, upserts, deletes and appends
//! - Bounded scans through a merging cursor
//! - Manual and size-triggered compaction
//!
//! Every public operation returns a typed error naming the operation that
//! failed; nothing in here terminates the process.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::comparator::SharedComparator;
use crate::config::{AppendMode, StoreOptions};
use crate::cursor::Cursor;
use crate::error::{OrdError, Result};
use crate::memtable::MemTable;
use crate::scan::{self, ScanFrom, MAX_SCAN_COUNT};
use crate::storage::{StorageManager, TableOptions};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Access counters for one store
#[derive(Debug, Default)]
pub struct StoreStats {
    reads: AtomicU64,
    writes: AtomicU64,
    scans: AtomicU64,
}

impl StoreStats {
    /// Point reads that reached the store
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Puts, deletes and appends
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Scans executed
    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }
}

/// An open ordered store
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/append/flush/compact): serialized by `write_lock`
/// - **Reads** (get/scan): no write lock; the MemTable handle is cloned
///   before the SSTable list so a concurrent flush never hides data
/// - A flush swaps in a fresh MemTable instead of clearing the old one, so
///   cursors holding the old handle keep a consistent view
pub struct Store {
    db_id: usize,

    /// Store directory: `<base>/<db_id>`
    path: PathBuf,

    options: StoreOptions,

    comparator: SharedComparator,

    /// Write-ahead log for durability (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// In-memory table for recent writes
    memtable: RwLock<Arc<MemTable>>,

    /// Persistent storage manager
    storage: StorageManager,

    /// Serializes write operations
    write_lock: Mutex<()>,

    stats: StoreStats,
}

impl Store {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";
    const COMPARATOR_FILENAME: &'static str = "COMPARATOR";

    /// Open or create the store for `db_id` under `base_dir`
    ///
    /// On startup:
    /// 1. Create `<base_dir>/<db_id>` if missing
    /// 2. Check (or record) the comparator name
    /// 3. Load existing SSTables
    /// 4. Replay the WAL and flush recovered entries
    pub fn open(base_dir: &Path, db_id: usize, options: StoreOptions) -> Result<Self> {
        let comparator = options.comparator.build();
        Self::open_with_comparator(base_dir, db_id, options, comparator)
    }

    /// Open with a caller-supplied comparator
    ///
    /// `options.comparator` is ignored; the comparator's own `name()` is the
    /// one recorded in, and checked against, the store directory.
    pub fn open_with_comparator(
        base_dir: &Path,
        db_id: usize,
        options: StoreOptions,
        comparator: SharedComparator,
    ) -> Result<Self> {
        let path = base_dir.join(db_id.to_string());
        Self::open_inner(&path, db_id, options, comparator).map_err(|e| match e {
            e @ OrdError::OpenFailed { .. } => e,
            other => OrdError::OpenFailed {
                path: path.clone(),
                reason: other.to_string(),
            },
        })
    }

    fn open_inner(
        path: &Path,
        db_id: usize,
        options: StoreOptions,
        comparator: SharedComparator,
    ) -> Result<Self> {
        fs::create_dir_all(path)?;
        Self::check_comparator(path, comparator.name())?;

        let storage = StorageManager::open(
            &path.join(Self::SSTABLE_DIR),
            TableOptions::from_store(&options, comparator.clone()),
        )?;

        let memtable = MemTable::new(comparator.clone());
        let wal_path = path.join(Self::WAL_FILENAME);

        if wal_path.exists() {
            let (entries, recovery) = WalRecovery::recover(&wal_path)?;

            if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
                tracing::info!(
                    db = db_id,
                    recovered = recovery.entries_recovered,
                    corrupted = recovery.entries_corrupted,
                    last_lsn = recovery.last_lsn,
                    "WAL recovery"
                );
            }

            for entry in entries {
                match entry.operation {
                    Operation::Put { key, value } => {
                        memtable.put(key, value);
                    }
                    Operation::Delete { key } => {
                        memtable.delete(key);
                    }
                }
            }

            // Make recovered data durable in an SSTable before the WAL is reset
            if !memtable.is_empty() {
                tracing::debug!(db = db_id, entries = memtable.entry_count(), "flushing recovered entries");
                storage.flush(&memtable)?;
                memtable.clear();
            }
        }

        let mut wal = WalWriter::open(&wal_path, options.wal_sync_strategy)?;
        wal.truncate()?;

        tracing::info!(
            db = db_id,
            path = %path.display(),
            comparator = comparator.name(),
            sstables = storage.sstable_count(),
            "store opened"
        );

        Ok(Self {
            db_id,
            path: path.to_path_buf(),
            options,
            comparator,
            wal: Mutex::new(wal),
            memtable: RwLock::new(Arc::new(memtable)),
            storage,
            write_lock: Mutex::new(()),
            stats: StoreStats::default(),
        })
    }

    /// Record the comparator on first open; refuse a different one later
    fn check_comparator(path: &Path, name: &str) -> Result<()> {
        let manifest = path.join(Self::COMPARATOR_FILENAME);
        if manifest.exists() {
            let stored = fs::read_to_string(&manifest)?;
            let stored = stored.trim();
            if stored != name {
                return Err(OrdError::Config(format!(
                    "store was created with comparator '{}', cannot open with '{}'",
                    stored, name
                )));
            }
        } else {
            fs::write(&manifest, format!("{}\n", name))?;
        }
        Ok(())
    }

    // =========================================================================
    // Point Operations
    // =========================================================================

    /// Get a value by key; absence is `Ok(None)`
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.stats.reads.fetch_add(1, Ordering::Relaxed);
        self.get_internal(key)
            .map_err(|e| OrdError::read_failed("get", e))
    }

    fn get_internal(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let memtable = self.memtable.read().clone();
        if let Some(entry) = memtable.get(key) {
            return Ok(entry.into_option());
        }
        self.storage.get(key)
    }

    /// Unconditional upsert
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        self.apply(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        })
        .map_err(|e| OrdError::write_failed("put", e))
    }

    /// Unconditional delete; deleting an absent key succeeds
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        self.apply(Operation::Delete { key: key.to_vec() })
            .map_err(|e| OrdError::write_failed("delete", e))
    }

    /// Append `suffix` to the value at `key`
    ///
    /// An absent or empty value behaves like `put(key, suffix)`. Under
    /// `AppendMode::Serialized` the read and the write happen under the
    /// write lock; under `ReadThenWrite` only the write does.
    pub fn append(&self, key: &[u8], suffix: &[u8]) -> Result<()> {
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        match self.options.append_mode {
            AppendMode::Serialized => {
                let _write_guard = self.write_lock.lock();
                let value = self.appended(key, suffix)?;
                self.apply(Operation::Put {
                    key: key.to_vec(),
                    value,
                })
                .map_err(|e| OrdError::write_failed("append", e))
            }
            AppendMode::ReadThenWrite => {
                let value = self.appended(key, suffix)?;
                let _write_guard = self.write_lock.lock();
                self.apply(Operation::Put {
                    key: key.to_vec(),
                    value,
                })
                .map_err(|e| OrdError::write_failed("append", e))
            }
        }
    }

    /// Existing value with `suffix` appended
    fn appended(&self, key: &[u8], suffix: &[u8]) -> Result<Vec<u8>> {
        let existing = self
            .get_internal(key)
            .map_err(|e| OrdError::read_failed("append", e))?;
        Ok(match existing {
            Some(mut value) if !value.is_empty() => {
                value.reserve_exact(suffix.len());
                value.extend_from_slice(suffix);
                value
            }
            _ => suffix.to_vec(),
        })
    }

    /// Log and apply one operation (write lock held)
    fn apply(&self, operation: Operation) -> Result<()> {
        self.wal.lock().append(operation.clone())?;

        let memtable = self.memtable.read().clone();
        let new_size = match operation {
            Operation::Put { key, value } => memtable.put(key, value),
            Operation::Delete { key } => memtable.delete(key),
        };

        if new_size >= self.options.write_buffer_size {
            self.flush_internal()?;
        }
        Ok(())
    }

    // =========================================================================
    // Scans
    // =========================================================================

    /// A fresh, unpositioned cursor over the whole store
    pub fn cursor(&self) -> Cursor {
        // MemTable first: see the struct docs
        let memtable = self.memtable.read().clone();
        let tables = self.storage.snapshot();
        Cursor::new(Some(memtable), tables, self.comparator.clone())
    }

    /// Up to `count` (key, value) pairs starting at `from`
    ///
    /// `count` must be in `1..=65535`; it is checked before the store is
    /// touched. An empty result is success.
    pub fn scan(&self, from: &ScanFrom, count: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if count == 0 || count > MAX_SCAN_COUNT {
            return Err(OrdError::InvalidArgument(format!(
                "iteration count {} out of range 1..={}",
                count, MAX_SCAN_COUNT
            )));
        }

        self.stats.scans.fetch_add(1, Ordering::Relaxed);
        let mut cursor = self.cursor();
        from.position(&mut cursor)
            .and_then(|_| scan::collect(&mut cursor, count))
            .map_err(|e| OrdError::read_failed("iterate", e))
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Flush memtable to disk
    pub fn flush(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
            .map_err(|e| OrdError::write_failed("flush", e))
    }

    /// Internal flush implementation (called with write lock held)
    fn flush_internal(&self) -> Result<()> {
        let memtable = self.memtable.read().clone();
        if memtable.is_empty() {
            return Ok(());
        }

        // Table first, then swap: a cursor never misses flushed entries
        self.storage.flush(&memtable)?;
        *self.memtable.write() = Arc::new(MemTable::new(self.comparator.clone()));

        // Entries are now durable in an SSTable
        self.wal.lock().truncate()?;

        if self.storage.sstable_count() > self.options.max_open_files {
            tracing::debug!(
                db = self.db_id,
                tables = self.storage.sstable_count(),
                limit = self.options.max_open_files,
                "sstable limit exceeded, compacting"
            );
            self.storage.compact()?;
        }
        Ok(())
    }

    /// Flush, then merge every SSTable into one
    pub fn compact(&self) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        self.flush_internal()
            .and_then(|_| self.storage.compact())
            .map(|_| ())
            .map_err(|e| OrdError::write_failed("compact", e))
    }

    /// Rebuild a damaged store
    pub fn repair(&self) -> Result<()> {
        tracing::warn!(db = self.db_id, "repair not currently supported");
        Err(OrdError::NotImplemented("repair"))
    }

    /// Close the store gracefully
    ///
    /// Flushes pending data and syncs the WAL. Consumes the store, so a
    /// second close cannot happen.
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.wal
            .lock()
            .sync()
            .map_err(|e| OrdError::write_failed("close", e))?;

        tracing::info!(db = self.db_id, path = %self.path.display(), "store closed");
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Logical database id
    pub fn db_id(&self) -> usize {
        self.db_id
    }

    /// Store directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Comparator ordering this store
    pub fn comparator(&self) -> &SharedComparator {
        &self.comparator
    }

    /// Access counters
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Get the current memtable size
    pub fn memtable_size(&self) -> usize {
        self.memtable.read().size()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.read().entry_count()
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    /// Get the store options
    pub fn options(&self) -> &StoreOptions {
        &self.options
    }
}

