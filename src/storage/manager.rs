//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Create new SSTables from MemTable flushes
//! - Merge all SSTables into one on compaction

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::comparator::SharedComparator;
use crate::config::{Compression, StoreOptions};
use crate::cursor::Cursor;
use crate::error::{OrdError, Result};
use crate::memtable::{MemTable, MemTableEntry};

use super::{BlockCache, ReaderOptions, SSTable, SSTableBuilder, SSTableReader};

/// Options shared by every table a manager creates or opens
#[derive(Clone)]
pub struct TableOptions {
    pub comparator: SharedComparator,
    pub compression: Compression,
    pub block_size: usize,
    pub block_cache_size: usize,
    pub verify_checksums: bool,
    pub fill_cache: bool,
}

impl TableOptions {
    /// Uncompressed, uncached tables ordered by `comparator`
    pub fn new(comparator: SharedComparator) -> Self {
        Self {
            comparator,
            compression: Compression::None,
            block_size: 64 * 1024,
            block_cache_size: 0,
            verify_checksums: false,
            fill_cache: false,
        }
    }

    /// Table options for a store opened with `options`
    pub fn from_store(options: &StoreOptions, comparator: SharedComparator) -> Self {
        Self {
            comparator,
            compression: options.compression,
            block_size: options.block_size,
            block_cache_size: options.block_cache_size,
            verify_checksums: options.verify_checksums,
            fill_cache: options.fill_cache,
        }
    }
}

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - Readers are shared via `Arc` so cursors can outlive a list swap
/// - `next_sstable_id`: Atomic counter (lock-free)
/// - All methods use `&self` (no exclusive access needed)
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<Arc<SSTableReader>>>,

    /// Next ID for creating new SSTables (atomic, lock-free)
    next_sstable_id: AtomicU64,

    options: TableOptions,

    /// Value cache shared by all readers
    cache: Option<Arc<BlockCache>>,
}

impl StorageManager {
    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing SSTable files
    /// 3. Open readers for each (loads indexes into RAM)
    /// 4. Order by ID descending (newest first)
    pub fn open(path: &Path, options: TableOptions) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = Self::parse_sstable_id(&file_path) {
                    sstable_ids.push(id);
                }
            }
        }

        // Sort newest first (highest ID first)
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let cache = (options.block_cache_size > 0)
            .then(|| Arc::new(BlockCache::new(options.block_cache_size)));

        let mut manager = Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(Vec::new()),
            next_sstable_id: AtomicU64::new(sstable_ids.first().map(|&id| id + 1).unwrap_or(1)),
            options,
            cache,
        };

        let mut sstables = Vec::with_capacity(sstable_ids.len());
        for id in &sstable_ids {
            sstables.push(Arc::new(manager.open_reader(*id)?));
        }
        manager.sstables = RwLock::new(sstables);

        tracing::debug!(
            dir = %path.display(),
            tables = sstable_ids.len(),
            "storage opened"
        );

        Ok(manager)
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key not found, or found tombstone (deleted)
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let sstables = self.sstables.read();

        for reader in sstables.iter() {
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => return Ok(None),              // Tombstone = deleted
                Err(OrdError::KeyNotFound) => continue,   // Not in this SSTable
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Flush a MemTable to a new SSTable
    ///
    /// Creates a new SSTable file from the MemTable's sorted entries,
    /// opens a reader for it, and adds it to the front of the list.
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(OrdError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = self.builder(&path)?;
        for (key, entry) in memtable.iter() {
            match entry {
                MemTableEntry::Value(v) => builder.add(&key, &v)?,
                MemTableEntry::Tombstone => builder.add_tombstone(&key)?,
            }
        }
        let metadata = builder.finish()?;

        let reader = Arc::new(self.open_reader(id)?);
        self.sstables.write().insert(0, reader);

        tracing::debug!(
            id,
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "memtable flushed to sstable"
        );

        Ok(metadata)
    }

    /// Merge every SSTable into one, dropping tombstones and shadowed values
    ///
    /// Returns the new table's metadata, or `None` when nothing is left
    /// (no tables, or every key was deleted).
    pub fn compact(&self) -> Result<Option<SSTable>> {
        let inputs = self.snapshot();
        if inputs.is_empty() {
            return Ok(None);
        }

        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);

        let mut builder = self.builder(&path)?;
        let mut cursor = Cursor::new(None, inputs.clone(), self.options.comparator.clone());
        cursor.seek_to_first()?;
        while let Some((key, value)) = cursor.current() {
            builder.add(key, value)?;
            cursor.next()?;
        }
        let metadata = builder.finish()?;

        let output = if metadata.entry_count > 0 {
            Some(Arc::new(self.open_reader(id)?))
        } else {
            fs::remove_file(&path)?;
            None
        };

        // Swap: keep any table that arrived after the snapshot, then the output
        {
            let mut sstables = self.sstables.write();
            sstables.retain(|t| !inputs.iter().any(|i| i.id() == t.id()));
            if let Some(reader) = output {
                sstables.push(reader);
            }
        }

        for table in &inputs {
            if let Err(e) = fs::remove_file(table.path()) {
                tracing::warn!(path = %table.path().display(), error = %e, "failed to remove compacted sstable");
            }
        }

        tracing::info!(
            dir = %self.data_dir.display(),
            inputs = inputs.len(),
            entries = metadata.entry_count,
            "compaction finished"
        );

        Ok((metadata.entry_count > 0).then_some(metadata))
    }

    /// Readers in newest → oldest order, for cursors
    pub fn snapshot(&self) -> Vec<Arc<SSTableReader>> {
        self.sstables.read().clone()
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    /// The shared value cache, if enabled
    pub fn block_cache(&self) -> Option<&Arc<BlockCache>> {
        self.cache.as_ref()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn builder(&self, path: &Path) -> Result<SSTableBuilder> {
        SSTableBuilder::with_options(path, self.options.compression, self.options.block_size)
    }

    fn open_reader(&self, id: u64) -> Result<SSTableReader> {
        let options = ReaderOptions {
            comparator: self.options.comparator.clone(),
            block_size: self.options.block_size,
            verify_checksums: self.options.verify_checksums,
            fill_cache: self.options.fill_cache,
            cache: self.cache.clone(),
        };
        SSTableReader::open(&self.sstable_path(id), id, options)
    }

    /// Generate the file path for an SSTable with given ID
    fn sstable_path(&self, id: u64) -> PathBuf {
        self.data_dir.join(format!("sstable_{:06}.sst", id))
    }

    /// Parse SSTable ID from filename
    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_string_lossy();
        let id_str = name.strip_prefix("sstable_")?;
        id_str.parse().ok()
    }
}
