//! Configuration for OrdKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::comparator::ComparatorKind;
use crate::protocol::MAX_PAYLOAD_SIZE;

/// Main configuration for an OrdKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Base directory for all logical databases
    /// Internal structure:
    ///   {base_dir}/
    ///     ├── 0/               (database 0)
    ///     │   ├── COMPARATOR   (comparator name)
    ///     │   ├── wal.log      (write-ahead log)
    ///     │   └── sstables/    (SSTable files)
    ///     └── 1/ ...
    pub base_dir: PathBuf,

    /// Number of logical databases opened at startup
    pub num_databases: usize,

    /// Options used to open each database's store
    pub store: StoreOptions,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Worker threads serving client connections
    pub worker_threads: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Largest encoded reply a scan may produce (in bytes, capped at the
    /// protocol's 64 MiB payload limit)
    pub max_reply_size: usize,
}

/// Options for a single ordered store
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// Key ordering; fixed for the lifetime of the store's files
    pub comparator: ComparatorKind,

    /// Max size of memtable before flush (in bytes)
    pub write_buffer_size: usize,

    /// Capacity of the SSTable value cache (in bytes, 0 disables it)
    pub block_cache_size: usize,

    /// Buffer size for SSTable reads and writes (in bytes)
    pub block_size: usize,

    /// Compression applied to SSTable values
    pub compression: Compression,

    /// SSTable count above which a flush triggers a full compaction
    pub max_open_files: usize,

    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    /// Verify SSTable data checksums when opening tables
    pub verify_checksums: bool,

    /// Populate the block cache on reads
    pub fill_cache: bool,

    /// Consistency of the append read-modify-write
    pub append_mode: AppendMode,

    /// Max entries held by the expiring cache (0 caches nothing)
    pub cache_capacity: usize,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },

    /// Hand writes to the OS without fsync; a crash may lose recent writes
    Buffered,
}

/// SSTable value compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Deflate,
}

/// How append reads and writes relate to concurrent writers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendMode {
    /// Read and write under the store write lock; appends through one store
    /// handle never lose updates
    Serialized,

    /// Read outside the write lock, then put; concurrent writers to the same
    /// key may lose updates (last writer wins)
    ReadThenWrite,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            comparator: ComparatorKind::CaseInsensitive,
            write_buffer_size: 128 * 1024 * 1024, // 128 MB
            block_cache_size: 128 * 1024 * 1024,  // 128 MB
            block_size: 64 * 1024,                // 64 KB
            compression: Compression::Deflate,
            max_open_files: 1000,
            wal_sync_strategy: WalSyncStrategy::Buffered,
            verify_checksums: false,
            fill_cache: true,
            append_mode: AppendMode::Serialized,
            cache_capacity: 100_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./ordkv_data"),
            num_databases: 16,
            store: StoreOptions::default(),
            listen_addr: "127.0.0.1:6380".to_string(),
            worker_threads: 64,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
            max_reply_size: MAX_PAYLOAD_SIZE as usize,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the base directory (root for all databases)
    pub fn base_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.base_dir = path.into();
        self
    }

    /// Set the number of logical databases
    pub fn num_databases(mut self, count: usize) -> Self {
        self.config.num_databases = count;
        self
    }

    /// Replace all store options at once
    pub fn store_options(mut self, options: StoreOptions) -> Self {
        self.config.store = options;
        self
    }

    /// Set the key comparator
    pub fn comparator(mut self, kind: ComparatorKind) -> Self {
        self.config.store.comparator = kind;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn write_buffer_size(mut self, size: usize) -> Self {
        self.config.store.write_buffer_size = size;
        self
    }

    /// Set the block cache capacity (in bytes)
    pub fn block_cache_size(mut self, size: usize) -> Self {
        self.config.store.block_cache_size = size;
        self
    }

    /// Set the SSTable I/O buffer size (in bytes)
    pub fn block_size(mut self, size: usize) -> Self {
        self.config.store.block_size = size;
        self
    }

    /// Set SSTable value compression
    pub fn compression(mut self, compression: Compression) -> Self {
        self.config.store.compression = compression;
        self
    }

    /// Set the SSTable count that triggers compaction
    pub fn max_open_files(mut self, count: usize) -> Self {
        self.config.store.max_open_files = count;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.store.wal_sync_strategy = strategy;
        self
    }

    /// Verify SSTable checksums on open
    pub fn verify_checksums(mut self, verify: bool) -> Self {
        self.config.store.verify_checksums = verify;
        self
    }

    /// Populate the block cache on reads
    pub fn fill_cache(mut self, fill: bool) -> Self {
        self.config.store.fill_cache = fill;
        self
    }

    /// Set the append consistency mode
    pub fn append_mode(mut self, mode: AppendMode) -> Self {
        self.config.store.append_mode = mode;
        self
    }

    /// Set the expiring cache capacity (in entries)
    pub fn cache_capacity(mut self, entries: usize) -> Self {
        self.config.store.cache_capacity = entries;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the number of connection worker threads
    pub fn worker_threads(mut self, count: usize) -> Self {
        self.config.worker_threads = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the scan reply size limit (in bytes)
    pub fn max_reply_size(mut self, bytes: usize) -> Self {
        self.config.max_reply_size = bytes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
