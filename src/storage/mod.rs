//! Storage Module
//!
//! Persistent storage layer using SSTable-like format.
//!
//! ## Responsibilities
//! - Persist data to disk in comparator order
//! - Efficient range scans and point lookups
//! - Full compaction of all tables into one
//! - Byte-bounded value cache for hot reads
//!
//! See [`sstable`] for the file format.

mod block_cache;
mod manager;
pub mod sstable;

pub use block_cache::BlockCache;
pub use manager::{StorageManager, TableOptions};
pub use sstable::{ReaderOptions, SSTable, SSTableBuilder, SSTableReader};
