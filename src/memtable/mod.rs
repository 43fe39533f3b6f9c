//! MemTable Module
//!
//! In-memory data structure for recent writes.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Single-writer/multi-reader access pattern
//! - Track size for flush triggers
//! - Ordered iteration for SSTable creation and cursors
//!
//! ## Data Structure Choice
//! BTreeMap keyed by `OrderedKey` wrapped in RwLock:
//! - Ordered by the store comparator, not raw bytes
//! - Keys the comparator considers equal share one slot

mod table;

pub use table::{MemTable, MemTableIterator};

/// Entry stored in the MemTable
#[derive(Debug, Clone, PartialEq)]
pub enum MemTableEntry {
    /// A live value
    Value(Vec<u8>),

    /// A tombstone (deleted key)
    Tombstone,
}

impl MemTableEntry {
    /// Value bytes held by this entry (0 for tombstones)
    pub fn value_len(&self) -> usize {
        match self {
            MemTableEntry::Value(v) => v.len(),
            MemTableEntry::Tombstone => 0,
        }
    }

    /// Convert to the `Option` form used by SSTables (None = tombstone)
    pub fn into_option(self) -> Option<Vec<u8>> {
        match self {
            MemTableEntry::Value(v) => Some(v),
            MemTableEntry::Tombstone => None,
        }
    }
}
