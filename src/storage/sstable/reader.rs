//! SSTable Reader
//!
//! Opens SSTable files and provides O(log n) key lookups via an in-memory
//! index searched with the store comparator.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::comparator::SharedComparator;
use crate::config::Compression;
use crate::cursor::Direction;
use crate::error::{OrdError, Result};
use crate::storage::BlockCache;

use super::iterator::SSTableIterator;
use super::{
    compression_from_flag, decode_value, FOOTER_SIZE, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER,
    VERSION,
};

/// How a reader is opened and how it reads
#[derive(Clone)]
pub struct ReaderOptions {
    /// Order the table was written in
    pub comparator: SharedComparator,
    /// Read buffer size
    pub block_size: usize,
    /// Check the data CRC when opening
    pub verify_checksums: bool,
    /// Insert values read from disk into the cache
    pub fill_cache: bool,
    /// Shared value cache
    pub cache: Option<Arc<BlockCache>>,
}

impl ReaderOptions {
    /// Options with no cache and no checksum verification
    pub fn new(comparator: SharedComparator) -> Self {
        Self {
            comparator,
            block_size: 64 * 1024,
            verify_checksums: false,
            fill_cache: false,
            cache: None,
        }
    }
}

/// Reader for SSTable files with in-memory index for O(log n) lookups
pub struct SSTableReader {
    /// Table id (unique per store, used as the cache namespace)
    id: u64,
    /// Path to the file
    path: PathBuf,
    /// File handle for reading entries; a mutex so reads need only `&self`
    pub(super) file: Mutex<BufReader<File>>,
    /// In-memory index: (key, file offset), in comparator order
    index: Vec<(Vec<u8>, u64)>,
    /// Metadata
    entry_count: u64,
    /// Index block starting offset (for iteration)
    pub(super) index_offset: u64,
    /// Value compression recorded in the header
    pub(super) compression: Compression,
    options: ReaderOptions,
}

impl SSTableReader {
    /// Open an SSTable for reading
    ///
    /// Loads the entire index into memory for fast lookups.
    pub fn open(path: &Path, id: u64, options: ReaderOptions) -> Result<Self> {
        let mut file = File::open(path)?;
        let file_size = file.metadata()?.len();

        if file_size < HEADER_SIZE + FOOTER_SIZE {
            return Err(OrdError::Storage(format!(
                "SSTable {} too small: {} bytes",
                path.display(),
                file_size
            )));
        }

        // Read and validate header
        let mut header = [0u8; HEADER_SIZE as usize];
        file.read_exact(&mut header)?;

        if &header[0..4] != MAGIC {
            return Err(OrdError::Storage(format!(
                "Invalid SSTable magic: expected OKV1, got {:?}",
                &header[0..4]
            )));
        }

        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(OrdError::Storage(format!(
                "Unsupported SSTable version: {}",
                version
            )));
        }

        let entry_count = read_u64(&header[6..14]);
        let compression = compression_from_flag(header[14])?;

        // Read footer to get index offset
        file.seek(SeekFrom::End(-(FOOTER_SIZE as i64)))?;
        let mut footer = [0u8; FOOTER_SIZE as usize];
        file.read_exact(&mut footer)?;

        let index_offset = read_u64(&footer[0..8]);
        let data_crc = read_u32(&footer[8..12]);

        if index_offset < HEADER_SIZE || index_offset > file_size - FOOTER_SIZE {
            return Err(OrdError::Storage(format!(
                "SSTable {} has invalid index offset {}",
                path.display(),
                index_offset
            )));
        }

        if options.verify_checksums {
            file.seek(SeekFrom::Start(HEADER_SIZE))?;
            let mut data = vec![0u8; (index_offset - HEADER_SIZE) as usize];
            file.read_exact(&mut data)?;
            let actual = crc32fast::hash(&data);
            if actual != data_crc {
                return Err(OrdError::Storage(format!(
                    "SSTable {} data CRC mismatch: stored {:08x}, computed {:08x}",
                    path.display(),
                    data_crc,
                    actual
                )));
            }
        }

        // Load index into memory
        file.seek(SeekFrom::Start(index_offset))?;
        let index_block_size = file_size - FOOTER_SIZE - index_offset;
        let mut index_data = vec![0u8; index_block_size as usize];
        file.read_exact(&mut index_data)?;

        let index = parse_index(&index_data)?;
        if index.len() as u64 != entry_count {
            return Err(OrdError::Storage(format!(
                "SSTable {} index has {} entries, header says {}",
                path.display(),
                index.len(),
                entry_count
            )));
        }

        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            id,
            path: path.to_path_buf(),
            file: Mutex::new(BufReader::with_capacity(options.block_size.max(4096), file)),
            index,
            entry_count,
            index_offset,
            compression,
            options,
        })
    }

    /// Get a value by key: O(log n) lookup via in-memory index
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key found but is a tombstone (deleted)
    /// - `Err(KeyNotFound)`: key not in this SSTable
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cmp = &self.options.comparator;
        match self.index.binary_search_by(|(k, _)| cmp.compare(k, key)) {
            Ok(pos) => self.value_at(pos),
            Err(_) => Err(OrdError::KeyNotFound),
        }
    }

    /// Key and value (None = tombstone) at index position `pos`
    pub fn entry_at(&self, pos: usize) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
        let key = self
            .index
            .get(pos)
            .map(|(k, _)| k.clone())
            .ok_or_else(|| OrdError::Storage(format!("SSTable position {} out of range", pos)))?;
        Ok((key, self.value_at(pos)?))
    }

    /// Index position a cursor should start from
    ///
    /// Forward: first key at or after (or strictly after) `from`.
    /// Backward: last key at or before (or strictly before) `from`.
    pub fn position(&self, from: Bound<&[u8]>, direction: Direction) -> Option<usize> {
        let cmp = &self.options.comparator;
        let len = self.index.len();
        if len == 0 {
            return None;
        }

        // Number of keys strictly below / at-or-below the bound
        let below = |key: &[u8], inclusive_equal: bool| {
            self.index.partition_point(|(k, _)| match cmp.compare(k, key) {
                Ordering::Less => true,
                Ordering::Equal => inclusive_equal,
                Ordering::Greater => false,
            })
        };

        match (direction, from) {
            (Direction::Forward, Bound::Unbounded) => Some(0),
            (Direction::Forward, Bound::Included(k)) => Some(below(k, false)).filter(|&p| p < len),
            (Direction::Forward, Bound::Excluded(k)) => Some(below(k, true)).filter(|&p| p < len),
            (Direction::Backward, Bound::Unbounded) => Some(len - 1),
            (Direction::Backward, Bound::Included(k)) => below(k, true).checked_sub(1),
            (Direction::Backward, Bound::Excluded(k)) => below(k, false).checked_sub(1),
        }
    }

    fn value_at(&self, pos: usize) -> Result<Option<Vec<u8>>> {
        let offset = self.index[pos].1;

        if let Some(cache) = &self.options.cache {
            if let Some(value) = cache.get(self.id, offset) {
                return Ok(Some(value.as_ref().clone()));
            }
        }

        let stored = {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start(offset))?;

            let mut header = [0u8; 8];
            file.read_exact(&mut header)?;
            let key_len = read_u32(&header[0..4]) as i64;
            let val_len = read_u32(&header[4..8]);

            if val_len == TOMBSTONE_MARKER {
                return Ok(None);
            }

            file.seek_relative(key_len)?;
            let mut stored = vec![0u8; val_len as usize];
            file.read_exact(&mut stored)?;
            stored
        };

        let value = decode_value(stored, self.compression)?;
        if self.options.fill_cache {
            if let Some(cache) = &self.options.cache {
                cache.insert(self.id, offset, Arc::new(value.clone()));
            }
        }
        Ok(Some(value))
    }

    /// Table id
    pub fn id(&self) -> u64 {
        self.id
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get entry count
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Get the minimum key in this SSTable (for range filtering)
    pub fn min_key(&self) -> Option<&[u8]> {
        self.index.first().map(|(k, _)| k.as_slice())
    }

    /// Get the maximum key in this SSTable (for range filtering)
    pub fn max_key(&self) -> Option<&[u8]> {
        self.index.last().map(|(k, _)| k.as_slice())
    }

    /// Quick check if a key might be in this SSTable (range check)
    /// Returns false only if the key is definitely outside [min_key, max_key]
    pub fn might_contain(&self, key: &[u8]) -> bool {
        let cmp = &self.options.comparator;
        match (self.min_key(), self.max_key()) {
            (Some(min), Some(max)) => {
                cmp.compare(key, min) != Ordering::Less && cmp.compare(key, max) != Ordering::Greater
            }
            _ => false, // Empty SSTable
        }
    }

    /// Sequential iterator over all entries (holds the file lock)
    pub fn iter(&self) -> Result<SSTableIterator<'_>> {
        SSTableIterator::new(self.file.lock(), self.index_offset, self.compression)
    }
}

/// Parse index entries: [key_len(4)][offset(8)][key]
fn parse_index(data: &[u8]) -> Result<Vec<(Vec<u8>, u64)>> {
    let mut index = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        if pos + 12 > data.len() {
            return Err(OrdError::Storage("Truncated SSTable index entry".to_string()));
        }
        let key_len = read_u32(&data[pos..pos + 4]) as usize;
        let offset = read_u64(&data[pos + 4..pos + 12]);
        pos += 12;

        if pos + key_len > data.len() {
            return Err(OrdError::Storage("Truncated SSTable index key".to_string()));
        }
        index.push((data[pos..pos + key_len].to_vec(), offset));
        pos += key_len;
    }
    Ok(index)
}

pub(super) fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[..4]);
    u32::from_le_bytes(buf)
}

pub(super) fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[..8]);
    u64::from_le_bytes(buf)
}
