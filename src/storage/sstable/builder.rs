//! SSTable Builder
//!
//! Writes sorted key-value entries to a new SSTable file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::BufMut;

use crate::config::Compression;
use crate::error::{OrdError, Result};

use super::{
    compression_flag, encode_value, SSTable, COUNT_OFFSET, HEADER_SIZE, MAGIC, TOMBSTONE_MARKER,
    VERSION,
};

/// Default write buffer when no block size is configured
const DEFAULT_BUFFER: usize = 64 * 1024;

/// Builder for creating new SSTables from sorted entries
pub struct SSTableBuilder {
    /// Output file path
    path: PathBuf,
    /// Buffered writer for performance
    writer: BufWriter<File>,
    /// Value compression
    compression: Compression,
    /// Number of entries written
    entry_count: u64,
    /// Current write position (for index)
    current_offset: u64,
    /// Index: key → file offset of entry
    index: Vec<(Vec<u8>, u64)>,
    /// Track min/max keys for metadata
    min_key: Option<Vec<u8>>,
    max_key: Option<Vec<u8>>,
    /// Running CRC hasher for data section
    data_hasher: crc32fast::Hasher,
}

impl SSTableBuilder {
    /// Create an uncompressed SSTable builder
    pub fn new(path: &Path) -> Result<Self> {
        Self::with_options(path, Compression::None, DEFAULT_BUFFER)
    }

    /// Create a builder with explicit compression and I/O buffer size
    ///
    /// Writes header immediately; call `add()`/`add_tombstone()` in sorted order,
    /// then `finish()` to write index and footer.
    pub fn with_options(path: &Path, compression: Compression, block_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut writer = BufWriter::with_capacity(block_size.max(4096), file);

        // Header (entry_count placeholder, patched in finish)
        let mut header = Vec::with_capacity(HEADER_SIZE as usize);
        header.put_slice(MAGIC);
        header.put_u16_le(VERSION);
        header.put_u64_le(0);
        header.put_u8(compression_flag(compression));
        writer.write_all(&header)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            compression,
            entry_count: 0,
            current_offset: HEADER_SIZE,
            index: Vec::new(),
            min_key: None,
            max_key: None,
            data_hasher: crc32fast::Hasher::new(),
        })
    }

    /// Add a key-value pair (must be called in sorted key order)
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let stored = encode_value(value, self.compression)?;
        self.write_entry(key, Some(&stored))
    }

    /// Add a tombstone (must be called in sorted key order)
    pub fn add_tombstone(&mut self, key: &[u8]) -> Result<()> {
        self.write_entry(key, None)
    }

    /// Internal: write an entry (value=None means tombstone)
    fn write_entry(&mut self, key: &[u8], value: Option<&[u8]>) -> Result<()> {
        self.index.push((key.to_vec(), self.current_offset));

        if self.min_key.is_none() {
            self.min_key = Some(key.to_vec());
        }
        self.max_key = Some(key.to_vec());

        let val_len = match value {
            Some(v) => v.len() as u32,
            None => TOMBSTONE_MARKER,
        };

        // [key_len(4)][val_len(4)][key][value]
        let mut entry = Vec::with_capacity(8 + key.len() + value.map_or(0, <[u8]>::len));
        entry.put_u32_le(key.len() as u32);
        entry.put_u32_le(val_len);
        entry.put_slice(key);
        if let Some(v) = value {
            entry.put_slice(v);
        }

        self.writer.write_all(&entry)?;
        self.data_hasher.update(&entry);

        self.current_offset += entry.len() as u64;
        self.entry_count += 1;

        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    /// Finish building: write index block, footer, and return metadata
    pub fn finish(mut self) -> Result<SSTable> {
        let index_offset = self.current_offset;

        // Index block: [key_len(4)][offset(8)][key] for each entry
        let mut block = Vec::new();
        for (key, offset) in &self.index {
            block.put_u32_le(key.len() as u32);
            block.put_u64_le(*offset);
            block.put_slice(key);
        }
        self.writer.write_all(&block)?;

        // Footer: index_offset (8) + data_crc (4) + padding (4)
        let data_crc = self.data_hasher.finalize();
        let mut footer = Vec::with_capacity(16);
        footer.put_u64_le(index_offset);
        footer.put_u32_le(data_crc);
        footer.put_u32_le(0);
        self.writer.write_all(&footer)?;

        self.writer.flush()?;

        // Seek back and update entry count in header
        let mut file = self.writer.into_inner().map_err(|e| {
            OrdError::Storage(format!("Failed to flush SSTable: {}", e))
        })?;
        file.seek(SeekFrom::Start(COUNT_OFFSET))?;
        file.write_all(&self.entry_count.to_le_bytes())?;
        file.sync_all()?;

        let file_size = file.metadata()?.len();

        Ok(SSTable {
            path: self.path,
            entry_count: self.entry_count,
            min_key: self.min_key.unwrap_or_default(),
            max_key: self.max_key.unwrap_or_default(),
            file_size,
        })
    }
}
