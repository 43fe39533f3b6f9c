//! SSTable Module
//!
//! Sorted String Table - immutable on-disk sorted key-value storage.
//!
//! ## File Format
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ Header (15 bytes)                                       │
//! │   Magic: "OKV1" (4) | Version: u16 (2) | Count: u64 (8) │
//! │   Compression: u8 (1)                                   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Data Block (variable)                                   │
//! │   [KeyLen: u32][ValLen: u32][Key][Value]                │
//! │   ... repeated for each entry ...                       │
//! │   (ValLen = u32::MAX means tombstone, no value bytes)   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Index Block (variable)                                  │
//! │   [KeyLen: u32][Offset: u64][Key]                       │
//! │   ... repeated for each entry ...                       │
//! ├─────────────────────────────────────────────────────────┤
//! │ Footer (16 bytes)                                       │
//! │   IndexOffset: u64 (8) | DataCRC: u32 (4) | Padding (4) │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are written in the store comparator's order; the file itself does
//! not record which comparator that was (the store directory does).

mod builder;
mod iterator;
mod reader;

use std::io::{Read, Write};
use std::path::PathBuf;

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;

use crate::config::Compression;
use crate::error::{OrdError, Result};

pub use builder::SSTableBuilder;
pub use iterator::SSTableIterator;
pub use reader::{ReaderOptions, SSTableReader};

// =============================================================================
// Shared Constants (used by builder, reader, iterator)
// =============================================================================

/// Magic bytes identifying an OrdKV SSTable file
pub(crate) const MAGIC: &[u8; 4] = b"OKV1";

/// Current SSTable format version
pub(crate) const VERSION: u16 = 1;

/// Header size: Magic (4) + Version (2) + EntryCount (8) + Compression (1)
pub(crate) const HEADER_SIZE: u64 = 15;

/// Offset of the entry count within the header
pub(crate) const COUNT_OFFSET: u64 = 6;

/// Footer size: IndexOffset (8) + DataCRC (4) + Padding (4) = 16 bytes
pub(crate) const FOOTER_SIZE: u64 = 16;

/// Sentinel value indicating a tombstone (deleted key)
pub(crate) const TOMBSTONE_MARKER: u32 = u32::MAX;

// =============================================================================
// Value Compression
// =============================================================================

pub(crate) fn compression_flag(compression: Compression) -> u8 {
    match compression {
        Compression::None => 0,
        Compression::Deflate => 1,
    }
}

pub(crate) fn compression_from_flag(flag: u8) -> Result<Compression> {
    match flag {
        0 => Ok(Compression::None),
        1 => Ok(Compression::Deflate),
        other => Err(OrdError::Storage(format!(
            "Unknown SSTable compression flag: {}",
            other
        ))),
    }
}

pub(crate) fn encode_value(value: &[u8], compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(value.to_vec()),
        Compression::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::fast());
            encoder.write_all(value)?;
            Ok(encoder.finish()?)
        }
    }
}

pub(crate) fn decode_value(stored: Vec<u8>, compression: Compression) -> Result<Vec<u8>> {
    match compression {
        Compression::None => Ok(stored),
        Compression::Deflate => {
            let mut out = Vec::with_capacity(stored.len() * 2);
            DeflateDecoder::new(stored.as_slice())
                .read_to_end(&mut out)
                .map_err(|e| OrdError::Storage(format!("Corrupt compressed value: {}", e)))?;
            Ok(out)
        }
    }
}

// =============================================================================
// SSTable Metadata
// =============================================================================

/// SSTable metadata returned by the builder
#[derive(Debug, Clone)]
pub struct SSTable {
    /// Path to the SSTable file
    pub path: PathBuf,
    /// Number of entries in this SSTable
    pub entry_count: u64,
    /// Smallest key (for range filtering)
    pub min_key: Vec<u8>,
    /// Largest key (for range filtering)
    pub max_key: Vec<u8>,
    /// File size in bytes
    pub file_size: u64,
}

impl SSTable {
    /// Get the number of entries
    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }
}
