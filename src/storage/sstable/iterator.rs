//! SSTable Iterator
//!
//! Sequential iteration over all entries in an SSTable.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};

use parking_lot::MutexGuard;

use crate::config::Compression;
use crate::error::{OrdError, Result};

use super::reader::read_u32;
use super::{decode_value, HEADER_SIZE, TOMBSTONE_MARKER};

/// Iterator over SSTable entries in sorted key order
pub struct SSTableIterator<'a> {
    file: MutexGuard<'a, BufReader<File>>,
    /// Stop reading when we reach this offset (start of index block)
    end_offset: u64,
    /// Current position in file
    current_offset: u64,
    compression: Compression,
    failed: bool,
}

impl<'a> SSTableIterator<'a> {
    /// Create a new iterator starting from the data block
    pub(super) fn new(
        mut file: MutexGuard<'a, BufReader<File>>,
        end_offset: u64,
        compression: Compression,
    ) -> Result<Self> {
        file.seek(SeekFrom::Start(HEADER_SIZE))?;
        Ok(Self {
            file,
            end_offset,
            current_offset: HEADER_SIZE,
            compression,
            failed: false,
        })
    }

    fn read_entry(&mut self) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
        let mut header = [0u8; 8];
        self.file.read_exact(&mut header)?;

        let key_len = read_u32(&header[0..4]) as usize;
        let val_len = read_u32(&header[4..8]);

        let mut key = vec![0u8; key_len];
        self.file.read_exact(&mut key)?;

        let mut entry_size = 8 + key_len as u64;

        let value = if val_len == TOMBSTONE_MARKER {
            None
        } else {
            let mut stored = vec![0u8; val_len as usize];
            self.file.read_exact(&mut stored)?;
            entry_size += val_len as u64;
            Some(decode_value(stored, self.compression)?)
        };

        self.current_offset += entry_size;
        if self.current_offset > self.end_offset {
            return Err(OrdError::Storage(
                "SSTable entry overruns the index block".to_string(),
            ));
        }

        Ok((key, value))
    }
}

impl<'a> Iterator for SSTableIterator<'a> {
    /// (key, Option<value>): None value means tombstone
    type Item = Result<(Vec<u8>, Option<Vec<u8>>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.current_offset >= self.end_offset {
            return None;
        }

        let entry = self.read_entry();
        if entry.is_err() {
            self.failed = true;
        }
        Some(entry)
    }
}
