//! WAL Writer
//!
//! Handles appending entries to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{OrdError, Result};

use super::{Operation, WalEntry, WalReader};

/// Writes entries to the WAL file
pub struct WalWriter {
    /// Path of the log (for diagnostics)
    path: PathBuf,

    /// Buffered append handle
    writer: BufWriter<File>,

    /// LSN assigned to the next appended entry
    next_lsn: u64,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Entries written since the last fsync
    uncommitted: usize,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// Existing entries are kept; LSNs continue after the last valid entry.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let last_lsn = if path.exists() {
            Self::scan_last_lsn(path)?
        } else {
            0
        };

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)?;
        file.seek(SeekFrom::End(0))?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            next_lsn: last_lsn + 1,
            sync_strategy,
            uncommitted: 0,
        })
    }

    /// Append an operation, returning the LSN assigned to it
    pub fn append(&mut self, operation: Operation) -> Result<u64> {
        let lsn = self.next_lsn;
        let entry = WalEntry::new(lsn, operation);
        let bytes = entry.serialize()?;

        self.writer
            .write_all(&bytes)
            .and_then(|_| self.writer.flush())
            .map_err(|e| OrdError::WalWrite(format!("{}: {}", self.path.display(), e)))?;

        self.next_lsn += 1;
        self.uncommitted += 1;

        match self.sync_strategy {
            WalSyncStrategy::EveryWrite => self.sync()?,
            WalSyncStrategy::EveryNEntries { count } if self.uncommitted >= count => self.sync()?,
            _ => {}
        }

        Ok(lsn)
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Discard all entries (after they are durable elsewhere)
    ///
    /// LSNs keep increasing across truncation.
    pub fn truncate(&mut self) -> Result<()> {
        self.writer.flush()?;
        let file = self.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.sync_all()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Get the LSN the next append will receive
    pub fn current_lsn(&self) -> u64 {
        self.next_lsn
    }

    /// Entries appended since the last fsync
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    fn scan_last_lsn(path: &Path) -> Result<u64> {
        let mut last = 0;
        for entry in WalReader::open(path)?.entries() {
            match entry {
                Ok(entry) => last = entry.lsn,
                // A torn tail ends the scan; recovery deals with it
                Err(_) => break,
            }
        }
        Ok(last)
    }
}
