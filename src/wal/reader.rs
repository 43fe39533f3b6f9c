//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{OrdError, Result};

use super::{WalEntry, HEADER_SIZE};

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,

    /// Byte offset of the next frame
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at a clean end of file and `WalCorruption` for a
    /// partial or damaged frame.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut header = [0u8; HEADER_SIZE];
        let read = read_up_to(&mut self.reader, &mut header)?;
        if read == 0 {
            return Ok(None);
        }
        if read < HEADER_SIZE {
            return Err(OrdError::WalCorruption(format!(
                "partial header at offset {}: {} bytes",
                self.position, read
            )));
        }

        let (_, _, len) = WalEntry::parse_header(&header);
        let mut frame = Vec::with_capacity(HEADER_SIZE + len);
        frame.extend_from_slice(&header);
        frame.resize(HEADER_SIZE + len, 0);

        let got = read_up_to(&mut self.reader, &mut frame[HEADER_SIZE..])?;
        if got < len {
            return Err(OrdError::WalCorruption(format!(
                "partial entry at offset {}: expected {} payload bytes, got {}",
                self.position, len, got
            )));
        }

        let entry = WalEntry::deserialize(&frame)?;
        self.position += frame.len() as u64;
        Ok(Some(entry))
    }

    /// Byte offset just past the last entry read
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    ///
    /// The iterator yields the first error it meets and then stops.
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the stream allows, returning the byte count
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
