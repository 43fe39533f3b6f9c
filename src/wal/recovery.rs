//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.
//!
//! A complete frame that fails its CRC is skipped and counted; recovery
//! carries on with the frame after it. A frame that runs past the end of the
//! file is a torn tail and is cut off. A damaged length field looks the same
//! as a torn tail, so entries after it are lost.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::Result;

use super::{WalEntry, HEADER_SIZE};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,

    /// Whether a torn tail was found (and, for `recover`, removed)
    pub was_truncated: bool,
}

/// Outcome of scanning a WAL image
struct Scan {
    entries: Vec<WalEntry>,
    result: RecoveryResult,
    valid_len: u64,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Skip complete entries that fail their CRC
    /// 3. Truncate a partial entry at the end of the file
    /// 4. Return all valid entries in order
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let scan = Self::scan(path)?;

        if scan.result.was_truncated {
            tracing::warn!(
                path = %path.display(),
                valid_len = scan.valid_len,
                corrupted = scan.result.entries_corrupted,
                "truncating damaged WAL tail"
            );
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        Ok((scan.entries, scan.result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Ok(Self::scan(path)?.result)
    }

    fn scan(path: &Path) -> Result<Scan> {
        let data = fs::read(path)?;
        let mut entries = Vec::new();
        let mut result = RecoveryResult::default();
        let mut pos = 0usize;

        while pos < data.len() {
            let rest = &data[pos..];
            if rest.len() < HEADER_SIZE {
                result.was_truncated = true;
                break;
            }

            let (_, _, len) = WalEntry::parse_header(rest);
            let frame_len = HEADER_SIZE + len;
            if rest.len() < frame_len {
                result.was_truncated = true;
                break;
            }

            match WalEntry::deserialize(&rest[..frame_len]) {
                Ok(entry) => {
                    result.entries_recovered += 1;
                    result.last_lsn = entry.lsn;
                    entries.push(entry);
                }
                Err(e) => {
                    tracing::warn!(offset = pos, error = %e, "skipping corrupted WAL entry");
                    result.entries_corrupted += 1;
                }
            }
            pos += frame_len;
        }

        Ok(Scan {
            entries,
            result,
            valid_len: pos as u64,
        })
    }
}
