//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their framing.

use std::time::{SystemTime, UNIX_EPOCH};

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::error::{OrdError, Result};

/// Frame header: LSN (8) + CRC (4) + payload length (4)
pub const HEADER_SIZE: usize = 16;

/// A single entry in the WAL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalEntry {
    /// Log Sequence Number - monotonically increasing
    pub lsn: u64,

    /// The operation to perform
    pub operation: Operation,

    /// Timestamp (unix millis) when entry was created
    pub timestamp: u64,
}

/// Operations that can be logged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Put a key-value pair
    Put { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },
}

/// Body of a frame; the LSN lives in the header
#[derive(Serialize, Deserialize)]
struct Payload {
    operation: Operation,
    timestamp: u64,
}

#[derive(Serialize)]
struct PayloadRef<'a> {
    operation: &'a Operation,
    timestamp: u64,
}

impl WalEntry {
    /// Create an entry stamped with the current time
    pub fn new(lsn: u64, operation: Operation) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            lsn,
            operation,
            timestamp,
        }
    }

    /// Serialize to a framed record: `[lsn][crc][len][payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload = self.encode_payload()?;
        let crc = Self::checksum(self.lsn, &payload);

        let mut buf = Vec::with_capacity(HEADER_SIZE + payload.len());
        buf.put_u64_le(self.lsn);
        buf.put_u32_le(crc);
        buf.put_u32_le(payload.len() as u32);
        buf.put_slice(&payload);
        Ok(buf)
    }

    /// Deserialize a framed record, validating length and CRC
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(OrdError::WalCorruption(format!(
                "header too small: {} bytes",
                bytes.len()
            )));
        }

        let (lsn, crc, len) = Self::parse_header(bytes);
        let end = HEADER_SIZE + len;
        if bytes.len() < end {
            return Err(OrdError::WalCorruption(format!(
                "truncated payload: expected {} bytes, got {}",
                len,
                bytes.len() - HEADER_SIZE
            )));
        }

        let payload = &bytes[HEADER_SIZE..end];
        let actual = Self::checksum(lsn, payload);
        if actual != crc {
            return Err(OrdError::WalCorruption(format!(
                "CRC mismatch at lsn {}: stored {:08x}, computed {:08x}",
                lsn, crc, actual
            )));
        }

        let decoded: Payload = bincode::deserialize(payload)
            .map_err(|e| OrdError::WalCorruption(format!("undecodable payload: {}", e)))?;

        Ok(Self {
            lsn,
            operation: decoded.operation,
            timestamp: decoded.timestamp,
        })
    }

    /// Size of the framed record in bytes
    pub fn serialized_size(&self) -> Result<usize> {
        let payload_len = bincode::serialized_size(&self.payload_ref())
            .map_err(|e| OrdError::Serialization(e.to_string()))?;
        Ok(HEADER_SIZE + payload_len as usize)
    }

    /// CRC32 over the LSN and encoded payload
    pub fn compute_crc(&self) -> Result<u32> {
        let payload = self.encode_payload()?;
        Ok(Self::checksum(self.lsn, &payload))
    }

    /// Split a header into (lsn, crc, payload_len). Caller checks the length.
    pub(crate) fn parse_header(bytes: &[u8]) -> (u64, u32, usize) {
        let mut lsn = [0u8; 8];
        lsn.copy_from_slice(&bytes[0..8]);
        let mut crc = [0u8; 4];
        crc.copy_from_slice(&bytes[8..12]);
        let mut len = [0u8; 4];
        len.copy_from_slice(&bytes[12..16]);
        (
            u64::from_le_bytes(lsn),
            u32::from_le_bytes(crc),
            u32::from_le_bytes(len) as usize,
        )
    }

    fn payload_ref(&self) -> PayloadRef<'_> {
        PayloadRef {
            operation: &self.operation,
            timestamp: self.timestamp,
        }
    }

    fn encode_payload(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.payload_ref()).map_err(|e| OrdError::Serialization(e.to_string()))
    }

    fn checksum(lsn: u64, payload: &[u8]) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&lsn.to_le_bytes());
        hasher.update(payload);
        hasher.finalize()
    }
}

impl Operation {
    /// The key this operation touches
    pub fn key(&self) -> &[u8] {
        match self {
            Operation::Put { key, .. } | Operation::Delete { key } => key,
        }
    }
}
