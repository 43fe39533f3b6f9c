//! Error types for OrdKV
//!
//! Provides a unified error type for all operations.
//!
//! Engine-level failures (I/O, WAL, storage) are wrapped into the
//! operation-level kinds `OpenFailed`, `ReadFailed` and `WriteFailed` at the
//! store boundary, so callers can tell *which* operation failed without
//! inspecting the underlying cause.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using OrdError
pub type Result<T> = std::result::Result<T, OrdError>;

/// Unified error type for OrdKV operations
#[derive(Debug, Error)]
pub enum OrdError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL corruption detected: {0}")]
    WalCorruption(String),

    #[error("WAL write failed: {0}")]
    WalWrite(String),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Key not found")]
    KeyNotFound,

    // -------------------------------------------------------------------------
    // Store Operation Errors
    // -------------------------------------------------------------------------
    #[error("unable to open store at {}: {reason}", path.display())]
    OpenFailed { path: PathBuf, reason: String },

    #[error("{op} failed: {reason}")]
    ReadFailed { op: &'static str, reason: String },

    #[error("{op} failed: {reason}")]
    WriteFailed { op: &'static str, reason: String },

    #[error("database {0} is unavailable")]
    DatabaseUnavailable(usize),

    // -------------------------------------------------------------------------
    // Client Errors
    // -------------------------------------------------------------------------
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    /// An ERROR reply received by a client
    #[error("Server error: {0}")]
    Server(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl OrdError {
    /// Wrap an engine error as a failed read of `op`
    pub(crate) fn read_failed(op: &'static str, err: OrdError) -> Self {
        match err {
            e @ OrdError::ReadFailed { .. } => e,
            other => OrdError::ReadFailed {
                op,
                reason: other.to_string(),
            },
        }
    }

    /// Wrap an engine error as a failed write of `op`
    pub(crate) fn write_failed(op: &'static str, err: OrdError) -> Self {
        match err {
            e @ (OrdError::WriteFailed { .. } | OrdError::ReadFailed { .. }) => e,
            other => OrdError::WriteFailed {
                op,
                reason: other.to_string(),
            },
        }
    }

    /// True for errors caused by the request rather than the store
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            OrdError::InvalidArgument(_) | OrdError::NotImplemented(_) | OrdError::Protocol(_)
        )
    }
}
