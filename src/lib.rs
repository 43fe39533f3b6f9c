//! # OrdKV
//!
//! An ordered, persistent key-value store with:
//! - Keys ordered by a pluggable comparator (case-insensitive by default)
//! - Write-Ahead Logging (WAL) and SSTables, with full compaction
//! - Bounded forward and backward range scans
//! - A per-connection, read/write-through expiring cache
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │            (Worker pool, one Session per client)             │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │              (Databases 0..num_databases)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                      Database                                │
//! │         ExpiringCache (shared)  ──►  Store (authoritative)   │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     WAL     │          │  MemTable   │
//!   │  (Append)   │          │  (RwLock)   │
//!   └─────────────┘          └──────┬──────┘
//!                                   │
//!                                   ▼
//!                           ┌─────────────┐
//!                           │   Storage   │
//!                           │  (SSTable)  │
//!                           └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod comparator;

pub mod wal;
pub mod memtable;
pub mod storage;
pub mod cursor;
pub mod scan;
pub mod store;
pub mod cache;
pub mod database;
pub mod engine;
pub mod network;
pub mod protocol;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{OrdError, Result};
pub use config::{Config, StoreOptions};
pub use comparator::{ComparatorKind, KeyComparator};
pub use store::Store;
pub use database::Database;
pub use engine::{Engine, Session};
pub use cache::CachePolicy;
pub use scan::{ScanFrom, ScanItem, ScanMode};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of OrdKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
