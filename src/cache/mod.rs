//! Cache Module
//!
//! A volatile, expiring key-value overlay shared by every connection of one
//! logical database.
//!
//! ## Responsibilities
//! - Hold recently read or written values with an optional absolute expiry
//! - Treat expired entries as absent and drop them on access
//! - Stay within a fixed entry count, dropping expired entries before live ones
//! - Track hits, misses, inserts, expirations and evictions
//!
//! The persistent store stays authoritative. Whether a connection consults the
//! cache at all is decided by its [`CachePolicy`].
//!
//! Keys are ordered by the store comparator, so two spellings the store treats
//! as one key also share one cache slot.

mod clock;
mod expiring;
mod policy;
mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use expiring::ExpiringCache;
pub use policy::{CacheMode, CachePolicy};
pub use stats::CacheStats;

use std::time::Instant;

/// A cached value and the instant it stops being visible
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Whether the entry is invisible at `now`
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}
