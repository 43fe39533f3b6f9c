//! Per-connection cache policy

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{OrdError, Result};

/// CACHE command mode token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    On,
    Off,
}

impl FromStr for CacheMode {
    type Err = OrdError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("on") {
            Ok(CacheMode::On)
        } else if s.eq_ignore_ascii_case("off") {
            Ok(CacheMode::Off)
        } else {
            Err(OrdError::InvalidArgument(format!(
                "unknown cache mode '{}', expected ON or OFF",
                s
            )))
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheMode::On => f.write_str("ON"),
            CacheMode::Off => f.write_str("OFF"),
        }
    }
}

/// Whether a connection uses the cache, and for how long entries live
///
/// Starts disabled. Lives as long as the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CachePolicy {
    pub enabled: bool,
    /// `None` means entries never expire
    pub expiry: Option<Duration>,
}

impl CachePolicy {
    /// Enabled with the given expiry (`0` = no expiry)
    pub fn enabled(expiry_secs: u64) -> Self {
        Self {
            enabled: true,
            expiry: (expiry_secs > 0).then(|| Duration::from_secs(expiry_secs)),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build a policy from CACHE command arguments
    pub fn from_args(expiry_secs: i64, mode: &str) -> Result<Self> {
        let mode: CacheMode = mode.parse()?;
        if expiry_secs < 0 {
            return Err(OrdError::InvalidArgument(format!(
                "cache expiry must be non-negative, got {}",
                expiry_secs
            )));
        }
        Ok(match mode {
            CacheMode::On => Self::enabled(expiry_secs as u64),
            CacheMode::Off => Self::disabled(),
        })
    }
}
