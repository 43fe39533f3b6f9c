//! Command definitions
//!
//! Represents commands from clients. Mode tokens travel as text and are
//! parsed when the command executes, so a bad token is a command-level error
//! rather than a framing error.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Append = 0x03,
    Delete = 0x04,
    IterForwards = 0x05,
    IterBackwards = 0x06,
    IterForwardsFirst = 0x07,
    IterBackwardsLast = 0x08,
    Compact = 0x09,
    Repair = 0x0A,
    Cache = 0x0B,
    Select = 0x0C,
    Flush = 0x0D,
    Ping = 0x0E,
}

impl TryFrom<u8> for CommandType {
    type Error = u8;

    fn try_from(byte: u8) -> std::result::Result<Self, u8> {
        Ok(match byte {
            0x01 => CommandType::Get,
            0x02 => CommandType::Set,
            0x03 => CommandType::Append,
            0x04 => CommandType::Delete,
            0x05 => CommandType::IterForwards,
            0x06 => CommandType::IterBackwards,
            0x07 => CommandType::IterForwardsFirst,
            0x08 => CommandType::IterBackwardsLast,
            0x09 => CommandType::Compact,
            0x0A => CommandType::Repair,
            0x0B => CommandType::Cache,
            0x0C => CommandType::Select,
            0x0D => CommandType::Flush,
            0x0E => CommandType::Ping,
            other => return Err(other),
        })
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a value by key
    Get { key: Vec<u8> },

    /// Upsert a key-value pair
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Append to the value at key
    Append { key: Vec<u8>, value: Vec<u8> },

    /// Delete a key
    Delete { key: Vec<u8> },

    /// Ascending scan from the first key >= start
    IterForwards {
        start: Vec<u8>,
        count: i64,
        mode: String,
    },

    /// Descending scan from the last key <= start
    IterBackwards {
        start: Vec<u8>,
        count: i64,
        mode: String,
    },

    /// Ascending scan from the smallest key
    IterForwardsFirst { count: i64, mode: String },

    /// Descending scan from the largest key
    IterBackwardsLast { count: i64, mode: String },

    Compact,

    Repair,

    /// Set this connection's cache policy
    Cache { expiry: i64, mode: String },

    /// Switch this connection's database
    Select { db: i64 },

    /// Force the memtable to disk
    Flush,

    /// Ping (health check)
    Ping,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Append { .. } => CommandType::Append,
            Command::Delete { .. } => CommandType::Delete,
            Command::IterForwards { .. } => CommandType::IterForwards,
            Command::IterBackwards { .. } => CommandType::IterBackwards,
            Command::IterForwardsFirst { .. } => CommandType::IterForwardsFirst,
            Command::IterBackwardsLast { .. } => CommandType::IterBackwardsLast,
            Command::Compact => CommandType::Compact,
            Command::Repair => CommandType::Repair,
            Command::Cache { .. } => CommandType::Cache,
            Command::Select { .. } => CommandType::Select,
            Command::Flush => CommandType::Flush,
            Command::Ping => CommandType::Ping,
        }
    }

    /// Command name as clients spell it
    pub fn name(&self) -> &'static str {
        match self.command_type() {
            CommandType::Get => "GET",
            CommandType::Set => "SET",
            CommandType::Append => "APPEND",
            CommandType::Delete => "DEL",
            CommandType::IterForwards => "ITERFORWARDS",
            CommandType::IterBackwards => "ITERBACKWARDS",
            CommandType::IterForwardsFirst => "ITERFORWARDSFIRST",
            CommandType::IterBackwardsLast => "ITERBACKWARDSLAST",
            CommandType::Compact => "COMPACT",
            CommandType::Repair => "REPAIR",
            CommandType::Cache => "CACHE",
            CommandType::Select => "SELECT",
            CommandType::Flush => "FLUSH",
            CommandType::Ping => "PING",
        }
    }
}
