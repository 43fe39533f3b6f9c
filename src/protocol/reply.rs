//! Reply definitions
//!
//! Represents replies to clients.

use super::codec::HEADER_SIZE;

/// Reply tags on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReplyTag {
    Ok = 0x00,
    Nil = 0x01,
    Bulk = 0x02,
    Array = 0x03,
    Error = 0x04,
}

/// A reply to send to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Status OK
    Ok,

    /// Absent value, or an empty scan
    Nil,

    /// One value
    Bulk(Vec<u8>),

    /// Scan results
    Array(Vec<Reply>),

    /// Command-level failure; the connection stays open
    Error(String),
}

impl Reply {
    pub fn tag(&self) -> ReplyTag {
        match self {
            Reply::Ok => ReplyTag::Ok,
            Reply::Nil => ReplyTag::Nil,
            Reply::Bulk(_) => ReplyTag::Bulk,
            Reply::Array(_) => ReplyTag::Array,
            Reply::Error(_) => ReplyTag::Error,
        }
    }

    /// Create an ERROR reply
    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    /// `Bulk` for a present value, `Nil` otherwise
    pub fn from_value(value: Option<Vec<u8>>) -> Self {
        value.map_or(Reply::Nil, Reply::Bulk)
    }

    /// Length of the encoded payload, without this reply's own header
    pub fn payload_len(&self) -> usize {
        match self {
            Reply::Ok | Reply::Nil => 0,
            Reply::Bulk(value) => value.len(),
            Reply::Error(message) => message.len(),
            Reply::Array(items) => {
                4 + items
                    .iter()
                    .map(|item| HEADER_SIZE + item.payload_len())
                    .sum::<usize>()
            }
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
