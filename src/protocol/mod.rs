//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │   Payload (fields)          │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! A payload is a fixed sequence of fields per command. A byte field is
//! `len (4) + bytes`; an integer field is an `i64` (8), big-endian.
//!
//! ### Commands
//! - 0x01: GET               - key
//! - 0x02: SET               - key, value
//! - 0x03: APPEND            - key, suffix
//! - 0x04: DEL               - key
//! - 0x05: ITERFORWARDS      - start, count, mode
//! - 0x06: ITERBACKWARDS     - start, count, mode
//! - 0x07: ITERFORWARDSFIRST - count, mode
//! - 0x08: ITERBACKWARDSLAST - count, mode
//! - 0x09: COMPACT
//! - 0x0A: REPAIR
//! - 0x0B: CACHE             - expiry seconds, mode
//! - 0x0C: SELECT            - database index
//! - 0x0D: FLUSH
//! - 0x0E: PING
//!
//! ### Reply Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Tag (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Reply Tags
//! - 0x00: OK
//! - 0x01: NIL
//! - 0x02: BULK  - raw bytes
//! - 0x03: ARRAY - count (4) + framed replies
//! - 0x04: ERROR - UTF-8 message

mod codec;
mod command;
mod reply;

pub use codec::{
    decode_command, decode_reply, encode_command, encode_reply, read_command, read_frame,
    read_reply, write_command, write_reply, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use command::{Command, CommandType};
pub use reply::{Reply, ReplyTag};
