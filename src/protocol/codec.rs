//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Reply Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Tag (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! An ARRAY payload is `count (4)` followed by `count` complete reply frames.

use std::io::{Read, Write};

use bytes::{Buf, BufMut};

use super::{Command, CommandType, Reply, ReplyTag};
use crate::error::{OrdError, Result};

/// Header size: 1 byte command/tag + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (64 MB); a full 65535-entry scan must fit
pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = Vec::new();

    match command {
        Command::Get { key } | Command::Delete { key } => put_bytes(&mut payload, key),
        Command::Set { key, value } | Command::Append { key, value } => {
            put_bytes(&mut payload, key);
            put_bytes(&mut payload, value);
        }
        Command::IterForwards { start, count, mode }
        | Command::IterBackwards { start, count, mode } => {
            put_bytes(&mut payload, start);
            payload.put_i64(*count);
            put_bytes(&mut payload, mode.as_bytes());
        }
        Command::IterForwardsFirst { count, mode } | Command::IterBackwardsLast { count, mode } => {
            payload.put_i64(*count);
            put_bytes(&mut payload, mode.as_bytes());
        }
        Command::Cache { expiry, mode } => {
            payload.put_i64(*expiry);
            put_bytes(&mut payload, mode.as_bytes());
        }
        Command::Select { db } => payload.put_i64(*db),
        Command::Compact | Command::Repair | Command::Flush | Command::Ping => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from one complete frame
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    let cmd_type = CommandType::try_from(cmd_type).map_err(|byte| {
        OrdError::Protocol(format!("Unknown command type: 0x{:02x}", byte))
    })?;

    let mut fields = Fields {
        buf: payload,
        command: cmd_type,
    };

    let command = match cmd_type {
        CommandType::Get => Command::Get { key: fields.bytes()? },
        CommandType::Set => Command::Set {
            key: fields.bytes()?,
            value: fields.bytes()?,
        },
        CommandType::Append => Command::Append {
            key: fields.bytes()?,
            value: fields.bytes()?,
        },
        CommandType::Delete => Command::Delete { key: fields.bytes()? },
        CommandType::IterForwards => Command::IterForwards {
            start: fields.bytes()?,
            count: fields.int()?,
            mode: fields.text()?,
        },
        CommandType::IterBackwards => Command::IterBackwards {
            start: fields.bytes()?,
            count: fields.int()?,
            mode: fields.text()?,
        },
        CommandType::IterForwardsFirst => Command::IterForwardsFirst {
            count: fields.int()?,
            mode: fields.text()?,
        },
        CommandType::IterBackwardsLast => Command::IterBackwardsLast {
            count: fields.int()?,
            mode: fields.text()?,
        },
        CommandType::Compact => Command::Compact,
        CommandType::Repair => Command::Repair,
        CommandType::Cache => Command::Cache {
            expiry: fields.int()?,
            mode: fields.text()?,
        },
        CommandType::Select => Command::Select { db: fields.int()? },
        CommandType::Flush => Command::Flush,
        CommandType::Ping => Command::Ping,
    };

    fields.finish()?;
    Ok(command)
}

/// Sequential reader over a command payload
struct Fields<'a> {
    buf: &'a [u8],
    command: CommandType,
}

impl Fields<'_> {
    fn bytes(&mut self) -> Result<Vec<u8>> {
        if self.buf.remaining() < 4 {
            return Err(self.error("missing field length"));
        }
        let len = self.buf.get_u32() as usize;
        if self.buf.remaining() < len {
            return Err(self.error(&format!(
                "incomplete field (expected {}, got {})",
                len,
                self.buf.remaining()
            )));
        }
        let field = self.buf[..len].to_vec();
        self.buf.advance(len);
        Ok(field)
    }

    fn text(&mut self) -> Result<String> {
        String::from_utf8(self.bytes()?).map_err(|_| self.error("field is not valid UTF-8"))
    }

    fn int(&mut self) -> Result<i64> {
        if self.buf.remaining() < 8 {
            return Err(self.error("missing integer field"));
        }
        Ok(self.buf.get_i64())
    }

    fn finish(self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(self.error(&format!(
                "unexpected trailing {} bytes",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn error(&self, message: &str) -> OrdError {
        OrdError::Protocol(format!("{:?} command: {}", self.command, message))
    }
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Encode a reply to bytes
///
/// Format: tag (1) + payload_len (4) + payload
pub fn encode_reply(reply: &Reply) -> Vec<u8> {
    let payload = match reply {
        Reply::Ok | Reply::Nil => Vec::new(),
        Reply::Bulk(value) => value.clone(),
        Reply::Error(message) => message.as_bytes().to_vec(),
        Reply::Array(items) => {
            let mut payload = Vec::new();
            payload.put_u32(items.len() as u32);
            for item in items {
                payload.put_slice(&encode_reply(item));
            }
            payload
        }
    };

    frame(reply.tag() as u8, &payload)
}

/// Decode a reply from one complete frame
pub fn decode_reply(bytes: &[u8]) -> Result<Reply> {
    let mut buf = bytes;
    let reply = decode_reply_from(&mut buf)?;
    if buf.has_remaining() {
        return Err(OrdError::Protocol(format!(
            "Reply has {} trailing bytes",
            buf.remaining()
        )));
    }
    Ok(reply)
}

/// Decode one reply frame from the front of `buf`, consuming it
fn decode_reply_from(buf: &mut &[u8]) -> Result<Reply> {
    let bytes: &[u8] = *buf;
    let (tag, payload) = split_frame(bytes, "reply")?;
    let consumed = HEADER_SIZE + payload.len();

    let reply = match tag {
        t if t == ReplyTag::Ok as u8 => Reply::Ok,
        t if t == ReplyTag::Nil as u8 => Reply::Nil,
        t if t == ReplyTag::Bulk as u8 => Reply::Bulk(payload.to_vec()),
        t if t == ReplyTag::Error as u8 => {
            Reply::Error(String::from_utf8_lossy(payload).into_owned())
        }
        t if t == ReplyTag::Array as u8 => {
            let mut items_buf = payload;
            if items_buf.remaining() < 4 {
                return Err(OrdError::Protocol("Array reply: missing count".to_string()));
            }
            let count = items_buf.get_u32() as usize;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(decode_reply_from(&mut items_buf)?);
            }
            if items_buf.has_remaining() {
                return Err(OrdError::Protocol(
                    "Array reply: unexpected trailing bytes".to_string(),
                ));
            }
            Reply::Array(items)
        }
        other => {
            return Err(OrdError::Protocol(format!(
                "Unknown reply tag: 0x{:02x}",
                other
            )))
        }
    };

    buf.advance(consumed);
    Ok(reply)
}

// =============================================================================
// Framing
// =============================================================================

fn put_bytes(payload: &mut Vec<u8>, bytes: &[u8]) {
    payload.put_u32(bytes.len() as u32);
    payload.put_slice(bytes);
}

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.put_u8(kind);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message
}

/// Split the first frame in `bytes` into (kind, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(OrdError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let kind = bytes[0];
    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    check_payload_len(payload_len)?;

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(OrdError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((kind, &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(len: u32) -> Result<()> {
    if len > MAX_PAYLOAD_SIZE {
        return Err(OrdError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
///
/// After a successful read the stream sits on a frame boundary, so a frame
/// that then fails to decode can be answered without closing the stream.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    check_payload_len(payload_len)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete reply from a stream
pub fn read_reply<R: Read>(reader: &mut R) -> Result<Reply> {
    decode_reply(&read_frame(reader)?)
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    let len = reply.payload_len();
    if len > MAX_PAYLOAD_SIZE as usize {
        return Err(OrdError::Protocol(format!(
            "Reply too large: {} bytes (max {})",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    writer.write_all(&encode_reply(reply))?;
    writer.flush()?;
    Ok(())
}
