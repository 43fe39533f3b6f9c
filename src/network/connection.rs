//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::{Engine, Session};
use crate::error::{OrdError, Result};
use crate::protocol::{decode_command, read_frame, write_reply, Reply};

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the command engine
    engine: Arc<Engine>,

    /// Selected database and cache policy, for this connection only
    session: Session,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and a fresh session
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            engine,
            session: Session::new(),
            peer_addr,
        })
    }

    /// Configure connection timeouts (0 = none)
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads commands in a loop and sends replies. A command that fails, or a
    /// frame that does not decode, gets an ERROR reply and the loop goes on.
    /// Returns when the client disconnects or the stream breaks.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!(peer = %self.peer_addr, "connection established");

        loop {
            let frame = match read_frame(&mut self.reader) {
                Ok(frame) => frame,
                Err(OrdError::Io(ref e)) if is_disconnect(e) => {
                    tracing::debug!(peer = %self.peer_addr, "client disconnected");
                    return Ok(());
                }
                Err(OrdError::Io(ref e)) if is_timeout(e) => {
                    tracing::debug!(peer = %self.peer_addr, "read timeout");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(peer = %self.peer_addr, error = %e, "error reading frame");
                    let _ = self.send_reply(&Reply::error(e.to_string()));
                    return Err(e);
                }
            };

            let reply = match decode_command(&frame) {
                Ok(command) => {
                    tracing::trace!(peer = %self.peer_addr, ?command, "received command");
                    self.engine.handle(&mut self.session, command)
                }
                Err(e) => {
                    tracing::debug!(peer = %self.peer_addr, error = %e, "undecodable command");
                    Reply::error(e.to_string())
                }
            };

            if let Err(e) = self.send_reply(&reply) {
                // Client left before the reply could be sent
                if let OrdError::Io(ref io_err) = e {
                    if is_disconnect(io_err) {
                        tracing::debug!(peer = %self.peer_addr, "client disconnected before reply");
                        return Ok(());
                    }
                }
                tracing::warn!(peer = %self.peer_addr, error = %e, "error writing reply");
                return Err(e);
            }
        }
    }

    fn send_reply(&mut self, reply: &Reply) -> Result<()> {
        write_reply(&mut self.writer, reply)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}

/// Unix reports `WouldBlock`, Windows `TimedOut`
fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}
