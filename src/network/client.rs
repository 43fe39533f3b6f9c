//! Blocking Client
//!
//! One TCP connection, one request in flight at a time. ERROR replies come
//! back as `OrdError::Server`.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::error::{OrdError, Result};
use crate::protocol::{read_reply, write_command, Command, Reply};

pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| OrdError::Network(format!("failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and return the raw reply, ERROR included
    pub fn execute(&mut self, command: &Command) -> Result<Reply> {
        write_command(&mut self.writer, command)?;
        read_reply(&mut self.reader)
    }

    /// Send a command; an ERROR reply becomes `Err`
    fn call(&mut self, command: Command) -> Result<Reply> {
        match self.execute(&command)? {
            Reply::Error(message) => Err(OrdError::Server(message)),
            reply => Ok(reply),
        }
    }

    fn expect_ok(&mut self, command: Command) -> Result<()> {
        match self.call(command)? {
            Reply::Ok => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn ping(&mut self) -> Result<()> {
        match self.call(Command::Ping)? {
            Reply::Bulk(_) => Ok(()),
            other => Err(unexpected(&other)),
        }
    }

    pub fn get(&mut self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.call(Command::Get { key: key.to_vec() })? {
            Reply::Bulk(value) => Ok(Some(value)),
            Reply::Nil => Ok(None),
            other => Err(unexpected(&other)),
        }
    }

    pub fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.expect_ok(Command::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.expect_ok(Command::Append {
            key: key.to_vec(),
            value: value.to_vec(),
        })
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.expect_ok(Command::Delete { key: key.to_vec() })
    }

    /// Set this connection's cache policy
    pub fn cache(&mut self, expiry_secs: i64, mode: &str) -> Result<()> {
        self.expect_ok(Command::Cache {
            expiry: expiry_secs,
            mode: mode.to_string(),
        })
    }

    pub fn select(&mut self, db: i64) -> Result<()> {
        self.expect_ok(Command::Select { db })
    }

    pub fn flush(&mut self) -> Result<()> {
        self.expect_ok(Command::Flush)
    }

    pub fn compact(&mut self) -> Result<()> {
        self.expect_ok(Command::Compact)
    }

    /// Run any of the ITER* commands; `Nil` comes back as an empty list
    pub fn iterate(&mut self, command: Command) -> Result<Vec<Reply>> {
        match self.call(command)? {
            Reply::Array(items) => Ok(items),
            Reply::Nil => Ok(Vec::new()),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(reply: &Reply) -> OrdError {
    OrdError::Protocol(format!("unexpected reply: {:?}", reply.tag()))
}
