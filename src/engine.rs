//! Engine Module
//!
//! Owns every logical database and executes client commands against them.
//!
//! ## Responsibilities
//! - Open `num_databases` stores under the base directory
//! - Keep serving when one database fails to open
//! - Route commands through the session's database and cache policy
//! - Close databases in reverse order on shutdown

use std::fs;
use std::sync::Arc;

use crate::cache::{CachePolicy, Clock, SystemClock};
use crate::config::Config;
use crate::database::Database;
use crate::error::{OrdError, Result};
use crate::protocol::{Command, Reply, MAX_PAYLOAD_SIZE};
use crate::scan::{self, ScanFrom, ScanItem, ScanMode};

/// Per-connection state
///
/// Created when a connection is accepted and dropped with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Selected database index
    pub db: usize,

    /// Cache policy set by CACHE
    pub cache: CachePolicy,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The command engine
///
/// ## Concurrency Model
///
/// `Engine` is shared across connection workers behind an `Arc`. Each
/// `Database` does its own locking, so commands on different databases never
/// contend and reads on the same database run concurrently.
pub struct Engine {
    config: Config,

    /// One slot per logical database; `None` when it failed to open
    databases: Vec<Option<Database>>,
}

impl Engine {
    /// Open every database named by `config`
    ///
    /// A database that fails to open is logged and left unavailable. Only a
    /// configuration error or an unusable base directory fails the engine.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock))
    }

    /// Open with a caller-supplied clock for cache expiry
    pub fn open_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.num_databases == 0 {
            return Err(OrdError::Config("num_databases must be at least 1".to_string()));
        }
        fs::create_dir_all(&config.base_dir)?;

        let mut databases = Vec::with_capacity(config.num_databases);
        for db_id in 0..config.num_databases {
            match Database::open_with_clock(&config.base_dir, db_id, config.store.clone(), clock.clone()) {
                Ok(db) => databases.push(Some(db)),
                Err(e) => {
                    tracing::error!(db = db_id, error = %e, "database unavailable");
                    databases.push(None);
                }
            }
        }

        tracing::info!(
            base_dir = %config.base_dir.display(),
            databases = config.num_databases,
            available = databases.iter().filter(|d| d.is_some()).count(),
            "engine opened"
        );

        Ok(Self { config, databases })
    }

    /// Execute a command, turning any error into an ERROR reply
    pub fn handle(&self, session: &mut Session, command: Command) -> Reply {
        let name = command.name();
        match self
            .execute(session, command)
            .and_then(|reply| self.check_reply_size(reply))
        {
            Ok(reply) => reply,
            Err(e) => {
                if e.is_client_error() {
                    tracing::debug!(command = name, error = %e, "command rejected");
                } else {
                    tracing::warn!(command = name, db = session.db, error = %e, "command failed");
                }
                Reply::error(format!("{}: {}", name, e))
            }
        }
    }

    /// Execute a command in the context of `session`
    pub fn execute(&self, session: &mut Session, command: Command) -> Result<Reply> {
        tracing::trace!(db = session.db, command = command.name(), "execute");

        match command {
            Command::Ping => Ok(Reply::Bulk(b"PONG".to_vec())),

            Command::Get { key } => {
                let db = self.database(session.db)?;
                Ok(Reply::from_value(db.get(&session.cache, &key)?))
            }

            Command::Set { key, value } => {
                self.database(session.db)?.set(&session.cache, &key, &value)?;
                Ok(Reply::Ok)
            }

            Command::Append { key, value } => {
                self.database(session.db)?.append(&session.cache, &key, &value)?;
                Ok(Reply::Ok)
            }

            Command::Delete { key } => {
                self.database(session.db)?.delete(&session.cache, &key)?;
                Ok(Reply::Ok)
            }

            Command::IterForwards { start, count, mode } => {
                self.iterate(session, ScanFrom::Forward(start), count, &mode)
            }

            Command::IterBackwards { start, count, mode } => {
                self.iterate(session, ScanFrom::Backward(start), count, &mode)
            }

            Command::IterForwardsFirst { count, mode } => {
                self.iterate(session, ScanFrom::First, count, &mode)
            }

            Command::IterBackwardsLast { count, mode } => {
                self.iterate(session, ScanFrom::Last, count, &mode)
            }

            Command::Compact => {
                self.database(session.db)?.compact()?;
                Ok(Reply::Ok)
            }

            Command::Repair => {
                self.database(session.db)?.repair()?;
                Ok(Reply::Ok)
            }

            Command::Flush => {
                self.database(session.db)?.flush()?;
                Ok(Reply::Ok)
            }

            Command::Cache { expiry, mode } => {
                session.cache = CachePolicy::from_args(expiry, &mode)?;
                tracing::debug!(
                    enabled = session.cache.enabled,
                    expiry = ?session.cache.expiry,
                    "cache policy changed"
                );
                Ok(Reply::Ok)
            }

            Command::Select { db } => {
                let index = usize::try_from(db)
                    .ok()
                    .filter(|&i| i < self.databases.len())
                    .ok_or_else(|| {
                        OrdError::InvalidArgument(format!(
                            "database index {} out of range 0..{}",
                            db,
                            self.databases.len()
                        ))
                    })?;
                self.database(index)?;
                session.db = index;
                Ok(Reply::Ok)
            }
        }
    }

    /// Validate arguments, scan, and shape the reply
    fn iterate(&self, session: &Session, from: ScanFrom, count: i64, mode: &str) -> Result<Reply> {
        let count = scan::check_count(count)?;
        let mode: ScanMode = mode.parse()?;

        let items = self
            .database(session.db)?
            .iterate(&session.cache, &from, count, mode)?;

        if items.is_empty() {
            return Ok(Reply::Nil);
        }

        Ok(Reply::Array(
            items
                .into_iter()
                .map(|ScanItem { key, value }| match value {
                    Some(value) => Reply::Array(vec![Reply::Bulk(key), Reply::Bulk(value)]),
                    None => Reply::Bulk(key),
                })
                .collect(),
        ))
    }

    /// Reject a reply whose payload would not fit in one protocol frame
    fn check_reply_size(&self, reply: Reply) -> Result<Reply> {
        let limit = self.config.max_reply_size.min(MAX_PAYLOAD_SIZE as usize);
        let len = reply.payload_len();
        if len > limit {
            return Err(OrdError::InvalidArgument(format!(
                "reply of {} bytes exceeds the {} byte limit, request fewer entries",
                len, limit
            )));
        }
        Ok(reply)
    }

    /// Database `db_id`, if it exists and opened
    pub fn database(&self, db_id: usize) -> Result<&Database> {
        match self.databases.get(db_id) {
            Some(Some(db)) => Ok(db),
            Some(None) => Err(OrdError::DatabaseUnavailable(db_id)),
            None => Err(OrdError::InvalidArgument(format!(
                "database index {} out of range 0..{}",
                db_id,
                self.databases.len()
            ))),
        }
    }

    /// Number of configured databases
    pub fn num_databases(&self) -> usize {
        self.databases.len()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Close every database, last opened first
    ///
    /// Every database is closed even if an earlier one fails; the first error
    /// is returned.
    pub fn close(self) -> Result<()> {
        let mut first_error = None;

        for (db_id, db) in self.databases.into_iter().enumerate().rev() {
            let Some(db) = db else { continue };
            if let Err(e) = db.close() {
                tracing::error!(db = db_id, error = %e, "failed to close database");
                first_error.get_or_insert(e);
            }
        }

        tracing::info!("engine closed");
        first_error.map_or(Ok(()), Err)
    }
}
