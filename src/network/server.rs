//! TCP Server
//!
//! Accepts connections and dispatches them to a fixed pool of worker threads
//! over a crossbeam channel.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver};

use super::Connection;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::{OrdError, Result};

/// How long the accept loop sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server for OrdKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self {
            config,
            engine,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Bind the listen address; returns the bound address
    ///
    /// `run` binds on its own if this was not called. Binding first lets a
    /// caller listen on port 0 and learn the real port.
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr).map_err(|e| {
            OrdError::Network(format!("failed to bind {}: {}", self.config.listen_addr, e))
        })?;
        // Non-blocking accept so the loop can observe shutdown
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        Ok(addr)
    }

    /// Start the server (blocking)
    ///
    /// Returns once shutdown is requested and every worker has finished its
    /// current connection.
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let Some(listener) = self.listener.take() else {
            return Err(OrdError::Network("listener not bound".to_string()));
        };

        let workers = self.config.worker_threads.max(1);
        let (sender, receiver) = channel::bounded::<TcpStream>(workers * 4);
        let handles: Vec<JoinHandle<()>> = (0..workers)
            .map(|id| self.spawn_worker(id, receiver.clone()))
            .collect::<io::Result<_>>()?;
        drop(receiver);

        tracing::info!(addr = %listener.local_addr()?, workers, "server listening");

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, peer)) => {
                    stream.set_nonblocking(false)?;
                    tracing::debug!(%peer, "accepted connection");
                    if sender.send(stream).is_err() {
                        tracing::error!("all workers exited, stopping accept loop");
                        break;
                    }
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }

        tracing::info!("shutting down, waiting for workers");
        drop(sender);
        for handle in handles {
            if handle.join().is_err() {
                tracing::error!("worker thread panicked");
            }
        }
        Ok(())
    }

    fn spawn_worker(&self, id: usize, receiver: Receiver<TcpStream>) -> io::Result<JoinHandle<()>> {
        let engine = Arc::clone(&self.engine);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        thread::Builder::new()
            .name(format!("ordkv-worker-{}", id))
            .spawn(move || {
                for stream in receiver.iter() {
                    let result = Connection::new(stream, Arc::clone(&engine)).and_then(|mut conn| {
                        conn.set_timeouts(read_ms, write_ms)?;
                        conn.handle()
                    });
                    if let Err(e) = result {
                        tracing::debug!(worker = id, error = %e, "connection ended with error");
                    }
                }
            })
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Flag that stops the accept loop when set, for use from other threads
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}
