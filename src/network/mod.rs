//! Network Module
//!
//! TCP server, connection handling and a blocking client.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections
//! - Commands routed through Engine with a per-connection Session

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::Server;
