//! OrdKV Server Binary
//!
//! Opens every database and serves the binary protocol over TCP.

use std::sync::Arc;

use clap::{Parser, ValueEnum};
use ordkv::config::{AppendMode, Compression};
use ordkv::network::Server;
use ordkv::{ComparatorKind, Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// OrdKV Server
#[derive(Parser, Debug)]
#[command(name = "ordkv-server")]
#[command(about = "Ordered key-value store with an expiring per-connection cache")]
#[command(version)]
struct Args {
    /// Base directory; database N lives in <base-dir>/N
    #[arg(short, long, default_value = "./ordkv_data")]
    base_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    listen: String,

    /// Number of logical databases
    #[arg(short = 'n', long, default_value = "16")]
    databases: usize,

    /// Worker threads (one connection each at a time)
    #[arg(short, long, default_value = "64")]
    workers: usize,

    /// MemTable size in MB before flush
    #[arg(short = 'm', long, default_value = "128")]
    write_buffer_mb: usize,

    /// SSTable value cache size in MB (0 disables it)
    #[arg(long, default_value = "128")]
    block_cache_mb: usize,

    /// Entries held by each database's expiring cache
    #[arg(long, default_value = "100000")]
    cache_entries: usize,

    /// Key ordering; fixed for the lifetime of a store
    #[arg(long, value_enum, default_value_t = ComparatorArg::CaseInsensitive)]
    comparator: ComparatorArg,

    /// Store SSTable values uncompressed
    #[arg(long)]
    no_compression: bool,

    /// Read the old value outside the write lock on APPEND
    #[arg(long)]
    unserialized_append: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ComparatorArg {
    CaseInsensitive,
    Bytewise,
}

impl From<ComparatorArg> for ComparatorKind {
    fn from(arg: ComparatorArg) -> Self {
        match arg {
            ComparatorArg::CaseInsensitive => ComparatorKind::CaseInsensitive,
            ComparatorArg::Bytewise => ComparatorKind::Bytewise,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ordkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("OrdKV Server v{}", ordkv::VERSION);
    tracing::info!("Base directory: {}", args.base_dir);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .base_dir(&args.base_dir)
        .listen_addr(&args.listen)
        .num_databases(args.databases)
        .worker_threads(args.workers)
        .write_buffer_size(args.write_buffer_mb * 1024 * 1024)
        .block_cache_size(args.block_cache_mb * 1024 * 1024)
        .cache_capacity(args.cache_entries)
        .comparator(args.comparator.into())
        .compression(if args.no_compression {
            Compression::None
        } else {
            Compression::Deflate
        })
        .append_mode(if args.unserialized_append {
            AppendMode::ReadThenWrite
        } else {
            AppendMode::Serialized
        })
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let mut server = Server::new(config, Arc::clone(&engine));
    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
    drop(server);

    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close() {
                tracing::error!("Failed to close engine cleanly: {}", e);
                std::process::exit(1);
            }
        }
        Err(_) => tracing::warn!("Engine still referenced, skipping close"),
    }

    tracing::info!("Server stopped");
}
