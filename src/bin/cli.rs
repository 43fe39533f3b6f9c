//! OrdKV CLI Client
//!
//! Command-line interface for interacting with OrdKV. Each invocation opens
//! one connection, so SELECT and CACHE apply to the command given with them.

use clap::{Parser, Subcommand};
use ordkv::network::Client;
use ordkv::protocol::{Command, Reply};

/// OrdKV CLI
#[derive(Parser, Debug)]
#[command(name = "ordkv-cli")]
#[command(about = "CLI for the OrdKV key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:6380")]
    server: String,

    /// Database to select before the command
    #[arg(short, long)]
    db: Option<i64>,

    /// Enable the cache with this expiry in seconds (0 = no expiry)
    #[arg(long)]
    cache_expiry: Option<i64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Get a value by key
    Get { key: String },

    /// Set a key-value pair
    Set { key: String, value: String },

    /// Append to the value at key
    Append { key: String, value: String },

    /// Delete a key
    Del { key: String },

    /// Scan upward from the first key >= start
    IterForwards {
        start: String,
        count: i64,
        #[arg(default_value = "keysandvalues")]
        mode: String,
    },

    /// Scan downward from the last key <= start
    IterBackwards {
        start: String,
        count: i64,
        #[arg(default_value = "keysandvalues")]
        mode: String,
    },

    /// Scan upward from the smallest key
    IterForwardsFirst {
        count: i64,
        #[arg(default_value = "keysandvalues")]
        mode: String,
    },

    /// Scan downward from the largest key
    IterBackwardsLast {
        count: i64,
        #[arg(default_value = "keysandvalues")]
        mode: String,
    },

    /// Merge all SSTables of the database
    Compact,

    /// Repair the database
    Repair,

    /// Force the memtable to disk
    Flush,

    /// Ping the server
    Ping,
}

impl From<Commands> for Command {
    fn from(command: Commands) -> Self {
        match command {
            Commands::Get { key } => Command::Get { key: key.into_bytes() },
            Commands::Set { key, value } => Command::Set {
                key: key.into_bytes(),
                value: value.into_bytes(),
            },
            Commands::Append { key, value } => Command::Append {
                key: key.into_bytes(),
                value: value.into_bytes(),
            },
            Commands::Del { key } => Command::Delete { key: key.into_bytes() },
            Commands::IterForwards { start, count, mode } => Command::IterForwards {
                start: start.into_bytes(),
                count,
                mode,
            },
            Commands::IterBackwards { start, count, mode } => Command::IterBackwards {
                start: start.into_bytes(),
                count,
                mode,
            },
            Commands::IterForwardsFirst { count, mode } => Command::IterForwardsFirst { count, mode },
            Commands::IterBackwardsLast { count, mode } => Command::IterBackwardsLast { count, mode },
            Commands::Compact => Command::Compact,
            Commands::Repair => Command::Repair,
            Commands::Flush => Command::Flush,
            Commands::Ping => Command::Ping,
        }
    }
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("(error) {}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> ordkv::Result<()> {
    let mut client = Client::connect(&args.server)?;

    if let Some(db) = args.db {
        client.select(db)?;
    }
    if let Some(expiry) = args.cache_expiry {
        client.cache(expiry, "on")?;
    }

    let reply = client.execute(&args.command.into())?;
    print_reply(&reply, 0);
    Ok(())
}

fn print_reply(reply: &Reply, depth: usize) {
    let indent = "  ".repeat(depth);
    match reply {
        Reply::Ok => println!("{}OK", indent),
        Reply::Nil => println!("{}(nil)", indent),
        Reply::Bulk(value) => println!("{}{}", indent, String::from_utf8_lossy(value)),
        Reply::Error(message) => println!("{}(error) {}", indent, message),
        Reply::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                match item {
                    Reply::Array(_) => {
                        println!("{}{})", indent, i + 1);
                        print_reply(item, depth + 1);
                    }
                    _ => {
                        print!("{}{}) ", indent, i + 1);
                        print_reply(item, 0);
                    }
                }
            }
        }
    }
}
