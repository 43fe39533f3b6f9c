//! Tests for the command engine
//!
//! These tests verify:
//! - Reply shapes for every command family
//! - SELECT and CACHE change only the calling session
//! - Argument errors become ERROR replies without touching the store
//! - Replies larger than the configured limit become ERROR replies
//! - A database that fails to open is reported, the others keep working

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use ordkv::cache::ManualClock;
use ordkv::protocol::{Command, Reply};
use ordkv::{CachePolicy, Config, Engine, OrdError, Session};
use tempfile::TempDir;

fn config(base: &Path, databases: usize) -> Config {
    Config::builder()
        .base_dir(base)
        .num_databases(databases)
        .build()
}

fn open(temp: &TempDir) -> Engine {
    Engine::open(config(temp.path(), 2)).unwrap()
}

fn set(key: &str, value: &str) -> Command {
    Command::Set {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

fn get(key: &str) -> Command {
    Command::Get {
        key: key.as_bytes().to_vec(),
    }
}

fn bulk(s: &str) -> Reply {
    Reply::Bulk(s.as_bytes().to_vec())
}

fn expect_error(reply: Reply, prefix: &str) {
    match reply {
        Reply::Error(message) => assert!(
            message.starts_with(prefix),
            "expected '{}' error, got '{}'",
            prefix,
            message
        ),
        other => panic!("expected error reply, got {:?}", other),
    }
}

#[test]
fn test_point_commands() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp);
    let mut session = Session::new();

    assert_eq!(engine.handle(&mut session, Command::Ping), bulk("PONG"));
    assert_eq!(engine.handle(&mut session, get("k")), Reply::Nil);
    assert_eq!(engine.handle(&mut session, set("k", "v")), Reply::Ok);
    assert_eq!(engine.handle(&mut session, get("K")), bulk("v"));

    let append = Command::Append {
        key: b"k".to_vec(),
        value: b"w".to_vec(),
    };
    assert_eq!(engine.handle(&mut session, append), Reply::Ok);
    assert_eq!(engine.handle(&mut session, get("k")), bulk("vw"));

    let delete = Command::Delete { key: b"k".to_vec() };
    assert_eq!(engine.handle(&mut session, delete.clone()), Reply::Ok);
    assert_eq!(engine.handle(&mut session, delete), Reply::Ok);
    assert_eq!(engine.handle(&mut session, get("k")), Reply::Nil);
}

#[test]
fn test_iteration_reply_shapes() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp);
    let mut session = Session::new();

    let first = |mode: &str| Command::IterForwardsFirst {
        count: 10,
        mode: mode.to_string(),
    };

    assert_eq!(engine.handle(&mut session, first("keys")), Reply::Nil);

    engine.handle(&mut session, set("a", "1"));
    engine.handle(&mut session, set("b", "2"));

    assert_eq!(
        engine.handle(&mut session, first("keys")),
        Reply::Array(vec![bulk("a"), bulk("b")])
    );
    assert_eq!(
        engine.handle(&mut session, first("KeysAndValues")),
        Reply::Array(vec![
            Reply::Array(vec![bulk("a"), bulk("1")]),
            Reply::Array(vec![bulk("b"), bulk("2")]),
        ])
    );

    let last = Command::IterBackwardsLast {
        count: 1,
        mode: "keys".to_string(),
    };
    assert_eq!(engine.handle(&mut session, last), Reply::Array(vec![bulk("b")]));

    let forwards = Command::IterForwards {
        start: b"b".to_vec(),
        count: 5,
        mode: "keys".to_string(),
    };
    assert_eq!(engine.handle(&mut session, forwards), Reply::Array(vec![bulk("b")]));

    let backwards = Command::IterBackwards {
        start: b"az".to_vec(),
        count: 5,
        mode: "keys".to_string(),
    };
    assert_eq!(engine.handle(&mut session, backwards), Reply::Array(vec![bulk("a")]));
}

#[test]
fn test_iteration_argument_errors() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp);
    let mut session = Session::new();

    for count in [0, -1, 70000] {
        let command = Command::IterForwardsFirst {
            count,
            mode: "keys".to_string(),
        };
        expect_error(engine.handle(&mut session, command), "ITERFORWARDSFIRST");
    }

    let bad_mode = Command::IterBackwardsLast {
        count: 1,
        mode: "values".to_string(),
    };
    expect_error(engine.handle(&mut session, bad_mode), "ITERBACKWARDSLAST");

    assert_eq!(engine.database(0).unwrap().store().stats().scans(), 0);
}

#[test]
fn test_oversized_reply_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .base_dir(temp.path())
        .num_databases(1)
        .max_reply_size(64)
        .build();
    let engine = Engine::open(config).unwrap();
    let mut session = Session::new();

    let value = "x".repeat(20);
    engine.handle(&mut session, set("a", &value));
    engine.handle(&mut session, set("b", &value));

    let first = |count: i64, mode: &str| Command::IterForwardsFirst {
        count,
        mode: mode.to_string(),
    };

    // Two pairs encode to 84 payload bytes, one pair to 44
    expect_error(
        engine.handle(&mut session, first(2, "keysandvalues")),
        "ITERFORWARDSFIRST",
    );
    assert_eq!(
        engine.handle(&mut session, first(1, "keysandvalues")),
        Reply::Array(vec![Reply::Array(vec![bulk("a"), bulk(&value)])])
    );
    assert_eq!(
        engine.handle(&mut session, first(2, "keys")),
        Reply::Array(vec![bulk("a"), bulk("b")])
    );

    engine.handle(&mut session, set("big", &"y".repeat(65)));
    expect_error(engine.handle(&mut session, get("big")), "GET");
}

#[test]
fn test_select_isolates_databases() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp);
    let mut first = Session::new();
    let mut second = Session::new();

    engine.handle(&mut first, set("k", "db0"));
    assert_eq!(engine.handle(&mut second, Command::Select { db: 1 }), Reply::Ok);
    assert_eq!(second.db, 1);
    assert_eq!(engine.handle(&mut second, get("k")), Reply::Nil);

    engine.handle(&mut second, set("k", "db1"));
    assert_eq!(engine.handle(&mut first, get("k")), bulk("db0"));
    assert_eq!(engine.handle(&mut second, get("k")), bulk("db1"));
    assert_eq!(first.db, 0);
}

#[test]
fn test_select_out_of_range() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp);
    let mut session = Session::new();

    expect_error(engine.handle(&mut session, Command::Select { db: 2 }), "SELECT");
    expect_error(engine.handle(&mut session, Command::Select { db: -1 }), "SELECT");
    assert_eq!(session.db, 0);
}

#[test]
fn test_cache_command() {
    let temp = TempDir::new().unwrap();
    let clock = Arc::new(ManualClock::new());
    let engine = Engine::open_with_clock(config(temp.path(), 1), clock.clone()).unwrap();
    let mut session = Session::new();
    let mut other = Session::new();

    let cache = |expiry: i64, mode: &str| Command::Cache {
        expiry,
        mode: mode.to_string(),
    };

    assert_eq!(engine.handle(&mut session, cache(1, "on")), Reply::Ok);
    assert_eq!(session.cache, CachePolicy::enabled(1));
    assert_eq!(other.cache, CachePolicy::disabled());

    engine.handle(&mut session, set("k", "v"));
    engine.handle(&mut session, get("k"));
    let stats = engine.database(0).unwrap().store().stats();
    assert_eq!(stats.reads(), 0);

    clock.advance(Duration::from_secs(2));
    engine.handle(&mut session, get("k"));
    assert_eq!(stats.reads(), 1);

    // The other session never uses the cache
    engine.handle(&mut other, get("k"));
    assert_eq!(stats.reads(), 2);

    expect_error(engine.handle(&mut session, cache(-5, "on")), "CACHE");
    expect_error(engine.handle(&mut session, cache(5, "maybe")), "CACHE");
    assert_eq!(session.cache, CachePolicy::enabled(1));

    assert_eq!(engine.handle(&mut session, cache(30, "OFF")), Reply::Ok);
    assert_eq!(session.cache, CachePolicy::disabled());
}

#[test]
fn test_maintenance_commands() {
    let temp = TempDir::new().unwrap();
    let engine = open(&temp);
    let mut session = Session::new();

    engine.handle(&mut session, set("a", "1"));
    assert_eq!(engine.handle(&mut session, Command::Flush), Reply::Ok);
    engine.handle(&mut session, set("a", "2"));
    assert_eq!(engine.handle(&mut session, Command::Compact), Reply::Ok);
    assert_eq!(engine.database(0).unwrap().store().sstable_count(), 1);
    assert_eq!(engine.handle(&mut session, get("a")), bulk("2"));

    expect_error(engine.handle(&mut session, Command::Repair), "REPAIR");
}

#[test]
fn test_unavailable_database() {
    let temp = TempDir::new().unwrap();
    // Database 1's directory is a plain file, so its store cannot open
    fs::write(temp.path().join("1"), b"in the way").unwrap();

    let engine = Engine::open(config(temp.path(), 3)).unwrap();
    let mut session = Session::new();

    assert!(matches!(engine.database(1), Err(OrdError::DatabaseUnavailable(1))));
    assert!(engine.database(2).is_ok());
    assert!(matches!(engine.database(3), Err(OrdError::InvalidArgument(_))));

    expect_error(engine.handle(&mut session, Command::Select { db: 1 }), "SELECT");
    assert_eq!(session.db, 0);
    assert_eq!(engine.handle(&mut session, Command::Select { db: 2 }), Reply::Ok);
    assert_eq!(engine.handle(&mut session, set("k", "v")), Reply::Ok);

    engine.close().unwrap();
}

#[test]
fn test_zero_databases_rejected() {
    let temp = TempDir::new().unwrap();
    assert!(matches!(
        Engine::open(config(temp.path(), 0)),
        Err(OrdError::Config(_))
    ));
}

#[test]
fn test_close_persists_every_database() {
    let temp = TempDir::new().unwrap();
    {
        let engine = open(&temp);
        let mut session = Session::new();
        engine.handle(&mut session, set("k", "zero"));
        engine.handle(&mut session, Command::Select { db: 1 });
        engine.handle(&mut session, set("k", "one"));
        engine.close().unwrap();
    }

    let engine = open(&temp);
    let mut session = Session::new();
    assert_eq!(engine.handle(&mut session, get("k")), bulk("zero"));
    engine.handle(&mut session, Command::Select { db: 1 });
    assert_eq!(engine.handle(&mut session, get("k")), bulk("one"));
}
