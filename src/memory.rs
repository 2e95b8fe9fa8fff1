//! In-process store with a single flat keyspace and Redis string semantics.
//!
//! Used as the embedded backend of the proxy binary and as the store behind
//! the behavioural tests. It knows nothing about namespaces.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

use crate::client::{Client, Reply};
use crate::error::{Error, Result};
use crate::glob::glob_match;

struct Entry {
    value: Vec<u8>,
    expiry: Option<Instant>,
}

impl Entry {
    fn new(value: Vec<u8>, expiry: Option<Instant>) -> Self {
        Self { value, expiry }
    }

    fn is_expired_at(&self, now: Instant) -> bool {
        self.expiry.is_some_and(|deadline| now >= deadline)
    }
}

type Map = HashMap<Vec<u8>, Entry>;

#[derive(Clone, Default)]
pub struct MemoryStore {
    db: Arc<RwLock<Map>>,
}

fn err(msg: &str) -> Error {
    Error::Server(format!("ERR {msg}"))
}

fn wrong_args(cmd: &[u8]) -> Error {
    err(&format!(
        "wrong number of arguments for '{}' command",
        String::from_utf8_lossy(cmd).to_ascii_lowercase()
    ))
}

fn not_an_integer() -> Error {
    err("value is not an integer or out of range")
}

fn parse_int(raw: &[u8]) -> Result<i64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(not_an_integer)
}

fn invalid_expire(cmd: &str) -> Error {
    err(&format!("invalid expire time in '{cmd}' command"))
}

/// `now + ttl`, or the invalid-expire error when the deadline is not
/// representable.
fn deadline(now: Instant, ttl: Duration, cmd: &str) -> Result<Instant> {
    now.checked_add(ttl).ok_or_else(|| invalid_expire(cmd))
}

/// Parses a positive expire amount for SET/SETEX/PSETEX into a deadline.
fn parse_expire(raw: &[u8], cmd: &str, unit: fn(u64) -> Duration, now: Instant) -> Result<Instant> {
    match parse_int(raw)? {
        n if n > 0 => deadline(now, unit(n as u64), cmd),
        _ => Err(invalid_expire(cmd)),
    }
}

fn purge_expired(db: &mut Map, key: &[u8], now: Instant) {
    if db.get(key).is_some_and(|e| e.is_expired_at(now)) {
        db.remove(key);
    }
}

fn live<'a>(db: &'a mut Map, key: &[u8], now: Instant) -> Option<&'a mut Entry> {
    purge_expired(db, key, now);
    db.get_mut(key)
}

fn apply_delta(db: &mut Map, key: &[u8], delta: i64, now: Instant) -> Result<i64> {
    let current = match live(db, key, now) {
        None => 0,
        Some(entry) => parse_int(&entry.value)?,
    };
    let next = current
        .checked_add(delta)
        .ok_or_else(|| err("increment or decrement would overflow"))?;
    let value = next.to_string().into_bytes();
    match db.get_mut(key) {
        // INCR and friends keep an existing TTL.
        Some(entry) => entry.value = value,
        None => {
            db.insert(key.to_vec(), Entry::new(value, None));
        }
    }
    Ok(next)
}

/// TTL reply in the requested unit: `-2` missing, `-1` persistent.
fn time_to_live(db: &mut Map, key: &[u8], now: Instant, millis: bool) -> i64 {
    let Some(entry) = live(db, key, now) else {
        return -2;
    };
    match entry.expiry {
        None => -1,
        Some(until) => {
            let ms = i64::try_from(until.saturating_duration_since(now).as_millis()).unwrap_or(i64::MAX);
            if millis { ms } else { ms.saturating_add(500) / 1000 }
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn execute(&self, args: &[Vec<u8>]) -> Result<Reply> {
        let Some(name) = args.first() else {
            return Err(err("empty command"));
        };
        let cmd = name.to_ascii_uppercase();
        let argc = args.len();
        let now = Instant::now();

        let arity = |ok: bool| if ok { Ok(()) } else { Err(wrong_args(name)) };

        match cmd.as_slice() {
            b"PING" => {
                arity(argc <= 2)?;
                Ok(match args.get(1) {
                    Some(msg) => Reply::Bulk(msg.clone()),
                    None => Reply::Status("PONG".to_owned()),
                })
            }
            b"ECHO" => {
                arity(argc == 2)?;
                Ok(Reply::Bulk(args[1].clone()))
            }
            b"QUIT" => Ok(Reply::ok()),

            b"GET" => {
                arity(argc == 2)?;
                let mut db = self.db.write().await;
                Ok(match live(&mut db, &args[1], now) {
                    Some(entry) => Reply::Bulk(entry.value.clone()),
                    None => Reply::Nil,
                })
            }
            b"SET" => {
                arity(argc >= 3)?;
                let mut expiry = None;
                let (mut nx, mut xx) = (false, false);
                let mut i = 3;
                while i < argc {
                    let opt = args[i].to_ascii_uppercase();
                    match opt.as_slice() {
                        b"NX" => nx = true,
                        b"XX" => xx = true,
                        b"EX" | b"PX" if i + 1 < argc => {
                            let unit: fn(u64) -> Duration = if opt == b"EX" {
                                Duration::from_secs
                            } else {
                                Duration::from_millis
                            };
                            expiry = Some(parse_expire(&args[i + 1], "set", unit, now)?);
                            i += 1;
                        }
                        _ => return Err(err("syntax error")),
                    }
                    i += 1;
                }
                if nx && xx {
                    return Err(err("syntax error"));
                }
                let mut db = self.db.write().await;
                let exists = live(&mut db, &args[1], now).is_some();
                if (nx && exists) || (xx && !exists) {
                    return Ok(Reply::Nil);
                }
                db.insert(args[1].clone(), Entry::new(args[2].clone(), expiry));
                debug!(key = %String::from_utf8_lossy(&args[1]), "SET");
                Ok(Reply::ok())
            }
            b"SETNX" => {
                arity(argc == 3)?;
                let mut db = self.db.write().await;
                if live(&mut db, &args[1], now).is_some() {
                    return Ok(Reply::Integer(0));
                }
                db.insert(args[1].clone(), Entry::new(args[2].clone(), None));
                Ok(Reply::Integer(1))
            }
            b"SETEX" | b"PSETEX" => {
                arity(argc == 4)?;
                let expiry = if cmd == b"SETEX" {
                    parse_expire(&args[2], "setex", Duration::from_secs, now)?
                } else {
                    parse_expire(&args[2], "psetex", Duration::from_millis, now)?
                };
                self.db
                    .write()
                    .await
                    .insert(args[1].clone(), Entry::new(args[3].clone(), Some(expiry)));
                Ok(Reply::ok())
            }
            b"GETSET" => {
                arity(argc == 3)?;
                let mut db = self.db.write().await;
                purge_expired(&mut db, &args[1], now);
                let old = db.insert(args[1].clone(), Entry::new(args[2].clone(), None));
                Ok(old.map_or(Reply::Nil, |e| Reply::Bulk(e.value)))
            }
            b"APPEND" => {
                arity(argc == 3)?;
                let mut db = self.db.write().await;
                let len = match live(&mut db, &args[1], now) {
                    Some(entry) => {
                        entry.value.extend_from_slice(&args[2]);
                        entry.value.len()
                    }
                    None => {
                        db.insert(args[1].clone(), Entry::new(args[2].clone(), None));
                        args[2].len()
                    }
                };
                Ok(Reply::Integer(len as i64))
            }
            b"STRLEN" => {
                arity(argc == 2)?;
                let mut db = self.db.write().await;
                let len = live(&mut db, &args[1], now).map_or(0, |e| e.value.len());
                Ok(Reply::Integer(len as i64))
            }
            b"TYPE" => {
                arity(argc == 2)?;
                let mut db = self.db.write().await;
                let kind = if live(&mut db, &args[1], now).is_some() { "string" } else { "none" };
                Ok(Reply::Status(kind.to_owned()))
            }
            b"MGET" => {
                arity(argc >= 2)?;
                let mut db = self.db.write().await;
                let values = args[1..]
                    .iter()
                    .map(|key| match live(&mut db, key, now) {
                        Some(entry) => Reply::Bulk(entry.value.clone()),
                        None => Reply::Nil,
                    })
                    .collect();
                Ok(Reply::Array(values))
            }
            b"MSET" => {
                arity(argc >= 3 && argc % 2 == 1)?;
                let mut db = self.db.write().await;
                for pair in args[1..].chunks_exact(2) {
                    db.insert(pair[0].clone(), Entry::new(pair[1].clone(), None));
                }
                Ok(Reply::ok())
            }
            b"DEL" | b"UNLINK" => {
                arity(argc >= 2)?;
                let mut db = self.db.write().await;
                let mut removed = 0;
                for key in &args[1..] {
                    purge_expired(&mut db, key, now);
                    if db.remove(key.as_slice()).is_some() {
                        removed += 1;
                    }
                }
                debug!(keys = argc - 1, removed, "DEL");
                Ok(Reply::Integer(removed))
            }
            b"EXISTS" => {
                arity(argc >= 2)?;
                let mut db = self.db.write().await;
                let count = args[1..]
                    .iter()
                    .filter(|key| live(&mut db, key, now).is_some())
                    .count();
                Ok(Reply::Integer(count as i64))
            }
            b"EXPIRE" | b"PEXPIRE" => {
                arity(argc == 3)?;
                let amount = parse_int(&args[2])?;
                // `None` for a non-positive amount: the key is deleted.
                let expiry = match amount {
                    n if n <= 0 => None,
                    n if cmd == b"EXPIRE" => Some(deadline(now, Duration::from_secs(n as u64), "expire")?),
                    n => Some(deadline(now, Duration::from_millis(n as u64), "pexpire")?),
                };
                let mut db = self.db.write().await;
                let Some(entry) = live(&mut db, &args[1], now) else {
                    return Ok(Reply::Integer(0));
                };
                match expiry {
                    Some(until) => entry.expiry = Some(until),
                    None => {
                        db.remove(args[1].as_slice());
                    }
                }
                Ok(Reply::Integer(1))
            }
            b"PERSIST" => {
                arity(argc == 2)?;
                let mut db = self.db.write().await;
                let cleared = live(&mut db, &args[1], now)
                    .and_then(|entry| entry.expiry.take())
                    .is_some();
                Ok(Reply::Integer(cleared as i64))
            }
            b"TTL" | b"PTTL" => {
                arity(argc == 2)?;
                let mut db = self.db.write().await;
                Ok(Reply::Integer(time_to_live(&mut db, &args[1], now, cmd == b"PTTL")))
            }
            b"INCR" | b"DECR" => {
                arity(argc == 2)?;
                let delta = if cmd == b"INCR" { 1 } else { -1 };
                let mut db = self.db.write().await;
                apply_delta(&mut db, &args[1], delta, now).map(Reply::Integer)
            }
            b"INCRBY" | b"DECRBY" => {
                arity(argc == 3)?;
                let by = parse_int(&args[2])?;
                let delta = if cmd == b"INCRBY" {
                    by
                } else {
                    by.checked_neg()
                        .ok_or_else(|| err("decrement would overflow"))?
                };
                let mut db = self.db.write().await;
                apply_delta(&mut db, &args[1], delta, now).map(Reply::Integer)
            }
            b"KEYS" => {
                arity(argc == 2)?;
                let db = self.db.read().await;
                let mut matched: Vec<Vec<u8>> = db
                    .iter()
                    .filter(|(key, entry)| !entry.is_expired_at(now) && glob_match(&args[1], key))
                    .map(|(key, _)| key.clone())
                    .collect();
                matched.sort();
                Ok(Reply::Array(matched.into_iter().map(Reply::Bulk).collect()))
            }
            b"DBSIZE" => {
                arity(argc == 1)?;
                let db = self.db.read().await;
                let count = db.values().filter(|e| !e.is_expired_at(now)).count();
                Ok(Reply::Integer(count as i64))
            }
            b"FLUSHDB" => {
                arity(argc <= 2)?;
                let mut db = self.db.write().await;
                debug!(keys = db.len(), "FLUSHDB");
                db.clear();
                Ok(Reply::ok())
            }
            _ => Err(err(&format!(
                "unknown command '{}'",
                String::from_utf8_lossy(name)
            ))),
        }
    }
}

impl Client for MemoryStore {
    async fn call(&self, args: &[Vec<u8>]) -> Result<Reply> {
        self.execute(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(parts: &[&str]) -> Vec<Vec<u8>> {
        parts.iter().map(|s| s.as_bytes().to_vec()).collect()
    }

    async fn run(store: &MemoryStore, parts: &[&str]) -> Result<Reply> {
        store.call(&args(parts)).await
    }

    fn server_msg(result: Result<Reply>) -> String {
        match result {
            Err(Error::Server(msg)) => msg,
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn ping_and_echo() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["PING"]).await.unwrap(), Reply::Status("PONG".into()));
        assert_eq!(run(&store, &["ping", "hi"]).await.unwrap(), Reply::bulk("hi"));
        assert_eq!(run(&store, &["ECHO", "x"]).await.unwrap(), Reply::bulk("x"));
    }

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["SET", "k", "v"]).await.unwrap(), Reply::ok());
        assert_eq!(run(&store, &["GET", "k"]).await.unwrap(), Reply::bulk("v"));
    }

    #[tokio::test]
    async fn get_missing_key_returns_nil() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["GET", "nope"]).await.unwrap(), Reply::Nil);
    }

    #[tokio::test]
    async fn set_nx_and_xx() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["SET", "k", "1", "XX"]).await.unwrap(), Reply::Nil);
        assert_eq!(run(&store, &["SET", "k", "1", "NX"]).await.unwrap(), Reply::ok());
        assert_eq!(run(&store, &["SET", "k", "2", "NX"]).await.unwrap(), Reply::Nil);
        assert_eq!(run(&store, &["SET", "k", "3", "xx"]).await.unwrap(), Reply::ok());
        assert_eq!(run(&store, &["GET", "k"]).await.unwrap(), Reply::bulk("3"));
    }

    #[tokio::test]
    async fn set_with_bad_option_is_syntax_error() {
        let store = MemoryStore::new();
        assert_eq!(server_msg(run(&store, &["SET", "k", "v", "EX"]).await), "ERR syntax error");
        assert_eq!(server_msg(run(&store, &["SET", "k", "v", "NX", "XX"]).await), "ERR syntax error");
    }

    #[tokio::test]
    async fn setnx_only_sets_once() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["SETNX", "k", "a"]).await.unwrap(), Reply::Integer(1));
        assert_eq!(run(&store, &["SETNX", "k", "b"]).await.unwrap(), Reply::Integer(0));
        assert_eq!(run(&store, &["GET", "k"]).await.unwrap(), Reply::bulk("a"));
    }

    #[tokio::test]
    async fn setex_sets_ttl_in_seconds() {
        let store = MemoryStore::new();
        run(&store, &["SETEX", "k", "30", "v"]).await.unwrap();
        let ttl = run(&store, &["TTL", "k"]).await.unwrap().into_integer().unwrap();
        assert!((29..=30).contains(&ttl), "ttl {ttl}");
        let pttl = run(&store, &["PTTL", "k"]).await.unwrap().into_integer().unwrap();
        assert!(pttl > 29_000 && pttl <= 30_000, "pttl {pttl}");
    }

    #[tokio::test]
    async fn setex_rejects_non_positive_ttl() {
        let store = MemoryStore::new();
        assert_eq!(
            server_msg(run(&store, &["SETEX", "k", "0", "v"]).await),
            "ERR invalid expire time in 'setex' command"
        );
    }

    #[tokio::test]
    async fn ttl_sentinels() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["TTL", "missing"]).await.unwrap(), Reply::Integer(-2));
        run(&store, &["SET", "k", "v"]).await.unwrap();
        assert_eq!(run(&store, &["TTL", "k"]).await.unwrap(), Reply::Integer(-1));
    }

    #[tokio::test]
    async fn get_returns_nil_after_ttl_elapses() {
        let store = MemoryStore::new();
        run(&store, &["SET", "k", "v", "PX", "10"]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(run(&store, &["GET", "k"]).await.unwrap(), Reply::Nil);
        assert_eq!(run(&store, &["TTL", "k"]).await.unwrap(), Reply::Integer(-2));
    }

    #[tokio::test]
    async fn expire_and_persist() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["EXPIRE", "k", "60"]).await.unwrap(), Reply::Integer(0));
        run(&store, &["SET", "k", "v"]).await.unwrap();
        assert_eq!(run(&store, &["EXPIRE", "k", "60"]).await.unwrap(), Reply::Integer(1));
        assert_eq!(run(&store, &["TTL", "k"]).await.unwrap(), Reply::Integer(60));
        assert_eq!(run(&store, &["PERSIST", "k"]).await.unwrap(), Reply::Integer(1));
        assert_eq!(run(&store, &["PERSIST", "k"]).await.unwrap(), Reply::Integer(0));
        assert_eq!(run(&store, &["TTL", "k"]).await.unwrap(), Reply::Integer(-1));
    }

    #[tokio::test]
    async fn unrepresentable_expire_is_rejected() {
        let store = MemoryStore::new();
        let huge = i64::MAX.to_string();
        run(&store, &["SET", "k", "v"]).await.unwrap();

        assert_eq!(
            server_msg(run(&store, &["EXPIRE", "k", &huge]).await),
            "ERR invalid expire time in 'expire' command"
        );
        assert_eq!(
            server_msg(run(&store, &["SETEX", "k2", &huge, "v"]).await),
            "ERR invalid expire time in 'setex' command"
        );
        assert_eq!(
            server_msg(run(&store, &["SET", "k3", "v", "EX", &huge]).await),
            "ERR invalid expire time in 'set' command"
        );

        // Representable in milliseconds: accepted, and TTL must not overflow.
        assert_eq!(run(&store, &["PEXPIRE", "k", &huge]).await.unwrap(), Reply::Integer(1));
        let ttl = run(&store, &["TTL", "k"]).await.unwrap().into_integer().unwrap();
        assert!(ttl > 0, "ttl {ttl}");
        run(&store, &["PERSIST", "k"]).await.unwrap();

        // Nothing was written or changed by the rejected commands.
        assert_eq!(run(&store, &["TTL", "k"]).await.unwrap(), Reply::Integer(-1));
        assert_eq!(run(&store, &["EXISTS", "k2", "k3"]).await.unwrap(), Reply::Integer(0));
    }

    #[tokio::test]
    async fn expire_non_positive_deletes() {
        let store = MemoryStore::new();
        run(&store, &["SET", "k", "v"]).await.unwrap();
        assert_eq!(run(&store, &["EXPIRE", "k", "0"]).await.unwrap(), Reply::Integer(1));
        assert_eq!(run(&store, &["EXISTS", "k"]).await.unwrap(), Reply::Integer(0));
    }

    #[tokio::test]
    async fn mget_preserves_order_and_arity() {
        let store = MemoryStore::new();
        run(&store, &["MSET", "a", "1", "c", "3"]).await.unwrap();
        assert_eq!(
            run(&store, &["MGET", "a", "b", "c"]).await.unwrap(),
            Reply::Array(vec![Reply::bulk("1"), Reply::Nil, Reply::bulk("3")])
        );
    }

    #[tokio::test]
    async fn mset_odd_arguments_is_arity_error() {
        let store = MemoryStore::new();
        assert_eq!(
            server_msg(run(&store, &["MSET", "a", "1", "b"]).await),
            "ERR wrong number of arguments for 'mset' command"
        );
    }

    #[tokio::test]
    async fn del_counts_removed_keys() {
        let store = MemoryStore::new();
        run(&store, &["MSET", "a", "1", "b", "2"]).await.unwrap();
        assert_eq!(run(&store, &["DEL", "a", "b", "c"]).await.unwrap(), Reply::Integer(2));
        assert_eq!(run(&store, &["DEL", "a"]).await.unwrap(), Reply::Integer(0));
    }

    #[tokio::test]
    async fn exists_counts_duplicates() {
        let store = MemoryStore::new();
        run(&store, &["SET", "a", "1"]).await.unwrap();
        assert_eq!(run(&store, &["EXISTS", "a", "a", "b"]).await.unwrap(), Reply::Integer(2));
    }

    #[tokio::test]
    async fn incr_family() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["INCR", "n"]).await.unwrap(), Reply::Integer(1));
        assert_eq!(run(&store, &["INCRBY", "n", "5"]).await.unwrap(), Reply::Integer(6));
        assert_eq!(run(&store, &["DECR", "n"]).await.unwrap(), Reply::Integer(5));
        assert_eq!(run(&store, &["DECRBY", "n", "2"]).await.unwrap(), Reply::Integer(3));
        assert_eq!(run(&store, &["GET", "n"]).await.unwrap(), Reply::bulk("3"));
    }

    #[tokio::test]
    async fn incr_keeps_ttl() {
        let store = MemoryStore::new();
        run(&store, &["SETEX", "n", "100", "1"]).await.unwrap();
        run(&store, &["INCR", "n"]).await.unwrap();
        let ttl = run(&store, &["TTL", "n"]).await.unwrap().into_integer().unwrap();
        assert!(ttl > 0);
    }

    #[tokio::test]
    async fn incr_errors() {
        let store = MemoryStore::new();
        run(&store, &["SET", "k", "abc"]).await.unwrap();
        assert_eq!(
            server_msg(run(&store, &["INCR", "k"]).await),
            "ERR value is not an integer or out of range"
        );
        run(&store, &["SET", "max", &i64::MAX.to_string()]).await.unwrap();
        assert_eq!(
            server_msg(run(&store, &["INCR", "max"]).await),
            "ERR increment or decrement would overflow"
        );
        assert_eq!(
            server_msg(run(&store, &["INCRBY", "k2", "x"]).await),
            "ERR value is not an integer or out of range"
        );
    }

    #[tokio::test]
    async fn string_helpers() {
        let store = MemoryStore::new();
        assert_eq!(run(&store, &["APPEND", "s", "hello"]).await.unwrap(), Reply::Integer(5));
        assert_eq!(run(&store, &["APPEND", "s", " world"]).await.unwrap(), Reply::Integer(11));
        assert_eq!(run(&store, &["STRLEN", "s"]).await.unwrap(), Reply::Integer(11));
        assert_eq!(run(&store, &["TYPE", "s"]).await.unwrap(), Reply::Status("string".into()));
        assert_eq!(run(&store, &["TYPE", "x"]).await.unwrap(), Reply::Status("none".into()));
        assert_eq!(
            run(&store, &["GETSET", "s", "new"]).await.unwrap(),
            Reply::bulk("hello world")
        );
        assert_eq!(run(&store, &["GETSET", "fresh", "v"]).await.unwrap(), Reply::Nil);
    }

    #[tokio::test]
    async fn keys_matches_pattern_sorted() {
        let store = MemoryStore::new();
        run(&store, &["MSET", "foo", "1", "foobar", "2", "baz", "3"]).await.unwrap();
        assert_eq!(
            run(&store, &["KEYS", "foo*"]).await.unwrap(),
            Reply::Array(vec![Reply::bulk("foo"), Reply::bulk("foobar")])
        );
        assert_eq!(run(&store, &["KEYS", "z*"]).await.unwrap(), Reply::Array(vec![]));
    }

    #[tokio::test]
    async fn keys_skips_expired_entries() {
        let store = MemoryStore::new();
        run(&store, &["SET", "live", "1"]).await.unwrap();
        run(&store, &["SET", "dying", "2", "PX", "1"]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            run(&store, &["KEYS", "*"]).await.unwrap(),
            Reply::Array(vec![Reply::bulk("live")])
        );
        assert_eq!(run(&store, &["DBSIZE"]).await.unwrap(), Reply::Integer(1));
    }

    #[tokio::test]
    async fn flushdb_clears_everything() {
        let store = MemoryStore::new();
        run(&store, &["MSET", "a", "1", "ns:b", "2"]).await.unwrap();
        assert_eq!(run(&store, &["FLUSHDB"]).await.unwrap(), Reply::ok());
        assert_eq!(run(&store, &["DBSIZE"]).await.unwrap(), Reply::Integer(0));
    }

    #[tokio::test]
    async fn clones_share_the_keyspace() {
        let a = MemoryStore::new();
        let b = a.clone();
        run(&a, &["SET", "k", "v"]).await.unwrap();
        assert_eq!(run(&b, &["GET", "k"]).await.unwrap(), Reply::bulk("v"));
    }

    #[tokio::test]
    async fn wrong_arity_and_unknown_commands() {
        let store = MemoryStore::new();
        assert_eq!(
            server_msg(run(&store, &["GET"]).await),
            "ERR wrong number of arguments for 'get' command"
        );
        assert_eq!(
            server_msg(run(&store, &["HSET", "h", "f", "v"]).await),
            "ERR unknown command 'HSET'"
        );
        assert!(matches!(store.call(&[]).await, Err(Error::Server(_))));
    }
}
