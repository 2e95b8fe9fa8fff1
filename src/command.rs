//! Static argument-role table for the commands the proxy understands.
//!
//! Positions count from the command name at index 0, so `GET key` has its key
//! at position 1.

/// Commands with no explicit keys that still act on "the whole keyspace" and
/// therefore have to be narrowed to one namespace.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScopedOp {
    FlushDb,
    DbSize,
}

/// Where the keys of a command sit among its arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeySpec {
    NoKey,
    Single(usize),
    /// Every argument from `first` on is a key.
    Variadic { first: usize },
    /// Keys at `first`, `first + step`, ... with values in between (MSET).
    Interleaved { first: usize, step: usize },
    /// A glob pattern over keys.
    Pattern(usize),
    Scoped(ScopedOp),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgRole {
    Name,
    Key,
    Pattern,
    Value,
}

impl KeySpec {
    pub fn role(&self, index: usize) -> ArgRole {
        if index == 0 {
            return ArgRole::Name;
        }
        let is_key = match *self {
            KeySpec::NoKey | KeySpec::Scoped(_) | KeySpec::Pattern(_) => false,
            KeySpec::Single(pos) => index == pos,
            KeySpec::Variadic { first } => index >= first,
            KeySpec::Interleaved { first, step } => {
                index >= first && (index - first) % step.max(1) == 0
            }
        };
        match *self {
            KeySpec::Pattern(pos) if index == pos => ArgRole::Pattern,
            _ if is_key => ArgRole::Key,
            _ => ArgRole::Value,
        }
    }
}

#[derive(Debug)]
pub struct CommandSpec {
    pub name: &'static str,
    pub keys: KeySpec,
}

const fn spec(name: &'static str, keys: KeySpec) -> CommandSpec {
    CommandSpec { name, keys }
}

pub static COMMANDS: &[CommandSpec] = &[
    // ── No keys ───────────────────────────────────────────────────────────────
    spec("PING", KeySpec::NoKey),
    spec("ECHO", KeySpec::NoKey),
    spec("QUIT", KeySpec::NoKey),
    // ── Single key ────────────────────────────────────────────────────────────
    spec("GET", KeySpec::Single(1)),
    spec("SET", KeySpec::Single(1)),
    spec("SETNX", KeySpec::Single(1)),
    spec("SETEX", KeySpec::Single(1)),
    spec("PSETEX", KeySpec::Single(1)),
    spec("GETSET", KeySpec::Single(1)),
    spec("APPEND", KeySpec::Single(1)),
    spec("STRLEN", KeySpec::Single(1)),
    spec("TYPE", KeySpec::Single(1)),
    spec("INCR", KeySpec::Single(1)),
    spec("DECR", KeySpec::Single(1)),
    spec("INCRBY", KeySpec::Single(1)),
    spec("DECRBY", KeySpec::Single(1)),
    spec("EXPIRE", KeySpec::Single(1)),
    spec("PEXPIRE", KeySpec::Single(1)),
    spec("PERSIST", KeySpec::Single(1)),
    spec("TTL", KeySpec::Single(1)),
    spec("PTTL", KeySpec::Single(1)),
    // ── Multiple keys ─────────────────────────────────────────────────────────
    spec("DEL", KeySpec::Variadic { first: 1 }),
    spec("UNLINK", KeySpec::Variadic { first: 1 }),
    spec("EXISTS", KeySpec::Variadic { first: 1 }),
    spec("MGET", KeySpec::Variadic { first: 1 }),
    spec("MSET", KeySpec::Interleaved { first: 1, step: 2 }),
    // ── Keyspace-wide ─────────────────────────────────────────────────────────
    spec("KEYS", KeySpec::Pattern(1)),
    spec("FLUSHDB", KeySpec::Scoped(ScopedOp::FlushDb)),
    spec("DBSIZE", KeySpec::Scoped(ScopedOp::DbSize)),
];

/// Case-insensitive lookup by command name.
pub fn lookup(name: &[u8]) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|spec| spec.name.as_bytes().eq_ignore_ascii_case(name))
}
