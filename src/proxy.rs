//! The namespacing decorator.
//!
//! `NamespacedClient` wraps any [`Client`] and scopes every key it sends to
//! one namespace:
//!
//! ```no_run
//! # async fn demo() -> kvns_proxy::Result<()> {
//! use kvns_proxy::{MemoryStore, Namespace, NamespacedClient};
//!
//! let store = MemoryStore::new();
//! let tenant = NamespacedClient::new(store.clone(), Namespace::new("tenant")?);
//! tenant.set("rabbit", "bunny").await?;           // stored as "tenant:rabbit"
//! assert_eq!(tenant.keys("*").await?, vec![b"rabbit".to_vec()]);
//! tenant.flushdb().await?;                         // removes only tenant:* keys
//! # Ok(())
//! # }
//! ```

use std::time::Instant;

use tracing::debug;

use crate::client::{Client, Reply};
use crate::command::{self, ArgRole, KeySpec, ScopedOp};
use crate::error::{Error, Result};
use crate::namespace::Namespace;

pub struct NamespacedClient<C> {
    client: C,
    namespace: Namespace,
}

fn cmd(parts: &[&[u8]]) -> Vec<Vec<u8>> {
    parts.iter().map(|p| p.to_vec()).collect()
}

impl<C: Client> NamespacedClient<C> {
    pub fn new(client: C, namespace: Namespace) -> Self {
        Self { client, namespace }
    }

    /// A proxy that forwards everything untouched.
    pub fn passthrough(client: C) -> Self {
        Self::new(client, Namespace::none())
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    pub fn into_inner(self) -> C {
        self.client
    }

    /// Sends a raw command (`args[0]` is the name) through the namespace.
    ///
    /// In passthrough mode the arguments reach the store byte-identical and
    /// nothing else is sent. Inside a namespace, commands missing from the
    /// command table are refused with [`Error::UnsupportedCommand`] because
    /// their keys cannot be located.
    pub async fn call(&self, args: &[Vec<u8>]) -> Result<Reply> {
        if self.namespace.is_passthrough() {
            return self.client.call(args).await;
        }
        let Some(name) = args.first() else {
            return self.client.call(args).await;
        };
        let Some(spec) = command::lookup(name) else {
            let name = String::from_utf8_lossy(name).into_owned();
            metrics::counter!("kvns_proxy_rejected_commands_total", "namespace" => self.namespace.name().to_owned())
                .increment(1);
            debug!(namespace = %self.namespace, command = %name, "rejected unsupported command");
            return Err(Error::UnsupportedCommand(name));
        };

        let start = Instant::now();
        let result = match spec.keys {
            KeySpec::Scoped(ScopedOp::FlushDb) => self.flush_namespace().await,
            KeySpec::Scoped(ScopedOp::DbSize) => self
                .physical_keys()
                .await
                .map(|keys| Reply::Integer(keys.len() as i64)),
            KeySpec::Pattern(_) => self
                .client
                .call(&self.rewrite(args, spec.keys))
                .await
                .and_then(|reply| self.strip_namespace(reply)),
            _ => self.client.call(&self.rewrite(args, spec.keys)).await,
        };
        metrics::histogram!(
            "kvns_proxy_command_duration_seconds",
            "command" => spec.name,
            "namespace" => self.namespace.name().to_owned()
        )
        .record(start.elapsed().as_secs_f64());
        result
    }

    /// Builds the forwarded argument list: keys interpolated, the pattern of
    /// an enumeration interpolated as a pattern, everything else copied.
    fn rewrite(&self, args: &[Vec<u8>], keys: KeySpec) -> Vec<Vec<u8>> {
        args.iter()
            .enumerate()
            .map(|(i, arg)| match keys.role(i) {
                ArgRole::Key => self.namespace.interpolate(arg).into_owned(),
                ArgRole::Pattern => self.namespace.interpolate_pattern(arg).into_owned(),
                ArgRole::Name | ArgRole::Value => arg.clone(),
            })
            .collect()
    }

    /// Rewrites a KEYS reply into caller-visible keys, dropping anything the
    /// store returned from outside the namespace.
    fn strip_namespace(&self, reply: Reply) -> Result<Reply> {
        let keys = reply
            .into_bulk_list()?
            .into_iter()
            .filter(|key| self.namespace.contains(key))
            .map(|key| Reply::Bulk(self.namespace.uninterpolate(&key).to_vec()))
            .collect();
        Ok(Reply::Array(keys))
    }

    /// Every stored key of this namespace, still carrying the prefix.
    async fn physical_keys(&self) -> Result<Vec<Vec<u8>>> {
        let pattern = self.namespace.interpolate_pattern(b"*").into_owned();
        let reply = self.client.call(&[b"KEYS".to_vec(), pattern]).await?;
        Ok(reply
            .into_bulk_list()?
            .into_iter()
            .filter(|key| self.namespace.contains(key))
            .collect())
    }

    /// Deletes every key of this namespace with one DEL, or sends nothing at
    /// all when the namespace is empty.
    ///
    /// Enumerate and delete are two separate round trips: a key written into
    /// the namespace in between survives the flush. Keys are deleted exactly
    /// as the store reported them so a key like `ns:ns:x` is not collapsed
    /// into `ns:x` by re-interpolation.
    async fn flush_namespace(&self) -> Result<Reply> {
        let keys = self.physical_keys().await?;
        if keys.is_empty() {
            debug!(namespace = %self.namespace, "FLUSHDB on empty namespace");
            return Ok(Reply::ok());
        }
        let count = keys.len();
        let mut args = Vec::with_capacity(count + 1);
        args.push(b"DEL".to_vec());
        args.extend(keys);
        // Keys that expired or were deleted since KEYS are not counted.
        let removed = self.client.call(&args).await?.into_integer()?;
        metrics::counter!("kvns_proxy_flushed_keys_total", "namespace" => self.namespace.name().to_owned())
            .increment(u64::try_from(removed).unwrap_or(0));
        debug!(namespace = %self.namespace, keys = count, removed, "FLUSHDB");
        Ok(Reply::ok())
    }

    // ── Typed operations ──────────────────────────────────────────────────────

    pub async fn get(&self, key: impl AsRef<[u8]>) -> Result<Option<Vec<u8>>> {
        self.call(&cmd(&[b"GET", key.as_ref()]))
            .await?
            .into_optional_bytes()
    }

    pub async fn set(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<()> {
        self.call(&cmd(&[b"SET", key.as_ref(), value.as_ref()]))
            .await?
            .into_status_flag()
            .map(drop)
    }

    /// `true` when the key was absent and has been set.
    pub async fn setnx(&self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Result<bool> {
        let n = self
            .call(&cmd(&[b"SETNX", key.as_ref(), value.as_ref()]))
            .await?
            .into_integer()?;
        Ok(n == 1)
    }

    pub async fn setex(
        &self,
        key: impl AsRef<[u8]>,
        seconds: u64,
        value: impl AsRef<[u8]>,
    ) -> Result<()> {
        let seconds = seconds.to_string();
        self.call(&cmd(&[b"SETEX", key.as_ref(), seconds.as_bytes(), value.as_ref()]))
            .await?
            .into_status_flag()
            .map(drop)
    }

    /// `true` when the key exists and the timeout was set.
    pub async fn expire(&self, key: impl AsRef<[u8]>, seconds: i64) -> Result<bool> {
        let seconds = seconds.to_string();
        let n = self
            .call(&cmd(&[b"EXPIRE", key.as_ref(), seconds.as_bytes()]))
            .await?
            .into_integer()?;
        Ok(n == 1)
    }

    /// Remaining seconds, or the store's sentinel (`-2` missing, `-1` no
    /// expiry) unchanged.
    pub async fn ttl(&self, key: impl AsRef<[u8]>) -> Result<i64> {
        self.call(&cmd(&[b"TTL", key.as_ref()]))
            .await?
            .into_integer()
    }

    /// Number of the given keys that exist.
    pub async fn exists<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        self.call(&Self::with_keys(b"EXISTS", keys))
            .await?
            .into_integer()
    }

    pub async fn incrby(&self, key: impl AsRef<[u8]>, delta: i64) -> Result<i64> {
        let delta = delta.to_string();
        self.call(&cmd(&[b"INCRBY", key.as_ref(), delta.as_bytes()]))
            .await?
            .into_integer()
    }

    pub async fn decrby(&self, key: impl AsRef<[u8]>, delta: i64) -> Result<i64> {
        let delta = delta.to_string();
        self.call(&cmd(&[b"DECRBY", key.as_ref(), delta.as_bytes()]))
            .await?
            .into_integer()
    }

    /// Number of keys removed.
    pub async fn del<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        self.call(&Self::with_keys(b"DEL", keys))
            .await?
            .into_integer()
    }

    /// One entry per requested key, in request order.
    pub async fn mget<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<Vec<Option<Vec<u8>>>> {
        self.call(&Self::with_keys(b"MGET", keys))
            .await?
            .into_array()?
            .into_iter()
            .map(Reply::into_optional_bytes)
            .collect()
    }

    /// Keys matching `pattern`, without the namespace prefix.
    pub async fn keys(&self, pattern: impl AsRef<[u8]>) -> Result<Vec<Vec<u8>>> {
        self.call(&cmd(&[b"KEYS", pattern.as_ref()]))
            .await?
            .into_bulk_list()
    }

    /// Removes this namespace's keys; without a namespace, flushes the whole
    /// store.
    pub async fn flushdb(&self) -> Result<()> {
        self.call(&cmd(&[b"FLUSHDB"])).await.map(drop)
    }

    pub async fn dbsize(&self) -> Result<i64> {
        self.call(&cmd(&[b"DBSIZE"])).await?.into_integer()
    }

    /// Sends QUIT to the store.
    pub async fn quit(&self) -> Result<()> {
        self.call(&cmd(&[b"QUIT"])).await.map(drop)
    }

    fn with_keys<K: AsRef<[u8]>>(name: &[u8], keys: &[K]) -> Vec<Vec<u8>> {
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.push(name.to_vec());
        args.extend(keys.iter().map(|k| k.as_ref().to_vec()));
        args
    }
}

/// A proxy is itself a client, so namespaces can be layered or handed to
/// anything that expects a [`Client`].
impl<C: Client> Client for NamespacedClient<C> {
    async fn call(&self, args: &[Vec<u8>]) -> Result<Reply> {
        NamespacedClient::call(self, args).await
    }
}
