//! Namespace values and the key transforms applied by the proxy.
//!
//! A namespace `ns` maps a caller key `k` to the physical key `ns:k`. An
//! empty namespace is the identity transform (passthrough mode).

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};
use crate::glob;

pub const SEPARATOR: u8 = b':';

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Namespace {
    /// `"<ns>:"`, or empty in passthrough mode.
    prefix: Vec<u8>,
}

impl Namespace {
    /// Passthrough: every transform is the identity.
    pub fn none() -> Self {
        Self::default()
    }

    /// Validates and builds a namespace. An empty string yields
    /// [`Namespace::none`]. A namespace starting or ending with the separator
    /// is rejected since `ns:` + `:k` and `ns` + `::k` would be
    /// indistinguishable once joined.
    ///
    /// Interior separators are accepted, but namespaces that nest are not
    /// isolated from each other: under `app`, the keys of `app:cache` are
    /// ordinary keys starting with `cache:`, so KEYS and FLUSHDB on `app`
    /// reach them. Tenants sharing a store must not use one namespace as a
    /// prefix of another.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Ok(Self::none());
        }
        let bytes = name.as_bytes();
        if bytes.first() == Some(&SEPARATOR) || bytes.last() == Some(&SEPARATOR) {
            return Err(Error::InvalidNamespace {
                namespace: name,
                reason: "must not begin or end with ':'",
            });
        }
        let mut prefix = Vec::with_capacity(bytes.len() + 1);
        prefix.extend_from_slice(bytes);
        prefix.push(SEPARATOR);
        Ok(Self { prefix })
    }

    pub fn is_passthrough(&self) -> bool {
        self.prefix.is_empty()
    }

    /// The namespace name without separator; empty in passthrough mode.
    pub fn name(&self) -> &str {
        match self.prefix.split_last() {
            // Built from a `String` in `new`, so always valid UTF-8.
            Some((_, name)) => std::str::from_utf8(name).unwrap_or_default(),
            None => "",
        }
    }

    /// `"<ns>:"` as raw bytes; empty in passthrough mode.
    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }

    /// Whether `key` already lives in this namespace.
    pub fn contains(&self, key: &[u8]) -> bool {
        !self.is_passthrough() && key.starts_with(&self.prefix)
    }

    /// Prefixes `key` with the namespace. Already-prefixed keys are returned
    /// untouched, which makes the transform idempotent.
    pub fn interpolate<'a>(&self, key: &'a [u8]) -> Cow<'a, [u8]> {
        if self.is_passthrough() || key.starts_with(&self.prefix) {
            return Cow::Borrowed(key);
        }
        let mut out = Vec::with_capacity(self.prefix.len() + key.len());
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(key);
        Cow::Owned(out)
    }

    /// Strips the namespace prefix if present.
    pub fn uninterpolate<'a>(&self, key: &'a [u8]) -> &'a [u8] {
        if self.is_passthrough() {
            return key;
        }
        key.strip_prefix(self.prefix.as_slice()).unwrap_or(key)
    }

    /// Like [`interpolate`](Self::interpolate) for a glob pattern: glob
    /// metacharacters inside the namespace itself are escaped so the pattern
    /// cannot reach into another namespace.
    pub fn interpolate_pattern<'a>(&self, pattern: &'a [u8]) -> Cow<'a, [u8]> {
        if self.is_passthrough() {
            return Cow::Borrowed(pattern);
        }
        let rest = pattern
            .strip_prefix(self.prefix.as_slice())
            .unwrap_or(pattern);
        let mut out = glob::escape(&self.prefix);
        out.extend_from_slice(rest);
        Cow::Owned(out)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
