//! A namespacing proxy for RESP key-value stores.
//!
//! Every key a caller sends through a [`NamespacedClient`] is stored as
//! `<namespace>:<key>`, and keys coming back from enumeration lose the
//! prefix again, so several tenants can share one store without seeing each
//! other's data. An empty namespace turns the proxy into a transparent
//! passthrough.

pub mod client;
pub mod command;
pub mod config;
pub mod connection;
pub mod error;
mod glob;
pub mod memory;
pub mod namespace;
pub mod proxy;
pub mod resp;
pub mod server;

pub use client::{Client, Reply};
pub use connection::RespConnection;
pub use error::{Error, Result};
pub use memory::MemoryStore;
pub use namespace::{Namespace, SEPARATOR};
pub use proxy::NamespacedClient;
