use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Error reply produced by the store, carried verbatim (e.g. `ERR ...`,
    /// `WRONGTYPE ...`).
    #[error("{0}")]
    Server(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("invalid namespace {namespace:?}: {reason}")]
    InvalidNamespace {
        namespace: String,
        reason: &'static str,
    },

    #[error("command {0} is not supported inside a namespace")]
    UnsupportedCommand(String),
}

impl Error {
    pub(crate) fn unexpected_reply(expected: &str) -> Self {
        Error::Protocol(format!("unexpected reply, expected {expected}"))
    }
}
