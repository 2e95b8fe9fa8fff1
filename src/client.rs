use std::future::Future;
use std::sync::Arc;

use crate::error::{Error, Result};

/// A decoded store reply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Status(String),
    Integer(i64),
    Bulk(Vec<u8>),
    Array(Vec<Reply>),
}

impl Reply {
    pub fn ok() -> Self {
        Reply::Status("OK".to_owned())
    }

    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        Reply::Bulk(data.into())
    }

    pub fn into_integer(self) -> Result<i64> {
        match self {
            Reply::Integer(n) => Ok(n),
            _ => Err(Error::unexpected_reply("integer")),
        }
    }

    /// `Nil` maps to `None`; a bulk string to its bytes.
    pub fn into_optional_bytes(self) -> Result<Option<Vec<u8>>> {
        match self {
            Reply::Nil => Ok(None),
            Reply::Bulk(b) => Ok(Some(b)),
            _ => Err(Error::unexpected_reply("bulk string or nil")),
        }
    }

    pub fn into_array(self) -> Result<Vec<Reply>> {
        match self {
            Reply::Array(items) => Ok(items),
            _ => Err(Error::unexpected_reply("array")),
        }
    }

    /// Accepts both `+OK` and any other status line; SET with NX/XX may
    /// answer nil instead, which maps to `false`.
    pub fn into_status_flag(self) -> Result<bool> {
        match self {
            Reply::Status(_) => Ok(true),
            Reply::Nil => Ok(false),
            _ => Err(Error::unexpected_reply("status")),
        }
    }

    pub(crate) fn into_bulk_list(self) -> Result<Vec<Vec<u8>>> {
        self.into_array()?
            .into_iter()
            .map(|item| match item {
                Reply::Bulk(b) => Ok(b),
                _ => Err(Error::unexpected_reply("bulk string")),
            })
            .collect()
    }
}

/// The underlying key-value client a proxy delegates to.
///
/// `args[0]` is the command name, the remainder its arguments in wire order.
/// Error replies from the store come back as [`Error::Server`].
pub trait Client: Send + Sync {
    fn call(&self, args: &[Vec<u8>]) -> impl Future<Output = Result<Reply>> + Send;
}

impl<C: Client> Client for Arc<C> {
    async fn call(&self, args: &[Vec<u8>]) -> Result<Reply> {
        (**self).call(args).await
    }
}
