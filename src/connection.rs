use std::io::ErrorKind;

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::{Client, Reply};
use crate::error::{Error, Result};
use crate::resp::{RespLimits, encode_command, read_reply};

struct Io {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    /// Set while an exchange is in flight and left set if it did not finish
    /// cleanly. The stream position is then unknown and the connection is
    /// never read from again.
    broken: bool,
}

impl Io {
    async fn exchange(&mut self, frame: &[u8], limits: RespLimits) -> Result<Reply> {
        self.writer.write_all(frame).await?;
        self.writer.flush().await?;
        read_reply(&mut self.reader, limits).await
    }
}

/// A single RESP connection to a store. Concurrent callers are serialized so
/// each request is paired with its own reply.
///
/// A failed or cancelled exchange leaves part of a reply unread, so after one
/// the connection refuses every further call with `BrokenPipe`. Error replies
/// from the store are consumed whole and do not break it.
pub struct RespConnection {
    io: Mutex<Io>,
    limits: RespLimits,
}

impl RespConnection {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        Self::connect_with_limits(addr, RespLimits::default()).await
    }

    pub async fn connect_with_limits(addr: impl ToSocketAddrs, limits: RespLimits) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        let _ = stream.set_nodelay(true);
        if let Ok(peer) = stream.peer_addr() {
            debug!(%peer, "connected to store");
        }
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            io: Mutex::new(Io {
                reader: BufReader::with_capacity(64 * 1024, read_half),
                writer: BufWriter::with_capacity(64 * 1024, write_half),
                broken: false,
            }),
            limits,
        })
    }

    /// Whether an earlier exchange failed and the connection is unusable.
    pub async fn is_broken(&self) -> bool {
        self.io.lock().await.broken
    }
}

impl Client for RespConnection {
    async fn call(&self, args: &[Vec<u8>]) -> Result<Reply> {
        let frame = encode_command(args);
        let mut io = self.io.lock().await;
        if io.broken {
            return Err(Error::Io(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "store connection is out of sync after a failed reply",
            )));
        }
        // Stays set if this future is dropped before the reply is read.
        io.broken = true;
        let result = io.exchange(&frame, self.limits).await;
        io.broken = matches!(&result, Err(e) if !matches!(e, Error::Server(_)));
        if let Err(e) = &result {
            if io.broken {
                warn!(error = %e, "store connection out of sync, refusing further calls");
            }
        }
        result
    }
}
