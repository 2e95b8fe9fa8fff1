use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, warn};

use crate::client::{Client, Reply};
use crate::config::Config;
use crate::error::Error;
use crate::proxy::NamespacedClient;
use crate::resp::{RespLimits, encode_error, encode_reply, parse_request};

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug)]
pub struct ServerLimits {
    pub resp: RespLimits,
    pub max_connections: usize,
}

impl ServerLimits {
    pub fn from_config(config: &Config) -> Self {
        Self {
            resp: RespLimits::default(),
            max_connections: config.max_connections,
        }
    }
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn write_result(out: &mut Vec<u8>, result: &Result<Reply, Error>) {
    match result {
        Ok(reply) => encode_reply(out, reply),
        Err(Error::Server(msg)) => encode_error(out, msg),
        Err(e) => encode_error(out, &format!("ERR {e}")),
    }
}

/// Accepts clients until `shutdown` resolves. Connections past
/// `limits.max_connections` get an error reply and are closed.
pub async fn serve<C, F>(
    listener: TcpListener,
    proxy: Arc<NamespacedClient<C>>,
    limits: ServerLimits,
    shutdown: F,
) where
    C: Client + 'static,
    F: Future<Output = ()>,
{
    let semaphore = Arc::new(Semaphore::new(limits.max_connections));
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((mut stream, peer)) => {
                        let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                            warn!(%peer, limit = limits.max_connections, "connection limit reached");
                            let _ = stream.write_all(b"-ERR max number of clients reached\r\n").await;
                            continue;
                        };
                        debug!(%peer, "accepted connection");
                        tokio::spawn(handle_connection(stream, Arc::clone(&proxy), limits, permit));
                    }
                    Err(e) => error!(?e, "accept error"),
                }
            }
            _ = &mut shutdown => break,
        }
    }
}

/// Serves one client. The store connection behind `proxy` is shared, so QUIT
/// is answered here and only closes this client.
pub async fn handle_connection<C: Client + 'static>(
    stream: TcpStream,
    proxy: Arc<NamespacedClient<C>>,
    limits: ServerLimits,
    _permit: OwnedSemaphorePermit,
) {
    let client_id = NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed);
    let _ = stream.set_nodelay(true);
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::with_capacity(64 * 1024, read_half);
    let mut writer = BufWriter::with_capacity(64 * 1024, write_half);
    let mut out = Vec::with_capacity(512);
    loop {
        match parse_request(&mut reader, limits.resp).await {
            Ok(None) => break,
            Ok(Some(args)) if args.is_empty() => continue,
            Ok(Some(args)) => {
                let quit = args[0].eq_ignore_ascii_case(b"QUIT");
                out.clear();
                if quit {
                    encode_reply(&mut out, &Reply::ok());
                } else {
                    let result = Client::call(proxy.as_ref(), &args).await;
                    if let Err(e) = &result {
                        debug!(client_id, error = %e, "command failed");
                    }
                    write_result(&mut out, &result);
                }
                if writer.write_all(&out).await.is_err() {
                    break;
                }
                if quit {
                    let _ = writer.flush().await;
                    break;
                }
                // Pipelined commands share a flush.
                if reader.buffer().is_empty() && writer.flush().await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(client_id, error = %e, "parse error, closing connection");
                out.clear();
                encode_error(&mut out, &format!("ERR Protocol error: {e}"));
                let _ = writer.write_all(&out).await;
                let _ = writer.flush().await;
                break;
            }
        }
    }
    debug!(client_id, "connection closed");
}
