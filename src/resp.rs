use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::client::Reply;
use crate::config::{DEFAULT_MAX_RESP_ARGS, DEFAULT_MAX_RESP_BULK_LEN, DEFAULT_MAX_RESP_INLINE_LEN};
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug)]
pub struct RespLimits {
    pub max_array_len: usize,
    pub max_bulk_len: usize,
    pub max_inline_len: usize,
}

impl Default for RespLimits {
    fn default() -> Self {
        Self {
            max_array_len: DEFAULT_MAX_RESP_ARGS,
            max_bulk_len: DEFAULT_MAX_RESP_BULK_LEN,
            max_inline_len: DEFAULT_MAX_RESP_INLINE_LEN,
        }
    }
}

fn invalid_data(msg: &'static str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, msg)
}

fn unexpected_eof() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "unexpected EOF")
}

fn parse_i64(bytes: &[u8], err_msg: &'static str) -> std::io::Result<i64> {
    let s = std::str::from_utf8(bytes).map_err(|_| invalid_data(err_msg))?;
    s.parse::<i64>().map_err(|_| invalid_data(err_msg))
}

/// Parses a `*N` / `$N` length, `None` for the RESP null (`-1`).
fn parse_len(body: &[u8], max: usize, too_large: &'static str) -> std::io::Result<Option<usize>> {
    let n = parse_i64(body, "bad length")?;
    if n < 0 {
        return Ok(None);
    }
    let n = usize::try_from(n).map_err(|_| invalid_data("bad length"))?;
    if n > max {
        return Err(invalid_data(too_large));
    }
    Ok(Some(n))
}

async fn read_resp_line<'a, R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &'a mut Vec<u8>,
    max_line_len: usize,
) -> std::io::Result<Option<&'a [u8]>> {
    buf.clear();
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(unexpected_eof());
        }
        let (take, done) = match chunk.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (chunk.len(), false),
        };
        if buf.len().saturating_add(take) > max_line_len.saturating_add(2) {
            return Err(invalid_data("line too long"));
        }
        buf.extend_from_slice(&chunk[..take]);
        reader.consume(take);
        if done {
            break;
        }
    }
    if buf.ends_with(b"\n") {
        buf.pop();
        if buf.ends_with(b"\r") {
            buf.pop();
        }
    }
    if buf.len() > max_line_len {
        return Err(invalid_data("line too long"));
    }
    Ok(Some(buf.as_slice()))
}

async fn read_bulk_body<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    len: usize,
) -> std::io::Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    let mut crlf = [0u8; 2];
    reader.read_exact(&mut crlf).await?;
    if &crlf != b"\r\n" {
        return Err(invalid_data("bulk string not terminated by CRLF"));
    }
    Ok(buf)
}

fn split_inline_command(line: &[u8]) -> Vec<Vec<u8>> {
    line.split(|b| b.is_ascii_whitespace())
        .filter(|word| !word.is_empty())
        .map(<[u8]>::to_vec)
        .collect()
}

// ── Requests (client → proxy) ─────────────────────────────────────────────────

/// Reads one command, either a RESP array of bulk strings or an inline
/// command line. `Ok(None)` on clean EOF; an empty vec for a blank line.
pub async fn parse_request<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    limits: RespLimits,
) -> std::io::Result<Option<Vec<Vec<u8>>>> {
    let mut line = Vec::new();
    let Some(trimmed) = read_resp_line(reader, &mut line, limits.max_inline_len).await? else {
        return Ok(None);
    };
    if trimmed.is_empty() {
        return Ok(Some(vec![]));
    }

    if let Some(rest) = trimmed.strip_prefix(b"*") {
        let Some(count) = parse_len(rest, limits.max_array_len, "too many bulk strings")? else {
            return Ok(Some(vec![]));
        };
        let mut args = Vec::with_capacity(count);
        let mut hdr = Vec::new();
        for _ in 0..count {
            let hdr_line = read_resp_line(reader, &mut hdr, limits.max_inline_len)
                .await?
                .ok_or_else(unexpected_eof)?;
            let body = hdr_line
                .strip_prefix(b"$")
                .ok_or_else(|| invalid_data("expected $"))?;
            match parse_len(body, limits.max_bulk_len, "bulk string too large")? {
                None => args.push(vec![]),
                Some(len) => args.push(read_bulk_body(reader, len).await?),
            }
        }
        return Ok(Some(args));
    }

    let out = split_inline_command(trimmed);
    if out.len() > limits.max_array_len {
        return Err(invalid_data("too many inline arguments"));
    }
    Ok(Some(out))
}

/// Encodes a command as a RESP array of bulk strings.
pub fn encode_command(args: &[Vec<u8>]) -> Vec<u8> {
    let payload: usize = args.iter().map(|a| a.len() + 16).sum();
    let mut out = Vec::with_capacity(payload + 16);
    append_array_header(&mut out, args.len());
    for arg in args {
        append_bulk(&mut out, arg);
    }
    out
}

// ── Replies (store → proxy) ───────────────────────────────────────────────────

/// Reads one complete reply. An error reply becomes [`Error::Server`]; when it
/// appears inside an array the rest of the array is still consumed so the
/// stream stays aligned.
pub async fn read_reply<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    limits: RespLimits,
) -> Result<Reply> {
    // Arrays still waiting for elements: (expected length, collected so far).
    let mut pending: Vec<(usize, Vec<Reply>)> = Vec::new();
    let mut server_error: Option<String> = None;
    let mut line = Vec::new();

    loop {
        let hdr = read_resp_line(reader, &mut line, limits.max_inline_len)
            .await?
            .ok_or_else(unexpected_eof)?;
        let (&kind, rest) = hdr
            .split_first()
            .ok_or_else(|| Error::Protocol("empty reply line".to_owned()))?;

        let mut reply = match kind {
            b'+' => Reply::Status(String::from_utf8_lossy(rest).into_owned()),
            b'-' => {
                if server_error.is_none() {
                    server_error = Some(String::from_utf8_lossy(rest).into_owned());
                }
                Reply::Nil
            }
            b':' => Reply::Integer(parse_i64(rest, "bad integer")?),
            b'$' => match parse_len(rest, limits.max_bulk_len, "bulk string too large")? {
                None => Reply::Nil,
                Some(len) => Reply::Bulk(read_bulk_body(reader, len).await?),
            },
            b'*' => match parse_len(rest, limits.max_array_len, "array too large")? {
                None => Reply::Nil,
                Some(0) => Reply::Array(vec![]),
                Some(n) => {
                    pending.push((n, Vec::with_capacity(n)));
                    continue;
                }
            },
            other => {
                return Err(Error::Protocol(format!(
                    "unknown reply type byte {:?}",
                    other as char
                )));
            }
        };

        loop {
            let Some((expected, mut items)) = pending.pop() else {
                return match server_error {
                    Some(msg) => Err(Error::Server(msg)),
                    None => Ok(reply),
                };
            };
            items.push(reply);
            if items.len() < expected {
                pending.push((expected, items));
                break;
            }
            reply = Reply::Array(items);
        }
    }
}

// ── Reply encoding (proxy → client) ───────────────────────────────────────────

pub(crate) fn append_array_header(out: &mut Vec<u8>, len: usize) {
    out.push(b'*');
    out.extend_from_slice(len.to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
}

pub(crate) fn append_bulk(out: &mut Vec<u8>, data: &[u8]) {
    out.push(b'$');
    out.extend_from_slice(data.len().to_string().as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\r\n");
}

pub fn encode_reply(out: &mut Vec<u8>, reply: &Reply) {
    match reply {
        Reply::Nil => out.extend_from_slice(b"$-1\r\n"),
        Reply::Status(s) => {
            out.push(b'+');
            out.extend_from_slice(s.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Integer(n) => {
            out.push(b':');
            out.extend_from_slice(n.to_string().as_bytes());
            out.extend_from_slice(b"\r\n");
        }
        Reply::Bulk(b) => append_bulk(out, b),
        Reply::Array(items) => {
            append_array_header(out, items.len());
            for item in items {
                encode_reply(out, item);
            }
        }
    }
}

/// Writes `msg` as a RESP error line. Line breaks are flattened so the reply
/// cannot be split into two frames.
pub fn encode_error(out: &mut Vec<u8>, msg: &str) {
    out.push(b'-');
    out.extend(msg.bytes().map(|b| if b == b'\r' || b == b'\n' { b' ' } else { b }));
    out.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn request(data: &[u8]) -> std::io::Result<Option<Vec<Vec<u8>>>> {
        let mut r = BufReader::new(data);
        parse_request(&mut r, RespLimits::default()).await
    }

    async fn reply(data: &[u8]) -> Result<Reply> {
        let mut r = BufReader::new(data);
        read_reply(&mut r, RespLimits::default()).await
    }

    // ── Requests ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn parse_array_set_command() {
        let result = request(b"*3\r\n$3\r\nSET\r\n$3\r\nfoo\r\n$3\r\nbar\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result, vec![b"SET".to_vec(), b"foo".to_vec(), b"bar".to_vec()]);
    }

    #[tokio::test]
    async fn parse_inline_with_args() {
        let result = request(b"GET   mykey\r\n").await.unwrap().unwrap();
        assert_eq!(result, vec![b"GET".to_vec(), b"mykey".to_vec()]);
    }

    #[tokio::test]
    async fn parse_eof_returns_none() {
        assert!(request(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn parse_empty_line_returns_empty_vec() {
        assert!(request(b"\r\n").await.unwrap().unwrap().is_empty());
    }

    #[tokio::test]
    async fn parse_truncated_array_is_unexpected_eof() {
        let err = request(b"*2\r\n$3\r\nGET\r\n").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn parse_rejects_too_many_bulk_strings() {
        let mut r = BufReader::new(&b"*2\r\n$4\r\nPING\r\n$4\r\nPONG\r\n"[..]);
        let limits = RespLimits {
            max_array_len: 1,
            ..RespLimits::default()
        };
        let err = parse_request(&mut r, limits)
            .await
            .expect_err("should reject oversized array");
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn parse_rejects_oversized_bulk_string() {
        let mut r = BufReader::new(&b"*1\r\n$4\r\nPING\r\n"[..]);
        let limits = RespLimits {
            max_bulk_len: 3,
            ..RespLimits::default()
        };
        let err = parse_request(&mut r, limits).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[tokio::test]
    async fn parse_rejects_oversized_inline_line() {
        let mut r = BufReader::new(&b"PING PONG\r\n"[..]);
        let limits = RespLimits {
            max_inline_len: 4,
            ..RespLimits::default()
        };
        let err = parse_request(&mut r, limits).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn encode_command_frames_bulk_strings() {
        let frame = encode_command(&[b"GET".to_vec(), b"ns:rabbit".to_vec()]);
        assert_eq!(frame, b"*2\r\n$3\r\nGET\r\n$9\r\nns:rabbit\r\n");
    }

    // ── Replies ───────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn read_scalar_replies() {
        assert_eq!(reply(b"+OK\r\n").await.unwrap(), Reply::ok());
        assert_eq!(reply(b":-2\r\n").await.unwrap(), Reply::Integer(-2));
        assert_eq!(reply(b"$5\r\nbunny\r\n").await.unwrap(), Reply::bulk("bunny"));
        assert_eq!(reply(b"$-1\r\n").await.unwrap(), Reply::Nil);
        assert_eq!(reply(b"*-1\r\n").await.unwrap(), Reply::Nil);
    }

    #[tokio::test]
    async fn read_array_with_nil_element() {
        let got = reply(b"*2\r\n$5\r\nbunny\r\n$-1\r\n").await.unwrap();
        assert_eq!(got, Reply::Array(vec![Reply::bulk("bunny"), Reply::Nil]));
    }

    #[tokio::test]
    async fn read_nested_arrays() {
        let got = reply(b"*2\r\n*1\r\n:1\r\n*0\r\n").await.unwrap();
        assert_eq!(
            got,
            Reply::Array(vec![Reply::Array(vec![Reply::Integer(1)]), Reply::Array(vec![])])
        );
    }

    #[tokio::test]
    async fn error_reply_is_server_error_verbatim() {
        let err = reply(b"-WRONGTYPE Operation against a key\r\n").await.unwrap_err();
        match err {
            Error::Server(msg) => assert_eq!(msg, "WRONGTYPE Operation against a key"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_inside_array_consumes_whole_frame() {
        let data = b"*2\r\n-ERR boom\r\n:1\r\n+NEXT\r\n";
        let mut r = BufReader::new(&data[..]);
        let err = read_reply(&mut r, RespLimits::default()).await.unwrap_err();
        assert!(matches!(err, Error::Server(ref m) if m == "ERR boom"));
        let next = read_reply(&mut r, RespLimits::default()).await.unwrap();
        assert_eq!(next, Reply::Status("NEXT".into()));
    }

    #[tokio::test]
    async fn unknown_reply_type_is_protocol_error() {
        assert!(matches!(reply(b"?x\r\n").await, Err(Error::Protocol(_))));
    }

    #[tokio::test]
    async fn encoded_reply_reads_back() {
        let original = Reply::Array(vec![
            Reply::bulk("a"),
            Reply::Nil,
            Reply::Integer(7),
            Reply::ok(),
        ]);
        let mut out = Vec::new();
        encode_reply(&mut out, &original);
        assert_eq!(reply(&out).await.unwrap(), original);
    }

    #[test]
    fn encode_error_flattens_newlines() {
        let mut out = Vec::new();
        encode_error(&mut out, "ERR bad\r\nthing");
        assert_eq!(out, b"-ERR bad  thing\r\n");
    }
}
