//! Request framing over a raw byte stream.
//!
//! A request is read in two phases: the header block up to `\r\n\r\n`,
//! then exactly `Content-Length` body bytes. Reads are issued in chunks of
//! at most [`READ_CHUNK`] bytes and each one is bounded by the caller's
//! timeout, so the result never depends on how the peer's bytes were split
//! across TCP segments.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::http::headers::Headers;
use crate::http::request::{Method, Request};

/// Size of a single read from the socket.
pub const READ_CHUNK: usize = 1024;

/// Largest header block accepted before the delimiter shows up.
pub const MAX_HEADER_BYTES: usize = 10 * 1024;

const HEADER_END: &[u8] = b"\r\n\r\n";

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("read timed out")]
    Timeout,

    #[error("connection closed by peer")]
    ConnectionClosed {
        /// Some bytes of the current request had already arrived.
        mid_request: bool,
    },

    #[error("request header too long ({size} bytes without terminator)")]
    HeaderTooLarge { size: usize },

    #[error("request body of {length} bytes exceeds limit of {limit}")]
    BodyTooLarge { length: usize, limit: usize },

    #[error("bad http request line {0:?}")]
    MalformedRequestLine(String),

    #[error("bad http request header {0:?}")]
    MalformedHeaderLine(String),

    #[error("request header is not valid utf-8")]
    InvalidEncoding,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Idle timeouts and clean closes between requests are normal ends of a
    /// keep-alive connection.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self,
            FrameError::Timeout | FrameError::ConnectionClosed { mid_request: false }
        )
    }
}

/// Reads one chunk into `buffer`, returning the number of bytes read.
async fn read_chunk<R>(stream: &mut R, buffer: &mut BytesMut, limit: Duration) -> Result<usize, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; READ_CHUNK];
    let n = timeout(limit, stream.read(&mut chunk))
        .await
        .map_err(|_| FrameError::Timeout)??;

    buffer.extend_from_slice(&chunk[..n]);
    Ok(n)
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_END.len())
        .position(|w| w == HEADER_END)
}

/// Reads until the end of the header block.
///
/// Returns the bytes before `\r\n\r\n` and whatever followed it in the last
/// read, which is the beginning of the body.
pub async fn read_header_block<R>(stream: &mut R, limit: Duration) -> Result<(BytesMut, BytesMut), FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);

    loop {
        let n = read_chunk(stream, &mut buffer, limit).await?;
        if n == 0 {
            return Err(FrameError::ConnectionClosed {
                mid_request: !buffer.is_empty(),
            });
        }

        // The delimiter may straddle the previous chunk.
        let search_from = buffer.len().saturating_sub(n + HEADER_END.len() - 1);
        if let Some(pos) = find_headers_end(&buffer[search_from..]) {
            let head = buffer.split_to(search_from + pos);
            buffer.advance(HEADER_END.len());
            return Ok((head, buffer));
        }

        if buffer.len() > MAX_HEADER_BYTES {
            return Err(FrameError::HeaderTooLarge { size: buffer.len() });
        }
    }
}

/// Parses a header block into a body-less request.
pub fn parse_header_block(head: &[u8]) -> Result<Request, FrameError> {
    let text = std::str::from_utf8(head).map_err(|_| FrameError::InvalidEncoding)?;
    let mut lines = text.split("\r\n");

    // Request line
    let request_line = lines.next().unwrap_or_default();
    let parts: Vec<&str> = request_line.split(' ').collect();
    let [method, path, version] = parts[..] else {
        return Err(FrameError::MalformedRequestLine(request_line.to_string()));
    };

    // Headers
    let mut headers = Headers::new();
    for line in lines {
        let (key, value) = line
            .split_once(": ")
            .ok_or_else(|| FrameError::MalformedHeaderLine(line.to_string()))?;
        headers.insert(key, value);
    }

    Ok(Request {
        method: Method::parse(method),
        path: path.to_string(),
        version: version.to_string(),
        headers,
        body: Vec::new(),
    })
}

/// Completes a body of `content_length` bytes, starting from the bytes
/// that arrived with the header block.
///
/// Anything received past `content_length` is dropped; requests are not
/// pipelined.
pub async fn read_body<R>(
    stream: &mut R,
    mut partial: BytesMut,
    content_length: usize,
    limit: Duration,
) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    while partial.len() < content_length {
        let n = read_chunk(stream, &mut partial, limit).await?;
        if n == 0 {
            return Err(FrameError::ConnectionClosed { mid_request: true });
        }
    }

    if partial.len() > content_length {
        tracing::debug!(
            discarded = partial.len() - content_length,
            "Dropping bytes past Content-Length"
        );
        partial.truncate(content_length);
    }

    Ok(partial.to_vec())
}

/// Reads and parses the header block of the next request.
///
/// Returns the body-less request and the bytes that followed the header
/// block. A declared `Content-Length` above `max_body` is refused here,
/// before any body byte is read.
pub async fn read_head<R>(stream: &mut R, limit: Duration, max_body: usize) -> Result<(Request, BytesMut), FrameError>
where
    R: AsyncRead + Unpin,
{
    let (head, leftover) = read_header_block(stream, limit).await?;
    let request = parse_header_block(&head)?;

    let length = request.content_length();
    if length > max_body {
        return Err(FrameError::BodyTooLarge {
            length,
            limit: max_body,
        });
    }

    Ok((request, leftover))
}

/// Reads one complete request: header block, parse, then body.
pub async fn read_request<R>(stream: &mut R, limit: Duration, max_body: usize) -> Result<Request, FrameError>
where
    R: AsyncRead + Unpin,
{
    let (mut request, leftover) = read_head(stream, limit, max_body).await?;
    let length = request.content_length();
    request.body = read_body(stream, leftover, length, limit).await?;
    Ok(request)
}
