use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::response::Response;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Encodes a response as `status line CRLF (name ": " value CRLF)* CRLF body`.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128 + resp.body.len());

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in resp.headers.iter() {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    // Body
    buf.extend_from_slice(&resp.body);

    buf
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("write timed out")]
    Timeout,

    #[error("connection closed while writing")]
    Closed,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A serialized response plus how much of it has reached the socket.
#[derive(Debug)]
pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self {
            buffer: serialize_response(response),
            written: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Writes the remaining bytes and flushes. Every write and the flush are
    /// individually bounded by `limit`.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W, limit: Duration) -> Result<(), WriteError>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = timeout(limit, stream.write(&self.buffer[self.written..]))
                .await
                .map_err(|_| WriteError::Timeout)??;

            if n == 0 {
                return Err(WriteError::Closed);
            }

            self.written += n;
        }

        timeout(limit, stream.flush())
            .await
            .map_err(|_| WriteError::Timeout)??;

        Ok(())
    }
}
