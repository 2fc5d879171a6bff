use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, warn};

use crate::config::ServerConfig;
use crate::http::framer::{self, FrameError};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::{ResponseWriter, WriteError};
use crate::router::Router;

/// Per-connection limits, copied into every connection.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionSettings {
    /// Bound on each read and write; also the idle timeout between requests.
    pub timeout: Duration,
    pub max_body: usize,
}

impl From<&ServerConfig> for ConnectionSettings {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            timeout: cfg.timeout(),
            max_body: cfg.max_body_bytes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

pub enum ConnectionState {
    AwaitingHeader,
    AwaitingBody(Request, BytesMut),
    Dispatching(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Closed,
}

/// One accepted socket and its request/response loop.
pub struct Connection<S> {
    stream: S,
    peer: String,
    router: Arc<Router>,
    settings: ConnectionSettings,
    state: ConnectionState,
    served: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl Into<String>, router: Arc<Router>, settings: ConnectionSettings) -> Self {
        Self {
            stream,
            peer: peer.into(),
            router,
            settings,
            state: ConnectionState::AwaitingHeader,
            served: 0,
        }
    }

    /// Runs the connection to completion, logs how it ended and closes the
    /// socket. Never fails: every error is scoped to this connection.
    pub async fn serve(mut self) {
        debug!(peer = %self.peer, "Connection opened");

        match self.run().await {
            Ok(()) => {}
            Err(ConnectionError::Frame(e @ FrameError::ConnectionClosed { .. })) => {
                warn!(peer = %self.peer, error = %e, "Connection dropped mid-request");
            }
            Err(e) => {
                error!(peer = %self.peer, error = %e, "Connection failed");
            }
        }

        let _ = self.stream.shutdown().await;
        debug!(peer = %self.peer, served = self.served, "Connection closed");
    }

    /// Drives the state machine until the connection closes.
    ///
    /// Idle timeouts, write timeouts and a peer closing between requests end
    /// the loop with `Ok`. Protocol violations and mid-request disconnects
    /// are returned; no response is sent for them.
    pub async fn run(&mut self) -> Result<(), ConnectionError> {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::Closed => break,
                state => self.step(state).await?,
            };
        }

        Ok(())
    }

    async fn step(&mut self, state: ConnectionState) -> Result<ConnectionState, ConnectionError> {
        let timeout = self.settings.timeout;

        let next = match state {
            ConnectionState::AwaitingHeader => {
                let head = framer::read_head(&mut self.stream, timeout, self.settings.max_body).await;
                let (request, leftover) = match head {
                    Ok(head) => head,
                    Err(e) if e.is_quiet() => {
                        debug!(peer = %self.peer, reason = %e, "Closing idle connection");
                        return Ok(ConnectionState::Closed);
                    }
                    Err(e) => return Err(e.into()),
                };
                debug!(peer = %self.peer, "request {}", request);

                ConnectionState::AwaitingBody(request, leftover)
            }

            ConnectionState::AwaitingBody(mut request, leftover) => {
                let length = request.content_length();
                match framer::read_body(&mut self.stream, leftover, length, timeout).await {
                    Ok(body) => {
                        request.body = body;
                        ConnectionState::Dispatching(request)
                    }
                    Err(FrameError::Timeout) => {
                        debug!(peer = %self.peer, expected = length, "Timed out waiting for body");
                        ConnectionState::Closed
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            ConnectionState::Dispatching(request) => {
                let line = request.to_string();
                match self.router.dispatch(request).await {
                    Ok(response) => {
                        debug!(peer = %self.peer, status = response.status.as_u16(), "{}", line);
                        let keep_alive = response.keeps_alive();
                        ConnectionState::Writing(ResponseWriter::new(&response), keep_alive)
                    }
                    Err(e) => {
                        error!(peer = %self.peer, error = %e, "Handler failed for {}", line);
                        let response = self.failure_response(&e);
                        ConnectionState::Writing(ResponseWriter::new(&response), false)
                    }
                }
            }

            ConnectionState::Writing(mut writer, keep_alive) => {
                match writer.write_to_stream(&mut self.stream, timeout).await {
                    Ok(()) => {}
                    Err(WriteError::Timeout) => {
                        debug!(peer = %self.peer, "Write timed out");
                        return Ok(ConnectionState::Closed);
                    }
                    Err(e) => return Err(e.into()),
                }

                self.served += 1;
                if keep_alive {
                    ConnectionState::AwaitingHeader
                } else {
                    ConnectionState::Closed
                }
            }

            ConnectionState::Closed => ConnectionState::Closed,
        };

        Ok(next)
    }

    /// 500 response for a failed handler; the connection closes after it.
    fn failure_response(&self, error: &anyhow::Error) -> Response {
        let mut response = Response::internal_error(&format!("{error:#}"));
        self.router.apply_postprocess(&mut response);
        response.set_keep_alive(false);
        response
    }
}
