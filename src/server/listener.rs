use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::http::connection::{Connection, ConnectionSettings};
use crate::router::Router;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// A bound listening socket plus the shared, read-only router.
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    settings: ConnectionSettings,
}

impl Server {
    /// Binds `ip:port` from the config. The keep-alive post-processor is
    /// added to the router here, after any registered by the caller.
    pub async fn bind(cfg: &ServerConfig, mut router: Router) -> anyhow::Result<Self> {
        router.keep_alive(cfg.keep_alive);

        let addr = cfg.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("bind {addr}"))?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            listener,
            router: Arc::new(router),
            settings: ConnectionSettings::from(cfg),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts connections forever, one task per connection.
    pub async fn serve(self) -> anyhow::Result<()> {
        loop {
            let (socket, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    // Usually fd exhaustion; the listener itself is still fine.
                    warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };
            debug!("Accepted connection from {}", peer);

            let conn = Connection::new(socket, peer.to_string(), Arc::clone(&self.router), self.settings);
            tokio::spawn(conn.serve());
        }
    }

    /// Serves until Ctrl-C. Open connections are not drained.
    pub async fn start(self) -> anyhow::Result<()> {
        tokio::select! {
            res = self.serve() => res,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                Ok(())
            }
        }
    }
}

/// Binds and serves until shutdown.
pub async fn run(cfg: &ServerConfig, router: Router) -> anyhow::Result<()> {
    Server::bind(cfg, router).await?.start().await
}
