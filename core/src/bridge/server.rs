//! TCP listener for the raw bridge

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::connection::handle_conn;
use super::upstream::Upstream;
use crate::protocol::constants::{DEFAULT_BRIDGE_PORT, DEFAULT_READ_TIMEOUT};
use crate::{Error, Result};

/// Listener settings for [`TcpBridge`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub addr: SocketAddr,
    /// Idle time after which a silent client counts as finished
    pub read_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            addr: ([0, 0, 0, 0], DEFAULT_BRIDGE_PORT).into(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

impl BridgeConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            ..Self::default()
        }
    }

    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }
}

/// Accepts raw TCP connections and turns them into upstream requests
pub struct TcpBridge {
    listener: TcpListener,
    local_addr: SocketAddr,
    read_timeout: Duration,
    upstream: Arc<dyn Upstream>,
}

impl TcpBridge {
    /// Bind the listener; connections are not accepted until [`TcpBridge::start`]
    pub async fn bind(config: BridgeConfig, upstream: Arc<dyn Upstream>) -> Result<Self> {
        let listener = TcpListener::bind(config.addr)
            .await
            .map_err(|e| Error::Network(format!("failed to bind {}: {}", config.addr, e)))?;

        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::Network(e.to_string()))?;

        tracing::info!("tcp bridge listening on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            read_timeout: config.read_timeout,
            upstream,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start the accept loop; each connection is served on its own task
    pub fn start(self) -> BridgeHandle {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let local_addr = self.local_addr;

        let task = tokio::spawn(async move {
            loop {
                let accepted = tokio::select! {
                    _ = token.cancelled() => break,
                    accepted = self.listener.accept() => accepted,
                };

                match accepted {
                    Ok((stream, addr)) => {
                        tracing::debug!("incoming connection from {}", addr);
                        let upstream = self.upstream.clone();
                        let read_timeout = self.read_timeout;
                        tokio::spawn(serve_conn(stream, addr, upstream, read_timeout));
                    }
                    Err(e) => {
                        tracing::error!("accept error: {}", e);
                    }
                }
            }
            tracing::info!("tcp bridge on {} stopped", local_addr);
        });

        BridgeHandle {
            task,
            shutdown,
            local_addr,
        }
    }
}

async fn serve_conn(mut stream: TcpStream, addr: SocketAddr, upstream: Arc<dyn Upstream>, read_timeout: Duration) {
    if let Err(e) = handle_conn(&mut stream, Some(addr), upstream.as_ref(), read_timeout).await {
        let _ = stream.write_all(format!("{}\n", e).as_bytes()).await;
        tracing::warn!("{} - tcp forward error: {}", addr, e);
    }
    let _ = stream.shutdown().await;
}

/// Handle to a running [`TcpBridge`]
pub struct BridgeHandle {
    task: tokio::task::JoinHandle<()>,
    shutdown: CancellationToken,
    local_addr: SocketAddr,
}

impl BridgeHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting; connections already being served run to completion
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for the accept loop to exit
    pub async fn wait(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| Error::Bridge(format!("accept loop failed: {}", e)))
    }
}
