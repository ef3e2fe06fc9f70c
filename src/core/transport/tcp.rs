//! TCP transport implementation.
//!
//! Newline-delimited JSON frames over plain TCP sockets, one long-lived
//! connection per client.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use super::connection::serve_connection;
use super::{TransportConfig, TransportError, TransportResult};
use crate::domains::dispatch::Dispatcher;

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// TCP transport handler.
pub struct TcpTransport {
    listener: TcpListener,
    config: TransportConfig,
}

impl TcpTransport {
    /// Bind the listening socket.
    pub async fn bind(config: TransportConfig) -> TransportResult<Self> {
        let addr = config.address();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        Ok(Self { listener, config })
    }

    /// The address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> TransportResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` flips, then wait for every
    /// connection to drain.
    pub async fn run(self, dispatcher: Dispatcher, mut shutdown: watch::Receiver<bool>) {
        match self.listener.local_addr() {
            Ok(addr) => info!("Ready - listening on {} (JSON lines over TCP)", addr),
            Err(_) => info!("Ready - listening on {}", self.config.address()),
        }

        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                Some(done) = connections.join_next(), if !connections.is_empty() => {
                    if let Err(e) = done {
                        error!("Connection task failed: {}", e);
                    }
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => {
                        info!("Accepted connection from {}", peer_addr);

                        // Set TCP_NODELAY to disable Nagle's algorithm
                        if let Err(e) = stream.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
                        }

                        connections.spawn(serve_connection(
                            stream,
                            peer_addr,
                            dispatcher.clone(),
                            self.config.max_frame_bytes,
                            shutdown.clone(),
                        ));
                    }
                    Err(e) => {
                        warn!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
            }
        }

        drop(self.listener);
        info!("Stopped accepting; draining {} connections", connections.len());
        while let Some(done) = connections.join_next().await {
            if let Err(e) = done {
                error!("Connection task failed: {}", e);
            }
        }
    }
}
