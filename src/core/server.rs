//! Tool server implementation and lifecycle management.
//!
//! ## Lifecycle
//!
//! 1. [`ToolServer::new`] scans the tool repositories and publishes the first
//!    registry snapshot. A failed scan is a startup error.
//! 2. [`ToolServer::start`] binds the listener, starts the repository
//!    watcher (when enabled) and begins accepting connections.
//! 3. [`ServerHandle::shutdown`] stops the watcher, stops accepting, and waits
//!    for every connection to finish its in-flight calls.
//!
//! **Adding a new tool does NOT require modifying this file.** Register a
//! handler in the [`HandlerCatalog`] and declare it in a manifest.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use super::config::Config;
use super::error::Result;
use super::transport::TcpTransport;
use crate::domains::dispatch::{Dispatcher, Router, ToolExecutor};
use crate::domains::tools::{
    HandlerCatalog, RegistryHandle, ToolLoader, WatcherHandle, reload, spawn_watcher,
};

/// Process-scoped server state.
#[derive(Debug, Clone)]
pub struct ToolServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Scans the configured repositories.
    loader: ToolLoader,

    /// The one register holding the current snapshot.
    registry: RegistryHandle,

    /// Validation, routing and execution shared by every connection.
    dispatcher: Dispatcher,
}

impl ToolServer {
    /// Create a server and publish its first registry snapshot.
    ///
    /// Blocks while the repositories are scanned.
    #[instrument(skip_all, fields(server = %config.server.name))]
    pub fn new(config: Config, catalog: HandlerCatalog) -> Result<Self> {
        let loader = ToolLoader::new(config.tools.repo_paths.clone(), catalog);
        let registry = RegistryHandle::new(loader.load()?);

        let current = registry.current();
        info!(
            "Registry v{} published with {} tools: {:?}",
            current.version(),
            current.len(),
            current.names()
        );

        let dispatcher = Dispatcher::new(
            Router::new(registry.clone()),
            ToolExecutor::new(config.tools.call_timeout()),
        );

        Ok(Self {
            config: Arc::new(config),
            loader,
            registry,
            dispatcher,
        })
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Handle to the current registry snapshot.
    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Rescan now, outside of the watcher. Returns the published version.
    pub async fn reload(&self) -> Option<u64> {
        reload(&self.loader, &self.registry).await
    }

    /// Bind, start watching and begin accepting connections.
    pub async fn start(self) -> Result<ServerHandle> {
        let transport = TcpTransport::bind(self.config.transport.clone()).await?;
        let local_addr = transport.local_addr()?;
        info!("Transport: {}", self.config.transport.description());

        let watcher = if self.config.tools.watch {
            Some(spawn_watcher(
                self.loader.clone(),
                self.registry.clone(),
                self.config.tools.debounce(),
            )?)
        } else {
            info!("Repository watching disabled");
            None
        };

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let dispatcher = self.dispatcher.clone();
        let accept_task = tokio::spawn(transport.run(dispatcher, shutdown_rx));

        Ok(ServerHandle {
            local_addr,
            registry: self.registry.clone(),
            shutdown: shutdown_tx,
            accept_task,
            watcher,
        })
    }

    /// Run until Ctrl-C, then shut down gracefully.
    pub async fn run(self) -> Result<()> {
        let handle = self.start().await?;

        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        }

        handle.shutdown().await;
        Ok(())
    }
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    registry: RegistryHandle,
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    watcher: Option<WatcherHandle>,
}

impl ServerHandle {
    /// The address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Stop the watcher, stop accepting and let in-flight calls drain.
    pub async fn shutdown(self) {
        if let Some(watcher) = self.watcher {
            watcher.stop().await;
        }

        let _ = self.shutdown.send(true);
        if let Err(e) = self.accept_task.await {
            warn!("Accept loop ended abnormally: {}", e);
        }
        info!("Server stopped");
    }
}
