//! Toolhost Library
//!
//! This crate exposes named functions ("tools") to remote clients over a
//! persistent TCP connection. Tools are declared in `*.tool.json` manifests;
//! the registry is rebuilt from a full rescan whenever a tool repository
//! changes and swapped in atomically.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, server lifecycle and the TCP transport
//! - **domains**: business logic organized by bounded contexts
//!   - **protocol**: message envelope, framing and validation
//!   - **tools**: handlers, manifests, registry snapshots and hot reload
//!   - **dispatch**: routing and tool execution
//! - **client**: a correlating client for the same protocol
//!
//! # Example
//!
//! ```rust,no_run
//! use toolhost::{Client, Config, HandlerCatalog, ToolServer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let server = ToolServer::new(config, HandlerCatalog::with_builtins())?;
//!     let handle = server.start().await?;
//!
//!     let client = Client::connect(&handle.local_addr().to_string()).await?;
//!     let sum = client.call("add", serde_json::json!({"a": 5, "b": 7})).await?;
//!     println!("{}", sum);
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use client::{Client, ClientConfig, ClientError};
pub use core::{Config, Error, Result, ServerHandle, ToolServer};
pub use domains::tools::{HandlerCatalog, ToolCall, ToolError, ToolHandler, handler_fn};
