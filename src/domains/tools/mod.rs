//! Tools domain module.
//!
//! Tools are named callables that clients invoke over the wire. This module
//! owns everything from discovering them on disk to holding the snapshot
//! that requests are routed against.
//!
//! ## Architecture
//!
//! - `definitions/` - Built-in handler implementations and the core manifest
//! - `handlers.rs` - The `ToolHandler` trait and the key→handler catalog
//! - `manifest.rs` - The `*.tool.json` declaration format
//! - `command.rs` - Handlers that run an external program per call
//! - `loader.rs` - Scans repositories and builds registry snapshots
//! - `watcher.rs` - Debounced hot reload on filesystem changes
//! - `registry.rs` - Immutable snapshots and the handle that publishes them
//! - `error.rs` - Tool and load error types
//!
//! ## Adding a New Tool
//!
//! 1. Implement `ToolHandler` (or use `handler_fn`) and register it in a
//!    `HandlerCatalog` under a key such as `"team.my_tool"`
//! 2. Declare the tool in a `*.tool.json` file in a tool repository with
//!    `"handler": "team.my_tool"`
//!
//! Tools backed by a script only need step 2, with `"command"` instead of
//! `"handler"`.

pub mod command;
pub mod definitions;
mod error;
mod handlers;
mod loader;
pub mod manifest;
mod registry;
mod watcher;

pub use command::{CommandHandler, DEFAULT_COMMAND_TIMEOUT_MS};
pub use error::{LoadError, ToolError};
pub use handlers::{FnHandler, HandlerCatalog, ToolCall, ToolHandler, handler_fn};
pub use loader::ToolLoader;
pub use manifest::MANIFEST_SUFFIX;
pub use registry::{
    RegistryBuilder, RegistryHandle, Tool, ToolDefinition, ToolOrigin, ToolParam, ToolRegistry,
};
pub use watcher::{DEFAULT_DEBOUNCE, WatcherHandle, reload, spawn_watcher};
