//! Tool definitions module.
//!
//! Handlers compiled into the server, plus the core manifest that binds the
//! built-in tools (`ping`, `list_tools_available`) to them.

pub mod math;
pub mod system;
pub mod text;

pub use math::{AddHandler, AddParams};
pub use system::{ListToolsHandler, PingHandler};
pub use text::{EchoHandler, EchoParams};

/// Manifest declaring the built-in tools. Scanned after every user root.
pub const CORE_MANIFEST: &str = include_str!("core_tools.tool.json");

/// Pseudo-path reported for tools declared by [`CORE_MANIFEST`].
pub const CORE_MANIFEST_PATH: &str = "<core>/core_tools.tool.json";
