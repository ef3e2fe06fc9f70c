//! Transport layer for the tool server.
//!
//! Clients hold one long-lived TCP connection each. Frames are single lines
//! of UTF-8 JSON; see [`crate::domains::protocol::codec`].
//!
//! - `tcp.rs` binds, accepts and tracks connections
//! - `connection.rs` reads frames, dispatches them and serializes writes

mod config;
mod connection;
mod error;
pub mod tcp;

pub use config::{DEFAULT_PORT, TransportConfig};
pub(crate) use config::parse_env;
pub use connection::serve_connection;
pub use error::{TransportError, TransportResult};
pub use tcp::TcpTransport;
