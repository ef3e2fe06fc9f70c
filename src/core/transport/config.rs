//! Transport configuration types.

use serde::{Deserialize, Serialize};

use crate::domains::protocol::DEFAULT_MAX_FRAME_BYTES;

/// Default TCP port.
pub const DEFAULT_PORT: u16 = 8765;

/// TCP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port number to listen on. `0` picks a free port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Longest accepted frame, in bytes, not counting the newline.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

impl TransportConfig {
    /// Create a TCP transport config.
    pub fn tcp(port: u16, host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Load transport config from `TOOLHOST_HOST`, `TOOLHOST_PORT` and
    /// `TOOLHOST_MAX_FRAME_BYTES`, collecting problems in `warnings`.
    pub(crate) fn read_env(warnings: &mut Vec<String>) -> Self {
        let mut config = Self::default();

        if let Ok(host) = std::env::var("TOOLHOST_HOST") {
            config.host = host;
        }
        config.port = parse_env("TOOLHOST_PORT", config.port, warnings);
        config.max_frame_bytes =
            parse_env("TOOLHOST_MAX_FRAME_BYTES", config.max_frame_bytes, warnings);

        config
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get a description of this transport for logging.
    pub fn description(&self) -> String {
        format!(
            "TCP on {} (newline-delimited JSON, max frame {} bytes)",
            self.address(),
            self.max_frame_bytes
        )
    }
}

/// Read and parse `key`, keeping `default` when it is unset or malformed.
///
/// A malformed value adds a line to `warnings`.
pub(crate) fn parse_env<T>(key: &str, default: T, warnings: &mut Vec<String>) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warnings.push(format!("Ignoring invalid {}={:?}, using {}", key, raw, default));
            default
        }),
        Err(_) => default,
    }
}
