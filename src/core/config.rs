//! Configuration management for the tool server.
//!
//! This module provides a centralized configuration structure populated
//! from defaults, a `.env` file and `TOOLHOST_*` environment variables.

use super::transport::{TransportConfig, parse_env};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the tool server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Tool discovery and execution.
    pub tools: ToolsConfig,

    /// Problems found while reading the environment, for logging once a
    /// subscriber is installed.
    #[serde(skip)]
    pub warnings: Vec<String>,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server, used in logs.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,
}

/// Configuration for tool discovery and execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directories scanned for `*.tool.json` manifests, in scan order.
    pub repo_paths: Vec<PathBuf>,

    /// Whether to reload the registry when a repository changes.
    pub watch: bool,

    /// Quiet period before a burst of changes triggers a rescan.
    pub debounce_ms: u64,

    /// Upper bound for a single tool call. `None` means no limit.
    pub call_timeout_ms: Option<u64>,
}

impl ToolsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "toolhost".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            repo_paths: Vec::new(),
            watch: true,
            debounce_ms: 500,
            call_timeout_ms: None,
        }
    }
}

/// Split a comma-separated path list, dropping empty entries.
fn parse_paths(raw: &str) -> Vec<PathBuf> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first. Variables are
    /// prefixed with `TOOLHOST_`, for example `TOOLHOST_PORT` or
    /// `TOOLHOST_TOOL_REPOS`. Malformed values keep their defaults and are
    /// reported in [`Config::warnings`]; nothing is logged here.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("TOOLHOST_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("TOOLHOST_LOG_LEVEL") {
            config.logging.level = level;
        }

        let mut warnings = Vec::new();
        config.transport = TransportConfig::read_env(&mut warnings);

        if let Ok(repos) = std::env::var("TOOLHOST_TOOL_REPOS") {
            config.tools.repo_paths = parse_paths(&repos);
        }

        if let Ok(raw) = std::env::var("TOOLHOST_WATCH") {
            match parse_flag(&raw) {
                Some(watch) => config.tools.watch = watch,
                None => warnings.push(format!(
                    "Ignoring invalid TOOLHOST_WATCH={:?}, using {}",
                    raw, config.tools.watch
                )),
            }
        }

        config.tools.debounce_ms =
            parse_env("TOOLHOST_DEBOUNCE_MS", config.tools.debounce_ms, &mut warnings);

        if std::env::var("TOOLHOST_CALL_TIMEOUT_MS").is_ok() {
            let timeout = parse_env("TOOLHOST_CALL_TIMEOUT_MS", 0u64, &mut warnings);
            config.tools.call_timeout_ms = (timeout > 0).then_some(timeout);
        }

        config.warnings = warnings;
        config
    }
}
