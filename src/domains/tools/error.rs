//! Tool-specific error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while invoking a tool.
///
/// All of these reach clients as `execution_error`.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Arguments did not match what the tool expects.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The tool ran and reported a failure.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// The tool did not finish within its time budget.
    #[error("Tool execution timed out after {0} ms")]
    Timeout(u64),

    /// The tool panicked or the runtime failed underneath it.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ToolError {
    /// Create a new "invalid arguments" error.
    pub fn invalid_arguments(msg: impl Into<String>) -> Self {
        Self::InvalidArguments(msg.into())
    }

    /// Create a new "execution failed" error.
    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::ExecutionFailed(msg.into())
    }

    /// Create a new "internal" error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// Errors raised while scanning tool repositories.
///
/// Any of these aborts the whole scan; a registry is never built from a
/// partial result.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A manifest or directory could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("Failed to walk tool repository: {0}")]
    Walk(#[from] ignore::Error),

    /// A manifest is not valid JSON or does not match the manifest shape.
    #[error("Malformed manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A manifest parsed but describes an unusable tool.
    #[error("Invalid tool in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    /// The filesystem watcher could not be started.
    #[error("Failed to watch tool repository: {0}")]
    Watch(#[from] notify::Error),
}

impl LoadError {
    /// Create an I/O error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a parse error for the given path.
    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Create a validation error for the given path.
    pub fn invalid(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
