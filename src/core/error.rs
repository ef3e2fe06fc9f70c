//! Error types for the tool server.
//!
//! Each layer owns its own error enum; this one is what server lifecycle
//! operations return.

use thiserror::Error;

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the tool server.
#[derive(Debug, Error)]
pub enum Error {
    /// Scanning or watching the tool repositories failed.
    #[error("Load error: {0}")]
    Load(#[from] crate::domains::tools::LoadError),

    /// Binding or serving the listener failed.
    #[error("Transport error: {0}")]
    Transport(#[from] super::transport::TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::LoadError;

    #[test]
    fn test_load_error_converts() {
        let err: Error = LoadError::invalid("/repo/a.tool.json", "missing description").into();
        assert!(matches!(err, Error::Load(_)));
        assert!(err.to_string().starts_with("Load error:"));
    }
}
