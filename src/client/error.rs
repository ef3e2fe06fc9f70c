//! Client error types.

use std::time::Duration;

use thiserror::Error;

use crate::domains::protocol::ErrorCode;

/// Errors returned by [`Client`](super::Client) operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not reach the server.
    #[error("Failed to connect to {address}: {source}")]
    ConnectionFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The connection ended before a response arrived.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No response within the configured time.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with an error response.
    #[error("{code}: {message}")]
    Remote { code: ErrorCode, message: String },

    /// The server's response did not have the expected shape.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error on the connection.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Create a protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// The wire error code closest to this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Remote { code, .. } => *code,
            Self::ConnectionClosed => ErrorCode::ConnectionClosed,
            _ => ErrorCode::ConnectionError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_display_and_code() {
        let err = ClientError::Remote {
            code: ErrorCode::ToolNotFound,
            message: "Tool 'sub' not found.".into(),
        };
        assert_eq!(err.to_string(), "tool_not_found: Tool 'sub' not found.");
        assert_eq!(err.code(), ErrorCode::ToolNotFound);
    }

    #[test]
    fn test_transport_codes() {
        assert_eq!(ClientError::ConnectionClosed.code(), ErrorCode::ConnectionClosed);
        assert_eq!(
            ClientError::Timeout(Duration::from_secs(1)).code(),
            ErrorCode::ConnectionError
        );
    }
}
