//! Text tool definitions.

use serde::Deserialize;
use serde_json::Value;

use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolCall, ToolHandler};

/// Parameters for the echo tool.
#[derive(Debug, Clone, Deserialize)]
pub struct EchoParams {
    /// Any JSON value; returned unchanged.
    pub message: Value,
}

/// Returns its `message` argument unchanged.
pub struct EchoHandler;

impl EchoHandler {
    /// Catalog key.
    pub const KEY: &'static str = "text.echo";
}

#[async_trait::async_trait]
impl ToolHandler for EchoHandler {
    async fn call(&self, call: ToolCall) -> Result<Value, ToolError> {
        let params: EchoParams = call.parse()?;
        Ok(params.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_round_trips_any_value() {
        let message = json!({"nested": [1, "two", null, true]});
        let call = ToolCall::new(json!({ "message": message.clone() }).as_object().cloned().unwrap());
        assert_eq!(EchoHandler.call(call).await.unwrap(), message);
    }

    #[tokio::test]
    async fn test_echo_requires_message() {
        let err = EchoHandler.call(ToolCall::default()).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
