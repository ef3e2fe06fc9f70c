//! Arithmetic tool definitions.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolCall, ToolHandler};

/// Parameters for the add tool.
#[derive(Debug, Clone, Deserialize)]
pub struct AddParams {
    pub a: i64,
    pub b: i64,
}

/// Adds two 64-bit integers.
pub struct AddHandler;

impl AddHandler {
    /// Catalog key.
    pub const KEY: &'static str = "math.add";

    pub fn execute(params: &AddParams) -> Result<i64, ToolError> {
        params
            .a
            .checked_add(params.b)
            .ok_or_else(|| ToolError::execution_failed("integer overflow"))
    }
}

#[async_trait::async_trait]
impl ToolHandler for AddHandler {
    async fn call(&self, call: ToolCall) -> Result<Value, ToolError> {
        let params: AddParams = call.parse()?;
        Ok(json!(Self::execute(&params)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(value: Value) -> ToolCall {
        ToolCall::new(value.as_object().cloned().unwrap())
    }

    #[tokio::test]
    async fn test_add() {
        let out = AddHandler.call(call(json!({"a": 5, "b": 7}))).await.unwrap();
        assert_eq!(out, json!(12));
    }

    #[tokio::test]
    async fn test_add_matches_direct_application() {
        for (a, b) in [(0i64, 0i64), (-3, 3), (i64::MAX - 1, 1), (-40, -2)] {
            let out = AddHandler.call(call(json!({"a": a, "b": b}))).await.unwrap();
            assert_eq!(out, json!(a + b));
        }
    }

    #[tokio::test]
    async fn test_add_type_mismatch() {
        let err = AddHandler
            .call(call(json!({"a": "5", "b": 7})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_add_missing_argument() {
        let err = AddHandler.call(call(json!({"a": 5}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_add_overflow() {
        let err = AddHandler
            .call(call(json!({"a": i64::MAX, "b": 1})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }
}
