//! System tool definitions.
//!
//! Health check and discovery. Both are bound by the core manifest and go
//! through the same routing and execution path as any user tool.

use serde_json::{Value, json};
use tracing::{debug, instrument};

use crate::domains::tools::error::ToolError;
use crate::domains::tools::handlers::{ToolCall, ToolHandler};

// ============================================================================
// Ping
// ============================================================================

/// Health check - confirms the request pipeline is working.
pub struct PingHandler;

impl PingHandler {
    /// Catalog key.
    pub const KEY: &'static str = "system.ping";

    /// Fixed reply.
    pub const REPLY: &'static str = "pong";
}

#[async_trait::async_trait]
impl ToolHandler for PingHandler {
    async fn call(&self, _call: ToolCall) -> Result<Value, ToolError> {
        Ok(json!(Self::REPLY))
    }
}

// ============================================================================
// List tools
// ============================================================================

/// Lists the definitions of every tool in the snapshot the call was routed
/// against. The registry is injected by the executor.
pub struct ListToolsHandler;

impl ListToolsHandler {
    /// Catalog key.
    pub const KEY: &'static str = "system.list_tools";
}

#[async_trait::async_trait]
impl ToolHandler for ListToolsHandler {
    #[instrument(skip_all)]
    async fn call(&self, call: ToolCall) -> Result<Value, ToolError> {
        let registry = call.registry()?;
        debug!(
            "Listing {} tools from registry v{}",
            registry.len(),
            registry.version()
        );
        serde_json::to_value(registry.definitions())
            .map_err(|e| ToolError::internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::registry::{Tool, ToolOrigin, ToolParam, ToolRegistry};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_ping() {
        let out = PingHandler.call(ToolCall::default()).await.unwrap();
        assert_eq!(out, json!("pong"));
    }

    #[tokio::test]
    async fn test_list_tools_uses_injected_snapshot() {
        let registry = ToolRegistry::builder()
            .with_tool(Tool::new(
                "add",
                "Add two integers.",
                vec![ToolParam::new("a", "int"), ToolParam::new("b", "int")],
                Arc::new(PingHandler),
                ToolOrigin::Builtin,
            ))
            .build();

        let call = ToolCall::default().with_registry(Arc::new(registry));
        let out = ListToolsHandler.call(call).await.unwrap();

        let tools = out.as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "add");
        assert_eq!(tools[0]["args_list"][1]["name"], "b");
    }

    #[tokio::test]
    async fn test_list_tools_without_registry_fails() {
        let err = ListToolsHandler.call(ToolCall::default()).await.unwrap_err();
        assert!(matches!(err, ToolError::Internal(_)));
    }
}
