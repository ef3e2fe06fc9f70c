//! Tool executor.
//!
//! Runs a resolved [`Execution`] and turns the outcome into exactly one
//! response message. Handler errors and panics become `execution_error`;
//! nothing a tool does can take down the connection that called it.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use super::router::Execution;
use crate::domains::protocol::{ErrorCode, Message};
use crate::domains::tools::{Tool, ToolCall, ToolError, ToolRegistry};

/// Longest error message sent to a client, in characters.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 512;

/// Invokes tools and builds their responses.
#[derive(Debug, Clone, Default)]
pub struct ToolExecutor {
    call_timeout: Option<Duration>,
}

impl ToolExecutor {
    /// Create an executor. `call_timeout` bounds every call when set.
    pub fn new(call_timeout: Option<Duration>) -> Self {
        Self { call_timeout }
    }

    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout
    }

    /// Run one call to completion.
    #[instrument(
        skip_all,
        fields(tool = %execution.tool.name(), correlation_id = %execution.correlation_id)
    )]
    pub async fn execute(&self, execution: Execution) -> Message {
        let Execution {
            correlation_id,
            tool,
            snapshot,
            args,
        } = execution;

        match self.invoke(&tool, snapshot, args).await {
            Ok(result) => {
                debug!("Tool call succeeded");
                Message::tool_result(correlation_id, tool.name(), result)
            }
            Err(e) => {
                warn!("Tool call failed: {}", e);
                Message::failure(
                    correlation_id,
                    ErrorCode::ExecutionError,
                    sanitize(&format!("Error executing tool '{}': {}", tool.name(), e)),
                )
            }
        }
    }

    async fn invoke(
        &self,
        tool: &Tool,
        snapshot: Arc<ToolRegistry>,
        args: Map<String, Value>,
    ) -> Result<Value, ToolError> {
        if args.contains_key(Tool::REGISTRY_PARAM) {
            return Err(ToolError::invalid_arguments(format!(
                "'{}' is supplied by the server and cannot be passed by clients",
                Tool::REGISTRY_PARAM
            )));
        }

        let mut call = ToolCall::new(args);
        if tool.needs_registry() {
            call = call.with_registry(snapshot);
        }

        let guarded = AssertUnwindSafe(tool.handler().call(call)).catch_unwind();
        let outcome = match self.call_timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .map_err(|_| ToolError::Timeout(limit.as_millis() as u64))?,
            None => guarded.await,
        };

        outcome.unwrap_or_else(|panic| {
            Err(ToolError::internal(format!(
                "tool panicked: {}",
                panic_message(panic.as_ref())
            )))
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

/// Make an error message safe to put on the wire.
///
/// Control characters become spaces (whitespace) or are dropped, and the
/// result is cut to [`MAX_ERROR_MESSAGE_CHARS`].
pub fn sanitize(message: &str) -> String {
    message
        .chars()
        .filter_map(|c| match c {
            c if !c.is_control() => Some(c),
            c if c.is_whitespace() => Some(' '),
            _ => None,
        })
        .take(MAX_ERROR_MESSAGE_CHARS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::tools::definitions::{AddHandler, ListToolsHandler};
    use crate::domains::tools::{ToolOrigin, ToolParam, handler_fn};
    use serde_json::json;

    fn execution(tool: Tool, args: Value) -> Execution {
        let tool = Arc::new(tool);
        let snapshot = Arc::new(ToolRegistry::builder().with_tool(add_tool()).build());
        Execution {
            correlation_id: "c-7".into(),
            tool,
            snapshot,
            args: args.as_object().cloned().unwrap(),
        }
    }

    fn add_tool() -> Tool {
        Tool::new(
            "add",
            "Add.",
            vec![ToolParam::new("a", "int"), ToolParam::new("b", "int")],
            Arc::new(AddHandler),
            ToolOrigin::Builtin,
        )
    }

    fn error_of(msg: &Message) -> (ErrorCode, &str) {
        let error = msg.error.as_ref().unwrap();
        (error.code, error.message.as_str())
    }

    #[tokio::test]
    async fn test_success() {
        let msg = ToolExecutor::default()
            .execute(execution(add_tool(), json!({"a": 5, "b": 7})))
            .await;
        assert_eq!(msg.correlation_id(), "c-7");
        assert_eq!(msg.body.unwrap(), json!({"tool_name": "add", "result": 12}));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_execution_error() {
        let msg = ToolExecutor::default()
            .execute(execution(add_tool(), json!({"a": "five", "b": 7})))
            .await;
        assert_eq!(error_of(&msg).0, ErrorCode::ExecutionError);
        assert_eq!(msg.correlation_id(), "c-7");
    }

    #[tokio::test]
    async fn test_handler_error() {
        let failing = Tool::new(
            "fail",
            "Always fails.",
            vec![],
            handler_fn(|_call| async { Err(ToolError::execution_failed("division by zero")) }),
            ToolOrigin::Builtin,
        );
        let msg = ToolExecutor::default().execute(execution(failing, json!({}))).await;
        let (code, message) = error_of(&msg);
        assert_eq!(code, ErrorCode::ExecutionError);
        assert!(message.contains("division by zero"));
        assert!(message.contains("'fail'"));
        assert!(msg.body.is_none());
    }

    #[tokio::test]
    async fn test_panic_is_caught() {
        let panicking = Tool::new(
            "boom",
            "Panics.",
            vec![],
            handler_fn(|_call| async {
                if true {
                    panic!("exploded");
                }
                Ok(Value::Null)
            }),
            ToolOrigin::Builtin,
        );
        let msg = ToolExecutor::default().execute(execution(panicking, json!({}))).await;
        let (code, message) = error_of(&msg);
        assert_eq!(code, ErrorCode::ExecutionError);
        assert!(message.contains("exploded"));
    }

    #[tokio::test]
    async fn test_registry_injected() {
        let list = Tool::new(
            "list_tools_available",
            "List tools.",
            vec![ToolParam::new(Tool::REGISTRY_PARAM, "ToolRegistry")],
            Arc::new(ListToolsHandler),
            ToolOrigin::Builtin,
        );
        let msg = ToolExecutor::default().execute(execution(list, json!({}))).await;
        let body = msg.body.unwrap();
        assert_eq!(body["result"][0]["name"], "add");
        assert_eq!(body["result"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_client_cannot_pass_registry() {
        let list = Tool::new(
            "list_tools_available",
            "List tools.",
            vec![ToolParam::new(Tool::REGISTRY_PARAM, "ToolRegistry")],
            Arc::new(ListToolsHandler),
            ToolOrigin::Builtin,
        );
        let msg = ToolExecutor::default()
            .execute(execution(list, json!({"tool_registry": []})))
            .await;
        let (code, message) = error_of(&msg);
        assert_eq!(code, ErrorCode::ExecutionError);
        assert!(message.contains("tool_registry"));
    }

    #[tokio::test]
    async fn test_call_timeout() {
        let slow = Tool::new(
            "slow",
            "Sleeps.",
            vec![],
            handler_fn(|_call| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(Value::Null)
            }),
            ToolOrigin::Builtin,
        );
        let executor = ToolExecutor::new(Some(Duration::from_millis(50)));
        let msg = executor.execute(execution(slow, json!({}))).await;
        let (code, message) = error_of(&msg);
        assert_eq!(code, ErrorCode::ExecutionError);
        assert!(message.contains("timed out"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("line one\nline two\u{7}"), "line one line two");
        let long = "x".repeat(MAX_ERROR_MESSAGE_CHARS * 2);
        assert_eq!(sanitize(&long).chars().count(), MAX_ERROR_MESSAGE_CHARS);
    }
}
