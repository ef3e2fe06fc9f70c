//! Request router.
//!
//! Catalog queries and lookups are answered on the spot. Tool calls that
//! resolve become an [`Execution`] for the executor.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::domains::protocol::message::LIST_TOOL;
use crate::domains::protocol::{ErrorCode, Message, Request, RequestBody};
use crate::domains::tools::{RegistryHandle, Tool, ToolRegistry};

/// A resolved tool call, bound to the snapshot it was looked up in.
#[derive(Debug)]
pub struct Execution {
    pub correlation_id: String,
    pub tool: Arc<Tool>,
    /// Snapshot used for the lookup, and injected if the tool asks for it.
    pub snapshot: Arc<ToolRegistry>,
    pub args: Map<String, Value>,
}

/// Outcome of routing one request.
#[derive(Debug)]
pub enum Routed {
    /// Answer immediately.
    Reply(Message),
    /// Hand off to the executor.
    Execute(Execution),
}

/// Dispatches validated requests against the current registry snapshot.
#[derive(Debug, Clone)]
pub struct Router {
    registry: RegistryHandle,
}

impl Router {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Route one request.
    ///
    /// The snapshot is read once; lookup and injection both use it.
    #[instrument(skip_all, fields(correlation_id = %request.header.correlation_id))]
    pub fn route(&self, request: Request) -> Routed {
        let snapshot = self.registry.current();
        let correlation_id = request.header.correlation_id;

        match request.body {
            RequestBody::Query(query) if query.request_type == LIST_TOOL => {
                debug!("Listing {} tools", snapshot.len());
                Routed::Reply(Message::tool_list(correlation_id, snapshot.definitions()))
            }
            RequestBody::Query(query) => Routed::Reply(Message::failure(
                correlation_id,
                ErrorCode::UnknownRequestType,
                format!("Request type '{}' is not supported.", query.request_type),
            )),
            RequestBody::ToolCall(call) => match snapshot.get(&call.tool) {
                Some(tool) => {
                    debug!("Routing call to '{}'", call.tool);
                    Routed::Execute(Execution {
                        correlation_id,
                        tool,
                        snapshot,
                        args: call.args,
                    })
                }
                None => Routed::Reply(Message::failure(
                    correlation_id,
                    ErrorCode::ToolNotFound,
                    format!("Tool '{}' not found.", call.tool),
                )),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::protocol::validate;
    use crate::domains::tools::{ToolOrigin, ToolParam, handler_fn};
    use serde_json::json;

    fn router_with(names: &[&str]) -> Router {
        let mut builder = ToolRegistry::builder();
        for name in names {
            builder.insert(Tool::new(
                *name,
                "test tool",
                vec![ToolParam::new("a", "int"), ToolParam::new("b", "int")],
                handler_fn(|_call| async { Ok(json!(null)) }),
                ToolOrigin::Builtin,
            ));
        }
        Router::new(RegistryHandle::new(builder.build()))
    }

    fn request(body: Value) -> Request {
        let raw = json!({"header": {"id": "m-1", "correlation_id": "c-1"}, "body": body});
        validate(&raw.to_string()).unwrap()
    }

    fn reply(routed: Routed) -> Message {
        match routed {
            Routed::Reply(msg) => msg,
            Routed::Execute(exec) => panic!("expected reply, got execution of {}", exec.tool.name()),
        }
    }

    #[test]
    fn test_list_tool() {
        let router = router_with(&["add"]);
        let msg = reply(router.route(request(json!({"request_type": "list_tool"}))));

        assert!(!msg.is_error());
        assert_eq!(msg.correlation_id(), "c-1");
        let tools = &msg.body.unwrap()["tools"];
        assert_eq!(tools.as_array().unwrap().len(), 1);
        assert_eq!(tools[0]["name"], "add");
        assert_eq!(tools[0]["args_list"][0]["name"], "a");
        assert_eq!(tools[0]["args_list"][1]["name"], "b");
    }

    #[test]
    fn test_unknown_request_type() {
        let router = router_with(&["add"]);
        let msg = reply(router.route(request(json!({"request_type": "subscribe"}))));
        assert_eq!(msg.error.unwrap().code, ErrorCode::UnknownRequestType);
        assert!(msg.body.is_none());
    }

    #[test]
    fn test_tool_not_found() {
        let router = router_with(&["add"]);
        let msg = reply(router.route(request(json!({"tool": "sub", "args": {}}))));
        let error = msg.error.unwrap();
        assert_eq!(error.code, ErrorCode::ToolNotFound);
        assert!(error.message.contains("sub"));
    }

    #[test]
    fn test_tool_call_resolves() {
        let router = router_with(&["add"]);
        match router.route(request(json!({"tool_name": "add", "args": {"a": 1, "b": 2}}))) {
            Routed::Execute(exec) => {
                assert_eq!(exec.correlation_id, "c-1");
                assert_eq!(exec.tool.name(), "add");
                assert_eq!(exec.args["a"], 1);
                assert_eq!(exec.snapshot.version(), 1);
            }
            Routed::Reply(msg) => panic!("unexpected reply {:?}", msg),
        }
    }

    #[test]
    fn test_routes_against_latest_snapshot() {
        let router = router_with(&["old"]);
        router
            .registry()
            .publish(ToolRegistry::builder().build());

        let msg = reply(router.route(request(json!({"tool": "old"}))));
        assert_eq!(msg.error.unwrap().code, ErrorCode::ToolNotFound);
    }
}
