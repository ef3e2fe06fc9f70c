//! Wire message types.
//!
//! Every frame on a connection carries exactly one [`Message`]. Requests and
//! responses share the same envelope; what differs is the shape of `body`
//! and whether `error` is populated.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::domains::tools::ToolDefinition;

/// Header `type` of a list request.
pub const LIST_TOOL: &str = "list_tool";

/// Header `type` of a tool-call request.
pub const TOOL_CALL: &str = "tool_call";

/// Header `type` of a list response.
pub const LIST_TOOL_RESPONSE: &str = "list_tool_response";

/// Header `type` of a tool-call response.
pub const TOOL_CALL_RESPONSE: &str = "tool_call_response";

/// Header `type` of any error response.
pub const ERROR_RESPONSE: &str = "error_response";

// ============================================================================
// Envelope
// ============================================================================

/// Outcome flag carried by responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Message metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Unique id of this message.
    pub id: String,

    /// Caller-chosen id linking a response to its request.
    pub correlation_id: String,

    /// Message kind, e.g. `tool_call` or `tool_call_response`.
    #[serde(rename = "type", default)]
    pub kind: String,

    /// Present on responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

/// Error codes understood by both ends of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ValidationError,
    UnknownRequestType,
    ToolNotFound,
    ExecutionError,
    ConnectionError,
    ConnectionClosed,
    /// Any code this build does not know about.
    #[serde(other)]
    Unknown,
}

impl ErrorCode {
    /// The wire spelling of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "validation_error",
            Self::UnknownRequestType => "unknown_request_type",
            Self::ToolNotFound => "tool_not_found",
            Self::ExecutionError => "execution_error",
            Self::ConnectionError => "connection_error",
            Self::ConnectionClosed => "connection_closed",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error payload of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}

/// One frame on the wire.
///
/// `body` and `error` are always serialized (as `null` when absent) so the
/// envelope keeps a fixed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub header: Header,

    #[serde(default)]
    pub body: Option<Value>,

    #[serde(default)]
    pub error: Option<ErrorBody>,
}

impl Message {
    /// Build a request envelope with a fresh message id.
    pub fn request(correlation_id: impl Into<String>, kind: &str, body: Value) -> Self {
        Self {
            header: Header {
                id: Uuid::new_v4().to_string(),
                correlation_id: correlation_id.into(),
                kind: kind.to_string(),
                status: None,
            },
            body: Some(body),
            error: None,
        }
    }

    /// Build a success response.
    pub fn success(correlation_id: impl Into<String>, kind: &str, body: Value) -> Self {
        Self {
            header: Header {
                id: Uuid::new_v4().to_string(),
                correlation_id: correlation_id.into(),
                kind: kind.to_string(),
                status: Some(Status::Success),
            },
            body: Some(body),
            error: None,
        }
    }

    /// Build an error response. Error responses never carry a body.
    pub fn failure(
        correlation_id: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            header: Header {
                id: Uuid::new_v4().to_string(),
                correlation_id: correlation_id.into(),
                kind: ERROR_RESPONSE.to_string(),
                status: Some(Status::Error),
            },
            body: None,
            error: Some(ErrorBody {
                code,
                message: message.into(),
            }),
        }
    }

    /// Success response for a tool call.
    pub fn tool_result(correlation_id: impl Into<String>, tool_name: &str, result: Value) -> Self {
        Self::success(
            correlation_id,
            TOOL_CALL_RESPONSE,
            json!({ "tool_name": tool_name, "result": result }),
        )
    }

    /// Success response for a catalog listing.
    pub fn tool_list(correlation_id: impl Into<String>, tools: Vec<ToolDefinition>) -> Self {
        Self::success(correlation_id, LIST_TOOL_RESPONSE, json!({ "tools": tools }))
    }

    pub fn correlation_id(&self) -> &str {
        &self.header.correlation_id
    }

    /// Whether this message reports a failure.
    pub fn is_error(&self) -> bool {
        self.error.is_some() || self.header.status == Some(Status::Error)
    }
}

// ============================================================================
// Bodies
// ============================================================================

/// Body of a successful tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub tool_name: String,
    pub result: Value,
}

/// Body of a successful catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolList {
    pub tools: Vec<ToolDefinition>,
}

/// Body of a tool-call request.
///
/// `tool` is the canonical field; `tool_name` is accepted on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallBody {
    #[serde(alias = "tool_name")]
    pub tool: String,

    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Body of a typed request such as `{"request_type": "list_tool"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryBody {
    pub request_type: String,
}

/// A request body after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Query(QueryBody),
    ToolCall(ToolCallBody),
}

/// A request that passed validation and is ready for routing.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub header: Header,
    pub body: RequestBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_result_shape() {
        let msg = Message::tool_result("c-1", "add", json!(12));
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["header"]["correlation_id"], "c-1");
        assert_eq!(value["header"]["type"], TOOL_CALL_RESPONSE);
        assert_eq!(value["header"]["status"], "success");
        assert_eq!(value["body"], json!({"tool_name": "add", "result": 12}));
        assert!(value["error"].is_null());
    }

    #[test]
    fn test_failure_shape() {
        let msg = Message::failure("c-2", ErrorCode::ToolNotFound, "Tool 'nope' not found");
        let value = serde_json::to_value(&msg).unwrap();

        assert_eq!(value["header"]["status"], "error");
        assert_eq!(value["header"]["type"], ERROR_RESPONSE);
        assert!(value["body"].is_null());
        assert_eq!(value["error"]["code"], "tool_not_found");
        assert!(msg.is_error());
    }

    #[test]
    fn test_request_omits_status() {
        let msg = Message::request("c-3", TOOL_CALL, json!({"tool": "ping", "args": {}}));
        let value = serde_json::to_value(&msg).unwrap();
        assert!(value["header"].get("status").is_none());
        assert!(!msg.is_error());
    }

    #[test]
    fn test_unknown_error_code_deserializes() {
        let body: ErrorBody =
            serde_json::from_value(json!({"code": "rate_limited", "message": "slow down"}))
                .unwrap();
        assert_eq!(body.code, ErrorCode::Unknown);
    }

    #[test]
    fn test_tool_name_alias_accepted() {
        let body: ToolCallBody =
            serde_json::from_value(json!({"tool_name": "add", "args": {"a": 1}})).unwrap();
        assert_eq!(body.tool, "add");
        assert_eq!(body.args["a"], 1);
    }
}
