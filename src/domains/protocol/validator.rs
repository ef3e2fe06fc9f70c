//! Message validation.
//!
//! Turns a raw frame into a [`Request`] or into the `validation_error`
//! response that should be sent back instead. Nothing that fails here ever
//! reaches the router.

use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use super::message::{
    ErrorCode, Header, Message, QueryBody, Request, RequestBody, ToolCallBody,
};

/// Validate one decoded frame.
///
/// On failure the returned message is addressed to the request's
/// `correlation_id` when it could be extracted, or to the nil UUID otherwise.
pub fn validate(raw: &str) -> Result<Request, Message> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| reject(&fallback_id(None), format!("Could not parse message: {}", e)))?;

    let correlation_id = fallback_id(Some(&value));

    let object = value
        .as_object()
        .ok_or_else(|| reject(&correlation_id, "Message must be a JSON object"))?;

    let header = object
        .get("header")
        .ok_or_else(|| reject(&correlation_id, "Missing 'header'"))?;
    let header: Header = serde_json::from_value(header.clone())
        .map_err(|e| reject(&correlation_id, format!("Invalid header: {}", e)))?;

    let body = match object.get("body") {
        Some(Value::Object(body)) => body,
        Some(Value::Null) | None => return Err(reject(&correlation_id, "Missing 'body'")),
        Some(_) => return Err(reject(&correlation_id, "'body' must be an object")),
    };

    let body = parse_body(body).map_err(|reason| reject(&correlation_id, reason))?;

    Ok(Request { header, body })
}

fn parse_body(body: &Map<String, Value>) -> Result<RequestBody, String> {
    let as_value = || Value::Object(body.clone());

    if body.contains_key("request_type") {
        let query: QueryBody = serde_json::from_value(as_value())
            .map_err(|e| format!("Invalid request body: {}", e))?;
        return Ok(RequestBody::Query(query));
    }

    if body.contains_key("tool") || body.contains_key("tool_name") {
        if body.contains_key("tool") && body.contains_key("tool_name") {
            return Err("Tool call body must use either 'tool' or 'tool_name', not both".into());
        }
        let call: ToolCallBody = serde_json::from_value(as_value())
            .map_err(|e| format!("Invalid tool call body: {}", e))?;
        return Ok(RequestBody::ToolCall(call));
    }

    Err("Body is neither a typed request nor a tool call".into())
}

/// Best-effort extraction of the correlation id from a parsed document.
fn fallback_id(value: Option<&Value>) -> String {
    value
        .and_then(|v| v.pointer("/header/correlation_id"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::nil().to_string())
}

fn reject(correlation_id: &str, message: impl Into<String>) -> Message {
    let message = message.into();
    debug!(correlation_id, "Rejecting message: {}", message);
    Message::failure(correlation_id, ErrorCode::ValidationError, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(value: Value) -> String {
        value.to_string()
    }

    fn expect_rejection(raw: &str) -> Message {
        match validate(raw) {
            Ok(req) => panic!("expected rejection, got {:?}", req),
            Err(msg) => {
                assert_eq!(msg.error.as_ref().unwrap().code, ErrorCode::ValidationError);
                msg
            }
        }
    }

    #[test]
    fn test_valid_tool_call() {
        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-1", "type": "tool_call"},
            "body": {"tool": "add", "args": {"a": 5, "b": 7}}
        }));

        let req = validate(&raw).unwrap();
        assert_eq!(req.header.correlation_id, "c-1");
        match req.body {
            RequestBody::ToolCall(call) => {
                assert_eq!(call.tool, "add");
                assert_eq!(call.args["b"], 7);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_tool_name_alias() {
        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-1"},
            "body": {"tool_name": "ping"}
        }));

        match validate(&raw).unwrap().body {
            RequestBody::ToolCall(call) => {
                assert_eq!(call.tool, "ping");
                assert!(call.args.is_empty());
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_query_body() {
        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-1", "type": "list_tool"},
            "body": {"request_type": "list_tool"}
        }));

        assert_eq!(
            validate(&raw).unwrap().body,
            RequestBody::Query(QueryBody {
                request_type: "list_tool".into()
            })
        );
    }

    #[test]
    fn test_unknown_request_type_passes_validation() {
        // Routing, not validation, decides what an unknown type means.
        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-1"},
            "body": {"request_type": "subscribe"}
        }));
        assert!(validate(&raw).is_ok());
    }

    #[test]
    fn test_invalid_json_uses_nil_id() {
        let msg = expect_rejection("{not json");
        assert_eq!(msg.correlation_id(), Uuid::nil().to_string());
    }

    #[test]
    fn test_missing_correlation_id() {
        let raw = frame(json!({
            "header": {"id": "m-1"},
            "body": {"tool": "ping"}
        }));
        let msg = expect_rejection(&raw);
        assert_eq!(msg.correlation_id(), Uuid::nil().to_string());
    }

    #[test]
    fn test_missing_header_id_keeps_correlation_id() {
        let raw = frame(json!({
            "header": {"correlation_id": "c-9"},
            "body": {"tool": "ping"}
        }));
        let msg = expect_rejection(&raw);
        assert_eq!(msg.correlation_id(), "c-9");
    }

    #[test]
    fn test_args_must_be_object() {
        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-2"},
            "body": {"tool": "add", "args": [5, 7]}
        }));
        let msg = expect_rejection(&raw);
        assert_eq!(msg.correlation_id(), "c-2");
    }

    #[test]
    fn test_both_tool_fields_rejected() {
        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-3"},
            "body": {"tool": "add", "tool_name": "add", "args": {}}
        }));
        expect_rejection(&raw);
    }

    #[test]
    fn test_unrecognized_body_rejected() {
        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-4"},
            "body": {"hello": "world"}
        }));
        expect_rejection(&raw);

        let raw = frame(json!({
            "header": {"id": "m-1", "correlation_id": "c-4"},
            "body": null
        }));
        expect_rejection(&raw);
    }

    #[test]
    fn test_non_object_document_rejected() {
        expect_rejection("[1, 2, 3]");
        expect_rejection("\"just a string\"");
    }
}
