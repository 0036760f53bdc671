//! JSON-RPC 2.0 envelope types for the MCP wire protocol.
//!
//! Every frame on the transport is one of:
//!
//! - **Request**: carries an `id` and expects exactly one reply
//! - **Notification**: no `id`, no reply
//! - **Response**: success (`result`) or error (`error`), echoing the id
//!
//! Per MCP, request ids are strings or integers, never `null`, and unique
//! within a session. Decoding salvages the id from malformed frames where
//! possible so the error reply can still be correlated by the client.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation speaks.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC server error code for an unavailable resource.
pub const RESOURCE_UNAVAILABLE_CODE: i32 = -32002;

/// A request identifier: string or integer, never null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric id.
    Number(i64),
    /// String id.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// An incoming request.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,
    /// Unique request identifier.
    pub id: RequestId,
    /// Method to invoke.
    pub method: String,
    /// Method parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

/// An incoming notification (no id, no reply expected).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Must be "2.0".
    pub jsonrpc: String,
    /// Notification method.
    pub method: String,
    /// Notification parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// Id of the request this answers.
    pub id: RequestId,
    /// Result payload.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a success reply.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// Standard JSON-RPC 2.0 error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Malformed JSON.
    ParseError,
    /// Structurally valid JSON that is not a valid request.
    InvalidRequest,
    /// Unknown method.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal server fault.
    InternalError,
    /// Implementation-defined code.
    ServerError(i32),
}

impl ErrorCode {
    /// The numeric wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ServerError(code) => code,
        }
    }
}

/// The `error` member of an error reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code.
    pub code: i32,
    /// Short description.
    pub message: String,
    /// Optional structured detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates error data with a message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code(),
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured detail.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// An error reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// Id of the request this answers, when it could be determined.
    pub id: Option<RequestId>,
    /// Error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates an error reply.
    #[must_use]
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }

    /// Malformed JSON; no id could be determined.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, JsonRpcErrorData::new(ErrorCode::ParseError, "Parse error"))
    }

    /// Structurally invalid request.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(id, JsonRpcErrorData::new(ErrorCode::InvalidRequest, message))
    }

    /// Unknown method.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::new(ErrorCode::MethodNotFound, format!("Method not found: {method}")),
        )
    }

    /// Invalid method parameters.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), JsonRpcErrorData::new(ErrorCode::InvalidParams, message))
    }

    /// Internal server fault.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), JsonRpcErrorData::new(ErrorCode::InternalError, message))
    }

    /// Resource lookup or read failure, non-fatal to the server.
    #[must_use]
    pub fn resource_unavailable(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(
            Some(id),
            JsonRpcErrorData::new(ErrorCode::ServerError(RESOURCE_UNAVAILABLE_CODE), message),
        )
    }
}

/// A decoded incoming frame.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a reply.
    Request(JsonRpcRequest),
    /// A one-way notification.
    Notification(JsonRpcNotification),
}

/// Decodes one frame into a request or notification.
///
/// Frames that are valid JSON objects but invalid envelopes produce an
/// `InvalidRequest` error carrying the frame's id when one is present, so
/// the client can correlate the rejection.
///
/// # Errors
///
/// Returns the [`JsonRpcError`] reply to send for an undecodable frame.
pub fn decode_frame(frame: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(frame).map_err(|_| JsonRpcError::parse_error())?;
    let Some(object) = value.as_object() else {
        return Err(JsonRpcError::parse_error());
    };

    // Salvage the id early so every later rejection can echo it.
    let id: Option<RequestId> = object
        .get("id")
        .and_then(|raw| serde_json::from_value(raw.clone()).ok());

    if object.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(JsonRpcError::invalid_request(
            id,
            "jsonrpc field must be \"2.0\"",
        ));
    }

    if object.contains_key("id") {
        let request: JsonRpcRequest = serde_json::from_value(value).map_err(|_| {
            JsonRpcError::invalid_request(id.clone(), "not a valid request object")
        })?;
        if request.method.is_empty() {
            return Err(JsonRpcError::invalid_request(
                Some(request.id),
                "method field cannot be empty",
            ));
        }
        Ok(IncomingMessage::Request(request))
    } else {
        let notification: JsonRpcNotification = serde_json::from_value(value)
            .map_err(|_| JsonRpcError::invalid_request(None, "not a valid notification object"))?;
        Ok(IncomingMessage::Notification(notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_request_with_numeric_id() {
        let frame = r#"{"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}"#;
        let IncomingMessage::Request(req) = decode_frame(frame).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(req.id, RequestId::Number(1));
        assert_eq!(req.method, "initialize");
    }

    #[test]
    fn decode_request_with_string_id() {
        let frame = r#"{"jsonrpc": "2.0", "id": "abc-123", "method": "ping"}"#;
        let IncomingMessage::Request(req) = decode_frame(frame).unwrap() else {
            panic!("expected request");
        };
        assert_eq!(req.id, RequestId::String("abc-123".to_string()));
    }

    #[test]
    fn decode_notification() {
        let frame = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
        let IncomingMessage::Notification(notif) = decode_frame(frame).unwrap() else {
            panic!("expected notification");
        };
        assert_eq!(notif.method, "notifications/initialized");
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = decode_frame("{not json").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
        assert!(err.id.is_none());
    }

    #[test]
    fn non_object_frame_is_a_parse_error() {
        let err = decode_frame("[1, 2, 3]").unwrap_err();
        assert_eq!(err.error.code, ErrorCode::ParseError.code());
    }

    #[test]
    fn missing_jsonrpc_version_salvages_id() {
        let err = decode_frame(r#"{"id": 7, "method": "ping"}"#).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::Number(7)));
    }

    #[test]
    fn wrong_jsonrpc_version_is_invalid() {
        let err = decode_frame(r#"{"jsonrpc": "1.0", "id": 1, "method": "ping"}"#).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
    }

    #[test]
    fn empty_method_is_invalid() {
        let err = decode_frame(r#"{"jsonrpc": "2.0", "id": 2, "method": ""}"#).unwrap_err();
        assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
        assert_eq!(err.id, Some(RequestId::Number(2)));
    }

    #[test]
    fn success_reply_serialises_compactly() {
        let reply =
            JsonRpcResponse::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""jsonrpc":"2.0""#));
        assert!(json.contains(r#""result":{"ok":true}"#));
    }

    #[test]
    fn error_reply_carries_code_and_message() {
        let reply = JsonRpcError::method_not_found(RequestId::Number(3), "tools/frobnicate");
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""code":-32601"#));
        assert!(json.contains("tools/frobnicate"));
    }

    #[test]
    fn error_data_attachment() {
        let data = JsonRpcErrorData::new(ErrorCode::InvalidParams, "bad field")
            .with_data(serde_json::json!({"field": "x"}));
        assert_eq!(data.data.unwrap()["field"], "x");
    }

    #[test]
    fn resource_unavailable_uses_server_error_code() {
        let reply = JsonRpcError::resource_unavailable(RequestId::Number(1), "gone");
        assert_eq!(reply.error.code, RESOURCE_UNAVAILABLE_CODE);
    }

    #[test]
    fn request_id_display() {
        assert_eq!(RequestId::Number(42).to_string(), "42");
        assert_eq!(RequestId::String("abc".to_string()).to_string(), "abc");
    }
}
