//! Handler surface: the signatures tool and resource implementations plug
//! into, and the tagged result type the dispatcher encodes onto the wire.
//!
//! The server core never knows what a handler does internally (open a
//! browser, write a memory record, run a subprocess). It only sees:
//!
//! - a [`ToolHandler`]: `(ValidatedArguments, &mut SessionState)` to a list
//!   of [`ContentBlock`]s or a [`HandlerFault`]
//! - a [`ResourceReader`]: `&SessionState` to text content or a fault
//!
//! Success and failure are both carried by [`InvocationResult`] — failure is
//! part of the signature, not a side channel, and a failing handler never
//! takes down the server.

use std::future::Future;
use std::pin::Pin;

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde_json::{json, Value};
use thiserror::Error;

use crate::registry::validate::ValidatedArguments;
use crate::session::SessionState;

/// An error returned by a tool handler or resource reader.
///
/// Faults are caught at the dispatch boundary and converted into a
/// [`InvocationResult::Failure`] reply for that single call.
#[derive(Error, Debug)]
pub enum HandlerFault {
    /// The handler failed with a descriptive message.
    #[error("{0}")]
    Failed(String),

    /// An I/O operation inside the handler failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialisation inside the handler failed.
    #[error("serialisation error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HandlerFault {
    /// Creates a fault from a descriptive message.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// A single block of content returned by a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    /// UTF-8 text content.
    Text {
        /// The text payload.
        text: String,
    },
    /// Binary content, base64-encoded on the wire.
    Binary {
        /// The raw bytes.
        data: Vec<u8>,
        /// MIME type of the payload.
        mime_type: String,
    },
}

impl ContentBlock {
    /// Creates a text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates a binary block with the given MIME type.
    #[must_use]
    pub fn binary(data: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self::Binary {
            data,
            mime_type: mime_type.into(),
        }
    }

    /// Renders this block as an MCP content object.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Text { text } => json!({"type": "text", "text": text}),
            Self::Binary { data, mime_type } => json!({
                "type": "blob",
                "data": BASE64_STANDARD.encode(data),
                "mimeType": mime_type,
            }),
        }
    }
}

/// Classification of a failed invocation.
///
/// Every kind except `Parse` originates after the envelope was decoded; all
/// of them are recovered locally and surface as structured reply payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request envelope could not be decoded.
    Parse,
    /// No tool is registered under the requested name.
    UnknownTool,
    /// Arguments did not conform to the tool's schema.
    InvalidArguments,
    /// The handler itself returned a fault.
    Handler,
    /// The requested resource could not be read.
    ResourceUnavailable,
    /// The handler exceeded the configured per-call timeout.
    Timeout,
}

impl FailureKind {
    /// Wire identifier for this failure kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse_error",
            Self::UnknownTool => "unknown_tool",
            Self::InvalidArguments => "invalid_arguments",
            Self::Handler => "handler_error",
            Self::ResourceUnavailable => "resource_unavailable",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of one tool invocation. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationResult {
    /// The tool completed and produced content.
    Success {
        /// Ordered content blocks.
        content: Vec<ContentBlock>,
    },
    /// The call failed; the server keeps running.
    Failure {
        /// Classification of the failure.
        kind: FailureKind,
        /// Human-readable detail.
        message: String,
    },
}

impl InvocationResult {
    /// Creates a success result with a single text block.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Success {
            content: vec![ContentBlock::text(text)],
        }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` for the failure variant.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Renders this result as an MCP `tools/call` result object.
    ///
    /// Failures carry both the MCP `isError` convention and a structured
    /// `error` object so callers can branch on the kind without parsing
    /// message text.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Success { content } => json!({
                "content": content.iter().map(ContentBlock::to_wire).collect::<Vec<_>>(),
            }),
            Self::Failure { kind, message } => json!({
                "content": [ContentBlock::text(message.clone()).to_wire()],
                "isError": true,
                "error": {"kind": kind.as_str(), "message": message},
            }),
        }
    }
}

/// The future a tool handler returns; borrows the session for its duration.
pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ContentBlock>, HandlerFault>> + Send + 'a>>;

/// A boxed tool handler.
///
/// Receives arguments already validated against the tool's schema and a
/// mutable borrow of the session state. The borrow ends with the returned
/// future; handlers must not stash session references anywhere else.
pub type ToolHandler =
    Box<dyn for<'a> Fn(ValidatedArguments, &'a mut SessionState) -> HandlerFuture<'a> + Send + Sync>;

/// A boxed resource reader. May consult the session state but not mutate it.
pub type ResourceReader =
    Box<dyn Fn(&SessionState) -> Result<String, HandlerFault> + Send + Sync>;

/// Wraps a session-independent async closure as a [`ToolHandler`].
///
/// For handlers that perform their own I/O but keep nothing in the session.
/// Handlers that borrow the session across an await point implement the
/// [`ToolHandler`] signature directly.
pub fn async_handler<F, Fut>(f: F) -> ToolHandler
where
    F: Fn(ValidatedArguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<ContentBlock>, HandlerFault>> + Send + 'static,
{
    Box::new(move |args, _session| Box::pin(f(args)))
}

/// Wraps a synchronous closure as a [`ToolHandler`].
///
/// Convenient for handlers that do no I/O of their own.
pub fn sync_handler<F>(f: F) -> ToolHandler
where
    F: Fn(ValidatedArguments, &mut SessionState) -> Result<Vec<ContentBlock>, HandlerFault>
        + Send
        + Sync
        + 'static,
{
    Box::new(move |args, session| {
        let outcome = f(args, session);
        Box::pin(async move { outcome })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_block_wire_shape() {
        let wire = ContentBlock::text("hello").to_wire();
        assert_eq!(wire, json!({"type": "text", "text": "hello"}));
    }

    #[test]
    fn binary_block_is_base64_encoded() {
        let wire = ContentBlock::binary(vec![0xDE, 0xAD, 0xBE, 0xEF], "image/png").to_wire();
        assert_eq!(wire["type"], "blob");
        assert_eq!(wire["mimeType"], "image/png");
        assert_eq!(wire["data"], "3q2+7w==");
    }

    #[test]
    fn success_wire_has_no_error_marker() {
        let wire = InvocationResult::text("ok").to_wire();
        assert!(wire.get("isError").is_none());
        assert!(wire.get("error").is_none());
        assert_eq!(wire["content"][0]["text"], "ok");
    }

    #[test]
    fn failure_wire_carries_kind_and_message() {
        let wire = InvocationResult::failure(FailureKind::UnknownTool, "no such tool").to_wire();
        assert_eq!(wire["isError"], true);
        assert_eq!(wire["error"]["kind"], "unknown_tool");
        assert_eq!(wire["error"]["message"], "no such tool");
        assert_eq!(wire["content"][0]["text"], "no such tool");
    }

    #[test]
    fn failure_kind_wire_names() {
        assert_eq!(FailureKind::Parse.as_str(), "parse_error");
        assert_eq!(FailureKind::InvalidArguments.as_str(), "invalid_arguments");
        assert_eq!(FailureKind::Timeout.to_string(), "timeout");
    }
}
