//! MCP protocol implementation: wire envelope, framing, and the dispatcher.
//!
//! - [`protocol`] — JSON-RPC 2.0 message types and frame decoding
//! - [`transport`] — newline-delimited JSON framing over a byte stream
//! - [`server`] — lifecycle, dispatch, and the serialised message loop

pub mod protocol;
pub mod server;
pub mod transport;
