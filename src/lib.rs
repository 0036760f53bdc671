//! toolhost-mcp: an embeddable MCP tool-invocation server core.
//!
//! A process that accepts JSON-RPC requests over a framed byte stream,
//! advertises a set of named operations with typed argument schemas,
//! validates and dispatches calls to handler functions, and returns
//! structured results. The handler bodies are supplied by the embedding
//! application; this crate is the server core around them.
//!
//! # Architecture
//!
//! - **Transport framer** ([`mcp::transport`]): newline-delimited JSON over
//!   stdio or any async byte stream, with no knowledge of message semantics
//! - **Schema registry** ([`registry`]): the static, registration-ordered
//!   catalog of tool and resource descriptors, each bound to its handler
//! - **Dispatcher** ([`mcp::server`]): the serialised message loop —
//!   decode, validate, invoke, reply; one request to completion at a time
//! - **Session state** ([`session`]): the single mutable context shared by
//!   all handlers across calls, with release hooks for held resources
//! - **Handler surface** ([`handler`]): the signatures embedders implement
//!   and the tagged success/failure result type
//!
//! Protocol faults are answered in-band and never crash the server; only a
//! transport I/O fault ends the loop.
//!
//! # Modules
//!
//! - [`builtin`] — memory tools and status resource served by the binary
//! - [`config`] — configuration loading and validation
//! - [`error`] — configuration error types
//! - [`handler`] — handler signatures and invocation results
//! - [`mcp`] — protocol, transport, and dispatcher
//! - [`registry`] — descriptors, validation, and the capability catalog
//! - [`session`] — session-scoped shared state

pub mod builtin;
pub mod config;
pub mod error;
pub mod handler;
pub mod mcp;
pub mod registry;
pub mod session;
