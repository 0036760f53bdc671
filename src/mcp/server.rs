//! The dispatcher: lifecycle management and the serialised message loop.
//!
//! One [`McpServer`] owns the transport, the capability registry, and the
//! session state. The loop reads one frame, dispatches it to completion
//! (including any blocking handler work), writes the reply, then reads the
//! next frame — strictly serialised, which is what makes the single shared
//! [`SessionState`] safe without locking. Long-running handlers block the
//! loop for their duration; the optional per-call timeout bounds how long.
//!
//! # Lifecycle
//!
//! 1. **Initialisation**: capability negotiation and version agreement
//! 2. **Operation**: tool calls, discovery, resource reads
//! 3. **Shutdown**: clean EOF, SIGINT/SIGTERM, releasing session resources
//!
//! Every fault except a transport I/O error is converted into a reply and
//! the loop continues; a single bad call never takes the server down.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use uuid::Uuid;

use crate::handler::{FailureKind, InvocationResult};
use crate::mcp::protocol::{
    decode_frame, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION,
};
use crate::mcp::transport::{StdioTransport, Transport};
use crate::registry::{validate, Registry, UnknownFieldPolicy};
use crate::session::SessionState;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for the initialize request.
    AwaitingInit,
    /// Initialize received, waiting for the initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Dispatcher behaviour knobs, fixed for the process lifetime.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Name advertised in the initialize reply.
    pub server_name: String,
    /// What to do with argument fields a tool's schema does not declare.
    pub unknown_fields: UnknownFieldPolicy,
    /// Upper bound on one tool call; `None` disables the limit.
    pub call_timeout: Option<Duration>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            server_name: env!("CARGO_PKG_NAME").to_string(),
            unknown_fields: UnknownFieldPolicy::Ignore,
            call_timeout: None,
        }
    }
}

/// Optional protocol features, negotiated once at startup.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
    /// Resource-related capabilities; absent when no resources are registered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,
}

impl ServerCapabilities {
    /// Computes the capability set from the registry contents.
    #[must_use]
    pub fn for_registry(registry: &Registry) -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
            resources: registry
                .has_resources()
                .then(ResourceCapabilities::default),
        }
    }
}

/// Tool capability flags.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session. It cannot: the
    /// registry is read-only once the loop starts.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Resource capability flags.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceCapabilities {
    /// Whether the resource list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters of the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    pub protocol_version: String,
    /// Client capabilities (unused by this server).
    #[serde(default)]
    pub capabilities: Value,
    /// Client identity.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters of a tools/call request.
#[derive(Debug, Clone, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Parameters of a resources/read request.
#[derive(Debug, Clone, Deserialize)]
struct ResourceReadParams {
    uri: String,
}

/// A tool-invocation server over one framed byte stream.
pub struct McpServer<R, W> {
    state: ServerState,
    transport: Transport<R, W>,
    registry: Registry,
    session: SessionState,
    options: DispatchOptions,
    capabilities: ServerCapabilities,
    protocol_version: Option<String>,
    session_id: Uuid,
}

impl McpServer<tokio::io::Stdin, tokio::io::Stdout> {
    /// Creates a server over this process's stdin and stdout.
    #[must_use]
    pub fn stdio(registry: Registry, options: DispatchOptions) -> Self {
        Self::new(StdioTransport::stdio(), registry, options)
    }
}

impl<R, W> McpServer<R, W>
where
    R: tokio::io::AsyncRead + Unpin,
    W: tokio::io::AsyncWrite + Unpin,
{
    /// Creates a server over an arbitrary transport.
    ///
    /// The capability set is computed here, from the registry contents, and
    /// never changes afterwards.
    #[must_use]
    pub fn new(transport: Transport<R, W>, registry: Registry, options: DispatchOptions) -> Self {
        let capabilities = ServerCapabilities::for_registry(&registry);
        Self {
            state: ServerState::AwaitingInit,
            transport,
            registry,
            session: SessionState::new(),
            options,
            capabilities,
            protocol_version: None,
            session_id: Uuid::new_v4(),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Mutable access to the session, for embedders seeding state before
    /// the loop starts. Once `run` is called, only handlers touch this.
    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    /// The protocol version agreed during initialisation, if any yet.
    #[must_use]
    pub fn negotiated_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Runs the message loop until EOF, a signal, or a transport fault.
    ///
    /// # Errors
    ///
    /// Returns an error only for transport I/O faults; every protocol-level
    /// fault is answered in-band and the loop continues.
    pub async fn run(&mut self) -> std::io::Result<()> {
        tracing::info!(
            session = %self.session_id,
            tools = self.registry.tool_count(),
            resources = self.registry.resource_count(),
            "server ready"
        );
        let result = self.run_with_shutdown().await;
        self.shutdown();
        result
    }

    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("received SIGINT, shutting down");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("received SIGTERM, shutting down");
                    return Ok(());
                }

                frame = self.transport.read_frame() => {
                    if self.handle_frame_result(frame).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("received Ctrl+C, shutting down");
                    return Ok(());
                }

                frame = self.transport.read_frame() => {
                    if self.handle_frame_result(frame).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Releases session resources and marks the server stopped.
    fn shutdown(&mut self) {
        self.state = ServerState::ShuttingDown;
        self.session.clear();
    }

    /// Handles one read result. Returns `true` when the loop should stop.
    async fn handle_frame_result(
        &mut self,
        frame: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(frame) = frame? else {
            tracing::info!("transport reached end of stream");
            return Ok(true);
        };

        if frame.trim().is_empty() {
            return Ok(false);
        }

        match decode_frame(&frame) {
            Ok(message) => self.handle_message(message).await?,
            Err(error) => self.transport.write_error(&error).await?,
        }

        Ok(self.state == ServerState::ShuttingDown)
    }

    async fn handle_message(&mut self, message: IncomingMessage) -> std::io::Result<()> {
        match message {
            IncomingMessage::Request(req) => self.handle_request(req).await,
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                Ok(())
            }
        }
    }

    async fn handle_request(&mut self, req: JsonRpcRequest) -> std::io::Result<()> {
        tracing::debug!(id = %req.id, method = %req.method, "dispatching request");

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "ping" => Ok(Self::handle_ping(&req)),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req).await,
            "resources/list" => self.handle_resources_list(&req),
            "resources/read" => self.handle_resources_read(&req),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(reply) => self.transport.write_response(&reply).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            self.state = ServerState::Running;
            tracing::debug!("client completed initialisation");
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(req.id.clone()),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = Self::require_params(req, "initialize")?;

        if let Some(ref client) = params.client_info {
            tracing::info!(
                client = %client.name,
                client_version = client.version.as_deref().unwrap_or("unknown"),
                requested_protocol = %params.protocol_version,
                "client connected"
            );
        }

        self.protocol_version = Some(MCP_PROTOCOL_VERSION.to_string());
        self.state = ServerState::Initialising;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": self.capabilities,
                "serverInfo": {
                    "name": self.options.server_name,
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        ))
    }

    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let tools: Vec<Value> = self.registry.tools().map(|tool| tool.to_wire()).collect();
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({"tools": tools}),
        ))
    }

    async fn handle_tools_call(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = Self::require_params(req, "tool call")?;
        let outcome = self.invoke_tool(&params.name, &params.arguments).await;

        if let InvocationResult::Failure { kind, ref message } = outcome {
            tracing::warn!(tool = %params.name, %kind, message, "tool call failed");
        }

        Ok(JsonRpcResponse::success(req.id.clone(), outcome.to_wire()))
    }

    /// Runs one tool call: lookup, validation, handler invocation under the
    /// configured timeout. Every fault is folded into the result; the
    /// session survives regardless of the outcome.
    async fn invoke_tool(&mut self, name: &str, arguments: &Value) -> InvocationResult {
        let Some(tool) = self.registry.lookup_tool(name) else {
            return InvocationResult::failure(
                FailureKind::UnknownTool,
                format!("Unknown tool: {name}"),
            );
        };

        let validated = match validate(
            &tool.descriptor.schema,
            arguments,
            self.options.unknown_fields,
        ) {
            Ok(validated) => validated,
            Err(violation) => {
                return InvocationResult::failure(
                    FailureKind::InvalidArguments,
                    violation.to_string(),
                )
            }
        };

        let invocation = (tool.handler)(validated, &mut self.session);
        let result = match self.options.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, invocation).await {
                Ok(result) => result,
                Err(_) => {
                    return InvocationResult::failure(
                        FailureKind::Timeout,
                        format!("tool `{name}` exceeded the {limit:?} call timeout"),
                    )
                }
            },
            None => invocation.await,
        };

        match result {
            Ok(content) => InvocationResult::Success { content },
            Err(fault) => InvocationResult::failure(FailureKind::Handler, fault.to_string()),
        }
    }

    fn handle_resources_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let resources: Vec<Value> = self
            .registry
            .resources()
            .map(|resource| resource.to_wire())
            .collect();
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({"resources": resources}),
        ))
    }

    fn handle_resources_read(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ResourceReadParams = Self::require_params(req, "resource read")?;

        let Some(resource) = self.registry.lookup_resource(&params.uri) else {
            return Err(JsonRpcError::resource_unavailable(
                req.id.clone(),
                format!("Resource not found: {}", params.uri),
            ));
        };

        let text = (resource.reader)(&self.session).map_err(|fault| {
            tracing::warn!(uri = %params.uri, error = %fault, "resource read failed");
            JsonRpcError::resource_unavailable(
                req.id.clone(),
                format!("Resource unavailable: {}", params.uri),
            )
        })?;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "contents": [{
                    "uri": resource.descriptor.uri,
                    "mimeType": resource.descriptor.mime_type,
                    "text": text,
                }],
            }),
        ))
    }

    /// Deserialises request params, rejecting absent or ill-typed ones.
    fn require_params<T: serde::de::DeserializeOwned>(
        req: &JsonRpcRequest,
        what: &str,
    ) -> Result<T, JsonRpcError> {
        req.params
            .as_ref()
            .map(|params| serde_json::from_value(params.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(req.id.clone(), format!("Invalid {what} params: {e}"))
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), format!("Missing {what} params"))
            })
    }

    /// Discovery and invocation are gated on a completed initialisation.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::invalid_request(
                Some(id.clone()),
                "Server not initialised",
            ));
        }
        Ok(())
    }
}
