//! Typed MCP lifecycle wrapper over [`JsonRpcClient`]
//!
//! This module provides two types that represent the two phases of an MCP
//! client session:
//!
//! - [`McpProtocol`] -- an uninitialized client. Call [`McpProtocol::initialize`]
//!   to perform the JSON-RPC `initialize` / `notifications/initialized`
//!   handshake and receive an [`InitializedMcpProtocol`].
//! - [`InitializedMcpProtocol`] -- a fully negotiated session exposing
//!   `tools/list` and `tools/call` as typed async methods.
//!
//! `list_tools` follows `nextCursor` until the server stops returning one,
//! accumulating results before returning.

use std::sync::Arc;

use crate::error::{E2eError, Result};
use crate::mcp::client::JsonRpcClient;
use crate::mcp::types::{
    CallToolParams, CallToolResponse, ClientCapabilities, Implementation, InitializeParams,
    InitializeResponse, ListToolsResponse, McpTool, PaginatedParams, LATEST_PROTOCOL_VERSION,
    METHOD_INITIALIZE, METHOD_INITIALIZED, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
    SUPPORTED_PROTOCOL_VERSIONS,
};

/// Upper bound on `tools/list` pages, guarding against a server that keeps
/// returning the same cursor.
const MAX_TOOL_PAGES: usize = 100;

/// An uninitialized MCP client session.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use mcp_e2e::mcp::client::{start_read_loop, JsonRpcClient};
/// use mcp_e2e::mcp::protocol::McpProtocol;
/// use mcp_e2e::mcp::transport::http::HttpTransport;
/// use mcp_e2e::mcp::types::Implementation;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let transport = HttpTransport::new(
///         url::Url::parse("http://127.0.0.1:8080/mcp")?,
///         Duration::from_secs(30),
///     )?;
///     let client = Arc::new(JsonRpcClient::new(Arc::new(transport), Duration::from_secs(30)));
///     start_read_loop(Arc::clone(&client), CancellationToken::new());
///     let session = McpProtocol::new(client)
///         .initialize(Implementation { name: "e2e-client".into(), version: "0.1.0".into() })
///         .await?;
///     println!("{}", session.server_info().name);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct McpProtocol {
    client: Arc<JsonRpcClient>,
}

impl McpProtocol {
    /// Wrap a client whose read loop is already running.
    pub fn new(client: Arc<JsonRpcClient>) -> Self {
        Self { client }
    }

    /// Perform the MCP `initialize` / `notifications/initialized` handshake.
    ///
    /// Offers [`LATEST_PROTOCOL_VERSION`], verifies that the server's choice
    /// is in [`SUPPORTED_PROTOCOL_VERSIONS`], sends the
    /// `notifications/initialized` notification and finally tells the
    /// transport which revision was selected.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::McpProtocolVersion`] if the server selects an
    /// unsupported revision, or any error from the underlying request.
    pub async fn initialize(self, client_info: Implementation) -> Result<InitializedMcpProtocol> {
        let response: InitializeResponse = self
            .client
            .request(
                METHOD_INITIALIZE,
                InitializeParams {
                    protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
                    capabilities: ClientCapabilities::default(),
                    client_info,
                },
            )
            .await?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&response.protocol_version.as_str()) {
            return Err(E2eError::McpProtocolVersion {
                expected: SUPPORTED_PROTOCOL_VERSIONS
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                got: response.protocol_version,
            }
            .into());
        }

        self.client
            .transport()
            .protocol_negotiated(&response.protocol_version)
            .await;

        self.client
            .notify(METHOD_INITIALIZED, serde_json::json!({}))
            .await?;

        Ok(InitializedMcpProtocol {
            client: self.client,
            initialize_response: response,
        })
    }
}

/// A fully negotiated MCP client session.
#[derive(Debug)]
pub struct InitializedMcpProtocol {
    client: Arc<JsonRpcClient>,
    /// The server's response to the `initialize` request.
    pub initialize_response: InitializeResponse,
}

impl InitializedMcpProtocol {
    /// Name and version the server reported.
    pub fn server_info(&self) -> &Implementation {
        &self.initialize_response.server_info
    }

    /// Protocol revision the server selected.
    pub fn protocol_version(&self) -> &str {
        &self.initialize_response.protocol_version
    }

    /// List all tools advertised by the server, following pagination.
    ///
    /// # Errors
    ///
    /// Returns an error if any page request fails. A page whose `tools`
    /// field is missing or not an array surfaces as
    /// [`E2eError::Serialization`].
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_TOOL_PAGES {
            let resp: ListToolsResponse = self
                .client
                .request(METHOD_TOOLS_LIST, PaginatedParams { cursor })
                .await?;

            tools.extend(resp.tools);

            match resp.next_cursor {
                Some(c) if !c.is_empty() => cursor = Some(c),
                _ => return Ok(tools),
            }
        }

        tracing::warn!("tools/list still paginating after {MAX_TOOL_PAGES} pages; stopping");
        Ok(tools)
    }

    /// Invoke a named tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the server answers with a
    /// JSON-RPC error, or the result does not deserialize.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResponse> {
        self.client
            .request(
                METHOD_TOOLS_CALL,
                CallToolParams {
                    name: name.to_string(),
                    arguments,
                },
            )
            .await
    }
}
