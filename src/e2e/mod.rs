//! End-to-end scenario orchestration
//!
//! The pieces here only talk to an MCP server through two seams:
//! [`Connector`] opens a session over a given transport, and
//! [`ToolSession`] lists and calls tools on it. [`McpConnector`] is the
//! production implementation backed by [`crate::mcp`]; tests substitute
//! scripted fakes.
//!
//! - `targets`   -- resolve the list of endpoints to check
//! - `negotiate` -- Streamable HTTP with retries, then legacy SSE candidates
//! - `catalog`   -- `tools/list` and the `[ok]` report line
//! - `invoke`    -- canonical arguments, text extraction and preview
//! - `scenario`  -- one full check against one target, always closing
//! - `runner`    -- every target in order, stopping at the first failure

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::mcp::client::DEFAULT_REQUEST_TIMEOUT;
use crate::mcp::transport::http::HttpTransport;
use crate::mcp::transport::sse::SseTransport;
use crate::mcp::types::{CallToolResponse, Implementation, McpTool};
use crate::mcp::{McpSession, TransportKind};

pub mod catalog;
pub mod invoke;
pub mod negotiate;
pub mod runner;
pub mod scenario;
pub mod targets;

pub use negotiate::{negotiate, Connected, NegotiationPolicy};
pub use runner::run_targets;
pub use scenario::{run_scenario, ScenarioSettings};
pub use targets::resolve_targets;

/// Client name sent in `initialize`.
pub const CLIENT_NAME: &str = "e2e-client";

/// Identity this runner announces to servers.
pub fn client_info() -> Implementation {
    Implementation {
        name: CLIENT_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// An open, initialized connection that can list and call tools.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// All advertised tools, in server order.
    async fn list_tools(&self) -> Result<Vec<McpTool>>;

    /// Invoke `name` with `arguments`.
    async fn call_tool(&self, name: &str, arguments: serde_json::Value)
        -> Result<CallToolResponse>;

    /// Release the connection.
    async fn close(&mut self) -> Result<()>;
}

/// Opens sessions over a specific transport.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Session type produced on success.
    type Session: ToolSession;

    /// Open the transport to `url` and complete the handshake.
    ///
    /// A connection that opens but fails `initialize` is an error.
    async fn connect(&self, kind: TransportKind, url: &url::Url) -> Result<Self::Session>;
}

#[async_trait]
impl ToolSession for McpSession {
    async fn list_tools(&self) -> Result<Vec<McpTool>> {
        McpSession::list_tools(self).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResponse> {
        McpSession::call_tool(self, name, arguments).await
    }

    async fn close(&mut self) -> Result<()> {
        McpSession::close(self).await
    }
}

/// [`Connector`] backed by the real HTTP transports.
#[derive(Debug, Clone)]
pub struct McpConnector {
    request_timeout: Duration,
    client_info: Implementation,
}

impl McpConnector {
    /// Create a connector whose requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            request_timeout,
            client_info: client_info(),
        }
    }
}

impl Default for McpConnector {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

#[async_trait]
impl Connector for McpConnector {
    type Session = McpSession;

    async fn connect(&self, kind: TransportKind, url: &url::Url) -> Result<McpSession> {
        let transport: Arc<dyn crate::mcp::transport::Transport> = match kind {
            TransportKind::StreamableHttp => {
                Arc::new(HttpTransport::new(url.clone(), self.request_timeout)?)
            }
            TransportKind::Sse => {
                Arc::new(SseTransport::connect(url.clone(), self.request_timeout).await?)
            }
        };

        McpSession::establish(
            transport,
            kind,
            url.clone(),
            self.client_info.clone(),
            self.request_timeout,
        )
        .await
    }
}
