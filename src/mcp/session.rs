//! A connected MCP client
//!
//! [`McpSession::establish`] wires a transport to a [`JsonRpcClient`], starts
//! the read loop and runs the `initialize` handshake. The session owns all of
//! it and releases everything in [`McpSession::close`].

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::mcp::client::{start_read_loop, JsonRpcClient};
use crate::mcp::protocol::{InitializedMcpProtocol, McpProtocol};
use crate::mcp::transport::{Transport, TransportKind};
use crate::mcp::types::{CallToolResponse, Implementation, McpTool};

/// An initialized connection to one MCP endpoint.
#[derive(Debug)]
pub struct McpSession {
    protocol: InitializedMcpProtocol,
    transport: Arc<dyn Transport>,
    cancellation: CancellationToken,
    read_loop: JoinHandle<()>,
    closed: bool,
}

impl McpSession {
    /// Start the read loop on `transport` and perform the handshake.
    ///
    /// On failure the read loop is stopped and the transport closed before
    /// the error is returned, so a failed attempt leaves nothing running.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `initialize`.
    pub async fn establish(
        transport: Arc<dyn Transport>,
        kind: TransportKind,
        url: url::Url,
        client_info: Implementation,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = Arc::new(JsonRpcClient::new(Arc::clone(&transport), request_timeout));
        let cancellation = CancellationToken::new();
        let read_loop = start_read_loop(Arc::clone(&client), cancellation.clone());

        match McpProtocol::new(client).initialize(client_info).await {
            Ok(protocol) => {
                tracing::debug!(
                    server = %protocol.server_info().name,
                    version = protocol.protocol_version(),
                    "{kind} session initialized on {url}"
                );
                Ok(Self {
                    protocol,
                    transport,
                    cancellation,
                    read_loop,
                    closed: false,
                })
            }
            Err(e) => {
                cancellation.cancel();
                read_loop.abort();
                if let Err(close_err) = transport.close().await {
                    tracing::debug!("closing failed {kind} attempt on {url}: {close_err}");
                }
                Err(e)
            }
        }
    }

    /// See [`InitializedMcpProtocol::list_tools`].
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        self.protocol.list_tools().await
    }

    /// See [`InitializedMcpProtocol::call_tool`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResponse> {
        self.protocol.call_tool(name, arguments).await
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Stop the read loop and release the transport.
    ///
    /// Only the first call does any work.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.cancellation.cancel();
        self.read_loop.abort();
        self.transport.close().await
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        self.cancellation.cancel();
        self.read_loop.abort();
    }
}
