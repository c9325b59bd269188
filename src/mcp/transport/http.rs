//! Streamable HTTP transport for MCP
//!
//! This module implements [`HttpTransport`], which speaks the Streamable
//! HTTP transport introduced in protocol revision `2025-03-26`. Every
//! outbound JSON-RPC message is sent as an HTTP POST. The server may reply
//! with:
//!
//! - `application/json` -- a direct JSON response body
//! - `text/event-stream` -- an SSE stream carrying one or more JSON-RPC
//!   messages
//! - `202 Accepted` -- an acknowledgement with no body (used for
//!   notifications)
//!
//! # Session management
//!
//! The server MAY return an `MCP-Session-Id` response header (normally on
//! the `initialize` response). When present, this value is stored and
//! attached to every subsequent POST. If the server returns `404` while a
//! session is active the session is cleared and
//! `E2eError::Mcp("mcp session expired")` is returned. [`Transport::close`]
//! issues an HTTP DELETE carrying the session id.
//!
//! # Protocol version header
//!
//! Every POST carries `MCP-Protocol-Version`. Until `initialize` completes
//! this is the offered revision; afterwards it is the revision the server
//! selected.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::error::{E2eError, Result};
use crate::mcp::transport::event_stream::pump_events;
use crate::mcp::transport::Transport;
use crate::mcp::types::LATEST_PROTOCOL_VERSION;

/// Streamable HTTP transport.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use url::Url;
/// use mcp_e2e::mcp::transport::http::HttpTransport;
///
/// let transport = HttpTransport::new(
///     Url::parse("http://127.0.0.1:8080/mcp").unwrap(),
///     Duration::from_secs(30),
/// )
/// .unwrap();
/// ```
#[derive(Debug)]
pub struct HttpTransport {
    /// Underlying reqwest HTTP client.
    http_client: reqwest::Client,
    /// MCP endpoint URL (POST target).
    endpoint: url::Url,
    /// Active session ID, populated from the first response that carries one.
    session_id: Arc<RwLock<Option<String>>>,
    /// Value of the `MCP-Protocol-Version` header.
    protocol_version: RwLock<String>,
    /// Sender for inbound JSON-RPC message strings.
    response_tx: mpsc::UnboundedSender<String>,
    /// Shared receiver exposed via `receive()`.
    response_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Last SSE event ID, sent as `Last-Event-ID` for stream resumption.
    last_event_id: Arc<RwLock<Option<String>>>,
}

impl HttpTransport {
    /// Construct a new [`HttpTransport`] targeting `endpoint`.
    ///
    /// No network I/O is performed at construction time.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - The MCP server URL (e.g. `http://host/mcp`).
    /// * `timeout` - Per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Http`] if the HTTP client cannot be built (TLS
    /// backend initialisation failure).
    pub fn new(endpoint: url::Url, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(E2eError::Http)?;

        let (response_tx, response_rx) = mpsc::unbounded_channel();

        Ok(Self {
            http_client,
            endpoint,
            session_id: Arc::new(RwLock::new(None)),
            protocol_version: RwLock::new(LATEST_PROTOCOL_VERSION.to_string()),
            response_tx,
            response_rx: Arc::new(Mutex::new(response_rx)),
            last_event_id: Arc::new(RwLock::new(None)),
        })
    }

    /// The session id assigned by the server, if any.
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    /// Send a JSON-RPC message via HTTP POST to the MCP endpoint.
    ///
    /// Response handling by status and `Content-Type`:
    ///
    /// - `202 Accepted`: no-op (notification ACK).
    /// - `text/event-stream`: SSE parsing task spawned; events pushed to
    ///   `receive()`.
    /// - anything else with 2xx: body read and pushed to `receive()`.
    /// - `404` with an active session: session cleared, `Mcp` error.
    /// - any other non-2xx: `McpTransport` error.
    async fn send(&self, message: String) -> Result<()> {
        let mut req = {
            let version = self.protocol_version.read().await;
            self.http_client
                .post(self.endpoint.as_str())
                .header("Content-Type", "application/json")
                .header("Accept", "application/json, text/event-stream")
                .header("MCP-Protocol-Version", version.as_str())
                .body(message)
        };

        if let Some(ref id) = *self.session_id.read().await {
            req = req.header("MCP-Session-Id", id.as_str());
        }
        if let Some(ref id) = *self.last_event_id.read().await {
            req = req.header("Last-Event-ID", id.as_str());
        }

        let response = req.send().await.map_err(|e| {
            anyhow::anyhow!(E2eError::McpTransport(format!("HTTP POST failed: {}", e)))
        })?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            let mut sid = self.session_id.write().await;
            if sid.take().is_some() {
                return Err(E2eError::Mcp("mcp session expired".into()).into());
            }
            return Err(E2eError::McpTransport("HTTP 404 Not Found".into()).into());
        }

        if !status.is_success() {
            return Err(E2eError::McpTransport(format!(
                "HTTP POST returned status {}",
                status
            ))
            .into());
        }

        if let Some(new_session_id) = response
            .headers()
            .get("MCP-Session-Id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
        {
            let mut sid = self.session_id.write().await;
            if sid.is_none() {
                tracing::debug!("MCP session established: {new_session_id}");
                *sid = Some(new_session_id);
            }
        }

        if status == reqwest::StatusCode::ACCEPTED {
            return Ok(());
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("text/event-stream") {
            let byte_stream = response.bytes_stream();
            let response_tx = self.response_tx.clone();
            let last_event_id = Arc::clone(&self.last_event_id);
            tokio::spawn(async move {
                let mut ids = Vec::new();
                pump_events(byte_stream, |event| {
                    if let Some(id) = event.id.clone() {
                        ids.push(id);
                    }
                    response_tx.send(event.data).is_ok()
                })
                .await;
                if let Some(id) = ids.pop() {
                    *last_event_id.write().await = Some(id);
                }
            });
        } else {
            let body = response.text().await.map_err(|e| {
                anyhow::anyhow!(E2eError::McpTransport(format!(
                    "failed to read response body: {}",
                    e
                )))
            })?;
            if !body.trim().is_empty() {
                let _ = self.response_tx.send(body);
            }
        }

        Ok(())
    }

    /// Messages are delivered in the order they are received, whether from
    /// direct JSON responses or SSE events.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.response_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    async fn protocol_negotiated(&self, version: &str) {
        *self.protocol_version.write().await = version.to_string();
    }

    /// Terminate the server-side session with an HTTP DELETE.
    ///
    /// Servers that do not support explicit termination answer `405`;
    /// any response or transport failure is only logged.
    async fn close(&self) -> Result<()> {
        let session_id = self.session_id.write().await.take();
        let Some(sid) = session_id else {
            return Ok(());
        };

        match self
            .http_client
            .delete(self.endpoint.as_str())
            .header("MCP-Session-Id", sid.as_str())
            .send()
            .await
        {
            Ok(resp) => tracing::debug!("session DELETE returned {}", resp.status()),
            Err(e) => tracing::debug!("session DELETE failed: {e}"),
        }
        Ok(())
    }
}
