//! Legacy HTTP+SSE transport for MCP (protocol revision `2024-11-05`)
//!
//! The client opens a long-lived `GET` with `Accept: text/event-stream`.
//! The server's first event is `event: endpoint` whose data is the URL
//! (usually relative, e.g. `/messages?sessionId=...`) that the client must
//! POST its JSON-RPC messages to. Replies never come back on the POST; they
//! arrive as `message` events on the GET stream.
//!
//! [`SseTransport::connect`] performs the GET and waits for the endpoint
//! event, so a returned transport is ready to carry the `initialize`
//! handshake.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::error::{E2eError, Result};
use crate::mcp::transport::event_stream::pump_events;
use crate::mcp::transport::Transport;

/// Legacy HTTP+SSE transport.
#[derive(Debug)]
pub struct SseTransport {
    /// Client without an overall timeout; the GET stream is long-lived.
    http_client: reqwest::Client,
    /// URL announced by the `endpoint` event.
    post_url: url::Url,
    /// Per-POST timeout.
    request_timeout: Duration,
    /// Shared receiver exposed via `receive()`.
    response_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Task reading the GET stream.
    stream_task: JoinHandle<()>,
}

impl SseTransport {
    /// Open the event stream at `stream_url` and wait for the endpoint event.
    ///
    /// # Arguments
    ///
    /// * `stream_url` - URL to open the SSE stream on.
    /// * `timeout` - Connect timeout, per-POST timeout, and the longest wait
    ///   for the `endpoint` event.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::McpTransport`] when the GET fails, the response is
    /// not a 2xx `text/event-stream`, the stream closes or stalls before the
    /// endpoint event, or the announced endpoint is unusable.
    pub async fn connect(stream_url: url::Url, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(E2eError::Http)?;

        let response = http_client
            .get(stream_url.as_str())
            .header("Accept", "text/event-stream")
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(E2eError::McpTransport(format!(
                    "SSE GET request failed: {}",
                    e
                )))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(E2eError::McpTransport(format!("SSE GET returned HTTP {}", status)).into());
        }

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !content_type.contains("text/event-stream") {
            return Err(E2eError::McpTransport(format!(
                "SSE GET returned Content-Type {:?}, expected text/event-stream",
                content_type
            ))
            .into());
        }

        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();
        let byte_stream = response.bytes_stream();

        let stream_task = tokio::spawn(async move {
            let mut endpoint_tx = Some(endpoint_tx);
            pump_events(byte_stream, |event| {
                let kind = event.kind().to_string();
                match kind.as_str() {
                    "endpoint" => {
                        if let Some(tx) = endpoint_tx.take() {
                            let _ = tx.send(event.data);
                        }
                        true
                    }
                    "message" => response_tx.send(event.data).is_ok(),
                    other => {
                        tracing::debug!("ignoring SSE event of type {other}");
                        true
                    }
                }
            })
            .await;
        });

        let endpoint = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                stream_task.abort();
                return Err(E2eError::McpTransport(
                    "SSE stream closed before the endpoint event".into(),
                )
                .into());
            }
            Err(_) => {
                stream_task.abort();
                return Err(E2eError::McpTransport(format!(
                    "no endpoint event within {:?}",
                    timeout
                ))
                .into());
            }
        };

        let post_url = match resolve_endpoint(&stream_url, &endpoint) {
            Ok(url) => url,
            Err(e) => {
                stream_task.abort();
                return Err(e);
            }
        };
        tracing::debug!("SSE endpoint for {stream_url} is {post_url}");

        Ok(Self {
            http_client,
            post_url,
            request_timeout: timeout,
            response_rx: Arc::new(Mutex::new(response_rx)),
            stream_task,
        })
    }
}

/// Resolve the `endpoint` event data against the stream URL.
///
/// The endpoint must stay on the stream's origin.
fn resolve_endpoint(stream_url: &url::Url, endpoint: &str) -> Result<url::Url> {
    let post_url = stream_url.join(endpoint.trim()).map_err(|e| {
        anyhow::anyhow!(E2eError::McpTransport(format!(
            "invalid endpoint {:?}: {}",
            endpoint, e
        )))
    })?;
    if post_url.origin() != stream_url.origin() {
        return Err(E2eError::McpTransport(format!(
            "endpoint origin {} does not match stream origin {}",
            post_url.origin().ascii_serialization(),
            stream_url.origin().ascii_serialization()
        ))
        .into());
    }
    Ok(post_url)
}

#[async_trait::async_trait]
impl Transport for SseTransport {
    /// POST the message to the announced endpoint; any 2xx is accepted and
    /// the body is ignored.
    async fn send(&self, message: String) -> Result<()> {
        let response = self
            .http_client
            .post(self.post_url.as_str())
            .timeout(self.request_timeout)
            .header("Content-Type", "application/json")
            .body(message)
            .send()
            .await
            .map_err(|e| {
                anyhow::anyhow!(E2eError::McpTransport(format!("SSE POST failed: {}", e)))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(E2eError::McpTransport(format!("SSE POST returned status {}", status)).into());
        }
        Ok(())
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.response_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    async fn close(&self) -> Result<()> {
        self.stream_task.abort();
        Ok(())
    }
}

impl Drop for SseTransport {
    fn drop(&mut self) {
        self.stream_task.abort();
    }
}
