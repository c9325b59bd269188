//! Transport-agnostic async JSON-RPC 2.0 client
//!
//! [`JsonRpcClient`] writes requests straight to an `Arc<dyn Transport>` and
//! correlates replies through a pending-request map. [`start_read_loop`]
//! consumes the transport's inbound stream in a background task.
//!
//! # Design
//!
//! - In-flight requests are tracked in a `pending` map keyed by `u64` request
//!   ID. Each entry is a `oneshot::Sender` that receives the `result` or
//!   `error` value when the matching response arrives.
//! - A send failure removes the pending entry and surfaces the transport
//!   error to the caller immediately, so a dead endpoint fails fast instead
//!   of waiting for the request timeout.
//! - A [`tokio_util::sync::CancellationToken`] stops the read loop cleanly and
//!   drops all pending senders so that awaiting callers receive an error.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{E2eError, Result};
use crate::mcp::transport::Transport;
use crate::mcp::types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_PING};

/// Default timeout applied to every request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The pending-response map type: maps request ID to the oneshot sender.
type PendingMap =
    HashMap<u64, oneshot::Sender<std::result::Result<serde_json::Value, JsonRpcError>>>;

/// Transport-agnostic async JSON-RPC 2.0 client.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use mcp_e2e::mcp::client::{start_read_loop, JsonRpcClient};
/// use mcp_e2e::mcp::transport::http::HttpTransport;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let transport = HttpTransport::new(
///         url::Url::parse("http://127.0.0.1:8080/mcp")?,
///         Duration::from_secs(30),
///     )?;
///     let client = Arc::new(JsonRpcClient::new(Arc::new(transport), Duration::from_secs(30)));
///     let token = CancellationToken::new();
///     let _handle = start_read_loop(Arc::clone(&client), token.clone());
///     let _pong: serde_json::Value = client.request("ping", serde_json::json!({})).await?;
///     token.cancel();
///     Ok(())
/// }
/// ```
pub struct JsonRpcClient {
    /// Monotonically increasing request ID counter.
    next_id: AtomicU64,
    /// In-flight requests waiting for a response.
    pending: Mutex<PendingMap>,
    /// Transport carrying both directions.
    transport: Arc<dyn Transport>,
    /// Deadline for each request.
    request_timeout: Duration,
}

impl std::fmt::Debug for JsonRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonRpcClient")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("transport", &self.transport)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl JsonRpcClient {
    /// Create a new client over `transport`.
    ///
    /// The caller must also call [`start_read_loop`] so that responses are
    /// dispatched.
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            transport,
            request_timeout,
        }
    }

    /// The transport this client writes to.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Send a JSON-RPC request and await the typed response.
    ///
    /// # Errors
    ///
    /// Returns the transport error if sending fails.
    /// Returns [`E2eError::McpTimeout`] if no response arrives within the timeout.
    /// Returns [`E2eError::Mcp`] if the server returns an error response.
    /// Returns [`E2eError::Serialization`] if serialization or deserialization fails.
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: serde::Serialize + Send,
        R: serde::de::DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        // Register before sending so the response can never arrive first.
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let message = serde_json::to_string(&JsonRpcRequest::new(
            Some(serde_json::json!(id)),
            method,
            Some(serde_json::to_value(params)?),
        ))?;

        tracing::debug!(method, id, "sending request");
        if let Err(e) = self.transport.send(message).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        let outcome = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(outcome) => outcome,
            Err(_) => {
                self.pending.lock().await.remove(&id);
                return Err(E2eError::McpTimeout {
                    method: method.to_string(),
                }
                .into());
            }
        };

        let rpc_result = outcome.map_err(|_| {
            E2eError::McpTransport("read loop exited before response arrived".to_string())
        })?;

        let value = rpc_result.map_err(|e| E2eError::Mcp(e.to_string()))?;

        serde_json::from_value(value).map_err(|e| E2eError::Serialization(e).into())
    }

    /// Send a JSON-RPC notification (no response expected).
    ///
    /// # Errors
    ///
    /// Returns the transport error if sending fails.
    pub async fn notify<P: serde::Serialize + Send>(&self, method: &str, params: P) -> Result<()> {
        let message = serde_json::to_string(&JsonRpcRequest::new(
            None,
            method,
            Some(serde_json::to_value(params)?),
        ))?;
        self.transport.send(message).await
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

/// Start the JSON-RPC read loop as a background Tokio task.
///
/// The loop reads serialized JSON strings from the transport, classifies
/// each message, and dispatches it:
///
/// - **Response** (has `"id"` and `"result"` or `"error"`): resolves the
///   matching pending sender.
/// - **Server-initiated request** (has `"id"` and `"method"`): `ping` is
///   answered with an empty result; anything else with `-32601`.
/// - **Notification** (has `"method"` but no `"id"`): logged and ignored.
///
/// When the loop ends (cancellation or end of stream) all pending senders
/// are dropped so that in-flight `request()` calls fail instead of waiting
/// for their timeout.
pub fn start_read_loop(
    client: Arc<JsonRpcClient>,
    cancellation: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        {
            let mut inbound = client.transport.receive();
            loop {
                tokio::select! {
                    biased;

                    _ = cancellation.cancelled() => break,

                    maybe_msg = inbound.next() => match maybe_msg {
                        Some(raw) => dispatch_message(&raw, &client).await,
                        None => {
                            tracing::debug!("MCP read loop: inbound stream ended");
                            break;
                        }
                    },
                }
            }
        }
        client.pending.lock().await.clear();
    })
}

/// Classify and dispatch a single inbound JSON string.
async fn dispatch_message(raw: &str, client: &JsonRpcClient) {
    let value: serde_json::Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!("MCP read loop: failed to parse inbound JSON: {e}");
            return;
        }
    };

    let has_id = value.get("id").is_some_and(|id| !id.is_null());
    let has_method = value.get("method").is_some();
    let has_result = value.get("result").is_some();
    let has_error = value.get("error").is_some();

    if has_id && (has_result || has_error) && !has_method {
        handle_response(value, client).await;
    } else if has_id && has_method {
        handle_server_request(value, client).await;
    } else if has_method {
        tracing::debug!(
            "MCP read loop: ignoring notification {}",
            value["method"].as_str().unwrap_or("?")
        );
    } else {
        tracing::debug!(
            "MCP read loop: received unclassifiable message; ignoring. \
             has_id={has_id} has_method={has_method} has_result={has_result} has_error={has_error}"
        );
    }
}

/// Resolve a pending request sender with the response value or error.
async fn handle_response(value: serde_json::Value, client: &JsonRpcClient) {
    let id_val = &value["id"];
    let id = match id_val
        .as_u64()
        .or_else(|| id_val.as_str().and_then(|s| s.parse::<u64>().ok()))
    {
        Some(id) => id,
        None => {
            tracing::warn!("MCP read loop: response has non-integer id: {id_val}");
            return;
        }
    };

    let Some(sender) = client.pending.lock().await.remove(&id) else {
        tracing::debug!("MCP read loop: response for unknown id {id}");
        return;
    };

    let outcome = match value.get("error") {
        Some(err) => Err(
            serde_json::from_value::<JsonRpcError>(err.clone()).unwrap_or_else(|_| JsonRpcError {
                code: -32603,
                message: err.to_string(),
                data: None,
            }),
        ),
        None => Ok(value.get("result").cloned().unwrap_or(serde_json::Value::Null)),
    };

    // The caller may have timed out and dropped the receiver.
    let _ = sender.send(outcome);
}

/// Answer a server-initiated request.
async fn handle_server_request(value: serde_json::Value, client: &JsonRpcClient) {
    let method = value["method"].as_str().unwrap_or_default();
    let response = if method == METHOD_PING {
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: value["id"].clone(),
            result: Some(serde_json::json!({})),
            error: None,
        }
    } else {
        tracing::debug!("MCP read loop: no handler for server request {method}");
        JsonRpcResponse {
            jsonrpc: "2.0".to_string(),
            id: value["id"].clone(),
            result: None,
            error: Some(JsonRpcError::method_not_found(method)),
        }
    };

    let serialized = match serde_json::to_string(&response) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("MCP read loop: failed to serialize reply: {e}");
            return;
        }
    };
    if let Err(e) = client.transport.send(serialized).await {
        tracing::warn!("MCP read loop: failed to answer {method}: {e}");
    }
}
