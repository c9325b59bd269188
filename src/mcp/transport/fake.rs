//! In-process fake transport for MCP unit tests
//!
//! [`FakeTransport::new`] returns a `(FakeTransport, FakeTransportHandle)`
//! pair. Wire the [`FakeTransport`] into the code under test; from the test
//! side, use the handle to:
//!
//! - Read what the client sent: `handle.outbound_rx.recv().await`
//! - Inject server responses: `handle.inbound_tx.send(json_string)`
//!
//! [`FakeTransportHandle::serve`] turns the handle into a scripted server
//! that answers each request through a closure.
//!
//! ```text
//! client send() -----> outbound_tx -----> outbound_rx (handle reads)
//! handle inbound_tx -> inbound_tx  -----> inbound_rx  (client receive())
//! ```

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::Stream;
use tokio::sync::{mpsc, Mutex};

use crate::error::{E2eError, Result};
use crate::mcp::transport::Transport;
use crate::mcp::types::JsonRpcRequest;

/// In-process fake transport for use in tests.
#[derive(Debug)]
pub struct FakeTransport {
    /// What the client writes goes here; the handle drains it.
    outbound_tx: mpsc::UnboundedSender<String>,
    /// Populated by the handle's `inbound_tx`; exposed via `receive()`.
    inbound_rx: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
    /// Number of `close()` calls observed.
    close_calls: Arc<AtomicUsize>,
    /// Last version passed to `protocol_negotiated`.
    negotiated: Arc<std::sync::Mutex<Option<String>>>,
}

impl FakeTransport {
    /// Create a new `(FakeTransport, FakeTransportHandle)` pair.
    pub fn new() -> (Self, FakeTransportHandle) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();
        let close_calls = Arc::new(AtomicUsize::new(0));
        let negotiated = Arc::new(std::sync::Mutex::new(None));

        let transport = Self {
            outbound_tx,
            inbound_rx: Arc::new(Mutex::new(inbound_rx)),
            close_calls: Arc::clone(&close_calls),
            negotiated: Arc::clone(&negotiated),
        };

        let handle = FakeTransportHandle {
            outbound_rx,
            inbound_tx,
            close_calls,
            negotiated,
        };

        (transport, handle)
    }
}

/// The test-side handle for a [`FakeTransport`].
#[derive(Debug)]
pub struct FakeTransportHandle {
    /// Receives messages that the client sent via [`Transport::send`].
    pub outbound_rx: mpsc::UnboundedReceiver<String>,
    /// Sends server messages into the client's [`Transport::receive`] stream.
    pub inbound_tx: mpsc::UnboundedSender<String>,
    close_calls: Arc<AtomicUsize>,
    negotiated: Arc<std::sync::Mutex<Option<String>>>,
}

impl FakeTransportHandle {
    /// How many times the transport was closed.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Protocol version reported through `protocol_negotiated`.
    pub fn negotiated_version(&self) -> Option<String> {
        self.negotiated.lock().ok().and_then(|g| g.clone())
    }

    /// Answer every inbound request with `respond`.
    ///
    /// `respond` returns the `result` value for a request, or `Err` with a
    /// JSON-RPC error message. Notifications are ignored. The spawned task
    /// ends when the client side is dropped.
    pub fn serve<F>(self, respond: F) -> Arc<FakeTransportHandleStats>
    where
        F: Fn(&JsonRpcRequest) -> std::result::Result<serde_json::Value, String>
            + Send
            + 'static,
    {
        let stats = Arc::new(FakeTransportHandleStats {
            close_calls: Arc::clone(&self.close_calls),
            negotiated: Arc::clone(&self.negotiated),
            requests: std::sync::Mutex::new(Vec::new()),
        });
        let task_stats = Arc::clone(&stats);
        let FakeTransportHandle {
            mut outbound_rx,
            inbound_tx,
            ..
        } = self;

        tokio::spawn(async move {
            while let Some(raw) = outbound_rx.recv().await {
                let Ok(req) = serde_json::from_str::<JsonRpcRequest>(&raw) else {
                    continue;
                };
                if let Ok(mut seen) = task_stats.requests.lock() {
                    seen.push(req.clone());
                }
                let Some(id) = req.id.clone() else {
                    continue;
                };
                let reply = match respond(&req) {
                    Ok(result) => serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                    Err(message) => serde_json::json!({
                        "jsonrpc": "2.0",
                        "id": id,
                        "error": { "code": -32603, "message": message }
                    }),
                };
                if inbound_tx.send(reply.to_string()).is_err() {
                    break;
                }
            }
        });

        stats
    }
}

/// Observations collected by [`FakeTransportHandle::serve`].
#[derive(Debug)]
pub struct FakeTransportHandleStats {
    close_calls: Arc<AtomicUsize>,
    negotiated: Arc<std::sync::Mutex<Option<String>>>,
    requests: std::sync::Mutex<Vec<JsonRpcRequest>>,
}

impl FakeTransportHandleStats {
    /// How many times the transport was closed.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Protocol version reported through `protocol_negotiated`.
    pub fn negotiated_version(&self) -> Option<String> {
        self.negotiated.lock().ok().and_then(|g| g.clone())
    }

    /// Methods received so far, in arrival order (notifications included).
    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.iter().map(|req| req.method.clone()).collect())
            .unwrap_or_default()
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<JsonRpcRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn send(&self, message: String) -> Result<()> {
        self.outbound_tx.send(message).map_err(|e| {
            anyhow::anyhow!(E2eError::McpTransport(format!(
                "FakeTransport outbound channel closed: {}",
                e
            )))
        })
    }

    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>> {
        let rx = Arc::clone(&self.inbound_rx);
        Box::pin(futures::stream::unfold(rx, |rx| async move {
            let mut guard = rx.lock().await;
            let item = guard.recv().await?;
            drop(guard);
            Some((item, rx))
        }))
    }

    async fn protocol_negotiated(&self, version: &str) {
        if let Ok(mut guard) = self.negotiated.lock() {
            *guard = Some(version.to_string());
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use futures::StreamExt;

    #[tokio::test]
    async fn test_send_delivers_to_handle_outbound_rx() {
        let (transport, mut handle) = FakeTransport::new();

        transport
            .send(r#"{"jsonrpc":"2.0","method":"ping"}"#.to_string())
            .await
            .unwrap();

        let received = tokio::time::timeout(Duration::from_secs(2), handle.outbound_rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");

        assert_eq!(received, r#"{"jsonrpc":"2.0","method":"ping"}"#);
    }

    #[tokio::test]
    async fn test_receive_yields_message_from_handle_inbound_tx() {
        let (transport, handle) = FakeTransport::new();

        handle
            .inbound_tx
            .send(r#"{"jsonrpc":"2.0","id":1,"result":{}}"#.to_string())
            .unwrap();

        let mut stream = transport.receive();
        let msg = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out")
            .expect("stream ended");

        assert_eq!(msg, r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
    }

    #[tokio::test]
    async fn test_send_returns_error_when_handle_dropped() {
        let (transport, handle) = FakeTransport::new();
        drop(handle);

        let result = transport.send("test".to_string()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_close_is_counted() {
        let (transport, handle) = FakeTransport::new();
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        assert_eq!(handle.close_calls(), 2);
    }

    #[tokio::test]
    async fn test_serve_answers_requests_and_skips_notifications() {
        let (transport, handle) = FakeTransport::new();
        let stats = handle.serve(|req| Ok(serde_json::json!({ "echo": req.method })));

        transport
            .send(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_string())
            .await
            .unwrap();
        transport
            .send(r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#.to_string())
            .await
            .unwrap();

        let mut stream = transport.receive();
        let msg = tokio::time::timeout(Duration::from_secs(2), stream.next())
            .await
            .expect("timed out")
            .expect("stream ended");
        let v: serde_json::Value = serde_json::from_str(&msg).unwrap();
        assert_eq!(v["id"], 7);
        assert_eq!(v["result"]["echo"], "ping");
        assert_eq!(stats.methods(), vec!["notifications/initialized", "ping"]);
    }

    #[test]
    fn test_fake_transport_is_object_safe() {
        let (transport, _handle) = FakeTransport::new();
        let _boxed: Box<dyn Transport> = Box::new(transport);
    }
}
