//! MCP transport abstraction and implementations
//!
//! This module defines the [`Transport`] trait that all MCP transport
//! implementations must satisfy. Concrete implementations live in
//! submodules:
//!
//! - [`http::HttpTransport`] -- Streamable HTTP transport: every message is
//!   a POST, replies come back as JSON or as an SSE stream.
//! - [`sse::SseTransport`] -- legacy HTTP+SSE transport: a long-lived GET
//!   stream carries replies, messages are POSTed to the endpoint the stream
//!   announces.
//! - [`fake::FakeTransport`] -- in-process fake used in tests (cfg(test)
//!   only).
//!
//! Both HTTP transports share the SSE framing in [`event_stream`].
//!
//! # Design
//!
//! Callers `send` a serialized JSON-RPC string and `receive` a stream of
//! serialized JSON-RPC strings (one per logical message). Framing and
//! session headers are the responsibility of each concrete implementation.

use std::fmt;
use std::pin::Pin;

use futures::Stream;

use crate::error::Result;

/// Which binding a connection was established over.
///
/// # Examples
///
/// ```
/// use mcp_e2e::mcp::transport::TransportKind;
///
/// assert_eq!(TransportKind::StreamableHttp.to_string(), "Streamable HTTP");
/// assert_eq!(TransportKind::Sse.label(), "sse");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Streamable HTTP (protocol revision `2025-03-26` and later).
    StreamableHttp,
    /// Legacy HTTP+SSE (protocol revision `2024-11-05`).
    Sse,
}

impl TransportKind {
    /// Short lowercase label used in console output.
    pub fn label(self) -> &'static str {
        match self {
            TransportKind::StreamableHttp => "streamable",
            TransportKind::Sse => "sse",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::StreamableHttp => write!(f, "Streamable HTTP"),
            TransportKind::Sse => write!(f, "SSE"),
        }
    }
}

/// Abstraction over MCP transport implementations.
///
/// All methods are `async` or return pinned [`Stream`]s so that transport
/// implementations can drive I/O without blocking the Tokio executor.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    /// Send a complete JSON-RPC message string to the remote peer.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::E2eError::McpTransport`] if the underlying
    /// I/O operation fails or the peer rejects the message.
    async fn send(&self, message: String) -> Result<()>;

    /// Returns a stream of inbound JSON-RPC message strings.
    ///
    /// The stream ends when the transport is closed or the remote peer
    /// disconnects.
    fn receive(&self) -> Pin<Box<dyn Stream<Item = String> + Send + '_>>;

    /// Record the protocol revision chosen during `initialize`.
    ///
    /// Transports that stamp the revision on outbound requests override
    /// this; the default does nothing.
    async fn protocol_negotiated(&self, _version: &str) {}

    /// Release the connection.
    ///
    /// Implementations must tolerate being called on a transport whose
    /// remote side has already gone away.
    async fn close(&self) -> Result<()>;
}

pub mod event_stream;
pub mod http;
pub mod sse;

#[cfg(test)]
pub mod fake;
