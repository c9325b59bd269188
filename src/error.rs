//! Error types for mcp-e2e
//!
//! This module defines all error types used throughout the runner,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for mcp-e2e operations
///
/// Covers configuration loading, target parsing, transport negotiation,
/// MCP protocol failures, and the content assertions applied to server
/// responses.
#[derive(Error, Debug)]
pub enum E2eError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// A configured target could not be parsed as an absolute URL
    #[error("Invalid target {target}: {reason}")]
    InvalidTarget {
        /// The target exactly as configured
        target: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Every transport attempt against a target failed
    #[error("Unable to connect to {target} via {}", .transports.join(" or "))]
    Connection {
        /// The original target address
        target: String,
        /// Display names of the transports that were attempted, in order
        transports: Vec<String>,
    },

    /// A response violated an expected shape or content contract
    #[error("Assertion failed: {0}")]
    Assertion(String),

    /// The server answered with a JSON-RPC error object
    #[error("MCP error: {0}")]
    Mcp(String),

    /// Transport-level failure (HTTP status, closed stream, bad framing)
    #[error("MCP transport error: {0}")]
    McpTransport(String),

    /// No response arrived for a request within the deadline
    #[error("MCP request timed out: method={method}")]
    McpTimeout {
        /// The JSON-RPC method that timed out
        method: String,
    },

    /// The server selected a protocol revision this client does not speak
    #[error("MCP protocol version mismatch: expected one of {expected:?}, got {got}")]
    McpProtocolVersion {
        /// Versions this client accepts
        expected: Vec<String>,
        /// Version returned by the server
        got: String,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for mcp-e2e operations
///
/// Uses `anyhow::Error` so that context can be attached while the typed
/// [`E2eError`] stays recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
