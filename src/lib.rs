//! mcp-e2e - End-to-end checks for MCP servers
//!
//! This library connects to MCP (Model Context Protocol) servers over
//! Streamable HTTP, falling back to the legacy HTTP+SSE transport, and
//! verifies that the weather tools they expose answer sensibly.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `mcp`: JSON-RPC client, MCP handshake and the HTTP transports
//! - `e2e`: Target resolution, negotiation, tool checks and the report
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use mcp_e2e::cli::Cli;
//! use mcp_e2e::config::Config;
//! use mcp_e2e::e2e::{run_targets, McpConnector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None, &Cli::default())?;
//!     config.validate()?;
//!
//!     let connector = McpConnector::new(config.request_timeout());
//!     run_targets(&config.targets(), &connector, &config.scenario_settings()).await
//! }
//! ```

pub mod cli;
pub mod config;
pub mod e2e;
pub mod error;
pub mod mcp;

// Re-export commonly used types
pub use config::Config;
pub use error::{E2eError, Result};
