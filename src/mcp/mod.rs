//! MCP (Model Context Protocol) client support
//!
//! Just enough of an MCP client to drive an end-to-end check: connect over
//! Streamable HTTP or legacy HTTP+SSE, run the `initialize` handshake, list
//! tools and call them.
//!
//! # Module Layout
//!
//! - `types`     -- Protocol types and JSON-RPC primitives
//! - `client`    -- Transport-agnostic async JSON-RPC 2.0 client
//! - `protocol`  -- Typed MCP lifecycle wrapper over `JsonRpcClient`
//! - `transport` -- `Transport` trait and the HTTP implementations
//! - `session`   -- A connected, initialized client that is closed once

pub mod client;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod types;

pub use session::McpSession;
pub use transport::TransportKind;
