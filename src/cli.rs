//! Command-line interface definition for mcp-e2e
//!
//! This module defines the CLI structure using clap's derive API.

use clap::Parser;

/// mcp-e2e - End-to-end checks for MCP weather servers
///
/// Connects to each target over Streamable HTTP (falling back to legacy
/// SSE), lists its tools and calls `get_alerts` and `get_forecast`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "mcp-e2e")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to an optional YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Comma-separated target URLs (overrides E2E_TARGETS)
    #[arg(short, long)]
    pub targets: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
