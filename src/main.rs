//! mcp-e2e - End-to-end checks for MCP weather servers
//!
#![doc = "Main entry point for the mcp-e2e runner."]

use std::process::ExitCode;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use mcp_e2e::cli::Cli;
use mcp_e2e::config::Config;
use mcp_e2e::e2e::{run_targets, McpConnector};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\nE2E failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref(), cli)?;
    config.validate()?;

    let connector = McpConnector::new(config.request_timeout());
    run_targets(&config.targets(), &connector, &config.scenario_settings()).await
}

/// Initialize tracing subscriber with environment filter
///
/// Diagnostics go to stderr so that stdout carries only the report.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "mcp_e2e=debug" } else { "mcp_e2e=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
