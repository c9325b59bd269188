//! Configuration management for mcp-e2e
//!
//! Settings are layered: built-in defaults, then an optional YAML file,
//! then `E2E_*` environment variables, then command-line flags.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::e2e::negotiate::NegotiationPolicy;
use crate::e2e::scenario::ScenarioSettings;
use crate::e2e::targets::resolve_targets;
use crate::error::{E2eError, Result};

/// Main configuration structure for mcp-e2e
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Comma-separated target URLs; unset means the default target
    #[serde(default)]
    pub targets: Option<String>,

    /// Transport negotiation settings
    #[serde(default)]
    pub negotiation: NegotiationConfig,

    /// Per-scenario settings
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

/// Transport negotiation configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiationConfig {
    /// Streamable HTTP attempts before falling back to SSE
    #[serde(default = "default_streamable_attempts")]
    pub streamable_attempts: u32,

    /// Pause between Streamable HTTP attempts in milliseconds
    #[serde(default = "default_streamable_retry_delay_ms")]
    pub streamable_retry_delay_ms: u64,

    /// Pause after each failed SSE candidate in milliseconds
    #[serde(default = "default_sse_retry_delay_ms")]
    pub sse_retry_delay_ms: u64,
}

fn default_streamable_attempts() -> u32 {
    3
}

fn default_streamable_retry_delay_ms() -> u64 {
    250
}

fn default_sse_retry_delay_ms() -> u64 {
    200
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            streamable_attempts: default_streamable_attempts(),
            streamable_retry_delay_ms: default_streamable_retry_delay_ms(),
            sse_retry_delay_ms: default_sse_retry_delay_ms(),
        }
    }
}

/// Scenario configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Pause before closing a session in milliseconds
    #[serde(default = "default_close_delay_ms")]
    pub close_delay_ms: u64,

    /// Deadline for each MCP request in seconds
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
}

fn default_close_delay_ms() -> u64 {
    50
}

fn default_request_timeout_seconds() -> u64 {
    30
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            close_delay_ms: default_close_delay_ms(),
            request_timeout_seconds: default_request_timeout_seconds(),
        }
    }
}

impl Config {
    /// Load configuration with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Optional path to a YAML file; a missing file means defaults
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Io`] if the file cannot be read,
    /// [`E2eError::Yaml`] if it cannot be parsed, and [`E2eError::Config`]
    /// if an `E2E_*` variable holds an unparsable number
    pub fn load(path: Option<&str>, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = match path {
            Some(path) if Path::new(path).exists() => Self::from_file(path)?,
            Some(path) => {
                tracing::debug!("Config file not found at {}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_vars()?;
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(E2eError::from)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config = serde_yaml::from_str(&contents)
            .map_err(E2eError::from)
            .with_context(|| format!("Failed to parse config file {}", path))?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) -> Result<()> {
        if let Ok(targets) = std::env::var("E2E_TARGETS") {
            self.targets = Some(targets);
        }

        if let Some(value) = env_number("E2E_STREAMABLE_ATTEMPTS")? {
            self.negotiation.streamable_attempts = value;
        }
        if let Some(value) = env_number("E2E_STREAMABLE_RETRY_DELAY_MS")? {
            self.negotiation.streamable_retry_delay_ms = value;
        }
        if let Some(value) = env_number("E2E_SSE_RETRY_DELAY_MS")? {
            self.negotiation.sse_retry_delay_ms = value;
        }
        if let Some(value) = env_number("E2E_CLOSE_DELAY_MS")? {
            self.scenario.close_delay_ms = value;
        }
        if let Some(value) = env_number("E2E_REQUEST_TIMEOUT_SECONDS")? {
            self.scenario.request_timeout_seconds = value;
        }

        Ok(())
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(targets) = &cli.targets {
            self.targets = Some(targets.clone());
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if self.negotiation.streamable_attempts == 0 {
            return Err(E2eError::Config(
                "negotiation.streamable_attempts must be greater than 0".to_string(),
            )
            .into());
        }

        if self.negotiation.streamable_attempts > 1000 {
            return Err(E2eError::Config(
                "negotiation.streamable_attempts must be less than or equal to 1000".to_string(),
            )
            .into());
        }

        if self.scenario.request_timeout_seconds == 0 {
            return Err(E2eError::Config(
                "scenario.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }

    /// Targets to check, in order
    pub fn targets(&self) -> Vec<String> {
        resolve_targets(self.targets.as_deref())
    }

    /// Deadline for each MCP request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.scenario.request_timeout_seconds)
    }

    /// Settings handed to the scenario runner
    pub fn scenario_settings(&self) -> ScenarioSettings {
        ScenarioSettings {
            policy: NegotiationPolicy {
                streamable_attempts: self.negotiation.streamable_attempts,
                streamable_retry_delay: Duration::from_millis(
                    self.negotiation.streamable_retry_delay_ms,
                ),
                sse_retry_delay: Duration::from_millis(self.negotiation.sse_retry_delay_ms),
            },
            close_delay: Duration::from_millis(self.scenario.close_delay_ms),
        }
    }
}

/// Parse a numeric environment variable; unset or blank yields `None`.
fn env_number<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| E2eError::Config(format!("Invalid {}={:?}: {}", name, raw, e)).into()),
        _ => Ok(None),
    }
}
