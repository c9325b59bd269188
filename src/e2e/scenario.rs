//! One end-to-end check against one target

use std::time::Duration;

use regex::Regex;

use crate::e2e::catalog::{list_operations, require_listed};
use crate::e2e::invoke::{invoke_operation, preview};
use crate::e2e::negotiate::{negotiate, Connected, NegotiationPolicy};
use crate::e2e::{Connector, ToolSession};
use crate::error::{E2eError, Result};

/// A required operation and the pattern its text must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentExpectation {
    /// Tool to call.
    pub operation: &'static str,
    /// Regular expression the returned text must match somewhere.
    pub pattern: &'static str,
}

/// Operations every target must provide, checked in this order.
pub const EXPECTATIONS: [ContentExpectation; 2] = [
    ContentExpectation {
        operation: "get_alerts",
        pattern: r"(?i)event:|no active alerts|unable to fetch",
    },
    ContentExpectation {
        operation: "get_forecast",
        pattern: r"(?i)temperature:|unable to fetch",
    },
];

impl ContentExpectation {
    /// Check `text` against the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Assertion`] when the text does not match.
    pub fn check(&self, text: &str) -> Result<()> {
        let re = Regex::new(self.pattern).map_err(|e| {
            E2eError::Config(format!("bad pattern for {}: {e}", self.operation))
        })?;
        if re.is_match(text) {
            Ok(())
        } else {
            Err(E2eError::Assertion(format!(
                "{} text does not match /{}/: {}",
                self.operation,
                self.pattern,
                preview(text)
            ))
            .into())
        }
    }
}

/// Knobs for [`run_scenario`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioSettings {
    /// Retry behavior while connecting.
    pub policy: NegotiationPolicy,
    /// Pause before the session is closed.
    pub close_delay: Duration,
}

impl Default for ScenarioSettings {
    fn default() -> Self {
        Self {
            policy: NegotiationPolicy::default(),
            close_delay: Duration::from_millis(50),
        }
    }
}

/// Connect to `target`, verify both operations and close the session.
///
/// Once connected, the session is closed exactly once whatever happens
/// afterwards. A close failure is logged at `warn` and never replaces the
/// scenario's own result.
///
/// # Errors
///
/// Returns the first negotiation, protocol or assertion failure.
pub async fn run_scenario<C: Connector>(
    target: &str,
    connector: &C,
    settings: &ScenarioSettings,
) -> Result<()> {
    let Connected { mut session, .. } = negotiate(connector, target, &settings.policy).await?;

    let outcome = exercise(&session).await;

    tokio::time::sleep(settings.close_delay).await;
    if let Err(e) = session.close().await {
        tracing::warn!(url = target, "failed to close session: {e:#}");
    }

    outcome
}

async fn exercise<S: ToolSession>(session: &S) -> Result<()> {
    let names = list_operations(session).await?;
    for expectation in &EXPECTATIONS {
        require_listed(&names, expectation.operation)?;
    }
    for expectation in &EXPECTATIONS {
        let text = invoke_operation(session, expectation.operation).await?;
        expectation.check(&text)?;
    }
    Ok(())
}
