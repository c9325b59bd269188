//! Transport negotiation with fallback
//!
//! Streamable HTTP is tried first, a few times, because servers are often
//! still starting when the check begins. If it never succeeds the legacy
//! HTTP+SSE binding is tried on the target itself and then on `<target>/sse`.

use std::time::Duration;

use crate::e2e::Connector;
use crate::error::{E2eError, Result};
use crate::mcp::TransportKind;

/// Retry counts and pauses used while negotiating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationPolicy {
    /// Streamable HTTP attempts before falling back to SSE.
    pub streamable_attempts: u32,
    /// Pause between Streamable HTTP attempts.
    pub streamable_retry_delay: Duration,
    /// Pause after each failed SSE candidate, including the last.
    pub sse_retry_delay: Duration,
}

impl Default for NegotiationPolicy {
    fn default() -> Self {
        Self {
            streamable_attempts: 3,
            streamable_retry_delay: Duration::from_millis(250),
            sse_retry_delay: Duration::from_millis(200),
        }
    }
}

/// A session together with how it was reached.
#[derive(Debug)]
pub struct Connected<S> {
    /// The open session.
    pub session: S,
    /// Transport that succeeded.
    pub kind: TransportKind,
    /// URL that succeeded.
    pub url: url::Url,
}

/// Legacy SSE URLs to try for `url`, in order.
///
/// The target itself always comes first. Unless its path already ends in
/// `/sse`, a second candidate with `/sse` appended to the path follows
/// (one trailing slash is removed first). Query and fragment are kept.
///
/// # Examples
///
/// ```
/// use mcp_e2e::e2e::negotiate::sse_candidates;
///
/// let url = url::Url::parse("http://127.0.0.1:8080/mcp").unwrap();
/// let candidates: Vec<String> = sse_candidates(&url).iter().map(|u| u.to_string()).collect();
/// assert_eq!(candidates, vec!["http://127.0.0.1:8080/mcp", "http://127.0.0.1:8080/mcp/sse"]);
/// ```
pub fn sse_candidates(url: &url::Url) -> Vec<url::Url> {
    let mut candidates = vec![url.clone()];
    if !url.path().ends_with("/sse") {
        let base = url.path().strip_suffix('/').unwrap_or(url.path());
        let mut alternate = url.clone();
        alternate.set_path(&format!("{base}/sse"));
        candidates.push(alternate);
    }
    candidates
}

fn parse_target(target: &str) -> Result<url::Url> {
    let url = url::Url::parse(target).map_err(|e| E2eError::InvalidTarget {
        target: target.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(E2eError::InvalidTarget {
            target: target.to_string(),
            reason: format!("unsupported scheme {other:?}"),
        }
        .into()),
    }
}

/// Connect to `target`, preferring Streamable HTTP.
///
/// Prints `[ok] Connected (<kind>) -> <url>` on success. Individual
/// attempt failures are logged at `debug` and otherwise dropped.
///
/// # Errors
///
/// Returns [`E2eError::InvalidTarget`] before any attempt when `target` is
/// not an absolute `http`/`https` URL, and [`E2eError::Connection`] when
/// every attempt failed.
pub async fn negotiate<C: Connector>(
    connector: &C,
    target: &str,
    policy: &NegotiationPolicy,
) -> Result<Connected<C::Session>> {
    let url = parse_target(target)?;

    for attempt in 1..=policy.streamable_attempts {
        match connector.connect(TransportKind::StreamableHttp, &url).await {
            Ok(session) => {
                println!("[ok] Connected ({}) -> {target}", TransportKind::StreamableHttp.label());
                return Ok(Connected {
                    session,
                    kind: TransportKind::StreamableHttp,
                    url,
                });
            }
            Err(e) => tracing::debug!(url = target, attempt, "Streamable HTTP attempt failed: {e:#}"),
        }
        if attempt < policy.streamable_attempts {
            tokio::time::sleep(policy.streamable_retry_delay).await;
        }
    }

    for candidate in sse_candidates(&url) {
        match connector.connect(TransportKind::Sse, &candidate).await {
            Ok(session) => {
                println!("[ok] Connected ({}) -> {candidate}", TransportKind::Sse.label());
                return Ok(Connected {
                    session,
                    kind: TransportKind::Sse,
                    url: candidate,
                });
            }
            Err(e) => tracing::debug!(url = %candidate, "SSE attempt failed: {e:#}"),
        }
        tokio::time::sleep(policy.sse_retry_delay).await;
    }

    Err(E2eError::Connection {
        target: target.to_string(),
        transports: vec![
            TransportKind::StreamableHttp.to_string(),
            TransportKind::Sse.to_string(),
        ],
    }
    .into())
}
