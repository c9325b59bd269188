//! Operation invocation and result text handling

use crate::e2e::ToolSession;
use crate::error::{E2eError, Result};
use crate::mcp::types::CallToolResponse;

/// Characters of result text shown in the report line.
pub const PREVIEW_CHARS: usize = 80;

/// Fixed arguments for each canonical operation.
///
/// `get_alerts` asks for California, `get_forecast` for San Francisco;
/// anything else gets an empty object.
///
/// # Examples
///
/// ```
/// use mcp_e2e::e2e::invoke::canonical_arguments;
///
/// assert_eq!(canonical_arguments("get_alerts"), serde_json::json!({ "state": "CA" }));
/// assert_eq!(canonical_arguments("other"), serde_json::json!({}));
/// ```
pub fn canonical_arguments(name: &str) -> serde_json::Value {
    match name {
        "get_alerts" => serde_json::json!({ "state": "CA" }),
        "get_forecast" => serde_json::json!({ "latitude": 37.7749, "longitude": -122.4194 }),
        _ => serde_json::json!({}),
    }
}

/// Text of the first `text` content item, or `""`.
pub fn extract_text(response: &CallToolResponse) -> &str {
    response.first_text().unwrap_or_default()
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `…` appended when cut.
///
/// # Examples
///
/// ```
/// use mcp_e2e::e2e::invoke::preview;
///
/// assert_eq!(preview("short"), "short");
/// assert_eq!(preview(&"x".repeat(81)), format!("{}…", "x".repeat(80)));
/// ```
pub fn preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text.to_string(),
    }
}

/// Call `name` with its canonical arguments and return the full text.
///
/// Prints `[ok] tools/call <name> -> <preview>` on success.
///
/// # Errors
///
/// Returns [`E2eError::Assertion`] when the result has no usable text or
/// its content cannot be decoded; other failures propagate unchanged.
pub async fn invoke_operation<S: ToolSession + ?Sized>(session: &S, name: &str) -> Result<String> {
    let response = session
        .call_tool(name, canonical_arguments(name))
        .await
        .map_err(|err| match err.downcast_ref::<E2eError>() {
            Some(E2eError::Serialization(e)) => {
                E2eError::Assertion(format!("tool {name} returned malformed content: {e}")).into()
            }
            _ => err,
        })?;

    if response.is_error == Some(true) {
        tracing::debug!(tool = name, "tool reported isError=true");
    }

    let text = extract_text(&response);
    if text.is_empty() {
        return Err(E2eError::Assertion(format!("tool {name} returned empty text")).into());
    }

    println!("[ok] tools/call {name} -> {}", preview(text));
    Ok(text.to_string())
}
