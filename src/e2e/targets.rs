//! Target list resolution

/// Endpoint checked when nothing else is configured.
pub const DEFAULT_TARGET: &str = "http://127.0.0.1:8080/mcp";

/// Split a comma-separated target list.
///
/// Entries are trimmed and empty ones dropped; order and duplicates are
/// kept. When nothing usable remains the single [`DEFAULT_TARGET`] is
/// returned.
///
/// # Examples
///
/// ```
/// use mcp_e2e::e2e::targets::resolve_targets;
///
/// assert_eq!(
///     resolve_targets(Some(" http://a/mcp , ,http://b/mcp")),
///     vec!["http://a/mcp", "http://b/mcp"]
/// );
/// assert_eq!(resolve_targets(None), vec!["http://127.0.0.1:8080/mcp"]);
/// ```
pub fn resolve_targets(raw: Option<&str>) -> Vec<String> {
    let targets: Vec<String> = raw
        .unwrap_or(DEFAULT_TARGET)
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();

    if targets.is_empty() {
        vec![DEFAULT_TARGET.to_string()]
    } else {
        targets
    }
}
