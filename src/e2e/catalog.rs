//! Capability listing

use crate::e2e::ToolSession;
use crate::error::{E2eError, Result};

/// List the session's tools and print `[ok] tools/list -> a, b, c`.
///
/// Returns the names in server order.
///
/// # Errors
///
/// A `tools/list` result that does not carry a `tools` array is reported as
/// [`E2eError::Assertion`]; other failures propagate unchanged.
pub async fn list_operations<S: ToolSession + ?Sized>(session: &S) -> Result<Vec<String>> {
    let tools = session.list_tools().await.map_err(|err| {
        match err.downcast_ref::<E2eError>() {
            Some(E2eError::Serialization(e)) => {
                E2eError::Assertion(format!("tools list must be an array: {e}")).into()
            }
            _ => err,
        }
    })?;

    let names: Vec<String> = tools.into_iter().map(|tool| tool.name).collect();
    println!("[ok] tools/list -> {}", names.join(", "));
    Ok(names)
}

/// Fail unless `name` is among `names`.
///
/// # Errors
///
/// Returns [`E2eError::Assertion`] with `<name> not listed`.
pub fn require_listed(names: &[String], name: &str) -> Result<()> {
    if names.iter().any(|n| n == name) {
        Ok(())
    } else {
        Err(E2eError::Assertion(format!("{name} not listed")).into())
    }
}
