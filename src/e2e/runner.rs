//! Runs the scenario for every target and prints the console report

use anyhow::Context;

use crate::e2e::scenario::{run_scenario, ScenarioSettings};
use crate::e2e::Connector;
use crate::error::Result;

/// Print the target banner, then check each target in order.
///
/// Stops at the first failing target. Prints `All E2E checks passed.` only
/// when every target passed.
///
/// # Errors
///
/// Returns the first target's failure, with the target attached as context.
pub async fn run_targets<C: Connector>(
    targets: &[String],
    connector: &C,
    settings: &ScenarioSettings,
) -> Result<()> {
    println!("{}", banner(targets));

    for target in targets {
        println!("\n=== Testing {target} ===");
        run_scenario(target, connector, settings)
            .await
            .with_context(|| format!("target {target}"))?;
    }

    println!("\nAll E2E checks passed.");
    Ok(())
}

/// `[info] E2E targets ->` followed by one indented line per target.
pub fn banner(targets: &[String]) -> String {
    let mut out = String::from("[info] E2E targets ->");
    for target in targets {
        out.push_str("\n  ");
        out.push_str(target);
    }
    out
}
