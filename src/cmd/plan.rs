//! Plan generation: `taskplan plan`.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

use taskplan::{PlanInput, PlanOutcome, Planner};

use super::config::load_plan_toml;

pub fn cmd_plan(
    project_dir: &Path,
    config: Option<&Path>,
    input: &Path,
    output: Option<&Path>,
    as_of: Option<NaiveDate>,
    compact: bool,
) -> Result<()> {
    let toml = load_plan_toml(project_dir, config)?;
    let planner = Planner::new(toml.to_planner_config()?)?;
    let request = PlanInput::load(input)?;

    let outcome = planner
        .plan_as_of(&request, as_of)
        .with_context(|| format!("Failed to plan {}", input.display()))?;

    match &outcome {
        PlanOutcome::Complete(result) => info!(
            tasks = result.tasks.len(),
            warnings = result.warnings.len(),
            "plan complete"
        ),
        PlanOutcome::Degraded(plan) => info!(
            unresolved = plan.unresolved_edges.len(),
            "plan degraded: {}", plan.reason
        ),
    }

    let json = if compact {
        serde_json::to_string(&outcome)
    } else {
        serde_json::to_string_pretty(&outcome)
    }
    .context("Failed to serialize plan")?;

    match output {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write plan: {}", path.display()))?;
            eprintln!("Wrote plan to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}
