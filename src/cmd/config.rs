//! Configuration view and validation commands: `taskplan config`.

use anyhow::Result;
use std::path::{Path, PathBuf};

use taskplan::config::{CONFIG_FILE_NAME, MAX_ITERATIONS_ENV, PlanToml};

use super::super::ConfigCommands;

/// Config file in effect: the `--config` flag, else `taskplan.toml` in the project dir.
pub fn config_path(project_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| project_dir.join(CONFIG_FILE_NAME))
}

/// Load the effective configuration. An explicit `--config` path must exist.
pub fn load_plan_toml(project_dir: &Path, explicit: Option<&Path>) -> Result<PlanToml> {
    match explicit {
        Some(path) => PlanToml::load(path),
        None => PlanToml::load_or_default(project_dir),
    }
}

fn print_toml(toml: &PlanToml) {
    let labels: Vec<String> = toml
        .phases
        .labels
        .iter()
        .map(|l| format!("\"{}\"", l))
        .collect();
    let boundaries: Vec<String> = toml.phases.boundaries.iter().map(f64::to_string).collect();

    println!("[phases]");
    println!("  labels = [{}]", labels.join(", "));
    println!("  boundaries = [{}]", boundaries.join(", "));
    println!();
    println!("[resolver]");
    println!("  max_iterations = {}", toml.resolver.max_iterations);
    println!("  on_failure = \"{}\"", toml.resolver.on_failure);
    println!();
    println!("[ordering]");
    println!("  tie_break = \"{}\"", toml.ordering.tie_break);
    println!();
    println!("[assignment]");
    println!("  skill_weight = {}", toml.assignment.skill_weight);
    println!("  capacity_weight = {}", toml.assignment.capacity_weight);
    println!("  criticality_weight = {}", toml.assignment.criticality_weight);
    println!("  criticality_divisor = {}", toml.assignment.criticality_divisor);
    println!();
    println!("[progress]");
    println!("  done = {}", toml.progress.done);
    println!("  in_progress = {}", toml.progress.in_progress);
    println!("  not_started = {}", toml.progress.not_started);
    println!();
}

pub fn cmd_config(
    project_dir: &Path,
    explicit: Option<&Path>,
    command: Option<ConfigCommands>,
) -> Result<()> {
    let config_path = config_path(project_dir, explicit);
    let found = explicit.is_some() || config_path.exists();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Taskplan Configuration");
            println!("======================");
            println!();

            let toml = load_plan_toml(project_dir, explicit)?;
            if found {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No taskplan.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
            }
            println!();
            print_toml(&toml);

            println!("Effective values (with env overrides):");
            println!("  max_iterations = {}", toml.max_iterations());
            println!();

            if !found {
                println!("Run 'taskplan config init' to create a taskplan.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !found {
                println!("No taskplan.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = load_plan_toml(project_dir, explicit)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("taskplan.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if let Some(parent) = config_path.parent()
                && !parent.as_os_str().is_empty()
                && !parent.exists()
            {
                std::fs::create_dir_all(parent)?;
            }

            PlanToml::default().save(&config_path)?;

            println!("Created taskplan.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [phases] labels, boundaries");
            println!("  - [resolver] max_iterations, on_failure");
            println!("  - [ordering] tie_break");
            println!("  - [assignment] and [progress] weights");
            println!();
            println!("{} overrides resolver.max_iterations.", MAX_ITERATIONS_ENV);
            println!();
        }
    }

    Ok(())
}
