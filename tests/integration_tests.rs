//! Integration tests for taskplan
//!
//! These tests drive the binary end to end through its CLI.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to create a taskplan Command with a clean environment
fn taskplan() -> Command {
    let mut cmd = cargo_bin_cmd!("taskplan");
    cmd.env_remove("TASKPLAN_MAX_ITERATIONS").env_remove("RUST_LOG");
    cmd
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

const DIAMOND: &str = r#"{
  "tasks": [
    {"id": "A", "duration": 2, "category": "design", "required_skills": ["design"]},
    {"id": "B", "duration": 3, "required_skills": ["rust"]},
    {"id": "C", "duration": 1, "required_skills": ["react"]},
    {"id": "D", "duration": 4, "category": "testing", "required_skills": ["rust", "react"]}
  ],
  "edges": [
    {"from_id": "A", "to_id": "B"},
    {"from_id": "A", "to_id": "C"},
    {"from_id": 1, "to_id": 3, "strength": 8},
    {"from_id": "C", "to_id": "D"}
  ],
  "project_window": {"start_date": "2026-06-01", "end_date": "2026-06-21"},
  "existing_progress": [{"task_id": "A", "status": "not_started"}],
  "members": [
    {"id": "ana", "skills": ["Rust", "Design"], "capacity_per_period": 6},
    {"id": "bo", "skills": ["react"], "capacity_per_period": 6}
  ]
}"#;

const CYCLIC: &str = r#"{
  "tasks": [
    {"id": "a", "duration": 1},
    {"id": "b", "duration": 2},
    {"id": "c", "duration": 3}
  ],
  "edges": [
    {"from_id": "a", "to_id": "b"},
    {"from_id": "b", "to_id": "c"},
    {"from_id": "c", "to_id": "a"},
    {"from_id": "a", "to_id": "ghost"}
  ],
  "project_window": {"start_date": "2026-03-01", "end_date": "2026-03-31"}
}"#;

fn write_input(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn plan_json(dir: &TempDir, input: &PathBuf) -> Value {
    let output = taskplan()
        .current_dir(dir.path())
        .arg("plan")
        .arg(input)
        .output()
        .unwrap();
    assert!(output.status.success(), "plan failed: {:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_taskplan_help() {
        taskplan()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("plan"))
            .stdout(predicate::str::contains("check"));
    }

    #[test]
    fn test_taskplan_version() {
        taskplan().arg("--version").assert().success();
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        taskplan().arg("schedule").assert().failure();
    }
}

// =============================================================================
// Plan Command Tests
// =============================================================================

mod plan_command {
    use super::*;

    #[test]
    fn test_plan_outputs_complete_plan() {
        let dir = create_temp_project();
        let input = write_input(&dir, "input.json", DIAMOND);
        let plan = plan_json(&dir, &input);

        assert_eq!(plan["status"], "complete");
        assert_eq!(plan["critical_path"], serde_json::json!(["A", "B", "D"]));
        assert_eq!(plan["critical_path_cost"], 9.0);
        assert_eq!(plan["topological_order"][0], "A");
        assert_eq!(plan["topological_order"][3], "D");
        assert_eq!(plan["parallel_groups"][1], serde_json::json!(["B", "C"]));
        assert_eq!(plan["assignments"]["A"], "ana");
        assert_eq!(plan["assignments"]["C"], "bo");
        assert_eq!(plan["phase_plan"].as_array().unwrap().len(), 3);
        assert_eq!(plan["phase_plan"][2]["deadline"], "2026-06-21");
        assert_eq!(plan["tasks"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_plan_resolves_cycles_with_warnings() {
        let dir = create_temp_project();
        let input = write_input(&dir, "cyclic.json", CYCLIC);
        let plan = plan_json(&dir, &input);

        assert_eq!(plan["status"], "complete");
        assert_eq!(plan["removed_edges"], serde_json::json!([["a", "b"]]));
        let kinds: Vec<&str> = plan["warnings"]
            .as_array()
            .unwrap()
            .iter()
            .map(|w| w["kind"].as_str().unwrap())
            .collect();
        assert!(kinds.contains(&"dropped_edge"));
        assert!(kinds.contains(&"removed_cycle_edge"));
    }

    #[test]
    fn test_plan_degrades_when_cap_is_zero() {
        let dir = create_temp_project();
        let input = write_input(&dir, "cyclic.json", CYCLIC);

        let output = taskplan()
            .current_dir(dir.path())
            .env("TASKPLAN_MAX_ITERATIONS", "0")
            .args(["plan", "--compact"])
            .arg(&input)
            .output()
            .unwrap();
        assert!(output.status.success());

        let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(plan["status"], "degraded");
        assert_eq!(plan["tasks"].as_array().unwrap().len(), 3);
        assert!(!plan["unresolved_edges"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_plan_fails_when_policy_is_fail() {
        let dir = create_temp_project();
        let input = write_input(&dir, "cyclic.json", CYCLIC);
        fs::write(
            dir.path().join("taskplan.toml"),
            "[resolver]\nmax_iterations = 0\non_failure = \"fail\"\n",
        )
        .unwrap();

        taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Dependency cycle"));
    }

    #[test]
    fn test_plan_writes_output_file() {
        let dir = create_temp_project();
        let input = write_input(&dir, "input.json", DIAMOND);
        let out = dir.path().join("plan.json");

        taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .arg("--output")
            .arg(&out)
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let plan: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(plan["status"], "complete");
    }

    #[test]
    fn test_plan_as_of_shortens_schedule() {
        let dir = create_temp_project();
        let input = write_input(&dir, "input.json", DIAMOND);

        let output = taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .args(["--as-of", "2026-06-11"])
            .output()
            .unwrap();
        assert!(output.status.success());

        let plan: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(plan["remaining_days"], 10.0);
    }

    #[test]
    fn test_plan_rejects_empty_task_list() {
        let dir = create_temp_project();
        let input = write_input(
            &dir,
            "empty.json",
            r#"{"tasks": [], "project_window": {"start_date": "2026-01-01", "end_date": "2026-01-10"}}"#,
        );

        taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid task graph"));
    }

    #[test]
    fn test_plan_rejects_inverted_window() {
        let dir = create_temp_project();
        let input = write_input(
            &dir,
            "window.json",
            r#"{"tasks": [{"id": "x", "duration": 1}], "project_window": {"start_date": "2026-02-10", "end_date": "2026-02-01"}}"#,
        );

        taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid project window"));
    }

    #[test]
    fn test_plan_missing_input_file() {
        let dir = create_temp_project();

        taskplan()
            .current_dir(dir.path())
            .args(["plan", "nope.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read plan input"));
    }

    #[test]
    fn test_plan_is_deterministic() {
        let dir = create_temp_project();
        let input = write_input(&dir, "cyclic.json", CYCLIC);

        let first = taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .output()
            .unwrap();
        let second = taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .output()
            .unwrap();
        assert_eq!(first.stdout, second.stdout);
    }
}

// =============================================================================
// Check Command Tests
// =============================================================================

mod check_command {
    use super::*;

    #[test]
    fn test_check_reports_acyclic_graph() {
        let dir = create_temp_project();
        let input = write_input(&dir, "input.json", DIAMOND);

        taskplan()
            .current_dir(dir.path())
            .arg("check")
            .arg(&input)
            .assert()
            .success()
            .stdout(predicate::str::contains("tasks = 4"))
            .stdout(predicate::str::contains("Entry tasks: A"))
            .stdout(predicate::str::contains("Exit tasks: D"))
            .stdout(predicate::str::contains("Graph is acyclic."));
    }

    #[test]
    fn test_check_tolerates_malformed_edges() {
        let dir = create_temp_project();
        let input = write_input(
            &dir,
            "malformed.json",
            r#"{
  "tasks": [
    {"id": "a", "duration": 1, "category": "frontend"},
    {"id": "b", "duration": 2}
  ],
  "edges": [
    {"from_id": -1, "to_id": "b"},
    {"from_id": "a", "to_id": "b", "strength": 300}
  ],
  "project_window": {"start_date": "2026-03-01", "end_date": "2026-03-31"}
}"#,
        );

        taskplan()
            .current_dir(dir.path())
            .arg("check")
            .arg(&input)
            .assert()
            .success()
            .stdout(predicate::str::contains("edges = 1 (after hygiene)"))
            .stdout(predicate::str::contains("Dropped edges: 1"))
            .stdout(predicate::str::contains("Graph is acyclic."));
    }

    #[test]
    fn test_check_reports_removed_and_dropped_edges() {
        let dir = create_temp_project();
        let input = write_input(&dir, "cyclic.json", CYCLIC);

        taskplan()
            .current_dir(dir.path())
            .arg("check")
            .arg(&input)
            .assert()
            .success()
            .stdout(predicate::str::contains("Dropped edges: 1"))
            .stdout(predicate::str::contains("a -> b"));
    }

    #[test]
    fn test_check_fails_on_unresolved_cycle() {
        let dir = create_temp_project();
        let input = write_input(&dir, "cyclic.json", CYCLIC);

        taskplan()
            .current_dir(dir.path())
            .env("TASKPLAN_MAX_ITERATIONS", "0")
            .arg("check")
            .arg(&input)
            .assert()
            .failure()
            .stdout(predicate::str::contains("Graph is still cyclic"));
    }
}

// =============================================================================
// Config Command Tests
// =============================================================================

mod config_command {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();

        taskplan()
            .current_dir(dir.path())
            .arg("config")
            .assert()
            .success()
            .stdout(predicate::str::contains("No taskplan.toml found"))
            .stdout(predicate::str::contains("max_iterations = 64"));
    }

    #[test]
    fn test_config_init_then_validate() {
        let dir = create_temp_project();

        taskplan()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Created taskplan.toml"));
        assert!(dir.path().join("taskplan.toml").exists());

        taskplan()
            .current_dir(dir.path())
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));

        taskplan()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration is valid."));
    }

    #[test]
    fn test_config_validate_reports_warnings() {
        let dir = create_temp_project();
        fs::write(
            dir.path().join("taskplan.toml"),
            "[phases]\nlabels = [\"a\", \"b\"]\nboundaries = [0.5, 0.9]\n",
        )
        .unwrap();

        taskplan()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration warnings:"));
    }

    #[test]
    fn test_explicit_config_flag() {
        let dir = create_temp_project();
        let config = dir.path().join("custom.toml");
        fs::write(&config, "[ordering]\ntie_break = \"insertion\"\n").unwrap();

        taskplan()
            .current_dir(dir.path())
            .arg("--config")
            .arg(&config)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("tie_break = \"insertion\""));
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let dir = create_temp_project();

        for subcommand in ["show", "validate"] {
            taskplan()
                .current_dir(dir.path())
                .args(["--config", "missing.toml", "config", subcommand])
                .assert()
                .failure()
                .stderr(predicate::str::contains("Failed to read config file"));
        }
    }

    #[test]
    fn test_invalid_config_blocks_planning() {
        let dir = create_temp_project();
        let input = write_input(&dir, "input.json", DIAMOND);
        fs::write(
            dir.path().join("taskplan.toml"),
            "[assignment]\ncriticality_divisor = 0.0\n",
        )
        .unwrap();

        taskplan()
            .current_dir(dir.path())
            .arg("plan")
            .arg(&input)
            .assert()
            .failure()
            .stderr(predicate::str::contains("criticality_divisor"));
    }
}
