//! Planner configuration read from `taskplan.toml`.
//!
//! Every section and key is optional; missing values fall back to the
//! engine defaults. Layering is file -> environment -> CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [phases]
//! labels = ["P0", "P1", "P2"]
//! boundaries = [0.33, 0.66, 1.0]
//!
//! [resolver]
//! max_iterations = 64
//! on_failure = "degrade"
//!
//! [ordering]
//! tie_break = "category"
//!
//! [assignment]
//! skill_weight = 0.6
//! capacity_weight = 0.2
//! criticality_weight = 0.2
//! criticality_divisor = 10.0
//!
//! [progress]
//! done = 1.0
//! in_progress = 0.5
//! not_started = 0.0
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::dag::{DEFAULT_MAX_ITERATIONS, TieBreak};
use crate::plan::{
    AssignmentWeights, CycleFailurePolicy, PhaseLayout, PlannerConfig, ProgressWeights,
};

/// File name looked up by [`PlanToml::load_or_default`].
pub const CONFIG_FILE_NAME: &str = "taskplan.toml";

/// Environment variable overriding `resolver.max_iterations`.
pub const MAX_ITERATIONS_ENV: &str = "TASKPLAN_MAX_ITERATIONS";

/// Phase labels and their cumulative duration boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasesSection {
    #[serde(default = "default_phase_labels")]
    pub labels: Vec<String>,
    #[serde(default = "default_phase_boundaries")]
    pub boundaries: Vec<f64>,
}

fn default_phase_labels() -> Vec<String> {
    PhaseLayout::default().labels().to_vec()
}

fn default_phase_boundaries() -> Vec<f64> {
    PhaseLayout::default().boundaries().to_vec()
}

impl Default for PhasesSection {
    fn default() -> Self {
        Self {
            labels: default_phase_labels(),
            boundaries: default_phase_boundaries(),
        }
    }
}

/// Cycle resolver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverSection {
    /// Maximum number of edges removed before giving up
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// "degrade" (return a partial plan) or "fail"
    #[serde(default)]
    pub on_failure: CycleFailurePolicy,
}

fn default_max_iterations() -> usize {
    DEFAULT_MAX_ITERATIONS
}

impl Default for ResolverSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            on_failure: CycleFailurePolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderingSection {
    #[serde(default)]
    pub tie_break: TieBreak,
}

/// Member scoring weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSection {
    #[serde(default = "default_skill_weight")]
    pub skill_weight: f64,
    #[serde(default = "default_capacity_weight")]
    pub capacity_weight: f64,
    #[serde(default = "default_criticality_weight")]
    pub criticality_weight: f64,
    #[serde(default = "default_criticality_divisor")]
    pub criticality_divisor: f64,
}

fn default_skill_weight() -> f64 {
    AssignmentWeights::default().skill
}

fn default_capacity_weight() -> f64 {
    AssignmentWeights::default().capacity
}

fn default_criticality_weight() -> f64 {
    AssignmentWeights::default().criticality
}

fn default_criticality_divisor() -> f64 {
    AssignmentWeights::default().criticality_divisor
}

impl Default for AssignmentSection {
    fn default() -> Self {
        Self {
            skill_weight: default_skill_weight(),
            capacity_weight: default_capacity_weight(),
            criticality_weight: default_criticality_weight(),
            criticality_divisor: default_criticality_divisor(),
        }
    }
}

/// Credit given to each progress status when computing completed work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSection {
    #[serde(default = "default_done")]
    pub done: f64,
    #[serde(default = "default_in_progress")]
    pub in_progress: f64,
    #[serde(default = "default_not_started")]
    pub not_started: f64,
}

fn default_done() -> f64 {
    ProgressWeights::default().done
}

fn default_in_progress() -> f64 {
    ProgressWeights::default().in_progress
}

fn default_not_started() -> f64 {
    ProgressWeights::default().not_started
}

impl Default for ProgressSection {
    fn default() -> Self {
        Self {
            done: default_done(),
            in_progress: default_in_progress(),
            not_started: default_not_started(),
        }
    }
}

/// Root of `taskplan.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanToml {
    #[serde(default)]
    pub phases: PhasesSection,
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub ordering: OrderingSection,
    #[serde(default)]
    pub assignment: AssignmentSection,
    #[serde(default)]
    pub progress: ProgressSection,
}

impl PlanToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse taskplan.toml")
    }

    /// Load `taskplan.toml` from `dir`, or defaults when it does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize taskplan.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Resolver iteration cap, with the environment taking precedence.
    pub fn max_iterations(&self) -> usize {
        if let Ok(env_val) = std::env::var(MAX_ITERATIONS_ENV) {
            match env_val.trim().parse() {
                Ok(value) => return value,
                Err(_) => warn!(
                    value = %env_val,
                    "ignoring non-numeric {}", MAX_ITERATIONS_ENV
                ),
            }
        }
        self.resolver.max_iterations
    }

    /// Validate the configuration and return a list of warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(e) = PhaseLayout::new(
            self.phases.labels.clone(),
            self.phases.boundaries.clone(),
        ) {
            warnings.push(format!("Invalid [phases]: {}", e));
        }

        if let Err(e) = self.planner_weights().validate() {
            warnings.push(e.to_string());
        }

        let weight_sum = self.assignment.skill_weight
            + self.assignment.capacity_weight
            + self.assignment.criticality_weight;
        if weight_sum <= 0.0 {
            warnings.push(
                "Assignment weights sum to zero: every member will score the same".to_string(),
            );
        }

        if self.progress.done < self.progress.in_progress
            || self.progress.in_progress < self.progress.not_started
        {
            warnings.push(format!(
                "Progress weights are not ordered (done={}, in_progress={}, not_started={})",
                self.progress.done, self.progress.in_progress, self.progress.not_started
            ));
        }

        if let Ok(env_val) = std::env::var(MAX_ITERATIONS_ENV)
            && env_val.trim().parse::<usize>().is_err()
        {
            warnings.push(format!(
                "Invalid {} '{}': should be a non-negative integer",
                MAX_ITERATIONS_ENV, env_val
            ));
        }

        warnings
    }

    /// Build a strictly validated engine configuration.
    pub fn to_planner_config(&self) -> crate::errors::Result<PlannerConfig> {
        let layout = PhaseLayout::new(self.phases.labels.clone(), self.phases.boundaries.clone())?;
        let config = PlannerConfig {
            layout,
            max_iterations: self.max_iterations(),
            ..self.planner_weights()
        };
        config.validate()?;
        Ok(config)
    }

    fn planner_weights(&self) -> PlannerConfig {
        PlannerConfig {
            on_cycle_failure: self.resolver.on_failure,
            tie_break: self.ordering.tie_break,
            assignment: AssignmentWeights {
                skill: self.assignment.skill_weight,
                capacity: self.assignment.capacity_weight,
                criticality: self.assignment.criticality_weight,
                criticality_divisor: self.assignment.criticality_divisor,
            },
            progress: ProgressWeights {
                done: self.progress.done,
                in_progress: self.progress.in_progress,
                not_started: self.progress.not_started,
            },
            ..PlannerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PlanError;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = PlanToml::parse("").unwrap();
        assert_eq!(toml, PlanToml::default());
        assert_eq!(toml.phases.labels, vec!["P0", "P1", "P2"]);
        assert_eq!(toml.resolver.max_iterations, 64);
        assert_eq!(toml.resolver.on_failure, CycleFailurePolicy::Degrade);
        assert_eq!(toml.ordering.tie_break, TieBreak::Category);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = PlanToml::parse(
            r#"
[phases]
labels = ["alpha", "beta"]
boundaries = [0.5, 1.0]

[resolver]
max_iterations = 8
on_failure = "fail"

[ordering]
tie_break = "insertion"

[assignment]
skill_weight = 1.0
capacity_weight = 0.0

[progress]
in_progress = 0.25
"#,
        )
        .unwrap();

        assert_eq!(toml.phases.labels, vec!["alpha", "beta"]);
        assert_eq!(toml.resolver.max_iterations, 8);
        assert_eq!(toml.resolver.on_failure, CycleFailurePolicy::Fail);
        assert_eq!(toml.ordering.tie_break, TieBreak::Insertion);
        assert_eq!(toml.assignment.skill_weight, 1.0);
        assert_eq!(toml.assignment.criticality_weight, 0.2);
        assert_eq!(toml.progress.in_progress, 0.25);
        assert_eq!(toml.progress.done, 1.0);
    }

    #[test]
    fn test_parse_rejects_unknown_policy() {
        let result = PlanToml::parse("[resolver]\non_failure = \"retry\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_to_planner_config() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe { std::env::remove_var(MAX_ITERATIONS_ENV) };

        let toml = PlanToml::parse("[resolver]\nmax_iterations = 3\n").unwrap();
        let config = toml.to_planner_config().unwrap();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.layout, PhaseLayout::default());
        assert_eq!(config.assignment, AssignmentWeights::default());
    }

    #[test]
    fn test_to_planner_config_rejects_bad_layout() {
        let toml = PlanToml::parse("[phases]\nlabels = [\"a\", \"b\"]\nboundaries = [0.7, 0.4]\n")
            .unwrap();
        assert!(matches!(
            toml.to_planner_config(),
            Err(PlanError::InvalidConfig(_))
        ));
        assert!(toml.validate().iter().any(|w| w.contains("[phases]")));
    }

    #[test]
    fn test_validate_default_is_clean() {
        let _guard = ENV_MUTEX.lock().unwrap();
        unsafe { std::env::remove_var(MAX_ITERATIONS_ENV) };
        assert!(PlanToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_weights() {
        let mut toml = PlanToml::default();
        toml.assignment.criticality_divisor = -1.0;
        toml.progress.done = 0.1;
        let warnings = toml.validate();
        assert!(warnings.iter().any(|w| w.contains("criticality_divisor")));
        assert!(warnings.iter().any(|w| w.contains("not ordered")));
    }

    #[test]
    fn test_env_overrides_max_iterations() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let toml = PlanToml::default();

        unsafe { std::env::set_var(MAX_ITERATIONS_ENV, "5") };
        assert_eq!(toml.max_iterations(), 5);
        assert_eq!(toml.to_planner_config().unwrap().max_iterations, 5);

        unsafe { std::env::set_var(MAX_ITERATIONS_ENV, "lots") };
        assert_eq!(toml.max_iterations(), 64);
        assert!(toml.validate().iter().any(|w| w.contains(MAX_ITERATIONS_ENV)));

        unsafe { std::env::remove_var(MAX_ITERATIONS_ENV) };
        assert_eq!(toml.max_iterations(), 64);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);

        let mut toml = PlanToml::default();
        toml.resolver.max_iterations = 12;
        toml.ordering.tie_break = TieBreak::Insertion;
        toml.save(&path).unwrap();

        let loaded = PlanToml::load(&path).unwrap();
        assert_eq!(loaded, toml);
        assert_eq!(PlanToml::load_or_default(dir.path()).unwrap(), toml);
    }

    #[test]
    fn test_load_or_default_without_file() {
        let dir = tempdir().unwrap();
        let toml = PlanToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml, PlanToml::default());
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempdir().unwrap();
        let err = PlanToml::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
