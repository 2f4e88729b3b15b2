//! Recoverable data-quality findings gathered during a planning run.
//!
//! Task and edge data comes from LLM extraction and is occasionally
//! malformed. Problems the engine can work around are recorded here and
//! returned next to the plan instead of failing it.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::task::TaskId;

/// Why a raw edge was not added to the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// One of the endpoints does not name a task in this request
    UnknownEndpoint,
    /// Both endpoints resolve to the same task
    SelfLoop,
}

/// Why a task was left without an assignee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnassignedReason {
    NoRequiredSkills,
    NoSkillMatch,
}

/// A recovered problem, reported alongside the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PlanWarning {
    DroppedEdge {
        from: String,
        to: String,
        reason: DropReason,
    },
    DuplicateEdge {
        from: TaskId,
        to: TaskId,
        strength: u8,
    },
    RemovedCycleEdge {
        from: TaskId,
        to: TaskId,
        cycle: Vec<TaskId>,
    },
    UnassignedTask {
        task: TaskId,
        reason: UnassignedReason,
    },
    UnknownProgressTask {
        task: TaskId,
    },
}

impl std::fmt::Display for PlanWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanWarning::DroppedEdge { from, to, reason } => match reason {
                DropReason::UnknownEndpoint => {
                    write!(f, "dropped edge {} -> {}: unknown endpoint", from, to)
                }
                DropReason::SelfLoop => write!(f, "dropped self-loop edge {} -> {}", from, to),
            },
            PlanWarning::DuplicateEdge { from, to, strength } => write!(
                f,
                "merged duplicate edge {} -> {} (kept strength {})",
                from, to, strength
            ),
            PlanWarning::RemovedCycleEdge { from, to, cycle } => {
                let cycle: Vec<&str> = cycle.iter().map(TaskId::as_str).collect();
                write!(
                    f,
                    "removed edge {} -> {} to break cycle [{}]",
                    from,
                    to,
                    cycle.join(" -> ")
                )
            }
            PlanWarning::UnassignedTask { task, reason } => match reason {
                UnassignedReason::NoRequiredSkills => {
                    write!(f, "task {} left unassigned: no required skills", task)
                }
                UnassignedReason::NoSkillMatch => {
                    write!(f, "task {} left unassigned: no member has a matching skill", task)
                }
            },
            PlanWarning::UnknownProgressTask { task } => {
                write!(f, "progress entry for unknown task {}", task)
            }
        }
    }
}

/// Collector threaded through the pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<PlanWarning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and log it.
    pub fn push(&mut self, warning: PlanWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[PlanWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn into_warnings(self) -> Vec<PlanWarning> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let w = PlanWarning::DroppedEdge {
            from: "a".into(),
            to: "#9".into(),
            reason: DropReason::UnknownEndpoint,
        };
        assert_eq!(w.to_string(), "dropped edge a -> #9: unknown endpoint");

        let w = PlanWarning::RemovedCycleEdge {
            from: TaskId::from("a"),
            to: TaskId::from("b"),
            cycle: vec![TaskId::from("a"), TaskId::from("b"), TaskId::from("a")],
        };
        assert_eq!(w.to_string(), "removed edge a -> b to break cycle [a -> b -> a]");
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let w = PlanWarning::UnassignedTask {
            task: TaskId::from("t1"),
            reason: UnassignedReason::NoSkillMatch,
        };
        let json = serde_json::to_value(&w).unwrap();
        assert_eq!(json["kind"], "unassigned_task");
        assert_eq!(json["task"], "t1");
        assert_eq!(json["reason"], "no_skill_match");
    }

    #[test]
    fn test_diagnostics_collects_in_order() {
        let mut diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        diagnostics.push(PlanWarning::UnknownProgressTask {
            task: TaskId::from("x"),
        });
        diagnostics.push(PlanWarning::UnknownProgressTask {
            task: TaskId::from("y"),
        });
        assert_eq!(diagnostics.len(), 2);
        let tasks: Vec<_> = diagnostics
            .into_warnings()
            .into_iter()
            .map(|w| match w {
                PlanWarning::UnknownProgressTask { task } => task.0,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(tasks, vec!["x", "y"]);
    }
}
