//! Typed error hierarchy for the planning engine.
//!
//! Only structural problems are errors. Data-quality problems that the
//! engine can recover from (dangling edges, unassignable tasks, removed
//! cycle edges) are reported as [`crate::plan::PlanWarning`] values next to
//! the result instead.

use chrono::NaiveDate;
use thiserror::Error;

use crate::task::TaskId;

/// Errors raised by the planning pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Invalid task graph: {reason}")]
    InvalidGraph { reason: String },

    #[error(
        "Dependency cycle could not be resolved after {iterations} iterations; unresolved edges: {}",
        format_edges(.remaining)
    )]
    DependencyCycle {
        /// Edges of the cycle that was still present when the cap was hit.
        remaining: Vec<(TaskId, TaskId)>,
        /// Edges removed before giving up, in removal order.
        removed: Vec<(TaskId, TaskId)>,
        iterations: usize,
    },

    #[error("Invalid project window: end date {end} is before start date {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("Invalid planner configuration: {0}")]
    InvalidConfig(String),
}

impl PlanError {
    pub(crate) fn invalid_graph(reason: impl Into<String>) -> Self {
        Self::InvalidGraph {
            reason: reason.into(),
        }
    }

    /// Whether the pipeline may fall back to a degraded plan for this error.
    pub fn is_degradable(&self) -> bool {
        matches!(self, Self::DependencyCycle { .. })
    }
}

fn format_edges(edges: &[(TaskId, TaskId)]) -> String {
    edges
        .iter()
        .map(|(from, to)| format!("{} -> {}", from, to))
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, PlanError>;
