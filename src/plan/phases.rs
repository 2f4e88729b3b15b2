//! Phase bucketing and back-scheduled deadlines.
//!
//! Tasks are bucketed by walking the topological order and comparing the
//! running duration fraction against cumulative phase boundaries. Deadlines
//! are laid out back-to-front from the project end date: each phase gets a
//! calendar span proportional to its share of the estimate, taken from the
//! remaining days shrunk by the share of existing work already done.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::dag::{AcyclicGraph, NodeIndex, TopoOrder};
use crate::errors::{PlanError, Result};
use crate::input::{ProgressEntry, ProgressStatus, ProjectWindow};
use crate::plan::diagnostics::{Diagnostics, PlanWarning};
use crate::task::TaskId;

/// Slack when comparing a running fraction against a boundary.
const BOUNDARY_EPSILON: f64 = 1e-9;

/// Ordered phases and their cumulative upper boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLayout {
    labels: Vec<String>,
    boundaries: Vec<f64>,
}

impl Default for PhaseLayout {
    fn default() -> Self {
        Self {
            labels: vec!["P0".into(), "P1".into(), "P2".into()],
            boundaries: vec![0.33, 0.66, 1.0],
        }
    }
}

impl PhaseLayout {
    /// Validate and build a layout. Boundaries must be strictly increasing
    /// within (0, 1] and end at 1.0, one per label.
    pub fn new(labels: Vec<String>, boundaries: Vec<f64>) -> Result<Self> {
        if labels.is_empty() {
            return Err(PlanError::InvalidConfig(
                "at least one phase is required".into(),
            ));
        }
        if labels.len() != boundaries.len() {
            return Err(PlanError::InvalidConfig(format!(
                "{} phase labels but {} boundaries",
                labels.len(),
                boundaries.len()
            )));
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(PlanError::InvalidConfig(format!(
                    "duplicate phase label '{}'",
                    label
                )));
            }
        }
        let mut previous = 0.0;
        for &b in &boundaries {
            if !b.is_finite() || b <= previous || b > 1.0 {
                return Err(PlanError::InvalidConfig(format!(
                    "phase boundaries must be strictly increasing within (0, 1], got {:?}",
                    boundaries
                )));
            }
            previous = b;
        }
        if (previous - 1.0).abs() > BOUNDARY_EPSILON {
            return Err(PlanError::InvalidConfig(format!(
                "last phase boundary must be 1.0, got {}",
                previous
            )));
        }
        Ok(Self { labels, boundaries })
    }

    /// Evenly spaced phases labelled P0..P(n-1).
    pub fn even(count: usize) -> Result<Self> {
        let labels = (0..count).map(|i| format!("P{}", i)).collect();
        let boundaries = (1..=count).map(|i| i as f64 / count as f64).collect();
        Self::new(labels, boundaries)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// First phase whose boundary is not exceeded by `fraction`.
    fn phase_for(&self, fraction: f64) -> usize {
        self.boundaries
            .iter()
            .position(|&b| fraction <= b + BOUNDARY_EPSILON)
            .unwrap_or(self.boundaries.len() - 1)
    }
}

/// Credit given to existing tasks per status when estimating completed work.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressWeights {
    pub done: f64,
    pub in_progress: f64,
    pub not_started: f64,
}

impl Default for ProgressWeights {
    fn default() -> Self {
        Self {
            done: 1.0,
            in_progress: 0.5,
            not_started: 0.0,
        }
    }
}

impl ProgressWeights {
    pub fn weight(&self, status: ProgressStatus) -> f64 {
        match status {
            ProgressStatus::Done => self.done,
            ProgressStatus::InProgress => self.in_progress,
            ProgressStatus::NotStarted => self.not_started,
        }
    }

    /// Weighted fraction of existing tasks already finished, within [0, 1].
    pub fn completed_ratio(&self, progress: &[ProgressEntry]) -> f64 {
        if progress.is_empty() {
            return 0.0;
        }
        let credit: f64 = progress.iter().map(|p| self.weight(p.status)).sum();
        (credit / progress.len() as f64).clamp(0.0, 1.0)
    }
}

/// One phase of the plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseSlot {
    pub label: String,
    pub deadline: NaiveDate,
    pub task_ids: Vec<TaskId>,
    /// Sum of the durations of the phase's tasks
    pub estimate: f64,
    /// Calendar days allotted to the phase
    pub span_days: f64,
}

/// Output of the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhasePlan {
    pub phases: Vec<PhaseSlot>,
    pub completed_ratio: f64,
    pub remaining_days: f64,
    #[serde(skip)]
    phase_of: Vec<usize>,
}

impl PhasePlan {
    /// Phase index of a task.
    pub fn phase_of(&self, node: NodeIndex) -> usize {
        self.phase_of[node]
    }
}

/// Buckets tasks into phases and back-computes their deadlines.
#[derive(Debug, Clone)]
pub struct PhaseAllocator<'a> {
    layout: &'a PhaseLayout,
    weights: ProgressWeights,
}

impl<'a> PhaseAllocator<'a> {
    pub fn new(layout: &'a PhaseLayout, weights: ProgressWeights) -> Self {
        Self { layout, weights }
    }

    /// Phase index for every task, indexed by node.
    ///
    /// When every task has zero duration the running task count is used in
    /// place of the running duration.
    pub fn bucket(&self, graph: &AcyclicGraph, order: &TopoOrder) -> Vec<usize> {
        let total: f64 = graph.nodes().iter().map(|n| n.duration).sum();
        let count = order.len() as f64;
        let mut phase_of = vec![0usize; graph.len()];
        let mut cumulative = 0.0;

        for (pos, &node) in order.order().iter().enumerate() {
            cumulative += graph.nodes()[node].duration;
            let fraction = if total > 0.0 {
                cumulative / total
            } else {
                (pos + 1) as f64 / count
            };
            phase_of[node] = self.layout.phase_for(fraction);
        }

        phase_of
    }

    /// Bucket tasks, compute deadlines and write `phase` / `due_date` onto
    /// the graph's task nodes.
    pub fn allocate(
        &self,
        graph: &mut AcyclicGraph,
        order: &TopoOrder,
        window: &ProjectWindow,
        as_of: NaiveDate,
        progress: &[ProgressEntry],
        diagnostics: &mut Diagnostics,
    ) -> PhasePlan {
        for entry in progress {
            if graph.index_of(&entry.task_id).is_none() {
                diagnostics.push(PlanWarning::UnknownProgressTask {
                    task: entry.task_id.clone(),
                });
            }
        }

        let phase_of = self.bucket(graph, order);
        let phase_count = self.layout.len();

        let mut task_ids: Vec<Vec<TaskId>> = vec![Vec::new(); phase_count];
        let mut estimates = vec![0.0f64; phase_count];
        let mut counts = vec![0usize; phase_count];
        for &node in order.order() {
            let p = phase_of[node];
            task_ids[p].push(graph.id(node).clone());
            estimates[p] += graph.nodes()[node].duration;
            counts[p] += 1;
        }

        let total: f64 = estimates.iter().sum();
        let completed_ratio = self.weights.completed_ratio(progress);
        let base_days = window.days_remaining_from(as_of) as f64;
        let remaining_days = base_days * (1.0 - completed_ratio);

        let spans: Vec<f64> = (0..phase_count)
            .map(|p| {
                let share = if total > 0.0 {
                    estimates[p] / total
                } else {
                    counts[p] as f64 / order.len().max(1) as f64
                };
                remaining_days * share
            })
            .collect();

        let mut deadlines = vec![window.end_date; phase_count];
        let mut offset: f64 = 0.0;
        for p in (0..phase_count).rev() {
            let back = Duration::days(offset.round() as i64);
            deadlines[p] = (window.end_date - back).max(window.start_date);
            offset += spans[p];
        }

        for &node in order.order() {
            let p = phase_of[node];
            if let Some(task) = graph.node_mut(node) {
                task.phase = Some(self.layout.labels()[p].clone());
                task.due_date = Some(deadlines[p]);
            }
        }

        let phases: Vec<PhaseSlot> = task_ids
            .into_iter()
            .enumerate()
            .map(|(p, ids)| PhaseSlot {
                label: self.layout.labels()[p].clone(),
                deadline: deadlines[p],
                task_ids: ids,
                estimate: estimates[p],
                span_days: spans[p],
            })
            .collect();

        debug!(
            phases = phase_count,
            completed_ratio, remaining_days, "allocated phases"
        );

        PhasePlan {
            phases,
            completed_ratio,
            remaining_days,
            phase_of,
        }
    }
}
