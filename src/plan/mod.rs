//! The planning pipeline.
//!
//! A [`Planner`] is built per request from a [`PlannerConfig`] and runs the
//! stages strictly in order:
//!
//! Builder -> Resolver -> Sort -> {Critical path, Parallel groups} -> Phases -> Assignment
//!
//! Structural problems (empty task list, malformed window, bad config) are
//! returned as errors. When the cycle resolver gives up the planner either
//! fails or, by default, returns an explicit [`PlanOutcome::Degraded`]
//! carrying the unordered task records and the cycle diagnostics.

pub mod assign;
pub mod diagnostics;
pub mod phases;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument, warn};

use crate::dag::{
    CriticalPath, CycleResolver, DEFAULT_MAX_ITERATIONS, GraphBuilder, ParallelGroups, TieBreak,
    TopoOrder,
};
use crate::errors::{PlanError, Result};
use crate::input::PlanInput;
use crate::task::{Category, TaskId, TaskNode};
use crate::team::MemberId;

pub use assign::{Assignment, AssignmentEngine, AssignmentTable, AssignmentWeights, MemberLoad};
pub use diagnostics::{Diagnostics, DropReason, PlanWarning, UnassignedReason};
pub use phases::{PhaseAllocator, PhaseLayout, PhasePlan, PhaseSlot, ProgressWeights};

/// What to do when cycles survive the resolver's iteration cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleFailurePolicy {
    /// Return a `Degraded` outcome without ordering, phases or assignments
    #[default]
    Degrade,
    /// Return the `DependencyCycle` error
    Fail,
}

impl std::fmt::Display for CycleFailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CycleFailurePolicy::Degrade => write!(f, "degrade"),
            CycleFailurePolicy::Fail => write!(f, "fail"),
        }
    }
}

/// Validated engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub layout: PhaseLayout,
    pub max_iterations: usize,
    pub on_cycle_failure: CycleFailurePolicy,
    pub tie_break: TieBreak,
    pub assignment: AssignmentWeights,
    pub progress: ProgressWeights,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            layout: PhaseLayout::default(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            on_cycle_failure: CycleFailurePolicy::default(),
            tie_break: TieBreak::default(),
            assignment: AssignmentWeights::default(),
            progress: ProgressWeights::default(),
        }
    }
}

impl PlannerConfig {
    pub fn with_layout(mut self, layout: PhaseLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_cycle_failure(mut self, policy: CycleFailurePolicy) -> Self {
        self.on_cycle_failure = policy;
        self
    }

    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Reject weights the scoring and progress formulas cannot use.
    pub fn validate(&self) -> Result<()> {
        let a = &self.assignment;
        for (name, value) in [
            ("assignment.skill_weight", a.skill),
            ("assignment.capacity_weight", a.capacity),
            ("assignment.criticality_weight", a.criticality),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PlanError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if !a.criticality_divisor.is_finite() || a.criticality_divisor <= 0.0 {
            return Err(PlanError::InvalidConfig(format!(
                "assignment.criticality_divisor must be positive, got {}",
                a.criticality_divisor
            )));
        }
        let p = &self.progress;
        for (name, value) in [
            ("progress.done", p.done),
            ("progress.in_progress", p.in_progress),
            ("progress.not_started", p.not_started),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(PlanError::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A task as it appears in the finished plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedTask {
    pub id: TaskId,
    pub duration: f64,
    pub category: Category,
    pub required_skills: BTreeSet<String>,
    /// Longest dependency chain (in edges) leading to this task
    pub depth: usize,
    /// Heaviest duration-weighted path starting at this task
    pub cost: f64,
    pub on_critical_path: bool,
    pub phase: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub assignee: Option<MemberId>,
}

/// The complete plan. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResult {
    pub topological_order: Vec<TaskId>,
    pub critical_path: Vec<TaskId>,
    pub critical_path_cost: f64,
    pub parallel_groups: Vec<Vec<TaskId>>,
    pub phase_plan: Vec<PhaseSlot>,
    pub completed_ratio: f64,
    pub remaining_days: f64,
    pub assignments: BTreeMap<TaskId, MemberId>,
    pub member_loads: Vec<MemberLoad>,
    pub tasks: Vec<PlannedTask>,
    pub removed_edges: Vec<(TaskId, TaskId)>,
    pub warnings: Vec<PlanWarning>,
}

impl PlanResult {
    pub fn phase(&self, label: &str) -> Option<&PhaseSlot> {
        self.phase_plan.iter().find(|p| p.label == label)
    }

    pub fn task(&self, id: &TaskId) -> Option<&PlannedTask> {
        self.tasks.iter().find(|t| &t.id == id)
    }
}

/// A plan without ordering, produced when cycles could not be removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedPlan {
    pub reason: String,
    pub unresolved_edges: Vec<(TaskId, TaskId)>,
    pub removed_edges: Vec<(TaskId, TaskId)>,
    pub iterations: usize,
    /// Tasks in input order, with no phase, due date or assignee
    pub tasks: Vec<TaskNode>,
    pub warnings: Vec<PlanWarning>,
}

impl DegradedPlan {
    /// The error that forced degraded mode.
    pub fn error(&self) -> PlanError {
        PlanError::DependencyCycle {
            remaining: self.unresolved_edges.clone(),
            removed: self.removed_edges.clone(),
            iterations: self.iterations,
        }
    }
}

/// What a planning run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PlanOutcome {
    Complete(PlanResult),
    Degraded(DegradedPlan),
}

impl PlanOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn result(&self) -> Option<&PlanResult> {
        match self {
            Self::Complete(result) => Some(result),
            Self::Degraded(_) => None,
        }
    }

    pub fn warnings(&self) -> &[PlanWarning] {
        match self {
            Self::Complete(result) => &result.warnings,
            Self::Degraded(plan) => &plan.warnings,
        }
    }
}

/// Stateless planning engine; construct one per request.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan with deadlines counted from the project start date.
    pub fn plan(&self, input: &PlanInput) -> Result<PlanOutcome> {
        self.plan_as_of(input, None)
    }

    /// Plan with deadlines counted from `as_of` (clamped into the window).
    #[instrument(skip_all, fields(tasks = input.tasks.len(), edges = input.edges.len()))]
    pub fn plan_as_of(&self, input: &PlanInput, as_of: Option<NaiveDate>) -> Result<PlanOutcome> {
        let window = input.project_window;
        if window.end_date < window.start_date {
            return Err(PlanError::InvalidWindow {
                start: window.start_date,
                end: window.end_date,
            });
        }

        let mut diagnostics = Diagnostics::new();
        let graph = GraphBuilder::new(input.tasks.clone())
            .with_edges(input.edges.clone())
            .build(&mut diagnostics)?;

        let mut graph = match CycleResolver::new(self.config.max_iterations)
            .resolve(graph, &mut diagnostics)
        {
            Ok(graph) => graph,
            Err(failure) => {
                return self.degrade(failure.graph.into_nodes(), failure.error, diagnostics);
            }
        };

        let order = TopoOrder::compute(&graph, self.config.tie_break);
        let critical = CriticalPath::compute(&graph, &order);
        let groups = ParallelGroups::compute(&graph, &order);

        let phase_plan = PhaseAllocator::new(&self.config.layout, self.config.progress).allocate(
            &mut graph,
            &order,
            &window,
            as_of.unwrap_or(window.start_date),
            &input.existing_progress,
            &mut diagnostics,
        );

        let table = AssignmentEngine::new(self.config.assignment, &input.members).assign(
            &mut graph,
            &order,
            &critical,
            &mut diagnostics,
        );

        let tasks: Vec<PlannedTask> = order
            .order()
            .iter()
            .map(|&i| {
                let node = &graph.nodes()[i];
                PlannedTask {
                    id: node.id.clone(),
                    duration: node.duration,
                    category: node.category,
                    required_skills: node.required_skills.clone(),
                    depth: order.depth(i),
                    cost: critical.cost(i),
                    on_critical_path: critical.contains(i),
                    phase: node.phase.clone(),
                    due_date: node.due_date,
                    assignee: node.assignee.clone(),
                }
            })
            .collect();

        let result = PlanResult {
            topological_order: order.ids(&graph),
            critical_path: critical.ids(&graph),
            critical_path_cost: critical.total(),
            parallel_groups: groups.ids(&graph),
            phase_plan: phase_plan.phases,
            completed_ratio: phase_plan.completed_ratio,
            remaining_days: phase_plan.remaining_days,
            assignments: table.by_task(),
            member_loads: table.member_loads,
            tasks,
            removed_edges: graph.removed_edges().to_vec(),
            warnings: diagnostics.into_warnings(),
        };

        info!(
            tasks = result.tasks.len(),
            critical_path_cost = result.critical_path_cost,
            groups = result.parallel_groups.len(),
            assigned = result.assignments.len(),
            warnings = result.warnings.len(),
            "plan complete"
        );

        Ok(PlanOutcome::Complete(result))
    }

    fn degrade(
        &self,
        tasks: Vec<TaskNode>,
        error: PlanError,
        diagnostics: Diagnostics,
    ) -> Result<PlanOutcome> {
        if self.config.on_cycle_failure == CycleFailurePolicy::Fail {
            return Err(error);
        }

        let PlanError::DependencyCycle {
            remaining,
            removed,
            iterations,
        } = &error
        else {
            return Err(error);
        };

        warn!(
            unresolved = remaining.len(),
            "returning degraded plan without ordering, phases or assignments"
        );

        Ok(PlanOutcome::Degraded(DegradedPlan {
            reason: error.to_string(),
            unresolved_edges: remaining.clone(),
            removed_edges: removed.clone(),
            iterations: *iterations,
            tasks,
            warnings: diagnostics.into_warnings(),
        }))
    }
}
