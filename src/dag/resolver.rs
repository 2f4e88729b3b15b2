//! Cycle detection and greedy cycle breaking.
//!
//! The resolver runs a DFS to find one cycle at a time and removes the first
//! edge of the reported cycle, repeating until the graph is acyclic or the
//! iteration cap is hit. This is a heuristic: it does not compute a minimum
//! feedback edge set, and which edge goes depends on DFS order (task input
//! order, then edge insertion order). Callers must expect fewer dependency
//! hints in the plan than the extraction layer proposed.

use serde::{Deserialize, Serialize};
use std::ops::Deref;
use tracing::{debug, warn};

use crate::dag::builder::{NodeIndex, TaskGraph};
use crate::errors::PlanError;
use crate::plan::diagnostics::{Diagnostics, PlanWarning};
use crate::task::TaskId;

/// Default cap on detect/remove rounds.
pub const DEFAULT_MAX_ITERATIONS: usize = 64;

/// Cycle-check state of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphState {
    /// Not checked since it was built or last modified
    #[default]
    Unchecked,
    Acyclic,
    /// Still cyclic after resolution gave up
    Cyclic,
}

/// A graph proven acyclic by [`CycleResolver::resolve`].
///
/// Downstream stages take this type so they never see a cyclic graph.
#[derive(Debug, Clone)]
pub struct AcyclicGraph {
    graph: TaskGraph,
    removed: Vec<(TaskId, TaskId)>,
}

impl AcyclicGraph {
    /// Edges the resolver removed, in removal order.
    pub fn removed_edges(&self) -> &[(TaskId, TaskId)] {
        &self.removed
    }

    pub fn into_inner(self) -> TaskGraph {
        self.graph
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> Option<&mut crate::task::TaskNode> {
        self.graph.node_mut(index)
    }
}

impl Deref for AcyclicGraph {
    type Target = TaskGraph;

    fn deref(&self) -> &TaskGraph {
        &self.graph
    }
}

/// The resolver gave up. The graph is handed back for degraded reporting.
#[derive(Debug, Clone)]
pub struct CycleFailure {
    pub graph: TaskGraph,
    pub error: PlanError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Greedy cycle breaker.
#[derive(Debug, Clone, Copy)]
pub struct CycleResolver {
    max_iterations: usize,
}

impl Default for CycleResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ITERATIONS)
    }
}

impl CycleResolver {
    pub fn new(max_iterations: usize) -> Self {
        Self { max_iterations }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Find one directed cycle, returned as its edge list.
    ///
    /// The cycle starts at the node where the DFS closed it, so the first
    /// edge is the one leaving the earliest-visited node on the cycle.
    pub fn find_cycle(graph: &TaskGraph) -> Option<Vec<(NodeIndex, NodeIndex)>> {
        let mut color = vec![Color::White; graph.len()];

        for root in 0..graph.len() {
            if color[root] != Color::White {
                continue;
            }

            // (node, position of the next successor to visit)
            let mut stack: Vec<(NodeIndex, usize)> = vec![(root, 0)];
            color[root] = Color::Gray;

            while let Some(frame) = stack.last_mut() {
                let (node, cursor) = *frame;
                let successors = graph.dependents(node);

                if cursor >= successors.len() {
                    color[node] = Color::Black;
                    stack.pop();
                    continue;
                }

                frame.1 += 1;
                let next = successors[cursor];
                match color[next] {
                    Color::White => {
                        color[next] = Color::Gray;
                        stack.push((next, 0));
                    }
                    Color::Gray => {
                        let start = stack.iter().position(|&(n, _)| n == next).unwrap_or(0);
                        let mut cycle: Vec<(NodeIndex, NodeIndex)> = stack[start..]
                            .windows(2)
                            .map(|pair| (pair[0].0, pair[1].0))
                            .collect();
                        cycle.push((node, next));
                        return Some(cycle);
                    }
                    Color::Black => {}
                }
            }
        }

        None
    }

    /// Check the graph and break cycles until it is acyclic.
    ///
    /// Every removed edge is recorded as a `RemovedCycleEdge` warning. When
    /// the cap is reached with a cycle still present the graph is returned
    /// inside a [`CycleFailure`] carrying `PlanError::DependencyCycle`.
    pub fn resolve(
        &self,
        mut graph: TaskGraph,
        diagnostics: &mut Diagnostics,
    ) -> std::result::Result<AcyclicGraph, CycleFailure> {
        let mut removed: Vec<(TaskId, TaskId)> = Vec::new();
        let mut iterations = 0;

        loop {
            let Some(cycle) = Self::find_cycle(&graph) else {
                graph.set_state(GraphState::Acyclic);
                debug!(removed = removed.len(), iterations, "dependency graph is acyclic");
                return Ok(AcyclicGraph { graph, removed });
            };

            if iterations >= self.max_iterations {
                graph.set_state(GraphState::Cyclic);
                let remaining: Vec<(TaskId, TaskId)> = cycle
                    .iter()
                    .map(|&(f, t)| (graph.id(f).clone(), graph.id(t).clone()))
                    .collect();
                warn!(
                    iterations,
                    unresolved = remaining.len(),
                    "giving up on dependency cycle resolution"
                );
                return Err(CycleFailure {
                    graph,
                    error: PlanError::DependencyCycle {
                        remaining,
                        removed,
                        iterations,
                    },
                });
            }
            iterations += 1;

            let (from, to) = cycle[0];
            let mut members: Vec<TaskId> = cycle.iter().map(|&(f, _)| graph.id(f).clone()).collect();
            members.push(graph.id(from).clone());

            let from_id = graph.id(from).clone();
            let to_id = graph.id(to).clone();
            graph.remove_edge(from, to);

            diagnostics.push(PlanWarning::RemovedCycleEdge {
                from: from_id.clone(),
                to: to_id.clone(),
                cycle: members,
            });
            removed.push((from_id, to_id));
        }
    }
}
