//! Graph builder for turning extracted tasks and dependency hints into a graph.
//!
//! Tasks are stored in a dense arena and addressed by `NodeIndex`; external
//! ids are translated once, here. Edges that cannot be placed (unknown
//! endpoint, self-loop) are dropped with a warning rather than failing the
//! build.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::dag::resolver::GraphState;
use crate::errors::{PlanError, Result};
use crate::plan::diagnostics::{Diagnostics, DropReason, PlanWarning};
use crate::task::{EdgeEndpoint, RawEdge, TaskId, TaskNode, TaskSpec};

/// Index into the task arena.
pub type NodeIndex = usize;

/// Directed graph edge: `from` must complete before `to`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeIndex,
    pub to: NodeIndex,
    pub strength: u8,
}

/// The dependency graph for one planning run.
///
/// The node set is fixed once built. Edges may only be removed, and only by
/// the cycle resolver.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    /// Tasks indexed by their position in the input
    nodes: Vec<TaskNode>,
    /// Map from task id to index
    index_map: HashMap<TaskId, NodeIndex>,
    /// Forward edges: index -> tasks that depend on it
    forward_edges: Vec<Vec<NodeIndex>>,
    /// Reverse edges: index -> tasks it depends on
    reverse_edges: Vec<Vec<NodeIndex>>,
    strengths: HashMap<(NodeIndex, NodeIndex), u8>,
    state: GraphState,
}

impl TaskGraph {
    /// Get the number of tasks in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the number of dependency edges.
    pub fn edge_count(&self) -> usize {
        self.strengths.len()
    }

    pub fn node_by_id(&self, id: &TaskId) -> Option<&TaskNode> {
        self.index_map.get(id).and_then(|&i| self.nodes.get(i))
    }

    pub fn index_of(&self, id: &TaskId) -> Option<NodeIndex> {
        self.index_map.get(id).copied()
    }

    pub fn nodes(&self) -> &[TaskNode] {
        &self.nodes
    }

    /// Id of the task at `index`. Panics on an index not produced by this graph.
    pub fn id(&self, index: NodeIndex) -> &TaskId {
        &self.nodes[index].id
    }

    /// Tasks that depend on the given task, in edge insertion order.
    pub fn dependents(&self, index: NodeIndex) -> &[NodeIndex] {
        self.forward_edges
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Tasks the given task depends on, in edge insertion order.
    pub fn dependencies(&self, index: NodeIndex) -> &[NodeIndex] {
        self.reverse_edges
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_edge(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.strengths.contains_key(&(from, to))
    }

    pub fn strength(&self, from: NodeIndex, to: NodeIndex) -> Option<u8> {
        self.strengths.get(&(from, to)).copied()
    }

    /// All edges, ordered by source index then insertion order.
    pub fn edges(&self) -> Vec<Edge> {
        self.forward_edges
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |&to| Edge {
                    from,
                    to,
                    strength: self.strengths.get(&(from, to)).copied().unwrap_or_default(),
                })
            })
            .collect()
    }

    /// Tasks with no dependencies (entry points).
    pub fn root_nodes(&self) -> Vec<NodeIndex> {
        self.reverse_edges
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Tasks nothing depends on (exit points).
    pub fn leaf_nodes(&self) -> Vec<NodeIndex> {
        self.forward_edges
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.is_empty())
            .map(|(i, _)| i)
            .collect()
    }

    /// Check if all dependencies of a task are in `completed`.
    pub fn dependencies_satisfied(&self, index: NodeIndex, completed: &HashSet<NodeIndex>) -> bool {
        self.dependencies(index)
            .iter()
            .all(|dep| completed.contains(dep))
    }

    /// Where this graph stands in cycle checking.
    pub fn state(&self) -> GraphState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: GraphState) {
        self.state = state;
    }

    /// Remove the edge `from -> to`. Returns false if it did not exist.
    pub(crate) fn remove_edge(&mut self, from: NodeIndex, to: NodeIndex) -> bool {
        if self.strengths.remove(&(from, to)).is_none() {
            return false;
        }
        if let Some(targets) = self.forward_edges.get_mut(from) {
            targets.retain(|&t| t != to);
        }
        if let Some(sources) = self.reverse_edges.get_mut(to) {
            sources.retain(|&s| s != from);
        }
        self.state = GraphState::Unchecked;
        true
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> Option<&mut TaskNode> {
        self.nodes.get_mut(index)
    }

    pub(crate) fn into_nodes(self) -> Vec<TaskNode> {
        self.nodes
    }
}

/// Builder for constructing task graphs.
pub struct GraphBuilder {
    tasks: Vec<TaskSpec>,
    edges: Vec<RawEdge>,
}

impl GraphBuilder {
    /// Create a new builder with the given tasks.
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self {
            tasks,
            edges: Vec::new(),
        }
    }

    pub fn with_edges(mut self, edges: Vec<RawEdge>) -> Self {
        self.edges = edges;
        self
    }

    /// Build the task graph.
    ///
    /// Fails only when the node set itself is unusable: empty, a blank or
    /// duplicate id, or a negative / non-finite duration. Edge problems are
    /// recorded in `diagnostics` and the edge is skipped.
    pub fn build(self, diagnostics: &mut Diagnostics) -> Result<TaskGraph> {
        if self.tasks.is_empty() {
            return Err(PlanError::invalid_graph("task list is empty"));
        }

        let mut index_map = HashMap::with_capacity(self.tasks.len());
        for (i, task) in self.tasks.iter().enumerate() {
            if task.id.as_str().trim().is_empty() {
                return Err(PlanError::invalid_graph(format!(
                    "task at position {} has an empty id",
                    i
                )));
            }
            if !task.duration.is_finite() || task.duration < 0.0 {
                return Err(PlanError::invalid_graph(format!(
                    "task '{}' has invalid duration {}",
                    task.id, task.duration
                )));
            }
            if index_map.insert(task.id.clone(), i).is_some() {
                return Err(PlanError::invalid_graph(format!(
                    "duplicate task id '{}'",
                    task.id
                )));
            }
        }

        let nodes: Vec<TaskNode> = self.tasks.iter().map(TaskNode::from_spec).collect();
        let mut forward_edges: Vec<Vec<NodeIndex>> = vec![Vec::new(); nodes.len()];
        let mut reverse_edges: Vec<Vec<NodeIndex>> = vec![Vec::new(); nodes.len()];
        let mut strengths: HashMap<(NodeIndex, NodeIndex), u8> = HashMap::new();

        for raw in &self.edges {
            let from = resolve_endpoint(&raw.from_id, &index_map, nodes.len());
            let to = resolve_endpoint(&raw.to_id, &index_map, nodes.len());

            let (from_idx, to_idx) = match (from, to) {
                (Some(f), Some(t)) => (f, t),
                _ => {
                    diagnostics.push(PlanWarning::DroppedEdge {
                        from: raw.from_id.to_string(),
                        to: raw.to_id.to_string(),
                        reason: DropReason::UnknownEndpoint,
                    });
                    continue;
                }
            };

            if from_idx == to_idx {
                diagnostics.push(PlanWarning::DroppedEdge {
                    from: raw.from_id.to_string(),
                    to: raw.to_id.to_string(),
                    reason: DropReason::SelfLoop,
                });
                continue;
            }

            let strength = raw.strength.clamp(1, 10) as u8;
            if let Some(existing) = strengths.get_mut(&(from_idx, to_idx)) {
                *existing = (*existing).max(strength);
                diagnostics.push(PlanWarning::DuplicateEdge {
                    from: nodes[from_idx].id.clone(),
                    to: nodes[to_idx].id.clone(),
                    strength: *existing,
                });
                continue;
            }

            // from_idx -> to_idx (from must complete before to)
            strengths.insert((from_idx, to_idx), strength);
            forward_edges[from_idx].push(to_idx);
            reverse_edges[to_idx].push(from_idx);
        }

        debug!(
            tasks = nodes.len(),
            edges = strengths.len(),
            raw_edges = self.edges.len(),
            "built task graph"
        );

        Ok(TaskGraph {
            nodes,
            index_map,
            forward_edges,
            reverse_edges,
            strengths,
            state: GraphState::Unchecked,
        })
    }
}

fn resolve_endpoint(
    endpoint: &EdgeEndpoint,
    index_map: &HashMap<TaskId, NodeIndex>,
    len: usize,
) -> Option<NodeIndex> {
    match endpoint {
        EdgeEndpoint::Index(i) if *i < len => Some(*i),
        EdgeEndpoint::Index(_) => None,
        EdgeEndpoint::Id(id) => index_map.get(id).copied(),
        EdgeEndpoint::Invalid(_) => None,
    }
}
