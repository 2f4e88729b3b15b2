//! Duration-weighted critical path.
//!
//! `cost(n) = duration(n) + max(cost(s))` over successors `s`, computed in
//! reverse topological order. The path starts at the source with the
//! largest cost and repeatedly follows the successor with the largest cost.
//! Ties go to the earlier candidate (topological order for the start,
//! adjacency order afterwards).

use crate::dag::builder::{NodeIndex, TaskGraph};
use crate::dag::resolver::AcyclicGraph;
use crate::dag::sort::TopoOrder;
use crate::task::TaskId;

/// Longest duration-weighted path through the DAG.
#[derive(Debug, Clone, PartialEq)]
pub struct CriticalPath {
    path: Vec<NodeIndex>,
    /// cost[node] = duration of the heaviest path starting at node
    cost: Vec<f64>,
    on_path: Vec<bool>,
}

impl CriticalPath {
    /// Compute costs and the critical path. O(V + E).
    pub fn compute(graph: &AcyclicGraph, order: &TopoOrder) -> Self {
        let mut cost = vec![0.0f64; graph.len()];

        for &node in order.order().iter().rev() {
            let downstream = graph
                .dependents(node)
                .iter()
                .map(|&s| cost[s])
                .fold(0.0f64, f64::max);
            cost[node] = graph.nodes()[node].duration + downstream;
        }

        let mut sources = graph.root_nodes();
        sources.sort_by_key(|&node| order.position(node));

        let mut start: Option<NodeIndex> = None;
        for node in sources {
            match start {
                Some(best) if cost[node] <= cost[best] => {}
                _ => start = Some(node),
            }
        }

        let mut path = Vec::new();
        let mut current = start;
        while let Some(node) = current {
            path.push(node);
            current = None;
            for &next in graph.dependents(node) {
                match current {
                    Some(best) if cost[next] <= cost[best] => {}
                    _ => current = Some(next),
                }
            }
        }

        let mut on_path = vec![false; graph.len()];
        for &node in &path {
            on_path[node] = true;
        }

        Self {
            path,
            cost,
            on_path,
        }
    }

    pub fn path(&self) -> &[NodeIndex] {
        &self.path
    }

    /// Total duration along the path, equal to the start node's cost.
    pub fn total(&self) -> f64 {
        self.path.first().map_or(0.0, |&start| self.cost[start])
    }

    pub fn cost(&self, node: NodeIndex) -> f64 {
        self.cost[node]
    }

    pub fn contains(&self, node: NodeIndex) -> bool {
        self.on_path.get(node).copied().unwrap_or(false)
    }

    pub fn ids(&self, graph: &TaskGraph) -> Vec<TaskId> {
        self.path.iter().map(|&i| graph.id(i).clone()).collect()
    }
}
