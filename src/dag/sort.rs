//! Topological ordering and node depth.
//!
//! Kahn's algorithm over an [`AcyclicGraph`]. Among tasks that are ready at
//! the same time the order is deterministic: by category rank then input
//! position, or input position only.

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

use crate::dag::builder::{NodeIndex, TaskGraph};
use crate::dag::resolver::AcyclicGraph;
use crate::task::TaskId;

/// Tie-break among equally-ready tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TieBreak {
    /// Earlier categories first (research before testing), then input order
    #[default]
    Category,
    /// Input order only
    Insertion,
}

impl std::fmt::Display for TieBreak {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TieBreak::Category => write!(f, "category"),
            TieBreak::Insertion => write!(f, "insertion"),
        }
    }
}

/// A topological order plus per-node depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopoOrder {
    order: Vec<NodeIndex>,
    /// position[node] = index of node in `order`
    position: Vec<usize>,
    /// depth[node] = longest edge count from any source
    depth: Vec<usize>,
}

impl TopoOrder {
    /// Compute the order for `graph`.
    pub fn compute(graph: &AcyclicGraph, tie_break: TieBreak) -> Self {
        let len = graph.len();
        let rank = |i: NodeIndex| -> u8 {
            match tie_break {
                TieBreak::Category => graph.nodes()[i].category as u8,
                TieBreak::Insertion => 0,
            }
        };

        let mut in_degree: Vec<usize> = (0..len).map(|i| graph.dependencies(i).len()).collect();
        let mut ready: BinaryHeap<Reverse<(u8, NodeIndex)>> = in_degree
            .iter()
            .enumerate()
            .filter(|&(_, deg)| *deg == 0)
            .map(|(i, _)| Reverse((rank(i), i)))
            .collect();

        let mut order = Vec::with_capacity(len);
        let mut depth = vec![0usize; len];

        while let Some(Reverse((_, node))) = ready.pop() {
            depth[node] = graph
                .dependencies(node)
                .iter()
                .map(|&dep| depth[dep] + 1)
                .max()
                .unwrap_or(0);
            order.push(node);

            for &dependent in graph.dependents(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(Reverse((rank(dependent), dependent)));
                }
            }
        }

        debug_assert_eq!(order.len(), len, "acyclic graph must sort completely");

        let mut position = vec![0usize; len];
        for (pos, &node) in order.iter().enumerate() {
            position[node] = pos;
        }

        debug!(
            tasks = len,
            max_depth = depth.iter().max().copied().unwrap_or(0),
            "computed topological order"
        );

        Self {
            order,
            position,
            depth,
        }
    }

    pub fn order(&self) -> &[NodeIndex] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn position(&self, node: NodeIndex) -> usize {
        self.position[node]
    }

    pub fn depth(&self, node: NodeIndex) -> usize {
        self.depth[node]
    }

    /// The order rendered as task ids.
    pub fn ids(&self, graph: &TaskGraph) -> Vec<TaskId> {
        self.order.iter().map(|&i| graph.id(i).clone()).collect()
    }

    /// Whether every edge `u -> v` of `graph` has `u` placed before `v`.
    pub fn respects(&self, graph: &TaskGraph) -> bool {
        self.order.len() == graph.len()
            && graph
                .edges()
                .iter()
                .all(|e| self.position[e.from] < self.position[e.to])
    }
}
