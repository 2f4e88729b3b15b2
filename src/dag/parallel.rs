//! Parallel group detection.
//!
//! Walks the topological order, opening a group at the first unprocessed
//! task and pulling in every later unprocessed task that is unrelated to
//! the group's first task (no path either way) and whose dependencies are
//! all in earlier groups. Reachability is precomputed as a dense matrix,
//! which is O(V²) memory; fine for task lists of tens to hundreds of items.

use std::collections::HashSet;

use crate::dag::builder::{NodeIndex, TaskGraph};
use crate::dag::resolver::AcyclicGraph;
use crate::dag::sort::TopoOrder;
use crate::task::TaskId;

/// Transitive closure of the dependency graph.
#[derive(Debug, Clone)]
pub struct Reachability {
    /// reach[a][b] = there is a non-empty path a -> b
    reach: Vec<Vec<bool>>,
}

impl Reachability {
    pub fn compute(graph: &AcyclicGraph, order: &TopoOrder) -> Self {
        let len = graph.len();
        let mut reach = vec![vec![false; len]; len];

        for &node in order.order().iter().rev() {
            let mut row = vec![false; len];
            for &next in graph.dependents(node) {
                row[next] = true;
                for (target, reachable) in reach[next].iter().enumerate() {
                    if *reachable {
                        row[target] = true;
                    }
                }
            }
            reach[node] = row;
        }

        Self { reach }
    }

    pub fn reaches(&self, from: NodeIndex, to: NodeIndex) -> bool {
        self.reach[from][to]
    }

    /// Whether one task is (transitively) waiting on the other.
    pub fn related(&self, a: NodeIndex, b: NodeIndex) -> bool {
        self.reaches(a, b) || self.reaches(b, a)
    }
}

/// Groups of tasks that can start together once earlier groups finish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelGroups {
    groups: Vec<Vec<NodeIndex>>,
}

impl ParallelGroups {
    pub fn compute(graph: &AcyclicGraph, order: &TopoOrder) -> Self {
        let reachability = Reachability::compute(graph, order);
        let mut processed: HashSet<NodeIndex> = HashSet::with_capacity(graph.len());
        let mut groups = Vec::new();

        for (pos, &anchor) in order.order().iter().enumerate() {
            if processed.contains(&anchor) {
                continue;
            }

            let mut group = vec![anchor];
            for &candidate in &order.order()[pos + 1..] {
                if processed.contains(&candidate) || reachability.related(anchor, candidate) {
                    continue;
                }
                if graph.dependencies_satisfied(candidate, &processed) {
                    group.push(candidate);
                }
            }

            processed.extend(group.iter().copied());
            groups.push(group);
        }

        Self { groups }
    }

    pub fn groups(&self) -> &[Vec<NodeIndex>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn ids(&self, graph: &TaskGraph) -> Vec<Vec<TaskId>> {
        self.groups
            .iter()
            .map(|group| group.iter().map(|&i| graph.id(i).clone()).collect())
            .collect()
    }
}
