//! Task dependency graph and the ordering stages that run over it.
//!
//! ## Architecture
//!
//! The stages run strictly in this order, each a pure function of the
//! output of the previous one:
//!
//! 1. **Builder** - Builds an arena graph from task descriptors and raw edges
//! 2. **Resolver** - Breaks cycles greedily and certifies the graph acyclic
//! 3. **Sort** - Kahn topological order plus per-task depth
//! 4. **Critical** - Duration-weighted longest path
//! 5. **Parallel** - Groups of tasks that can start together
//!
//! ## Example
//!
//! ```
//! use taskplan::dag::{CriticalPath, CycleResolver, GraphBuilder, ParallelGroups, TieBreak, TopoOrder};
//! use taskplan::plan::Diagnostics;
//! use taskplan::task::{RawEdge, TaskSpec};
//!
//! let tasks = vec![
//!     TaskSpec::new("A", 2.0),
//!     TaskSpec::new("B", 3.0),
//!     TaskSpec::new("C", 1.0),
//!     TaskSpec::new("D", 4.0),
//! ];
//! let edges = vec![
//!     RawEdge::new("A", "B"),
//!     RawEdge::new("A", "C"),
//!     RawEdge::new("B", "D"),
//!     RawEdge::new("C", "D"),
//! ];
//!
//! let mut diagnostics = Diagnostics::new();
//! let graph = GraphBuilder::new(tasks).with_edges(edges).build(&mut diagnostics).unwrap();
//! let graph = CycleResolver::default().resolve(graph, &mut diagnostics).unwrap();
//!
//! let order = TopoOrder::compute(&graph, TieBreak::Insertion);
//! let critical = CriticalPath::compute(&graph, &order);
//! let groups = ParallelGroups::compute(&graph, &order);
//!
//! assert_eq!(critical.total(), 9.0);
//! // Group 0: [A], group 1: [B, C], group 2: [D]
//! assert_eq!(groups.len(), 3);
//! ```

mod builder;
mod critical;
mod parallel;
mod resolver;
mod sort;

pub use builder::{Edge, GraphBuilder, NodeIndex, TaskGraph};
pub use critical::CriticalPath;
pub use parallel::{ParallelGroups, Reachability};
pub use resolver::{
    AcyclicGraph, CycleFailure, CycleResolver, DEFAULT_MAX_ITERATIONS, GraphState,
};
pub use sort::{TieBreak, TopoOrder};
