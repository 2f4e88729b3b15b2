//! Greedy member assignment.
//!
//! Tasks are visited in topological order. Each member with at least one
//! matching skill is scored as
//!
//! ```text
//! skill_weight * overlap + capacity_weight * available + criticality_weight * (1 + cost / divisor)
//! ```
//!
//! and the best-scoring member (first in roster order on ties) takes the
//! task, adding its duration to their running load. Tasks that require no
//! skills, or whose skills nobody has, stay unassigned.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::dag::{AcyclicGraph, CriticalPath, TopoOrder};
use crate::plan::diagnostics::{Diagnostics, PlanWarning, UnassignedReason};
use crate::task::{TaskId, TaskNode};
use crate::team::{Member, MemberId, MemberSpec};

/// Scoring weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssignmentWeights {
    pub skill: f64,
    pub capacity: f64,
    pub criticality: f64,
    /// Critical-path cost is divided by this before entering the score
    pub criticality_divisor: f64,
}

impl Default for AssignmentWeights {
    fn default() -> Self {
        Self {
            skill: 0.6,
            capacity: 0.2,
            criticality: 0.2,
            criticality_divisor: 10.0,
        }
    }
}

/// One task handed to one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub task_id: TaskId,
    pub member_id: MemberId,
    pub score: f64,
    pub skill_overlap: f64,
}

/// Final load of one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberLoad {
    pub member_id: MemberId,
    pub load: f64,
    pub capacity_per_period: f64,
}

/// Result of an assignment walk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssignmentTable {
    /// In the order the assignments were made
    pub assignments: Vec<Assignment>,
    pub member_loads: Vec<MemberLoad>,
}

impl AssignmentTable {
    /// Task id -> member id. Unassigned tasks are absent.
    pub fn by_task(&self) -> BTreeMap<TaskId, MemberId> {
        self.assignments
            .iter()
            .map(|a| (a.task_id.clone(), a.member_id.clone()))
            .collect()
    }

    pub fn member_for(&self, task: &TaskId) -> Option<&MemberId> {
        self.assignments
            .iter()
            .find(|a| &a.task_id == task)
            .map(|a| &a.member_id)
    }
}

/// Walks tasks once, holding the only mutable member state in the engine.
#[derive(Debug, Clone)]
pub struct AssignmentEngine {
    weights: AssignmentWeights,
    members: Vec<Member>,
}

impl AssignmentEngine {
    pub fn new(weights: AssignmentWeights, roster: &[MemberSpec]) -> Self {
        Self {
            weights,
            members: roster.iter().map(Member::from_spec).collect(),
        }
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Score `member` for `task`. `None` when they share no skill.
    pub fn score(&self, member: &Member, task: &TaskNode, critical_cost: f64) -> Option<f64> {
        let overlap = member.skill_overlap_ratio(&task.required_skills);
        if overlap <= 0.0 {
            return None;
        }
        let criticality = 1.0 + critical_cost / self.weights.criticality_divisor;
        Some(
            self.weights.skill * overlap
                + self.weights.capacity * member.available_capacity()
                + self.weights.criticality * criticality,
        )
    }

    /// Assign every task in `order`, writing `assignee` onto the graph.
    pub fn assign(
        mut self,
        graph: &mut AcyclicGraph,
        order: &TopoOrder,
        critical: &CriticalPath,
        diagnostics: &mut Diagnostics,
    ) -> AssignmentTable {
        let mut assignments = Vec::new();

        for &node in order.order() {
            let task = &graph.nodes()[node];
            if task.required_skills.is_empty() {
                diagnostics.push(PlanWarning::UnassignedTask {
                    task: task.id.clone(),
                    reason: UnassignedReason::NoRequiredSkills,
                });
                continue;
            }

            let mut best: Option<(usize, f64)> = None;
            for (i, member) in self.members.iter().enumerate() {
                let Some(score) = self.score(member, task, critical.cost(node)) else {
                    continue;
                };
                match best {
                    Some((_, top)) if score <= top => {}
                    _ => best = Some((i, score)),
                }
            }

            let Some((winner, score)) = best else {
                diagnostics.push(PlanWarning::UnassignedTask {
                    task: task.id.clone(),
                    reason: UnassignedReason::NoSkillMatch,
                });
                continue;
            };

            let member = &mut self.members[winner];
            let skill_overlap = member.skill_overlap_ratio(&task.required_skills);
            member.current_load += task.duration;
            let assignment = Assignment {
                task_id: task.id.clone(),
                member_id: member.id.clone(),
                score,
                skill_overlap,
            };

            if let Some(node) = graph.node_mut(node) {
                node.assignee = Some(assignment.member_id.clone());
            }
            assignments.push(assignment);
        }

        debug!(
            assigned = assignments.len(),
            tasks = order.len(),
            "assigned tasks to members"
        );

        AssignmentTable {
            assignments,
            member_loads: self
                .members
                .into_iter()
                .map(|m| MemberLoad {
                    member_id: m.id,
                    load: m.current_load,
                    capacity_per_period: m.capacity_per_period,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dag::{CycleResolver, GraphBuilder, TieBreak};
    use crate::task::{RawEdge, TaskSpec};

    struct Fixture {
        graph: AcyclicGraph,
        order: TopoOrder,
        critical: CriticalPath,
    }

    fn fixture(tasks: Vec<TaskSpec>, edges: &[(&str, &str)]) -> Fixture {
        let mut diagnostics = Diagnostics::new();
        let graph = GraphBuilder::new(tasks)
            .with_edges(edges.iter().map(|&(f, t)| RawEdge::new(f, t)).collect())
            .build(&mut diagnostics)
            .unwrap();
        let graph = CycleResolver::default().resolve(graph, &mut diagnostics).unwrap();
        let order = TopoOrder::compute(&graph, TieBreak::Insertion);
        let critical = CriticalPath::compute(&graph, &order);
        Fixture {
            graph,
            order,
            critical,
        }
    }

    fn run(f: &mut Fixture, roster: &[MemberSpec]) -> (AssignmentTable, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let table = AssignmentEngine::new(AssignmentWeights::default(), roster).assign(
            &mut f.graph,
            &f.order,
            &f.critical,
            &mut diagnostics,
        );
        (table, diagnostics)
    }

    #[test]
    fn test_score_formula() {
        let f = fixture(vec![TaskSpec::new("t", 2.0).with_skills(&["rust", "sql"])], &[]);
        let engine = AssignmentEngine::new(
            AssignmentWeights::default(),
            &[MemberSpec::new("m", &["rust"], 5.0)],
        );
        let score = engine
            .score(&engine.members()[0], &f.graph.nodes()[0], 10.0)
            .unwrap();
        // 0.6 * 0.5 + 0.2 * 5 + 0.2 * 2
        assert!((score - 1.7).abs() < 1e-9);
    }

    #[test]
    fn test_no_overlap_scores_none() {
        let f = fixture(vec![TaskSpec::new("t", 2.0).with_skills(&["go"])], &[]);
        let engine = AssignmentEngine::new(
            AssignmentWeights::default(),
            &[MemberSpec::new("m", &["rust"], 5.0)],
        );
        assert!(engine.score(&engine.members()[0], &f.graph.nodes()[0], 1.0).is_none());
    }

    #[test]
    fn test_best_skill_match_wins() {
        let mut f = fixture(vec![TaskSpec::new("api", 3.0).with_skills(&["rust", "sql"])], &[]);
        let roster = [
            MemberSpec::new("half", &["rust"], 10.0),
            MemberSpec::new("full", &["Rust", "SQL"], 10.0),
        ];
        let (table, diagnostics) = run(&mut f, &roster);

        assert_eq!(table.member_for(&TaskId::from("api")), Some(&MemberId::from("full")));
        assert_eq!(table.assignments[0].skill_overlap, 1.0);
        assert_eq!(
            f.graph.node_by_id(&TaskId::from("api")).unwrap().assignee,
            Some(MemberId::from("full"))
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_load_spreads_work() {
        let mut f = fixture(
            vec![
                TaskSpec::new("t1", 4.0).with_skills(&["rust"]),
                TaskSpec::new("t2", 4.0).with_skills(&["rust"]),
            ],
            &[],
        );
        let roster = [
            MemberSpec::new("ana", &["rust"], 4.0),
            MemberSpec::new("bo", &["rust"], 4.0),
        ];
        let (table, _) = run(&mut f, &roster);

        let by_task = table.by_task();
        assert_eq!(by_task[&TaskId::from("t1")], MemberId::from("ana"));
        assert_eq!(by_task[&TaskId::from("t2")], MemberId::from("bo"));
        assert_eq!(table.member_loads[0].load, 4.0);
        assert_eq!(table.member_loads[1].load, 4.0);
    }

    #[test]
    fn test_ties_go_to_first_member() {
        let mut f = fixture(vec![TaskSpec::new("t", 1.0).with_skills(&["ux"])], &[]);
        let roster = [
            MemberSpec::new("first", &["ux"], 3.0),
            MemberSpec::new("second", &["ux"], 3.0),
        ];
        let (table, _) = run(&mut f, &roster);
        assert_eq!(table.assignments[0].member_id, MemberId::from("first"));
    }

    #[test]
    fn test_unassignable_tasks_are_reported() {
        let mut f = fixture(
            vec![
                TaskSpec::new("docs", 1.0),
                TaskSpec::new("ml", 2.0).with_skills(&["pytorch"]),
                TaskSpec::new("web", 2.0).with_skills(&["react"]),
            ],
            &[],
        );
        let (table, diagnostics) = run(&mut f, &[MemberSpec::new("m", &["react"], 8.0)]);

        let by_task = table.by_task();
        assert_eq!(by_task.len(), 1);
        assert!(by_task.contains_key(&TaskId::from("web")));
        assert_eq!(
            diagnostics.warnings(),
            &[
                PlanWarning::UnassignedTask {
                    task: TaskId::from("docs"),
                    reason: UnassignedReason::NoRequiredSkills,
                },
                PlanWarning::UnassignedTask {
                    task: TaskId::from("ml"),
                    reason: UnassignedReason::NoSkillMatch,
                },
            ]
        );
    }

    #[test]
    fn test_every_assignment_shares_a_skill() {
        let mut f = fixture(
            vec![
                TaskSpec::new("a", 2.0).with_skills(&["rust"]),
                TaskSpec::new("b", 3.0).with_skills(&["react", "css"]),
                TaskSpec::new("c", 1.0).with_skills(&["sql"]),
                TaskSpec::new("d", 5.0).with_skills(&["rust", "sql"]),
            ],
            &[("a", "b"), ("a", "d"), ("c", "d")],
        );
        let roster = [
            MemberSpec::new("back", &["rust", "sql"], 6.0),
            MemberSpec::new("front", &["css", "react"], 6.0),
        ];
        let (table, _) = run(&mut f, &roster);

        assert_eq!(table.assignments.len(), 4);
        for assignment in &table.assignments {
            let task = f.graph.node_by_id(&assignment.task_id).unwrap();
            let member = roster.iter().find(|m| m.id == assignment.member_id).unwrap();
            let skills: Vec<String> = member.skills.iter().map(|s| s.to_lowercase()).collect();
            assert!(task.required_skills.iter().any(|s| skills.contains(s)));
        }
    }
}
