//! Graph sanity check: `taskplan check`.

use anyhow::Result;
use std::path::Path;

use taskplan::dag::{CycleResolver, GraphBuilder, NodeIndex, TaskGraph};
use taskplan::plan::{Diagnostics, PlanWarning};
use taskplan::PlanInput;

use super::config::load_plan_toml;

/// Build and cycle-check the graph, printing a summary. Fails when cycles
/// remain after the resolver's cap.
pub fn cmd_check(project_dir: &Path, config: Option<&Path>, input: &Path) -> Result<()> {
    let toml = load_plan_toml(project_dir, config)?;
    let request = PlanInput::load(input)?;

    let mut diagnostics = Diagnostics::new();
    let graph = GraphBuilder::new(request.tasks.clone())
        .with_edges(request.edges.clone())
        .build(&mut diagnostics)?;
    let (tasks, edges) = (graph.len(), graph.edge_count());

    let resolved = CycleResolver::new(toml.max_iterations()).resolve(graph, &mut diagnostics);

    println!();
    println!("Input: {}", input.display());
    println!("  tasks = {}", tasks);
    println!("  edges = {} (after hygiene)", edges);
    println!("  members = {}", request.members.len());
    println!();

    let mut dropped = 0;
    let mut merged = 0;
    for warning in diagnostics.warnings() {
        match warning {
            PlanWarning::DroppedEdge { .. } => dropped += 1,
            PlanWarning::DuplicateEdge { .. } => merged += 1,
            _ => {}
        }
    }
    println!("Dropped edges: {}", dropped);
    println!("Merged duplicate edges: {}", merged);

    let outcome = match resolved {
        Ok(graph) => {
            println!("Edges removed to break cycles: {}", graph.removed_edges().len());
            for (from, to) in graph.removed_edges() {
                println!("  - {} -> {}", from, to);
            }
            println!("Entry tasks: {}", names(&graph, &graph.root_nodes()));
            println!("Exit tasks: {}", names(&graph, &graph.leaf_nodes()));
            println!();
            println!("Graph is acyclic.");
            Ok(())
        }
        Err(failure) => {
            println!();
            println!("Graph is still cyclic: {}", failure.error);
            Err(failure.error)
        }
    };

    if !diagnostics.is_empty() {
        println!();
        println!("Warnings:");
        for warning in diagnostics.warnings() {
            println!("  - {}", warning);
        }
    }
    println!();

    outcome?;
    Ok(())
}

fn names(graph: &TaskGraph, nodes: &[NodeIndex]) -> String {
    nodes
        .iter()
        .map(|&n| graph.id(n).as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
