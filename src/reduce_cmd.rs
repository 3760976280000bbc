use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::core::{InterferenceGraph, NodeId, NodeWeights, ReductionOutcome, SerializedGraph};
use crate::engine::ArtifactSet;
use crate::reduce::{GreedyReduction, greedy_cover};
use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, Serialize)]
pub struct ReduceReport {
    pub unit: String,
    pub strategy: String,
    pub nodes: usize,
    pub edges: usize,
    /// Size of the full greedy cover, independent of `steps`.
    pub cover_size: usize,
    pub outcome: ReductionOutcome,
}

/// Load a graph from an adjacency list or a serialized `.json` graph.
fn load_graph(path: &Path) -> BenchResult<(InterferenceGraph, Option<NodeWeights>)> {
    if path.extension().is_some_and(|e| e == "json") {
        InterferenceGraph::from_serialized(&SerializedGraph::read(path)?)
    } else {
        Ok((InterferenceGraph::load_adjlist(path)?, None))
    }
}

fn unit_name(path: &Path) -> String {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    for suffix in [".graph.json", ".export.pp2graph"] {
        if let Some(unit) = name.strip_suffix(suffix) {
            return unit.to_string();
        }
    }
    name
}

fn join(nodes: &[NodeId]) -> String {
    nodes.iter().map(|n| n.to_string()).collect::<Vec<_>>().join(" ")
}

/// Run the greedy reduction on one graph outside of an experiment.
pub fn run(
    graph_path: PathBuf,
    weights_path: Option<PathBuf>,
    steps: usize,
    weighted: bool,
    outdir: Option<PathBuf>,
    json_out: Option<PathBuf>,
) -> BenchResult<ReduceReport> {
    let (graph, embedded) = load_graph(&graph_path)?;
    let weights = match weights_path {
        Some(p) => Some(NodeWeights::load(&p)?),
        None => embedded,
    };
    let strategy = if weighted { GreedyReduction::weighted() } else { GreedyReduction::unweighted() };
    if weighted && weights.is_none() {
        tracing::warn!("no weights given; every node weighs 1");
    }

    let unit = unit_name(&graph_path);
    let outcome = strategy.run(&graph, weights.as_ref(), steps);
    outcome.validate(&graph)?;
    let report = ReduceReport {
        strategy: if weighted { "weighted-greedy" } else { "greedy" }.to_string(),
        nodes: graph.node_count(),
        edges: graph.edge_count(),
        cover_size: greedy_cover(&graph).len(),
        unit,
        outcome,
    };

    println!("{}: {} nodes, {} edges", report.unit, report.nodes, report.edges);
    for sel in &report.outcome.selections {
        println!(
            "  step {}: selected [{}] freed [{}] residual {}",
            sel.step,
            join(&sel.selected),
            join(&sel.freed),
            sel.residual_size
        );
    }
    println!("  complement: [{}]", join(&report.outcome.complement));
    println!("  greedy cover size: {}", report.cover_size);

    if let Some(dir) = outdir {
        std::fs::create_dir_all(&dir)?;
        let set = ArtifactSet::new(&dir);
        for sel in &report.outcome.selections {
            std::fs::write(set.selection(&report.unit, sel.step), sel.to_selection_line())?;
        }
    }
    if let Some(path) = json_out {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let json = serde_json::to_vec_pretty(&report).map_err(|e| BenchError::Message(e.to_string()))?;
        std::fs::write(&path, json)?;
    }
    Ok(report)
}
