//! Per-step node selections produced by a reduction strategy.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::graph::{InterferenceGraph, NodeId};
use crate::{BenchError, BenchResult};

/// Nodes revealed at one extraction step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSelection {
    pub step: usize,
    /// Cover members chosen at this step, in selection order.
    pub selected: Vec<NodeId>,
    /// Isolated nodes dropped from the residual graph at this step.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub freed: Vec<NodeId>,
    /// Residual graph size after this step's removals.
    pub residual_size: usize,
}

impl StepSelection {
    /// Selection-file body: whitespace-delimited node ids.
    pub fn to_selection_line(&self) -> String {
        let mut line = self
            .selected
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        line.push('\n');
        line
    }
}

/// Parse a selection file body into node ids.
pub fn parse_selection(text: &str) -> BenchResult<Vec<NodeId>> {
    text.split_whitespace()
        .map(|tok| {
            tok.parse::<NodeId>()
                .map_err(|e| BenchError::Message(format!("invalid node id `{tok}` in selection: {e}")))
        })
        .collect()
}

pub fn read_selection(path: &Path) -> BenchResult<Vec<NodeId>> {
    if !path.exists() {
        return Err(BenchError::ArtifactMissing {
            path: path.to_path_buf(),
        });
    }
    parse_selection(&std::fs::read_to_string(path)?)
}

/// Full result of reducing one unit's graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionOutcome {
    pub original_size: usize,
    pub selections: Vec<StepSelection>,
    /// Nodes never selected as cover members, ascending.
    pub complement: Vec<NodeId>,
}

impl ReductionOutcome {
    pub fn new(graph: &InterferenceGraph, selections: Vec<StepSelection>) -> Self {
        let chosen: BTreeSet<NodeId> = selections
            .iter()
            .flat_map(|s| s.selected.iter().copied())
            .collect();
        let complement = graph.nodes().filter(|n| !chosen.contains(n)).collect();
        ReductionOutcome {
            original_size: graph.node_count(),
            selections,
            complement,
        }
    }

    /// Residual graph size seen by allocation step `step` (after `step` selections).
    pub fn residual_before(&self, step: usize) -> usize {
        if step == 0 {
            return self.original_size;
        }
        self.selections
            .get(step - 1)
            .or_else(|| self.selections.last())
            .map(|s| s.residual_size)
            .unwrap_or(self.original_size)
    }

    /// Number of cover members revealed to allocation step `step`.
    pub fn revealed_before(&self, step: usize) -> usize {
        self.selections.iter().take(step).map(|s| s.selected.len()).sum()
    }

    /// Check the partition and monotonic-shrink invariants against `graph`.
    pub fn validate(&self, graph: &InterferenceGraph) -> BenchResult<()> {
        let mut seen = BTreeSet::new();
        let mut previous = graph.node_count();
        for (i, sel) in self.selections.iter().enumerate() {
            if sel.step != i {
                return Err(BenchError::Message(format!(
                    "selection {i} is labelled step {}",
                    sel.step
                )));
            }
            for n in sel.selected.iter().chain(&sel.freed) {
                if !graph.contains(*n) {
                    return Err(BenchError::Message(format!("step {i} names unknown node {n}")));
                }
                if !seen.insert(*n) {
                    return Err(BenchError::Message(format!("step {i} repeats node {n}")));
                }
            }
            if sel.residual_size > previous {
                return Err(BenchError::Message(format!(
                    "residual grew at step {i}: {previous} -> {}",
                    sel.residual_size
                )));
            }
            previous = sel.residual_size;
        }

        let selected: BTreeSet<NodeId> = self
            .selections
            .iter()
            .flat_map(|s| s.selected.iter().copied())
            .collect();
        let complement: BTreeSet<NodeId> = self.complement.iter().copied().collect();
        if !selected.is_disjoint(&complement) {
            return Err(BenchError::Message("complement overlaps the selections".into()));
        }
        let covered = selected.len() + complement.len();
        if covered != graph.node_count() || complement.len() != self.complement.len() {
            return Err(BenchError::Message(format!(
                "selections and complement cover {covered} of {} nodes",
                graph.node_count()
            )));
        }
        Ok(())
    }
}
