//! Greedy vertex-cover approximation.
//!
//! Each step scans the residual graph in ascending node order, drops every
//! isolated node as free, then moves the node with the highest score into the
//! cover. The unweighted score is the degree; the weighted score is
//! `degree / weight`. Ties go to the lowest node id. Nodes never chosen form the
//! independent complement.

use crate::BenchResult;
use crate::core::{InterferenceGraph, NodeId, NodeWeights, ReductionOutcome, StepSelection};

use super::traits::{ReductionRequest, ReductionStrategy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    Degree,
    DegreePerWeight,
}

#[derive(Debug, Clone, Copy)]
pub struct GreedyReduction {
    scoring: Scoring,
}

impl GreedyReduction {
    pub fn unweighted() -> Self {
        GreedyReduction {
            scoring: Scoring::Degree,
        }
    }

    pub fn weighted() -> Self {
        GreedyReduction {
            scoring: Scoring::DegreePerWeight,
        }
    }

    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    /// Run `steps` greedy iterations over a copy of `graph`.
    pub fn run(&self, graph: &InterferenceGraph, weights: Option<&NodeWeights>, steps: usize) -> ReductionOutcome {
        let mut residual = graph.clone();
        let mut selections = Vec::with_capacity(steps);
        for step in 0..steps {
            let (selected, freed) = self.iterate(&mut residual, weights);
            selections.push(StepSelection {
                step,
                selected: selected.into_iter().collect(),
                freed,
                residual_size: residual.node_count(),
            });
        }
        ReductionOutcome::new(graph, selections)
    }

    /// Iterate until the residual graph is empty and return the whole cover.
    pub fn cover(&self, graph: &InterferenceGraph, weights: Option<&NodeWeights>) -> Vec<NodeId> {
        let mut residual = graph.clone();
        let mut cover = Vec::new();
        while !residual.is_empty() {
            let (selected, _) = self.iterate(&mut residual, weights);
            cover.extend(selected);
        }
        cover
    }

    /// One scan: free isolated nodes, pick the best-scoring node.
    fn iterate(
        &self,
        residual: &mut InterferenceGraph,
        weights: Option<&NodeWeights>,
    ) -> (Option<NodeId>, Vec<NodeId>) {
        let mut best: Option<(NodeId, f64)> = None;
        let mut freed = Vec::new();
        for (node, degree) in residual.degrees() {
            if degree == 0 {
                freed.push(node);
                continue;
            }
            let score = self.score(node, degree, weights);
            if best.is_none_or(|(_, s)| score > s) {
                best = Some((node, score));
            }
        }
        for n in &freed {
            residual.remove_node(*n);
        }
        let selected = best.map(|(n, _)| n);
        if let Some(n) = selected {
            residual.remove_node(n);
        }
        (selected, freed)
    }

    fn score(&self, node: NodeId, degree: usize, weights: Option<&NodeWeights>) -> f64 {
        match self.scoring {
            Scoring::Degree => degree as f64,
            Scoring::DegreePerWeight => {
                let w = weights.map(|w| w.weight(node)).unwrap_or(1.0);
                degree as f64 / w
            }
        }
    }
}

impl ReductionStrategy for GreedyReduction {
    fn name(&self) -> &str {
        match self.scoring {
            Scoring::Degree => "greedy",
            Scoring::DegreePerWeight => "weighted-greedy",
        }
    }

    fn needs_weights(&self) -> bool {
        self.scoring == Scoring::DegreePerWeight
    }

    fn reduce(&self, request: &ReductionRequest<'_>) -> BenchResult<ReductionOutcome> {
        let outcome = self.run(request.graph, request.weights, request.steps);
        tracing::debug!(
            unit = request.unit,
            strategy = self.name(),
            steps = request.steps,
            complement = outcome.complement.len(),
            "greedy reduction finished"
        );
        Ok(outcome)
    }
}

/// Full greedy cover with degree scoring.
pub fn greedy_cover(graph: &InterferenceGraph) -> Vec<NodeId> {
    GreedyReduction::unweighted().cover(graph, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path4() -> InterferenceGraph {
        InterferenceGraph::from_edges([1, 2, 3, 4], [(1, 2), (2, 3), (3, 4)]).unwrap()
    }

    fn selected(outcome: &ReductionOutcome) -> Vec<Vec<NodeId>> {
        outcome.selections.iter().map(|s| s.selected.clone()).collect()
    }

    #[test]
    fn test_path_scenario_two_steps() {
        let outcome = GreedyReduction::unweighted().run(&path4(), None, 2);
        assert_eq!(selected(&outcome), vec![vec![2], vec![3]]);
        assert_eq!(outcome.complement, vec![1, 4]);
        assert_eq!(outcome.selections[0].freed, Vec::<NodeId>::new());
        assert_eq!(outcome.selections[0].residual_size, 3);
        assert_eq!(outcome.selections[1].freed, vec![1]);
        assert_eq!(outcome.selections[1].residual_size, 1);
        outcome.validate(&path4()).unwrap();
    }

    #[test]
    fn test_residual_reaches_zero_within_node_count() {
        let graph = InterferenceGraph::from_edges(
            0..8,
            [(0, 1), (0, 2), (0, 3), (1, 2), (4, 5), (5, 6), (6, 7), (7, 4)],
        )
        .unwrap();
        let outcome = GreedyReduction::unweighted().run(&graph, None, graph.node_count());
        outcome.validate(&graph).unwrap();
        let sizes: Vec<usize> = outcome.selections.iter().map(|s| s.residual_size).collect();
        assert!(sizes.windows(2).all(|w| w[1] <= w[0]));
        assert_eq!(*sizes.last().unwrap(), 0);
    }

    #[test]
    fn test_steps_beyond_exhaustion_are_empty() {
        let outcome = GreedyReduction::unweighted().run(&path4(), None, 6);
        let tail = &outcome.selections[4..];
        assert!(tail.iter().all(|s| s.selected.is_empty() && s.freed.is_empty() && s.residual_size == 0));
        outcome.validate(&path4()).unwrap();
    }

    #[test]
    fn test_greedy_is_deterministic() {
        let graph = InterferenceGraph::from_edges(
            [10, 3, 7, 1, 5],
            [(10, 3), (3, 7), (7, 1), (1, 10), (5, 3), (5, 7)],
        )
        .unwrap();
        let weights = NodeWeights::parse("10 2\n3 0.5\n7 1.5\n").unwrap();
        for strategy in [GreedyReduction::unweighted(), GreedyReduction::weighted()] {
            let a = strategy.run(&graph, Some(&weights), 4);
            let b = strategy.run(&graph, Some(&weights), 4);
            assert_eq!(a, b);
            assert_eq!(
                serde_json::to_vec(&a).unwrap(),
                serde_json::to_vec(&b).unwrap()
            );
        }
    }

    #[test]
    fn test_equal_weights_match_unweighted() {
        let graph = InterferenceGraph::from_edges(
            0..7,
            [(0, 1), (0, 2), (1, 2), (2, 3), (3, 4), (4, 5), (5, 6), (6, 3)],
        )
        .unwrap();
        let weights = NodeWeights::uniform(&graph, 3.0).unwrap();
        let plain = GreedyReduction::unweighted().run(&graph, None, 7);
        let weighted = GreedyReduction::weighted().run(&graph, Some(&weights), 7);
        assert_eq!(plain, weighted);
    }

    #[test]
    fn test_weight_changes_choice() {
        // Node 2 has the higher degree but is expensive to reveal.
        let weights = NodeWeights::parse("2 10\n").unwrap();
        let outcome = GreedyReduction::weighted().run(&path4(), Some(&weights), 1);
        assert_eq!(selected(&outcome), vec![vec![3]]);
    }

    #[test]
    fn test_tie_goes_to_lowest_id() {
        let graph = InterferenceGraph::from_edges([9, 4, 6], [(9, 4), (4, 6), (6, 9)]).unwrap();
        let outcome = GreedyReduction::unweighted().run(&graph, None, 1);
        assert_eq!(selected(&outcome), vec![vec![4]]);
    }

    #[test]
    fn test_cover_touches_every_edge() {
        let graph = InterferenceGraph::from_edges(
            0..6,
            [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 3)],
        )
        .unwrap();
        let cover = greedy_cover(&graph);
        assert!(graph.edges().all(|(a, b)| cover.contains(&a) || cover.contains(&b)));
    }

    #[test]
    fn test_empty_graph() {
        let graph = InterferenceGraph::new();
        let outcome = GreedyReduction::unweighted().run(&graph, None, 2);
        assert_eq!(outcome.selections.len(), 2);
        assert!(outcome.complement.is_empty());
        assert!(greedy_cover(&graph).is_empty());
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!(GreedyReduction::unweighted().name(), "greedy");
        assert!(!GreedyReduction::unweighted().needs_weights());
        assert_eq!(GreedyReduction::weighted().name(), "weighted-greedy");
        assert!(GreedyReduction::weighted().needs_weights());
    }
}
