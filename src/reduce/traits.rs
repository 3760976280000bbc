//! Reduction strategy trait and request type.

use std::path::Path;

use crate::BenchResult;
use crate::core::{InterferenceGraph, NodeWeights, ReductionOutcome};

/// Everything a strategy needs to reduce one unit's graph.
#[derive(Debug, Clone, Copy)]
pub struct ReductionRequest<'a> {
    /// Unit name (graph export stem).
    pub unit: &'a str,
    pub graph: &'a InterferenceGraph,
    pub weights: Option<&'a NodeWeights>,
    /// Number of extraction steps to produce.
    pub steps: usize,
    /// Serialized form of `graph`, for strategies that run out of process.
    pub serialized: Option<&'a Path>,
}

impl<'a> ReductionRequest<'a> {
    pub fn new(unit: &'a str, graph: &'a InterferenceGraph, steps: usize) -> Self {
        ReductionRequest {
            unit,
            graph,
            weights: None,
            steps,
            serialized: None,
        }
    }

    pub fn with_weights(mut self, weights: Option<&'a NodeWeights>) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_serialized(mut self, path: &'a Path) -> Self {
        self.serialized = Some(path);
        self
    }
}

/// Produces one node selection per extraction step.
///
/// Implementations must return exactly `steps` selections whose node sets are
/// pairwise disjoint, with non-increasing residual sizes. A strategy never
/// retries on its own; failures are reported as errors and the pipeline
/// decides whether to call again.
pub trait ReductionStrategy: Send + Sync {
    /// Returns the strategy name (e.g., "greedy").
    fn name(&self) -> &str;

    /// Whether the strategy needs node weights.
    fn needs_weights(&self) -> bool {
        false
    }

    fn reduce(&self, request: &ReductionRequest<'_>) -> BenchResult<ReductionOutcome>;
}
