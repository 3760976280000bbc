//! Shape statistics of interference graphs.
//!
//! Isolated nodes are dropped first; every remaining connected component is
//! described by its size and edge density `2e / (n(n-1))`.

use crate::core::InterferenceGraph;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphShape {
    pub unit: String,
    pub nodes: usize,
    pub edges: usize,
    pub isolated: usize,
    /// Components with at least one edge.
    pub components: usize,
    pub largest_component: usize,
    /// Per-component densities, in component order.
    pub densities: Vec<f64>,
}

impl GraphShape {
    pub fn of(unit: impl Into<String>, graph: &InterferenceGraph) -> Self {
        let mut densities = Vec::new();
        let mut largest = 0;
        for component in graph.connected_components() {
            let n = component.len();
            if n < 2 {
                continue;
            }
            let degree_sum: usize = component.iter().filter_map(|v| graph.degree(*v)).sum();
            let e = degree_sum / 2;
            densities.push(2.0 * e as f64 / (n as f64 * (n as f64 - 1.0)));
            largest = largest.max(n);
        }
        GraphShape {
            unit: unit.into(),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            isolated: graph.isolated_nodes().len(),
            components: densities.len(),
            largest_component: largest,
            densities,
        }
    }

    pub fn mean_density(&self) -> Option<f64> {
        mean(&self.densities)
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Geometric mean; `None` when empty or any value is non-positive.
pub fn geometric_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|v| *v <= 0.0) {
        return None;
    }
    Some((values.iter().map(|v| v.ln()).sum::<f64>() / values.len() as f64).exp())
}

/// Densities pooled over every component of every unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSummary {
    pub units: usize,
    pub components: usize,
    pub mean_density: Option<f64>,
    pub geometric_mean_density: Option<f64>,
    pub mean_component_size: Option<f64>,
}

impl GraphSummary {
    pub fn of(shapes: &[GraphShape], sizes: &[usize]) -> Self {
        let densities: Vec<f64> = shapes.iter().flat_map(|s| s.densities.iter().copied()).collect();
        let sizes: Vec<f64> = sizes.iter().map(|n| *n as f64).collect();
        GraphSummary {
            units: shapes.len(),
            components: densities.len(),
            mean_density: mean(&densities),
            geometric_mean_density: geometric_mean(&densities),
            mean_component_size: mean(&sizes),
        }
    }
}

/// Sizes of every non-trivial component of `graph`.
pub fn component_sizes(graph: &InterferenceGraph) -> Vec<usize> {
    graph
        .connected_components()
        .into_iter()
        .map(|c| c.len())
        .filter(|n| *n >= 2)
        .collect()
}
