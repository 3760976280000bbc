//! Interference graph model and its on-disk forms.
//!
//! Two formats are understood:
//! - the adjacency-list export written by the code generator (one line per node:
//!   the node id followed by its neighbours), and
//! - the serialized JSON form handed to reduction strategies (`<unit>.graph.json`).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BenchError, BenchResult};

/// Opaque node identifier as emitted by the code generator.
pub type NodeId = u32;

/// Undirected interference graph without self-loops.
///
/// Nodes are kept in ascending id order, which is the iteration order every
/// reduction strategy relies on for deterministic tie-breaking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterferenceGraph {
    adjacency: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl InterferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from explicit node and edge lists.
    ///
    /// Edge endpoints that are not in `nodes` are added implicitly.
    pub fn from_edges(
        nodes: impl IntoIterator<Item = NodeId>,
        edges: impl IntoIterator<Item = (NodeId, NodeId)>,
    ) -> BenchResult<Self> {
        let mut graph = Self::new();
        for n in nodes {
            graph.add_node(n);
        }
        for (a, b) in edges {
            graph.add_edge(a, b)?;
        }
        Ok(graph)
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.adjacency.entry(node).or_default();
    }

    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> BenchResult<()> {
        if a == b {
            return Err(BenchError::Message(format!("self-loop on node {a}")));
        }
        self.adjacency.entry(a).or_default().insert(b);
        self.adjacency.entry(b).or_default().insert(a);
        Ok(())
    }

    /// Parse the adjacency-list export format.
    ///
    /// Blank lines and `#` comments are ignored. A neighbour listed on several
    /// lines yields a single undirected edge.
    pub fn parse_adjlist(text: &str) -> BenchResult<Self> {
        let mut graph = Self::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut ids = line.split_whitespace().map(|tok| {
                tok.parse::<NodeId>().map_err(|e| {
                    BenchError::Message(format!(
                        "line {}: invalid node id `{tok}`: {e}",
                        lineno + 1
                    ))
                })
            });
            let Some(node) = ids.next() else { continue };
            let node = node?;
            graph.add_node(node);
            for neighbour in ids {
                let neighbour = neighbour?;
                if neighbour == node {
                    tracing::warn!(node, line = lineno + 1, "ignoring self-loop in graph export");
                    continue;
                }
                graph.add_edge(node, neighbour)?;
            }
        }
        Ok(graph)
    }

    pub fn load_adjlist(path: &Path) -> BenchResult<Self> {
        if !path.exists() {
            return Err(BenchError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse_adjlist(&text).map_err(|e| {
            BenchError::Message(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// Render in the adjacency-list export format.
    pub fn to_adjlist(&self) -> String {
        let mut out = String::new();
        for (node, neighbours) in &self.adjacency {
            out.push_str(&node.to_string());
            for n in neighbours {
                out.push(' ');
                out.push_str(&n.to_string());
            }
            out.push('\n');
        }
        out
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeSet::len).sum::<usize>() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    pub fn degree(&self, node: NodeId) -> Option<usize> {
        self.adjacency.get(&node).map(BTreeSet::len)
    }

    /// Nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Nodes with their degrees, in ascending id order.
    pub fn degrees(&self) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        self.adjacency.iter().map(|(n, adj)| (*n, adj.len()))
    }

    pub fn neighbors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.adjacency.get(&node).into_iter().flatten().copied()
    }

    /// Each undirected edge once, as `(low, high)`.
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(a, adj)| adj.iter().filter(move |b| *b > a).map(move |b| (*a, *b)))
    }

    pub fn isolated_nodes(&self) -> Vec<NodeId> {
        self.degrees().filter(|(_, d)| *d == 0).map(|(n, _)| n).collect()
    }

    /// Remove a node and its incident edges. Returns false if absent.
    pub(crate) fn remove_node(&mut self, node: NodeId) -> bool {
        let Some(neighbours) = self.adjacency.remove(&node) else {
            return false;
        };
        for n in neighbours {
            if let Some(adj) = self.adjacency.get_mut(&n) {
                adj.remove(&node);
            }
        }
        true
    }

    /// Connected components, each sorted, ordered by their smallest node.
    pub fn connected_components(&self) -> Vec<Vec<NodeId>> {
        let mut seen = BTreeSet::new();
        let mut components = Vec::new();
        for start in self.nodes() {
            if !seen.insert(start) {
                continue;
            }
            let mut component = vec![start];
            let mut stack = vec![start];
            while let Some(n) = stack.pop() {
                for m in self.neighbors(n) {
                    if seen.insert(m) {
                        component.push(m);
                        stack.push(m);
                    }
                }
            }
            component.sort_unstable();
            components.push(component);
        }
        components
    }

    pub fn to_serialized(&self, weights: Option<&NodeWeights>) -> SerializedGraph {
        SerializedGraph {
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
            weights: weights.map(|w| w.0.clone()),
        }
    }

    pub fn from_serialized(serialized: &SerializedGraph) -> BenchResult<(Self, Option<NodeWeights>)> {
        let graph = Self::from_edges(serialized.nodes.iter().copied(), serialized.edges.iter().copied())?;
        let weights = match &serialized.weights {
            Some(map) => Some(NodeWeights::from_map(map.clone())?),
            None => None,
        };
        Ok((graph, weights))
    }
}

/// Serialized graph handed to reduction strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub nodes: Vec<NodeId>,
    pub edges: Vec<(NodeId, NodeId)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights: Option<BTreeMap<NodeId, f64>>,
}

impl SerializedGraph {
    pub fn write(&self, path: &Path) -> BenchResult<()> {
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| BenchError::Message(format!("failed to serialize graph: {e}")))?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read(path: &Path) -> BenchResult<Self> {
        if !path.exists() {
            return Err(BenchError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        serde_json::from_slice(&bytes).map_err(|e| {
            BenchError::Message(format!("failed to parse {}: {e}", path.display()))
        })
    }
}

/// Positive per-node weights; nodes without an entry weigh 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeWeights(BTreeMap<NodeId, f64>);

impl NodeWeights {
    pub fn from_map(map: BTreeMap<NodeId, f64>) -> BenchResult<Self> {
        for (node, w) in &map {
            if !w.is_finite() || *w <= 0.0 {
                return Err(BenchError::Message(format!(
                    "weight of node {node} must be a positive real, got {w}"
                )));
            }
        }
        Ok(NodeWeights(map))
    }

    pub fn uniform(graph: &InterferenceGraph, weight: f64) -> BenchResult<Self> {
        Self::from_map(graph.nodes().map(|n| (n, weight)).collect())
    }

    pub fn weight(&self, node: NodeId) -> f64 {
        self.0.get(&node).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `<node> <weight>` lines.
    pub fn parse(text: &str) -> BenchResult<Self> {
        let mut map = BTreeMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(node), Some(weight), None) = (parts.next(), parts.next(), parts.next()) else {
                return Err(BenchError::Message(format!(
                    "line {}: expected `<node> <weight>`",
                    lineno + 1
                )));
            };
            let node: NodeId = node.parse().map_err(|e| {
                BenchError::Message(format!("line {}: invalid node id: {e}", lineno + 1))
            })?;
            let weight: f64 = weight.parse().map_err(|e| {
                BenchError::Message(format!("line {}: invalid weight: {e}", lineno + 1))
            })?;
            map.insert(node, weight);
        }
        Self::from_map(map)
    }

    pub fn load(path: &Path) -> BenchResult<Self> {
        if !path.exists() {
            return Err(BenchError::ArtifactMissing {
                path: path.to_path_buf(),
            });
        }
        Self::parse(&std::fs::read_to_string(path)?)
    }

    pub fn to_text(&self) -> String {
        self.0.iter().map(|(n, w)| format!("{n} {w}\n")).collect()
    }
}
