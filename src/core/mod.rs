//! Core types for isec-bench.
//!
//! The graph model, per-step selections, measurement records and the
//! experiment configuration every stage receives by reference.

pub mod config;
pub mod graph;
pub mod schema;
pub mod selection;

// Re-export key types for convenience
pub use config::{
    BenchTargetConfig, BenchmarkKind, ExperimentConfig, LinkTarget, ReductionKind, RetryConfig,
    StatisticsConfig, ToolchainConfig,
};
pub use graph::{InterferenceGraph, NodeId, NodeWeights, SerializedGraph};
pub use schema::{CodeSizeRecord, RuntimeRecord, TimingStat};
pub use selection::{ReductionOutcome, StepSelection, parse_selection, read_selection};
