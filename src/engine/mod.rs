//! Engine module: drives the experiment from sources to statistics tables.
//!
//! # Architecture
//!
//! - **Toolchain**: compiler, graph exporter, allocator and linker calls.
//!   `CommandToolchain` shells out to the configured tools, `MockToolchain`
//!   fakes their outputs for tests.
//!
//! - **Pipeline**: the stage state machine. It owns the toolchain, the
//!   reduction strategy and the benchmark sweep, and persists every
//!   intermediate result through the `ArtifactSet` naming scheme.
//!
//! # Boundaries
//!
//! - `Toolchain` does NOT know about steps beyond the flag it forwards to the allocator.
//! - Reduction and benchmarking live in `crate::reduce` and `crate::bench`; the
//!   pipeline only sequences them.

pub mod artifacts;
pub mod pipeline;
pub mod process;
pub mod provenance;
pub mod retry;
pub mod toolchain;

// Re-export key types for convenience
pub use artifacts::{ArtifactKind, ArtifactSet};
pub use pipeline::{Pipeline, PipelineError, PipelineReport, PipelineState, Stage};
pub use provenance::Provenance;
pub use retry::{AbortHandle, RetryPolicy};
pub use toolchain::{CommandToolchain, MockToolchain, ToolRun, Toolchain};
