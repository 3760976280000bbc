pub mod bench;
pub mod core;
pub mod engine;
pub mod logging;
pub mod reduce;
pub mod stats;
pub mod storage;

pub mod reduce_cmd;
pub mod run_cmd;
pub mod stats_cmd;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("{0}")]
    Message(String),

    /// An external tool exited with a non-zero status.
    #[error("`{command}` failed with {status}")]
    ToolInvocation {
        command: String,
        status: String,
        diagnostics: String,
    },

    /// A reduction attempt failed; the orchestrator may retry it.
    #[error("reduction attempt failed: {0}")]
    TransientReduction(String),

    #[error("measurement of {binary} failed: {reason}")]
    Measurement { binary: String, reason: String },

    #[error("missing artifact: {}", path.display())]
    ArtifactMissing { path: PathBuf },

    #[error("no data for {0}")]
    AggregationGap(String),

    #[error("aborted by operator")]
    Aborted,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl BenchError {
    /// Captured diagnostic output attached to the failure, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            BenchError::ToolInvocation { diagnostics, .. } if !diagnostics.is_empty() => {
                Some(diagnostics)
            }
            _ => None,
        }
    }
}

pub type BenchResult<T> = Result<T, BenchError>;

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha256::digest;
    digest(bytes)
}
