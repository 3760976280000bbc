//! Benchmark strategy trait definition.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{BenchTargetConfig, RuntimeRecord};
use crate::engine::artifacts::ArtifactKind;
use crate::BenchResult;

/// One benchmark binary and the options it is launched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchTarget {
    pub binary: String,
    pub options: Vec<String>,
    /// Names the target's reports and runtime rows; unique within a sweep.
    pub label: String,
}

impl BenchTarget {
    pub fn new(binary: impl Into<String>) -> Self {
        let binary = binary.into();
        BenchTarget {
            label: binary.clone(),
            binary,
            options: Vec::new(),
        }
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// `<binary>@<options>` with every character outside `[A-Za-z0-9_-]` turned into `-`.
    pub fn options_label(&self) -> String {
        let slug: String = self
            .options
            .join("_")
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
            .collect();
        format!("{}@{slug}", self.binary)
    }
}

impl From<&BenchTargetConfig> for BenchTarget {
    fn from(cfg: &BenchTargetConfig) -> Self {
        BenchTarget::new(cfg.binary.clone()).with_options(cfg.options.clone())
    }
}

/// Remove a step report left by a failed or earlier run.
pub fn discard_report(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "discarded step report"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not discard step report"),
    }
}

/// Everything a strategy needs to time one binary at one step.
#[derive(Debug, Clone)]
pub struct MeasureRequest<'a> {
    pub target: &'a BenchTarget,
    pub step: usize,
    pub repetitions: u32,
    /// Directory holding the binary; also the cwd of the run.
    pub workdir: &'a Path,
    /// Where the strategy must leave its raw report.
    pub report: PathBuf,
    pub timeout: Duration,
}

impl MeasureRequest<'_> {
    pub fn binary_path(&self) -> PathBuf {
        self.workdir.join(&self.target.binary)
    }
}

/// How a binary is timed.
///
/// `measure` runs the binary and leaves a raw report at `request.report`;
/// `collect` turns a previously written report back into records, so results
/// can be rebuilt without re-running anything. Records carry `target.label`
/// as their binary name. A failed `measure` leaves no report behind.
pub trait BenchmarkStrategy: Send + Sync {
    /// Strategy name (e.g. "harness", "perf")
    fn name(&self) -> &str;

    /// Kind of raw report this strategy writes.
    fn report_kind(&self) -> ArtifactKind;

    fn measure(&self, request: &MeasureRequest<'_>) -> BenchResult<Vec<RuntimeRecord>>;

    fn collect(&self, target: &BenchTarget, step: usize, report: &Path) -> BenchResult<Vec<RuntimeRecord>>;
}
