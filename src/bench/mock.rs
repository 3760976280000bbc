//! Mock benchmark strategy for testing.

use std::path::Path;

use crate::core::RuntimeRecord;
use crate::engine::artifacts::ArtifactKind;
use crate::{BenchError, BenchResult};

use super::traits::{BenchTarget, BenchmarkStrategy, MeasureRequest, discard_report};

/// Produces synthetic timings without launching anything.
///
/// Each step runs `speedup_per_step` faster than the previous one, so tests can
/// check normalized output. Reports are JSON lists of [`RuntimeRecord`].
pub struct MockBenchmark {
    base_ms: f64,
    speedup_per_step: f64,
    failing_steps: Vec<usize>,
    failing_binaries: Vec<String>,
}

impl Default for MockBenchmark {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBenchmark {
    pub fn new() -> Self {
        MockBenchmark {
            base_ms: 100.0,
            speedup_per_step: 0.0,
            failing_steps: Vec::new(),
            failing_binaries: Vec::new(),
        }
    }

    pub fn with_base_ms(mut self, base_ms: f64) -> Self {
        self.base_ms = base_ms;
        self
    }

    /// Milliseconds shaved off per step.
    pub fn with_speedup_per_step(mut self, ms: f64) -> Self {
        self.speedup_per_step = ms;
        self
    }

    /// Fail every measurement at `step`.
    pub fn failing_step(mut self, step: usize) -> Self {
        self.failing_steps.push(step);
        self
    }

    /// Fail every measurement of `binary`.
    pub fn failing_binary(mut self, binary: impl Into<String>) -> Self {
        self.failing_binaries.push(binary.into());
        self
    }

    fn mean_at(&self, step: usize) -> f64 {
        (self.base_ms - self.speedup_per_step * step as f64).max(0.001)
    }
}

impl BenchmarkStrategy for MockBenchmark {
    fn name(&self) -> &str {
        "mock"
    }

    fn report_kind(&self) -> ArtifactKind {
        ArtifactKind::RuntimeReport
    }

    fn measure(&self, request: &MeasureRequest<'_>) -> BenchResult<Vec<RuntimeRecord>> {
        let target = request.target;
        if self.failing_steps.contains(&request.step) || self.failing_binaries.contains(&target.binary) {
            discard_report(&request.report);
            return Err(BenchError::Measurement {
                binary: target.label.clone(),
                reason: "mock failure".into(),
            });
        }
        let mean = self.mean_at(request.step);
        let records = vec![RuntimeRecord::new(&target.label, "", request.step, mean, mean / 100.0)];
        let json = serde_json::to_string_pretty(&records).map_err(|e| BenchError::Message(e.to_string()))?;
        std::fs::write(&request.report, json)?;
        Ok(records)
    }

    fn collect(&self, _target: &BenchTarget, _step: usize, report: &Path) -> BenchResult<Vec<RuntimeRecord>> {
        let json = std::fs::read_to_string(report).map_err(|_| BenchError::ArtifactMissing {
            path: report.to_path_buf(),
        })?;
        serde_json::from_str(&json).map_err(|e| BenchError::Message(e.to_string()))
    }
}
