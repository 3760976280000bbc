//! Multi-binary sweep: runs one strategy over every configured target.
//!
//! A failing target is logged and left absent for that step; it never stops
//! the sweep or the other targets. Reports and table rows are keyed by the
//! target label, so one binary swept over several option sets keeps one row
//! per option set.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::core::RuntimeRecord;
use crate::engine::artifacts::ArtifactSet;
use crate::BenchError;

use super::traits::{BenchTarget, BenchmarkStrategy, MeasureRequest, discard_report};

/// Records gathered for one step plus the targets that produced nothing.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub records: Vec<RuntimeRecord>,
    pub failures: Vec<(String, BenchError)>,
}

impl SweepOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct BenchmarkSweep {
    strategy: Box<dyn BenchmarkStrategy>,
    targets: Vec<BenchTarget>,
}

impl BenchmarkSweep {
    pub fn new(strategy: Box<dyn BenchmarkStrategy>, targets: Vec<BenchTarget>) -> Self {
        BenchmarkSweep {
            strategy,
            targets: distinct_labels(targets),
        }
    }

    pub fn strategy(&self) -> &dyn BenchmarkStrategy {
        self.strategy.as_ref()
    }

    pub fn targets(&self) -> &[BenchTarget] {
        &self.targets
    }

    /// Run every target at `step`, writing one raw report per target.
    pub fn measure_step(&self, artifacts: &ArtifactSet, step: usize, repetitions: u32, timeout: Duration) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        for target in &self.targets {
            let request = MeasureRequest {
                target,
                step,
                repetitions,
                workdir: artifacts.root(),
                report: artifacts.step_artifact(&target.label, step, self.strategy.report_kind()),
                timeout,
            };
            discard_report(&request.report);
            match self.strategy.measure(&request) {
                Ok(records) => outcome.records.extend(records),
                Err(e) => {
                    discard_report(&request.report);
                    tracing::warn!(label = %target.label, step, error = %e, "benchmark failed; step left without data");
                    outcome.failures.push((target.label.clone(), e));
                }
            }
        }
        outcome
    }

    /// Rebuild records for `step` from reports already on disk.
    pub fn collect_step(&self, artifacts: &ArtifactSet, step: usize) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        for target in &self.targets {
            let report = artifacts.step_artifact(&target.label, step, self.strategy.report_kind());
            match self.strategy.collect(target, step, &report) {
                Ok(records) => outcome.records.extend(records),
                Err(e) => {
                    tracing::debug!(label = %target.label, step, error = %e, "no report to collect");
                    outcome.failures.push((target.label.clone(), e));
                }
            }
        }
        outcome
    }
}

/// Relabel targets whose label is taken, first by options, then by position.
fn distinct_labels(mut targets: Vec<BenchTarget>) -> Vec<BenchTarget> {
    let mut counts = HashMap::<String, usize>::new();
    for t in &targets {
        *counts.entry(t.label.clone()).or_default() += 1;
    }
    let mut seen = HashSet::new();
    for (i, target) in targets.iter_mut().enumerate() {
        if counts.get(&target.label).copied().unwrap_or(0) > 1 {
            target.label = target.options_label();
        }
        if !seen.insert(target.label.clone()) {
            target.label = format!("{}-{i}", target.label);
            seen.insert(target.label.clone());
        }
    }
    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::mock::MockBenchmark;

    fn sweep(mock: MockBenchmark) -> BenchmarkSweep {
        BenchmarkSweep::new(
            Box::new(mock),
            vec![BenchTarget::new("harris"), BenchTarget::new("blur")],
        )
    }

    #[test]
    fn test_measure_step_covers_all_targets() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path());
        let outcome = sweep(MockBenchmark::new()).measure_step(&artifacts, 0, 2, Duration::ZERO);
        assert!(outcome.is_complete());
        let labels: Vec<_> = outcome.records.iter().map(|r| r.binary.as_str()).collect();
        assert_eq!(labels, vec!["harris", "blur"]);
    }

    #[test]
    fn test_failing_target_does_not_stop_sweep() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path());
        let mock = MockBenchmark::new().failing_binary("harris");
        let outcome = sweep(mock).measure_step(&artifacts, 1, 2, Duration::ZERO);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "harris");
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].binary, "blur");
    }

    #[test]
    fn test_same_binary_with_different_options_keeps_both_points() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path());
        let sweep = BenchmarkSweep::new(
            Box::new(MockBenchmark::new()),
            vec![
                BenchTarget::new("suite").with_options(vec!["10".into()]),
                BenchTarget::new("suite").with_options(vec!["20".into()]),
                BenchTarget::new("blur"),
            ],
        );
        let labels: Vec<_> = sweep.targets().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["suite@10", "suite@20", "blur"]);

        let measured = sweep.measure_step(&artifacts, 0, 1, Duration::ZERO);
        assert!(measured.is_complete());
        assert!(dir.path().join("suite@10.0.bench.json").exists());
        assert!(dir.path().join("suite@20.0.bench.json").exists());

        let collected = sweep.collect_step(&artifacts, 0);
        let rows = crate::stats::RuntimeTable::build(&collected.records, 1).unwrap();
        let row_labels: Vec<_> = rows.rows.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(row_labels, vec!["blur", "suite@10", "suite@20"]);
    }

    #[test]
    fn test_identical_targets_fall_back_to_position() {
        let sweep = BenchmarkSweep::new(
            Box::new(MockBenchmark::new()),
            vec![BenchTarget::new("suite"), BenchTarget::new("suite")],
        );
        let labels: Vec<_> = sweep.targets().iter().map(|t| t.label.as_str()).collect();
        assert_eq!(labels, vec!["suite@", "suite@-1"]);
    }

    #[test]
    fn test_failed_measurement_drops_stale_report() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path());
        let stale = dir.path().join("harris.1.bench.json");
        std::fs::write(&stale, r#"[{"binary": "harris", "step": 1, "mean_ms": 500.0, "stddev_ms": 1.0}]"#).unwrap();

        let sweep = sweep(MockBenchmark::new().failing_binary("harris"));
        let outcome = sweep.measure_step(&artifacts, 1, 1, Duration::ZERO);
        assert_eq!(outcome.failures[0].0, "harris");
        assert!(!stale.exists());
        let collected = sweep.collect_step(&artifacts, 1);
        assert!(collected.records.iter().all(|r| r.binary != "harris"));
    }

    #[test]
    fn test_collect_reads_back_reports() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactSet::new(dir.path());
        let sweep = sweep(MockBenchmark::new().failing_step(2));
        for step in 0..3 {
            sweep.measure_step(&artifacts, step, 1, Duration::ZERO);
        }
        let collected = sweep.collect_step(&artifacts, 1);
        assert_eq!(collected.records.len(), 2);
        let gap = sweep.collect_step(&artifacts, 2);
        assert!(gap.records.is_empty());
        assert_eq!(gap.failures.len(), 2);
    }
}
