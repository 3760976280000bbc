//! Benchmark-harness strategy.
//!
//! The binary is a Google-Benchmark style harness that writes a JSON report
//! with a `benchmarks` list. Aggregate rows (`mean`, `stddev`) are used when
//! present, otherwise the iteration rows are folded into a [`TimingStat`].

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::core::{RuntimeRecord, TimingStat};
use crate::engine::artifacts::ArtifactKind;
use crate::engine::process::{describe, run_with_timeout};
use crate::{BenchError, BenchResult};

use super::traits::{BenchTarget, BenchmarkStrategy, MeasureRequest, discard_report};

#[derive(Debug, Deserialize)]
struct HarnessReport {
    #[serde(default)]
    benchmarks: Vec<HarnessEntry>,
}

#[derive(Debug, Deserialize)]
struct HarnessEntry {
    name: String,
    #[serde(default)]
    run_name: Option<String>,
    #[serde(default)]
    run_type: Option<String>,
    #[serde(default)]
    aggregate_name: Option<String>,
    real_time: f64,
    #[serde(default = "default_time_unit")]
    time_unit: String,
}

fn default_time_unit() -> String {
    "ns".to_string()
}

impl HarnessEntry {
    fn case(&self) -> &str {
        self.run_name.as_deref().unwrap_or(&self.name)
    }

    fn is_aggregate(&self) -> bool {
        self.run_type.as_deref() == Some("aggregate")
    }

    fn real_time_ms(&self) -> BenchResult<f64> {
        let scale = match self.time_unit.as_str() {
            "ns" => 1e-6,
            "us" => 1e-3,
            "ms" => 1.0,
            "s" => 1e3,
            other => {
                return Err(BenchError::Message(format!("unknown time unit `{other}`")));
            }
        };
        Ok(self.real_time * scale)
    }
}

#[derive(Default)]
struct CaseAccumulator {
    samples: Vec<f64>,
    mean: Option<f64>,
    stddev: Option<f64>,
}

/// Google-Benchmark harness runner.
pub struct HarnessBenchmark {
    /// Case names to keep; empty keeps every case.
    cases: Vec<String>,
}

impl HarnessBenchmark {
    pub fn new(cases: Vec<String>) -> Self {
        HarnessBenchmark { cases }
    }

    fn wanted(&self, case: &str) -> bool {
        self.cases.is_empty()
            || self
                .cases
                .iter()
                .any(|c| case == c || case.strip_prefix(c.as_str()).is_some_and(|r| r.starts_with('/')))
    }

    fn build_command(&self, request: &MeasureRequest<'_>) -> Command {
        let mut cmd = Command::new(request.binary_path());
        cmd.args(&request.target.options)
            .arg(format!("--benchmark_out={}", request.report.display()))
            .arg("--benchmark_out_format=json")
            .arg(format!("--benchmark_repetitions={}", request.repetitions))
            .current_dir(request.workdir);
        cmd
    }

    fn run_harness(&self, request: &MeasureRequest<'_>) -> BenchResult<Vec<RuntimeRecord>> {
        let label = &request.target.label;
        let cmd = self.build_command(request);
        tracing::debug!(label = %label, step = request.step, command = %describe(&cmd), "running harness");

        let output = run_with_timeout(cmd, request.timeout).map_err(|e| BenchError::Measurement {
            binary: label.clone(),
            reason: e.to_string(),
        })?;
        if !output.success() {
            return Err(BenchError::Measurement {
                binary: label.clone(),
                reason: format!("exited with {}: {}", output.status, output.stderr.trim()),
            });
        }

        let mut records = self.collect(request.target, request.step, &request.report)?;
        for r in &mut records {
            r.peak_rss_bytes = output.peak_rss_bytes;
        }
        Ok(records)
    }
}

/// Parse a harness JSON report into one record per case, in report order.
pub fn parse_report(binary: &str, step: usize, json: &str, keep: impl Fn(&str) -> bool) -> BenchResult<Vec<RuntimeRecord>> {
    let report: HarnessReport = serde_json::from_str(json)
        .map_err(|e| BenchError::Message(format!("malformed harness report: {e}")))?;

    let mut order: Vec<String> = Vec::new();
    let mut cases: std::collections::HashMap<String, CaseAccumulator> = Default::default();
    for entry in &report.benchmarks {
        let case = entry.case();
        if !keep(case) {
            continue;
        }
        let ms = entry.real_time_ms()?;
        let acc = cases.entry(case.to_string()).or_insert_with(|| {
            order.push(case.to_string());
            CaseAccumulator::default()
        });
        if entry.is_aggregate() {
            match entry.aggregate_name.as_deref() {
                Some("mean") => acc.mean = Some(ms),
                Some("stddev") => acc.stddev = Some(ms),
                _ => {}
            }
        } else {
            acc.samples.push(ms);
        }
    }

    let mut records = Vec::with_capacity(order.len());
    for case in order {
        let Some(acc) = cases.remove(&case) else { continue };
        let stat = TimingStat::from_samples(&acc.samples);
        let mean = match acc.mean {
            Some(m) => m,
            None if stat.iterations > 0 => stat.mean_ms,
            None => continue,
        };
        let stddev = acc.stddev.or(stat.stddev_ms).unwrap_or(0.0);
        records.push(RuntimeRecord::new(binary, case, step, mean, stddev));
    }
    Ok(records)
}

impl BenchmarkStrategy for HarnessBenchmark {
    fn name(&self) -> &str {
        "harness"
    }

    fn report_kind(&self) -> ArtifactKind {
        ArtifactKind::RuntimeReport
    }

    fn measure(&self, request: &MeasureRequest<'_>) -> BenchResult<Vec<RuntimeRecord>> {
        let result = self.run_harness(request);
        if result.is_err() {
            discard_report(&request.report);
        }
        result
    }

    fn collect(&self, target: &BenchTarget, step: usize, report: &Path) -> BenchResult<Vec<RuntimeRecord>> {
        let json = std::fs::read_to_string(report).map_err(|_| BenchError::ArtifactMissing {
            path: report.to_path_buf(),
        })?;
        let records = parse_report(&target.label, step, &json, |c| self.wanted(c))?;
        if records.is_empty() {
            return Err(BenchError::Measurement {
                binary: target.label.clone(),
                reason: "report contains no matching benchmark".into(),
            });
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
      "context": {"date": "2024-01-01"},
      "benchmarks": [
        {"name": "BM_Harris/1024", "run_name": "BM_Harris/1024", "run_type": "iteration",
         "repetitions": 2, "repetition_index": 0, "iterations": 10,
         "real_time": 2000000.0, "cpu_time": 1900000.0, "time_unit": "ns"},
        {"name": "BM_Harris/1024", "run_name": "BM_Harris/1024", "run_type": "iteration",
         "repetitions": 2, "repetition_index": 1, "iterations": 10,
         "real_time": 4000000.0, "cpu_time": 3900000.0, "time_unit": "ns"},
        {"name": "BM_Harris/1024_mean", "run_name": "BM_Harris/1024", "run_type": "aggregate",
         "aggregate_name": "mean", "real_time": 3000000.0, "time_unit": "ns"},
        {"name": "BM_Harris/1024_stddev", "run_name": "BM_Harris/1024", "run_type": "aggregate",
         "aggregate_name": "stddev", "real_time": 1414213.56, "time_unit": "ns"},
        {"name": "BM_Blur", "real_time": 5.0, "time_unit": "ms"}
      ]
    }"#;

    #[test]
    fn test_parse_uses_aggregates() {
        let records = parse_report("harris", 2, REPORT, |_| true).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].case, "BM_Harris/1024");
        assert_eq!(records[0].step, 2);
        assert!((records[0].mean_ms - 3.0).abs() < 1e-9);
        assert!((records[0].stddev_ms - 1.41421356).abs() < 1e-6);
        assert_eq!(records[1].case, "BM_Blur");
        assert!((records[1].mean_ms - 5.0).abs() < 1e-9);
        assert_eq!(records[1].stddev_ms, 0.0);
    }

    #[test]
    fn test_parse_without_aggregates() {
        let json = r#"{"benchmarks": [
            {"name": "BM_A", "real_time": 1000.0, "time_unit": "us"},
            {"name": "BM_A", "real_time": 3000.0, "time_unit": "us"}
        ]}"#;
        let records = parse_report("bin", 0, json, |_| true).unwrap();
        assert!((records[0].mean_ms - 2.0).abs() < 1e-9);
        assert!((records[0].stddev_ms - 2.0f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_case_filter() {
        let bench = HarnessBenchmark::new(vec!["BM_Harris".into()]);
        assert!(bench.wanted("BM_Harris"));
        assert!(bench.wanted("BM_Harris/1024"));
        assert!(!bench.wanted("BM_HarrisFast"));
        assert!(!bench.wanted("BM_Blur"));
        assert!(HarnessBenchmark::new(vec![]).wanted("anything"));
    }

    #[test]
    fn test_unknown_time_unit() {
        let json = r#"{"benchmarks": [{"name": "BM_A", "real_time": 1.0, "time_unit": "fortnight"}]}"#;
        assert!(parse_report("bin", 0, json, |_| true).is_err());
    }

    #[test]
    fn test_collect_missing_report() {
        let dir = tempfile::tempdir().unwrap();
        let bench = HarnessBenchmark::new(vec![]);
        let target = BenchTarget::new("harris");
        let err = bench
            .collect(&target, 0, &dir.path().join("harris.0.bench.json"))
            .unwrap_err();
        assert!(matches!(err, BenchError::ArtifactMissing { .. }));
    }

    #[test]
    fn test_collect_filtered_to_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harris.0.bench.json");
        std::fs::write(&path, REPORT).unwrap();
        let bench = HarnessBenchmark::new(vec!["BM_Missing".into()]);
        let err = bench.collect(&BenchTarget::new("harris"), 0, &path).unwrap_err();
        assert!(matches!(err, BenchError::Measurement { .. }));
    }

    #[cfg(unix)]
    fn write_harness(dir: &Path, name: &str, tail: &str) {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.join(name);
        let body = format!(
            r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --benchmark_out=*) out="${{arg#--benchmark_out=}}" ;;
  esac
done
echo '{{"benchmarks": [{{"name": "BM_Harris", "real_time": 7.5, "time_unit": "ms"}}]}}' > "$out"
{tail}
"#
        );
        std::fs::write(&script, body).unwrap();
        let mut perms = std::fs::metadata(&script).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_measure_runs_harness() {
        let dir = tempfile::tempdir().unwrap();
        write_harness(dir.path(), "harris", "");

        let target = BenchTarget::new("harris");
        let request = MeasureRequest {
            target: &target,
            step: 1,
            repetitions: 2,
            workdir: dir.path(),
            report: dir.path().join("harris.1.bench.json"),
            timeout: std::time::Duration::from_secs(30),
        };
        let records = HarnessBenchmark::new(vec![]).measure(&request).unwrap();
        assert_eq!(records.len(), 1);
        assert!((records[0].mean_ms - 7.5).abs() < 1e-9);
        assert!(request.report.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_harness_leaves_no_report() {
        let dir = tempfile::tempdir().unwrap();
        write_harness(dir.path(), "harris", "echo 'segfault in teardown' >&2\nexit 3");

        let target = BenchTarget::new("harris");
        let request = MeasureRequest {
            target: &target,
            step: 2,
            repetitions: 1,
            workdir: dir.path(),
            report: dir.path().join("harris.2.bench.json"),
            timeout: std::time::Duration::from_secs(30),
        };
        let bench = HarnessBenchmark::new(vec![]);
        let err = bench.measure(&request).unwrap_err();
        assert!(matches!(err, BenchError::Measurement { .. }));
        assert!(!request.report.exists());
        assert!(matches!(
            bench.collect(&target, 2, &request.report),
            Err(BenchError::ArtifactMissing { .. })
        ));
    }
}
