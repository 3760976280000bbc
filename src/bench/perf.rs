//! Hardware-counter strategy built on `perf stat`.
//!
//! Wall time comes from the `seconds time elapsed` line. Counter values are
//! stored on the record for reference only and never feed the speedup tables.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use crate::core::RuntimeRecord;
use crate::engine::artifacts::ArtifactKind;
use crate::engine::process::{describe, run_with_timeout};
use crate::{BenchError, BenchResult};

use super::traits::{BenchTarget, BenchmarkStrategy, MeasureRequest, discard_report};

const UNIT_TOKENS: &[&str] = &["msec", "usec", "nsec", "ms", "us", "ns", "sec"];

pub struct PerfBenchmark {
    perf: String,
    events: Vec<String>,
}

impl PerfBenchmark {
    pub fn new(perf: impl Into<String>, events: Vec<String>) -> Self {
        PerfBenchmark {
            perf: perf.into(),
            events,
        }
    }

    fn build_command(&self, request: &MeasureRequest<'_>) -> Command {
        let mut cmd = Command::new(&self.perf);
        cmd.arg("stat")
            .arg("-r")
            .arg(request.repetitions.to_string())
            .arg("-o")
            .arg(&request.report);
        if !self.events.is_empty() {
            cmd.arg("-e").arg(self.events.join(","));
        }
        cmd.arg("--")
            .arg(request.binary_path())
            .args(&request.target.options)
            .current_dir(request.workdir);
        cmd
    }
}

/// Parsed content of a `perf stat` text report.
#[derive(Debug, Clone, PartialEq)]
pub struct PerfReport {
    pub elapsed_ms: f64,
    pub elapsed_stddev_ms: f64,
    pub counters: BTreeMap<String, f64>,
}

fn parse_number(token: &str) -> Option<f64> {
    token.replace(',', "").parse::<f64>().ok()
}

pub fn parse_perf_report(text: &str) -> BenchResult<PerfReport> {
    let mut elapsed: Option<(f64, f64)> = None;
    let mut counters = BTreeMap::new();

    for line in text.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(value) = tokens.first().and_then(|t| parse_number(t)) else {
            continue;
        };
        if line.contains("seconds time elapsed") {
            let stddev = match tokens.get(1) {
                Some(&"+-") => tokens.get(2).and_then(|t| parse_number(t)).unwrap_or(0.0),
                _ => 0.0,
            };
            elapsed = Some((value * 1e3, stddev * 1e3));
            continue;
        }
        let Some(&second) = tokens.get(1) else { continue };
        if second == "seconds" {
            // user / sys totals
            continue;
        }
        let name = if UNIT_TOKENS.contains(&second) {
            match tokens.get(2) {
                Some(&n) if n != "#" => n,
                _ => continue,
            }
        } else {
            second
        };
        counters.insert(name.to_string(), value);
    }

    let (elapsed_ms, elapsed_stddev_ms) =
        elapsed.ok_or_else(|| BenchError::Message("perf report has no elapsed time".into()))?;
    Ok(PerfReport {
        elapsed_ms,
        elapsed_stddev_ms,
        counters,
    })
}

impl BenchmarkStrategy for PerfBenchmark {
    fn name(&self) -> &str {
        "perf"
    }

    fn report_kind(&self) -> ArtifactKind {
        ArtifactKind::HardwareCounterReport
    }

    fn measure(&self, request: &MeasureRequest<'_>) -> BenchResult<Vec<RuntimeRecord>> {
        let label = &request.target.label;
        let cmd = self.build_command(request);
        tracing::debug!(label = %label, step = request.step, command = %describe(&cmd), "running perf stat");

        let result = run_with_timeout(cmd, request.timeout)
            .map_err(|e| BenchError::Measurement {
                binary: label.clone(),
                reason: e.to_string(),
            })
            .and_then(|output| {
                if output.success() {
                    self.collect(request.target, request.step, &request.report)
                } else {
                    Err(BenchError::Measurement {
                        binary: label.clone(),
                        reason: format!("perf exited with {}: {}", output.status, output.stderr.trim()),
                    })
                }
            });
        if result.is_err() {
            discard_report(&request.report);
        }
        result
    }

    fn collect(&self, target: &BenchTarget, step: usize, report: &Path) -> BenchResult<Vec<RuntimeRecord>> {
        let text = std::fs::read_to_string(report).map_err(|_| BenchError::ArtifactMissing {
            path: report.to_path_buf(),
        })?;
        let parsed = parse_perf_report(&text).map_err(|e| BenchError::Measurement {
            binary: target.label.clone(),
            reason: e.to_string(),
        })?;
        let mut record = RuntimeRecord::new(&target.label, "", step, parsed.elapsed_ms, parsed.elapsed_stddev_ms);
        record.counters = parsed.counters;
        Ok(vec![record])
    }
}
