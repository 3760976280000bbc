//! Measurement records shared by benchmark strategies and the statistics layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Timing statistics over repeated samples
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingStat {
    pub iterations: u32,
    pub mean_ms: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev_ms: Option<f64>,
    pub min_ms: f64,
    pub max_ms: f64,
}

impl TimingStat {
    /// Create TimingStat from a slice of sample times in milliseconds
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return TimingStat {
                iterations: 0,
                mean_ms: 0.0,
                median_ms: None,
                stddev_ms: None,
                min_ms: 0.0,
                max_ms: 0.0,
            };
        }

        let sum: f64 = samples.iter().sum();
        let mean_ms = sum / n as f64;

        let min_ms = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Sample standard deviation, matching what benchmark harnesses report
        let stddev_ms = if n > 1 {
            let variance: f64 =
                samples.iter().map(|x| (x - mean_ms).powi(2)).sum::<f64>() / (n - 1) as f64;
            Some(variance.sqrt())
        } else {
            Some(0.0)
        };

        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_ms = if n % 2 == 0 {
            Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
        } else {
            Some(sorted[n / 2])
        };

        TimingStat {
            iterations: n as u32,
            mean_ms,
            median_ms,
            stddev_ms,
            min_ms,
            max_ms,
        }
    }
}

/// Wall-time measurement of one benchmark case at one extraction step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeRecord {
    /// Sweep target label: the binary name, or `<binary>@<options>` when one
    /// binary is swept with several option sets.
    pub binary: String,
    /// Named case inside the binary; empty when the binary is timed as a whole.
    #[serde(default)]
    pub case: String,
    pub step: usize,
    pub mean_ms: f64,
    pub stddev_ms: f64,
    /// Raw hardware counters, kept for reference only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub counters: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_rss_bytes: Option<u64>,
}

impl RuntimeRecord {
    pub fn new(binary: impl Into<String>, case: impl Into<String>, step: usize, mean_ms: f64, stddev_ms: f64) -> Self {
        RuntimeRecord {
            binary: binary.into(),
            case: case.into(),
            step,
            mean_ms,
            stddev_ms,
            counters: BTreeMap::new(),
            peak_rss_bytes: None,
        }
    }

    /// Row label in the runtime table.
    pub fn label(&self) -> String {
        if self.case.is_empty() {
            self.binary.clone()
        } else {
            format!("{}/{}", self.binary, self.case)
        }
    }
}

/// Assembly size and spill-code counts of one unit at one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSizeRecord {
    pub unit: String,
    pub step: usize,
    pub asm_lines: u64,
    pub spills: u64,
    pub reloads: u64,
}
