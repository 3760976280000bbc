//! Runtime table: per-step means then per-step standard deviations per binary.

use std::collections::BTreeMap;

use crate::core::RuntimeRecord;
use crate::{BenchError, BenchResult};

/// One tracked binary (or binary/case); `None` marks a step without data.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeRow {
    pub label: String,
    pub means: Vec<Option<f64>>,
    pub stddevs: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeTable {
    pub step_count: usize,
    /// Cells hold speedup and relative deviation instead of milliseconds.
    pub normalized: bool,
    pub rows: Vec<RuntimeRow>,
}

impl RuntimeTable {
    /// Align records on steps `0..step_count`, one row per label in label order.
    pub fn build(records: &[RuntimeRecord], step_count: usize) -> BenchResult<Self> {
        let mut rows: BTreeMap<String, RuntimeRow> = BTreeMap::new();
        for r in records {
            if r.step >= step_count {
                tracing::warn!(binary = %r.binary, step = r.step, "runtime record beyond step bound ignored");
                continue;
            }
            let label = r.label();
            let row = rows.entry(label.clone()).or_insert_with(|| RuntimeRow {
                label,
                means: vec![None; step_count],
                stddevs: vec![None; step_count],
            });
            if row.means[r.step].is_some() {
                tracing::warn!(label = %row.label, step = r.step, "duplicate runtime record; keeping the last");
            }
            row.means[r.step] = Some(r.mean_ms);
            row.stddevs[r.step] = Some(r.stddev_ms);
        }
        if rows.is_empty() {
            return Err(BenchError::AggregationGap("runtime table".into()));
        }
        Ok(RuntimeTable {
            step_count,
            normalized: false,
            rows: rows.into_values().collect(),
        })
    }

    pub fn row(&self, label: &str) -> Option<&RuntimeRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    /// Speedup `mean_0 / mean_i` and relative deviation `stddev_i / mean_0`.
    ///
    /// A row without a usable step-0 mean normalizes to all-absent cells.
    pub fn normalized(&self) -> RuntimeTable {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let base = row.means.first().copied().flatten().filter(|b| *b > 0.0);
                RuntimeRow {
                    label: row.label.clone(),
                    means: row
                        .means
                        .iter()
                        .map(|m| match (base, *m) {
                            (Some(b), Some(m)) if m > 0.0 => Some(b / m),
                            _ => None,
                        })
                        .collect(),
                    stddevs: row
                        .stddevs
                        .iter()
                        .map(|s| base.zip(*s).map(|(b, s)| s / b))
                        .collect(),
                }
            })
            .collect();
        RuntimeTable {
            step_count: self.step_count,
            normalized: true,
            rows,
        }
    }
}
