//! Code-size and spill/reload table, with the node-count evolution alongside.
//!
//! Counts are a textual scan of the generated assembly for the marker strings
//! the allocator emits as comments; nothing is parsed semantically.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::{CodeSizeRecord, ReductionOutcome, StatisticsConfig};
use crate::{BenchError, BenchResult};

/// Marker substrings identifying spill and reload instructions.
#[derive(Debug, Clone)]
pub struct MarkerScan {
    spill: Vec<String>,
    reload: Vec<String>,
}

impl MarkerScan {
    pub fn new(spill: Vec<String>, reload: Vec<String>) -> Self {
        MarkerScan { spill, reload }
    }

    pub fn from_config(config: &StatisticsConfig) -> Self {
        Self::new(config.spill_markers.clone(), config.reload_markers.clone())
    }

    /// Count lines, spill lines and reload lines of one assembly text.
    pub fn scan(&self, unit: &str, step: usize, text: &str) -> CodeSizeRecord {
        let mut record = CodeSizeRecord {
            unit: unit.to_string(),
            step,
            asm_lines: 0,
            spills: 0,
            reloads: 0,
        };
        for line in text.lines() {
            record.asm_lines += 1;
            if self.spill.iter().any(|m| line.contains(m.as_str())) {
                record.spills += 1;
            }
            if self.reload.iter().any(|m| line.contains(m.as_str())) {
                record.reloads += 1;
            }
        }
        record
    }

    /// Scan an assembly file and write its record as JSON to `report`.
    pub fn scan_file(&self, unit: &str, step: usize, asm: &Path, report: &Path) -> BenchResult<CodeSizeRecord> {
        let text = std::fs::read_to_string(asm).map_err(|_| BenchError::ArtifactMissing {
            path: asm.to_path_buf(),
        })?;
        let record = self.scan(unit, step, &text);
        let json = serde_json::to_string_pretty(&record).map_err(|e| BenchError::Message(e.to_string()))?;
        std::fs::write(report, json)?;
        Ok(record)
    }
}

impl Default for MarkerScan {
    fn default() -> Self {
        Self::from_config(&StatisticsConfig::default())
    }
}

pub fn read_code_size_report(path: &Path) -> BenchResult<CodeSizeRecord> {
    let json = std::fs::read_to_string(path).map_err(|_| BenchError::ArtifactMissing {
        path: path.to_path_buf(),
    })?;
    serde_json::from_str(&json)
        .map_err(|e| BenchError::Message(format!("malformed code-size report {}: {e}", path.display())))
}

/// Residual and revealed node counts per step, summed over units.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeEvolution {
    pub residual: Vec<usize>,
    pub revealed: Vec<usize>,
}

impl NodeEvolution {
    /// Counts as seen by the allocator at steps `0..step_count`.
    pub fn from_outcomes<'a>(outcomes: impl IntoIterator<Item = &'a ReductionOutcome>, step_count: usize) -> Self {
        let mut evolution = NodeEvolution {
            residual: vec![0; step_count],
            revealed: vec![0; step_count],
        };
        for outcome in outcomes {
            for step in 0..step_count {
                evolution.residual[step] += outcome.residual_before(step);
                evolution.revealed[step] += outcome.revealed_before(step);
            }
        }
        evolution
    }
}

/// One row of the code-size table; `None` marks a step without assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSizeRow {
    pub step: usize,
    pub asm_lines: Option<u64>,
    pub spills: Option<u64>,
    pub reloads: Option<u64>,
    /// Assembly lines relative to step 0.
    pub size_ratio: Option<f64>,
    pub spill_delta: Option<i64>,
    pub reload_delta: Option<i64>,
    pub residual_nodes: Option<usize>,
    pub revealed_nodes: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeSizeTable {
    pub rows: Vec<CodeSizeRow>,
}

impl CodeSizeTable {
    /// Sum records over units per step, for steps `0..step_count`.
    pub fn build(records: &[CodeSizeRecord], step_count: usize, evolution: Option<&NodeEvolution>) -> BenchResult<Self> {
        let mut sums: BTreeMap<usize, (u64, u64, u64)> = BTreeMap::new();
        for r in records {
            if r.step >= step_count {
                tracing::warn!(unit = %r.unit, step = r.step, "code-size record beyond step bound ignored");
                continue;
            }
            let e = sums.entry(r.step).or_default();
            e.0 += r.asm_lines;
            e.1 += r.spills;
            e.2 += r.reloads;
        }
        if sums.is_empty() {
            return Err(BenchError::AggregationGap("code-size table".into()));
        }

        let base = sums.get(&0).copied();
        let rows = (0..step_count)
            .map(|step| {
                let cur = sums.get(&step).copied();
                let delta = |pick: fn(&(u64, u64, u64)) -> u64| match (cur, base) {
                    (Some(c), Some(b)) => Some(pick(&c) as i64 - pick(&b) as i64),
                    _ => None,
                };
                CodeSizeRow {
                    step,
                    asm_lines: cur.map(|c| c.0),
                    spills: cur.map(|c| c.1),
                    reloads: cur.map(|c| c.2),
                    size_ratio: match (cur, base) {
                        (Some(c), Some(b)) if b.0 > 0 => Some(c.0 as f64 / b.0 as f64),
                        _ => None,
                    },
                    spill_delta: delta(|t| t.1),
                    reload_delta: delta(|t| t.2),
                    residual_nodes: evolution.and_then(|e| e.residual.get(step).copied()),
                    revealed_nodes: evolution.and_then(|e| e.revealed.get(step).copied()),
                }
            })
            .collect();
        Ok(CodeSizeTable { rows })
    }
}
