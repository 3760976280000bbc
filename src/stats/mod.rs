//! Statistics aggregation over the per-step artifacts of one experiment.
//!
//! Runs after the step loop. Missing steps become absent cells; only a table
//! with no data at all is an error.

pub mod codesize;
pub mod graph;
pub mod runtime;

// Re-export key types
pub use codesize::{CodeSizeRow, CodeSizeTable, MarkerScan, NodeEvolution, read_code_size_report};
pub use graph::{GraphShape, GraphSummary, component_sizes, geometric_mean, mean};
pub use runtime::{RuntimeRow, RuntimeTable};

use crate::bench::BenchmarkSweep;
use crate::core::{InterferenceGraph, ReductionOutcome};
use crate::engine::artifacts::{ArtifactKind, ArtifactSet};
use crate::storage::CsvExporter;
use crate::{BenchError, BenchResult};

pub const RUNTIME_TABLE: &str = "runtime.csv";
pub const RUNTIME_NORMALIZED_TABLE: &str = "runtime_normalized.csv";
pub const CODESIZE_TABLE: &str = "codesize.csv";
pub const GRAPH_TABLE: &str = "graphs.csv";

/// Every table of one experiment.
#[derive(Debug, Clone)]
pub struct StatisticsReport {
    pub runtime: RuntimeTable,
    pub runtime_normalized: RuntimeTable,
    pub codesize: CodeSizeTable,
    pub graphs: Vec<GraphShape>,
    pub graph_summary: GraphSummary,
}

pub struct StatisticsAggregator<'a> {
    sweep: &'a BenchmarkSweep,
    step_count: usize,
}

impl<'a> StatisticsAggregator<'a> {
    pub fn new(sweep: &'a BenchmarkSweep, step_count: usize) -> Self {
        StatisticsAggregator { sweep, step_count }
    }

    /// Build every table from the artifacts under `source`.
    pub fn aggregate(&self, source: &ArtifactSet) -> BenchResult<StatisticsReport> {
        let mut runtime_records = Vec::new();
        for step in 0..self.step_count {
            let outcome = self.sweep.collect_step(source, step);
            for (binary, err) in &outcome.failures {
                tracing::debug!(binary = %binary, step, error = %err, "no runtime data");
            }
            runtime_records.extend(outcome.records);
        }
        let runtime = RuntimeTable::build(&runtime_records, self.step_count)?;

        let mut outcomes: Vec<ReductionOutcome> = Vec::new();
        for path in source.files_of_kind(ArtifactKind::ReductionSummary)? {
            let json = std::fs::read_to_string(&path)?;
            let outcome = serde_json::from_str(&json).map_err(|e| {
                BenchError::Message(format!("malformed reduction summary {}: {e}", path.display()))
            })?;
            outcomes.push(outcome);
        }
        let evolution = (!outcomes.is_empty()).then(|| NodeEvolution::from_outcomes(&outcomes, self.step_count));

        let mut size_records = Vec::new();
        for path in source.files_of_kind(ArtifactKind::CodeSizeReport)? {
            size_records.push(read_code_size_report(&path)?);
        }
        let codesize = CodeSizeTable::build(&size_records, self.step_count, evolution.as_ref())?;

        let mut graphs = Vec::new();
        let mut sizes = Vec::new();
        for unit in source.units()? {
            let graph = InterferenceGraph::load_adjlist(&source.graph_export(&unit))?;
            sizes.extend(component_sizes(&graph));
            graphs.push(GraphShape::of(unit, &graph));
        }
        let graph_summary = GraphSummary::of(&graphs, &sizes);

        Ok(StatisticsReport {
            runtime_normalized: runtime.normalized(),
            runtime,
            codesize,
            graphs,
            graph_summary,
        })
    }

    /// Write every table into the root of `dest`.
    pub fn write(&self, report: &StatisticsReport, dest: &ArtifactSet) -> BenchResult<()> {
        let exporter = CsvExporter::new();
        exporter.export(&report.runtime, &dest.table(RUNTIME_TABLE))?;
        exporter.export(&report.runtime_normalized, &dest.table(RUNTIME_NORMALIZED_TABLE))?;
        exporter.export(&report.codesize, &dest.table(CODESIZE_TABLE))?;
        exporter.export(report.graphs.as_slice(), &dest.table(GRAPH_TABLE))?;

        let s = &report.graph_summary;
        tracing::info!(
            units = s.units,
            components = s.components,
            mean_density = ?s.mean_density,
            gmean_density = ?s.geometric_mean_density,
            mean_component_size = ?s.mean_component_size,
            "interference graph summary"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bench::{BenchTarget, MockBenchmark};
    use crate::core::RuntimeRecord;

    fn write_runtime(set: &ArtifactSet, binary: &str, step: usize, mean: f64) {
        let records = vec![RuntimeRecord::new(binary, "", step, mean, mean / 10.0)];
        let path = set.step_artifact(binary, step, ArtifactKind::RuntimeReport);
        std::fs::write(path, serde_json::to_string(&records).unwrap()).unwrap();
    }

    #[test]
    fn test_aggregate_aligns_steps() {
        let dir = tempfile::tempdir().unwrap();
        let set = ArtifactSet::new(dir.path());
        for step in [0, 2, 3] {
            write_runtime(&set, "harris", step, 10.0 - step as f64);
            let asm = set.assembly("main", step);
            std::fs::write(&asm, "\tmovq %rax, 8(%rsp) # 8-byte Spill\n\tretq\n").unwrap();
            MarkerScan::default()
                .scan_file("main", step, &asm, &set.code_size_report("main", step))
                .unwrap();
        }
        let graph = InterferenceGraph::from_edges([1, 2, 3], [(1, 2), (2, 3)]).unwrap();
        std::fs::write(set.graph_export("main.ll.0"), graph.to_adjlist()).unwrap();

        let sweep = BenchmarkSweep::new(Box::new(MockBenchmark::new()), vec![BenchTarget::new("harris")]);
        let aggregator = StatisticsAggregator::new(&sweep, 4);
        let report = aggregator.aggregate(&set).unwrap();

        let row = report.runtime.row("harris").unwrap();
        assert_eq!(row.means, vec![Some(10.0), None, Some(8.0), Some(7.0)]);
        assert_eq!(report.codesize.rows[1].asm_lines, None);
        assert_eq!(report.codesize.rows[3].spills, Some(1));
        assert_eq!(report.graphs.len(), 1);
        assert_eq!(report.graphs[0].components, 1);

        aggregator.write(&report, &set).unwrap();
        for table in [RUNTIME_TABLE, RUNTIME_NORMALIZED_TABLE, CODESIZE_TABLE, GRAPH_TABLE] {
            assert!(dir.path().join(table).exists(), "{table} missing");
        }
    }

    #[test]
    fn test_aggregate_without_any_runtime_is_gap() {
        let dir = tempfile::tempdir().unwrap();
        let set = ArtifactSet::new(dir.path());
        let sweep = BenchmarkSweep::new(Box::new(MockBenchmark::new()), vec![BenchTarget::new("harris")]);
        let err = StatisticsAggregator::new(&sweep, 3).aggregate(&set).unwrap_err();
        assert!(matches!(err, BenchError::AggregationGap(_)));
    }
}
