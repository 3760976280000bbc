//! The experiment pipeline.
//!
//! Stages run strictly in order: setup, compile, graph extraction, graph
//! serialization, coloring, then `steps + 1` rounds of {allocate, link,
//! benchmark, collect}, then statistics and cleanup. Every stage is fail-fast
//! except coloring, which is retried, and benchmarking, whose failures only
//! leave holes in the tables.
//!
//! Progress is tracked by an explicit [`PipelineState`]; the files in the
//! working directory are its persisted form.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bench::{self, BenchmarkSweep};
use crate::core::{ExperimentConfig, InterferenceGraph, NodeWeights, ReductionOutcome};
use crate::engine::artifacts::ArtifactSet;
use crate::engine::provenance::{self, ExperimentInfo, GraphFingerprint};
use crate::engine::retry::{AbortHandle, RetryPolicy};
use crate::engine::toolchain::{CommandToolchain, Toolchain};
use crate::logging::RunLog;
use crate::reduce::{self, ReductionRequest, ReductionStrategy};
use crate::stats::{MarkerScan, StatisticsAggregator, StatisticsReport};
use crate::{BenchError, BenchResult};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Setup,
    Compile,
    GraphExtraction,
    GraphSerialization,
    Coloring,
    Allocation,
    Link,
    Benchmark,
    Collect,
    Statistics,
    Cleanup,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Setup => "setup",
            Stage::Compile => "compile",
            Stage::GraphExtraction => "graph-extraction",
            Stage::GraphSerialization => "graph-serialization",
            Stage::Coloring => "coloring",
            Stage::Allocation => "allocation",
            Stage::Link => "link",
            Stage::Benchmark => "benchmark",
            Stage::Collect => "collect",
            Stage::Statistics => "statistics",
            Stage::Cleanup => "cleanup",
        }
    }

    /// Banner tag in `log.txt`.
    pub fn tag(&self) -> &'static str {
        match self {
            Stage::Setup => "SETUP",
            Stage::Compile => "COMPILE",
            Stage::GraphExtraction => "PROCESS",
            Stage::GraphSerialization => "SERIALIZE",
            Stage::Coloring => "COLORING",
            Stage::Allocation => "REGALLOC",
            Stage::Link => "LINKING",
            Stage::Benchmark => "BENCHMARK",
            Stage::Collect => "COLLECT",
            Stage::Statistics => "STATISTICS",
            Stage::Cleanup => "CLEANUP",
        }
    }

    /// First exit code of the stage's reserved range of ten.
    pub fn exit_base(&self) -> i32 {
        match self {
            Stage::Setup => 10,
            Stage::Compile => 20,
            Stage::GraphExtraction => 30,
            Stage::GraphSerialization => 40,
            Stage::Coloring => 50,
            Stage::Allocation => 60,
            Stage::Link => 70,
            Stage::Benchmark => 80,
            Stage::Collect => 90,
            Stage::Statistics => 100,
            Stage::Cleanup => 110,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Compiled,
    GraphExtracted,
    GraphSerialized,
    Colored,
    Allocated(usize),
    Linked(usize),
    Benchmarked(usize),
    StatsCollected(usize),
    StatisticsReady,
    CleanedUp,
    Done,
    Failed { stage: Stage, cause: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed { .. })
    }

    /// Whether `next` may follow `self` in a run of `step_count` steps.
    pub fn can_advance_to(&self, next: &PipelineState, step_count: usize) -> bool {
        use PipelineState::*;
        match (self, next) {
            (Failed { .. } | Done, _) => false,
            (_, Failed { .. }) => true,
            (Init, Compiled)
            | (Compiled, GraphExtracted)
            | (GraphExtracted, GraphSerialized)
            | (GraphSerialized, Colored)
            | (Colored, Allocated(0))
            | (StatisticsReady, CleanedUp)
            | (CleanedUp, Done) => true,
            (Allocated(i), Linked(j)) | (Linked(i), Benchmarked(j)) | (Benchmarked(i), StatsCollected(j)) => i == j,
            (StatsCollected(i), Allocated(j)) => *j == i + 1 && *j < step_count,
            (StatsCollected(i), StatisticsReady) => i + 1 == step_count,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Allocated(i) => write!(f, "Allocated({i})"),
            PipelineState::Linked(i) => write!(f, "Linked({i})"),
            PipelineState::Benchmarked(i) => write!(f, "Benchmarked({i})"),
            PipelineState::StatsCollected(i) => write!(f, "StatsCollected({i})"),
            PipelineState::Failed { stage, cause } => write!(f, "Failed({stage}: {cause})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// A stage failure; the exit code identifies the stage.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: BenchError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: BenchError) -> Self {
        PipelineError { stage, source }
    }

    /// Wrap errors raised while running `stage`.
    pub fn at(stage: Stage) -> impl FnOnce(BenchError) -> PipelineError {
        move |source| PipelineError::new(stage, source)
    }

    pub fn exit_code(&self) -> i32 {
        let offset = match self.source {
            BenchError::ToolInvocation { .. } => 1,
            BenchError::ArtifactMissing { .. } => 2,
            BenchError::Io(_) => 3,
            BenchError::Aborted => 4,
            BenchError::AggregationGap(_) => 5,
            _ => 9,
        };
        self.stage.exit_base() + offset
    }
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct PipelineReport {
    pub step_count: usize,
    pub units: Vec<String>,
    pub reductions: Vec<(String, ReductionOutcome)>,
    /// Reduction attempts across all units, failed ones included.
    pub coloring_attempts: u32,
    /// `(step, binary)` pairs whose measurement failed.
    pub measurement_failures: Vec<(usize, String)>,
    pub statistics: StatisticsReport,
}

struct UnitGraph {
    unit: String,
    graph: InterferenceGraph,
    weights: Option<NodeWeights>,
}

pub struct Pipeline<'a> {
    config: &'a ExperimentConfig,
    artifacts: ArtifactSet,
    toolchain: Box<dyn Toolchain>,
    reduction: Box<dyn ReductionStrategy>,
    sweep: BenchmarkSweep,
    markers: MarkerScan,
    retry: RetryPolicy,
    abort: AbortHandle,
    log: RunLog,
    full_provenance: bool,
    state: PipelineState,
    history: Vec<PipelineState>,
    units: Vec<UnitGraph>,
    reductions: Vec<(String, ReductionOutcome)>,
    coloring_attempts: u32,
    measurement_failures: Vec<(usize, String)>,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a ExperimentConfig,
        toolchain: Box<dyn Toolchain>,
        reduction: Box<dyn ReductionStrategy>,
        sweep: BenchmarkSweep,
    ) -> Self {
        let artifacts = ArtifactSet::from_config(config);
        let abort = AbortHandle::new().with_sentinel(artifacts.abort_sentinel());
        let log = RunLog::new(artifacts.log_file(), artifacts.err_file());
        Pipeline {
            config,
            toolchain,
            reduction,
            sweep,
            markers: MarkerScan::from_config(&config.statistics),
            retry: RetryPolicy::from_config(&config.reduction.retry),
            abort,
            log,
            full_provenance: false,
            state: PipelineState::Init,
            history: vec![PipelineState::Init],
            units: Vec::new(),
            reductions: Vec::new(),
            coloring_attempts: 0,
            measurement_failures: Vec::new(),
            artifacts,
        }
    }

    /// Pipeline with the real toolchain and the configured strategies.
    pub fn from_config(config: &'a ExperimentConfig) -> BenchResult<Self> {
        let toolchain = CommandToolchain::new(config.toolchain.clone()).with_timeout(config.tool_timeout());
        let reduction = reduce::from_config(config)?;
        let sweep = bench::sweep_from_config(config);
        Ok(Self::new(config, Box::new(toolchain), reduction, sweep).with_full_provenance())
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the abort channel; the sentinel file is kept.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = abort.with_sentinel(self.artifacts.abort_sentinel());
        self
    }

    /// Query tool versions and system details for the manifest.
    pub fn with_full_provenance(mut self) -> Self {
        self.full_provenance = true;
        self
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Every state entered so far, starting with `Init`.
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// Reduction attempts so far, failed ones included.
    pub fn coloring_attempts(&self) -> u32 {
        self.coloring_attempts
    }

    fn advance(&mut self, next: PipelineState) -> BenchResult<()> {
        if !self.state.can_advance_to(&next, self.config.step_count()) {
            return Err(BenchError::Message(format!(
                "invalid pipeline transition {} -> {next}",
                self.state
            )));
        }
        tracing::debug!(from = %self.state, to = %next, "pipeline transition");
        self.state = next.clone();
        self.history.push(next);
        Ok(())
    }

    /// Run every stage to completion or to the first fatal failure.
    pub fn run(&mut self) -> Result<PipelineReport, PipelineError> {
        match self.run_stages() {
            Ok(report) => Ok(report),
            Err(err) => {
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    fn record_failure(&mut self, err: &PipelineError) {
        tracing::error!(stage = %err.stage, exit_code = err.exit_code(), error = %err.source, "pipeline failed");
        if let Err(e) = self.log.failure(&format!("Failed at {} stage", err.stage), &err.source) {
            tracing::warn!(error = %e, "could not write error log");
        }
        let failed = PipelineState::Failed {
            stage: err.stage,
            cause: err.source.to_string(),
        };
        if !self.state.is_terminal() {
            self.state = failed.clone();
            self.history.push(failed);
        }
    }

    fn run_stages(&mut self) -> Result<PipelineReport, PipelineError> {
        self.setup().map_err(PipelineError::at(Stage::Setup))?;
        self.compile().map_err(PipelineError::at(Stage::Compile))?;
        self.extract_graphs().map_err(PipelineError::at(Stage::GraphExtraction))?;
        self.serialize_graphs().map_err(PipelineError::at(Stage::GraphSerialization))?;
        self.color().map_err(PipelineError::at(Stage::Coloring))?;

        for step in 0..self.config.step_count() {
            let _span = tracing::info_span!("step", step).entered();
            self.allocate(step).map_err(PipelineError::at(Stage::Allocation))?;
            self.link(step).map_err(PipelineError::at(Stage::Link))?;
            self.benchmark(step).map_err(PipelineError::at(Stage::Benchmark))?;
            self.collect(step).map_err(PipelineError::at(Stage::Collect))?;
        }

        let statistics = self.statistics().map_err(PipelineError::at(Stage::Statistics))?;
        self.cleanup().map_err(PipelineError::at(Stage::Cleanup))?;

        Ok(PipelineReport {
            step_count: self.config.step_count(),
            units: self.units.iter().map(|u| u.unit.clone()).collect(),
            reductions: std::mem::take(&mut self.reductions),
            coloring_attempts: self.coloring_attempts,
            measurement_failures: std::mem::take(&mut self.measurement_failures),
            statistics,
        })
    }

    fn setup(&mut self) -> BenchResult<()> {
        let _span = tracing::info_span!("setup").entered();
        let root = self.artifacts.root().to_path_buf();
        if !root.is_dir() {
            return Err(BenchError::ArtifactMissing { path: root });
        }
        self.log.truncate()?;
        self.log.banner(Stage::Setup.tag(), &format!("experiment {}", self.config.name))?;

        let sentinel = self.artifacts.abort_sentinel();
        if sentinel.exists() {
            tracing::warn!(path = %sentinel.display(), "removing stale abort sentinel");
            std::fs::remove_file(&sentinel)?;
        }
        let archive = self.artifacts.archive();
        if archive.exists() {
            tracing::info!(path = %archive.display(), "clearing previous archive");
            std::fs::remove_dir_all(&archive)?;
        }
        // Leftovers of an interrupted run would be read back as this run's data.
        let leftovers = self.artifacts.intermediate_files()?;
        for file in &leftovers {
            std::fs::remove_file(file)?;
        }
        if !leftovers.is_empty() {
            tracing::warn!(removed = leftovers.len(), "removed intermediate artifacts of a previous run");
        }
        Ok(())
    }

    fn compile(&mut self) -> BenchResult<()> {
        let _span = tracing::info_span!("compile").entered();
        let sources = self
            .artifacts
            .files_with_extensions(&self.config.toolchain.source_extensions)?;
        if sources.is_empty() {
            return Err(BenchError::Message(format!(
                "no source files ({}) in {}",
                self.config.toolchain.source_extensions.join(", "),
                self.artifacts.root().display()
            )));
        }
        for source in &sources {
            self.log.banner(Stage::Compile.tag(), &source.display().to_string())?;
            tracing::info!(source = %source.display(), "compiling");
            let run = self.toolchain.compile(self.artifacts.root(), source)?;
            self.log.tool_output(&run)?;
            let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            self.artifacts.require(&self.artifacts.ir_file(&stem))?;
        }
        self.advance(PipelineState::Compiled)
    }

    fn extract_graphs(&mut self) -> BenchResult<()> {
        let _span = tracing::info_span!("graph_extraction").entered();
        for stem in self.artifacts.ir_stems()? {
            let ir = self.artifacts.ir_file(&stem);
            self.log.banner(Stage::GraphExtraction.tag(), &ir.display().to_string())?;
            tracing::info!(ir = %ir.display(), "exporting interference graphs");
            let run = self.toolchain.extract_graph(self.artifacts.root(), &ir)?;
            self.log.tool_output(&run)?;
        }
        if self.artifacts.units()?.is_empty() {
            return Err(BenchError::ArtifactMissing {
                path: self.artifacts.graph_export("*"),
            });
        }
        self.advance(PipelineState::GraphExtracted)
    }

    fn serialize_graphs(&mut self) -> BenchResult<()> {
        let _span = tracing::info_span!("graph_serialization").entered();
        let mut fingerprints = Vec::new();
        let mut units = Vec::new();
        for unit in self.artifacts.units()? {
            let export = self.artifacts.graph_export(&unit);
            let graph = InterferenceGraph::load_adjlist(&export)?;
            let weights_path = self.artifacts.node_weights(&unit);
            let weights = if weights_path.exists() {
                Some(NodeWeights::load(&weights_path)?)
            } else {
                if self.reduction.needs_weights() {
                    tracing::warn!(unit = %unit, "no node weights; every node weighs 1");
                }
                None
            };
            graph
                .to_serialized(weights.as_ref())
                .write(&self.artifacts.serialized_graph(&unit))?;
            self.log.banner(
                Stage::GraphSerialization.tag(),
                &format!("{unit}: {} nodes, {} edges", graph.node_count(), graph.edge_count()),
            )?;
            fingerprints.push(GraphFingerprint::of(&unit, &export, &graph)?);
            units.push(UnitGraph { unit, graph, weights });
        }

        let experiment = ExperimentInfo::from_config(self.config, self.reduction.name(), self.sweep.strategy().name());
        let manifest = if self.full_provenance {
            provenance::collect(experiment, self.config, fingerprints)
        } else {
            provenance::collect_minimal(experiment, fingerprints)
        };
        manifest.write(&self.artifacts.manifest())?;

        self.units = units;
        self.advance(PipelineState::GraphSerialized)
    }

    fn color(&mut self) -> BenchResult<()> {
        let _span = tracing::info_span!("coloring", strategy = self.reduction.name()).entered();
        let steps = self.config.steps;
        let mut attempts = 0u32;
        let mut reductions = Vec::with_capacity(self.units.len());

        for unit in &self.units {
            let serialized = self.artifacts.serialized_graph(&unit.unit);
            let request = ReductionRequest::new(&unit.unit, &unit.graph, steps)
                .with_weights(unit.weights.as_ref())
                .with_serialized(&serialized);

            self.log.banner(Stage::Coloring.tag(), &unit.unit)?;
            let result = self.retry.run(
                &self.abort,
                |attempt| {
                    attempts += 1;
                    tracing::debug!(unit = %unit.unit, attempt, "reducing");
                    self.reduction.reduce(&request)
                },
                |attempt, err| {
                    tracing::warn!(unit = %unit.unit, attempt, error = %err, "reduction failed; retrying");
                    if let Err(e) = self.log.failure(&format!("Failed to color {} (attempt {attempt})", unit.unit), err) {
                        tracing::warn!(error = %e, "could not write error log");
                    }
                },
            );
            self.coloring_attempts = attempts;
            let outcome = result?;
            outcome.validate(&unit.graph)?;
            if outcome.selections.len() != steps {
                return Err(BenchError::Message(format!(
                    "{} produced {} selections for {} steps",
                    self.reduction.name(),
                    outcome.selections.len(),
                    steps
                )));
            }

            for selection in &outcome.selections {
                std::fs::write(
                    self.artifacts.selection(&unit.unit, selection.step),
                    selection.to_selection_line(),
                )?;
            }
            let summary = serde_json::to_string_pretty(&outcome).map_err(|e| BenchError::Message(e.to_string()))?;
            std::fs::write(self.artifacts.reduction_summary(&unit.unit), summary)?;

            tracing::info!(
                unit = %unit.unit,
                cover = outcome.selections.iter().map(|s| s.selected.len()).sum::<usize>(),
                complement = outcome.complement.len(),
                "reduction done"
            );
            reductions.push((unit.unit.clone(), outcome));
        }

        self.reductions = reductions;
        self.advance(PipelineState::Colored)
    }

    fn allocate(&mut self, step: usize) -> BenchResult<()> {
        if step > 0 {
            for unit in &self.units {
                self.artifacts.require(&self.artifacts.selection(&unit.unit, step - 1))?;
            }
        }
        for stem in self.artifacts.ir_stems()? {
            let ir = self.artifacts.ir_file(&stem);
            let live = self.artifacts.live_assembly(&stem);
            if live.exists() {
                std::fs::remove_file(&live)?;
            }
            self.log
                .banner(Stage::Allocation.tag(), &format!("step {step}: {}", ir.display()))?;
            let run = self.toolchain.allocate(self.artifacts.root(), &ir, step)?;
            self.log.tool_output(&run)?;
            self.artifacts.require(&live)?;
        }
        self.advance(PipelineState::Allocated(step))
    }

    fn link(&mut self, step: usize) -> BenchResult<()> {
        for target in &self.config.links {
            self.log
                .banner(Stage::Link.tag(), &format!("step {step}: {}", target.output))?;
            let run = self.toolchain.link(self.artifacts.root(), target)?;
            self.log.tool_output(&run)?;
            self.artifacts.require(&self.artifacts.binary(&target.output))?;
        }
        self.advance(PipelineState::Linked(step))
    }

    fn benchmark(&mut self, step: usize) -> BenchResult<()> {
        self.log.banner(Stage::Benchmark.tag(), &format!("step {step}"))?;
        let outcome = self.sweep.measure_step(
            &self.artifacts,
            step,
            self.config.repetitions,
            self.config.tool_timeout(),
        );
        for (binary, err) in &outcome.failures {
            self.log
                .failure(&format!("Failed to benchmark {binary} at step {step}"), err)?;
            self.measurement_failures.push((step, binary.clone()));
        }
        tracing::info!(step, records = outcome.records.len(), failures = outcome.failures.len(), "benchmarked");
        self.advance(PipelineState::Benchmarked(step))
    }

    fn collect(&mut self, step: usize) -> BenchResult<()> {
        for stem in self.artifacts.ir_stems()? {
            let live = self.artifacts.live_assembly(&stem);
            self.artifacts.require(&live)?;
            let asm = self.artifacts.assembly(&stem, step);
            std::fs::rename(&live, &asm)?;
            let record = self
                .markers
                .scan_file(&stem, step, &asm, &self.artifacts.code_size_report(&stem, step))?;
            tracing::debug!(unit = %stem, step, lines = record.asm_lines, spills = record.spills, reloads = record.reloads, "collected");
        }
        self.advance(PipelineState::StatsCollected(step))
    }

    fn statistics(&mut self) -> BenchResult<StatisticsReport> {
        let _span = tracing::info_span!("statistics").entered();
        self.log.banner(Stage::Statistics.tag(), "building tables")?;
        let aggregator = StatisticsAggregator::new(&self.sweep, self.config.step_count());
        let report = aggregator.aggregate(&self.artifacts)?;
        aggregator.write(&report, &self.artifacts)?;
        self.advance(PipelineState::StatisticsReady)?;
        Ok(report)
    }

    fn cleanup(&mut self) -> BenchResult<()> {
        let _span = tracing::info_span!("cleanup").entered();
        self.log.banner(Stage::Cleanup.tag(), "archiving intermediate artifacts")?;
        let archive = self.artifacts.archive();
        std::fs::create_dir_all(&archive)?;
        let files = self.artifacts.intermediate_files()?;
        for file in &files {
            if let Some(name) = file.file_name() {
                std::fs::rename(file, archive.join(name))?;
            }
        }
        tracing::info!(archived = files.len(), path = %archive.display(), "cleanup done");
        self.advance(PipelineState::CleanedUp)?;
        self.advance(PipelineState::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_disjoint_per_stage() {
        let stages = [
            Stage::Setup,
            Stage::Compile,
            Stage::GraphExtraction,
            Stage::GraphSerialization,
            Stage::Coloring,
            Stage::Allocation,
            Stage::Link,
            Stage::Benchmark,
            Stage::Collect,
            Stage::Statistics,
            Stage::Cleanup,
        ];
        for (i, a) in stages.iter().enumerate() {
            for b in &stages[i + 1..] {
                assert!(a.exit_base() + 9 < b.exit_base());
            }
        }
    }

    #[test]
    fn test_exit_code_offsets() {
        let tool = PipelineError::new(
            Stage::Compile,
            BenchError::ToolInvocation {
                command: "clang++".into(),
                status: "exit status: 1".into(),
                diagnostics: String::new(),
            },
        );
        assert_eq!(tool.exit_code(), 21);
        assert_eq!(PipelineError::new(Stage::Coloring, BenchError::Aborted).exit_code(), 54);
        let gap = PipelineError::new(Stage::Statistics, BenchError::AggregationGap("runtime".into()));
        assert_eq!(gap.exit_code(), 105);
        let other = PipelineError::new(Stage::Link, BenchError::Message("x".into()));
        assert_eq!(other.exit_code(), 79);
    }

    #[test]
    fn test_state_transitions() {
        use PipelineState::*;
        assert!(Init.can_advance_to(&Compiled, 3));
        assert!(!Init.can_advance_to(&GraphExtracted, 3));
        assert!(Colored.can_advance_to(&Allocated(0), 3));
        assert!(!Colored.can_advance_to(&Allocated(1), 3));
        assert!(Allocated(1).can_advance_to(&Linked(1), 3));
        assert!(!Allocated(1).can_advance_to(&Linked(2), 3));
        assert!(StatsCollected(1).can_advance_to(&Allocated(2), 3));
        assert!(!StatsCollected(2).can_advance_to(&Allocated(3), 3));
        assert!(StatsCollected(2).can_advance_to(&StatisticsReady, 3));
        assert!(!StatsCollected(1).can_advance_to(&StatisticsReady, 3));
        let failed = Failed {
            stage: Stage::Link,
            cause: "x".into(),
        };
        assert!(Linked(0).can_advance_to(&failed, 3));
        assert!(!failed.can_advance_to(&Done, 3));
        assert!(!Done.can_advance_to(&failed, 3));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PipelineState::Allocated(3).to_string(), "Allocated(3)");
        assert_eq!(PipelineState::Colored.to_string(), "Colored");
    }
}
