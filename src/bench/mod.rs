//! Benchmark strategies.
//!
//! A strategy times one binary at one step and leaves a raw report in the
//! step namespace. [`BenchmarkSweep`] runs a strategy over every target.

pub mod harness;
pub mod mock;
pub mod perf;
pub mod sweep;
pub mod traits;

// Re-export key types
pub use harness::HarnessBenchmark;
pub use mock::MockBenchmark;
pub use perf::{PerfBenchmark, PerfReport, parse_perf_report};
pub use sweep::{BenchmarkSweep, SweepOutcome};
pub use traits::{BenchTarget, BenchmarkStrategy, MeasureRequest, discard_report};

use crate::core::{BenchmarkKind, ExperimentConfig};

/// Build the strategy selected in the experiment configuration.
pub fn strategy_from_config(config: &ExperimentConfig) -> Box<dyn BenchmarkStrategy> {
    match config.benchmark.strategy {
        BenchmarkKind::Harness => Box::new(HarnessBenchmark::new(config.benchmark.cases.clone())),
        BenchmarkKind::Perf => Box::new(PerfBenchmark::new(
            config.benchmark.perf.clone(),
            config.benchmark.events.clone(),
        )),
    }
}

/// Sweep over every configured target with the configured strategy.
pub fn sweep_from_config(config: &ExperimentConfig) -> BenchmarkSweep {
    let targets = config.bench_targets().iter().map(BenchTarget::from).collect();
    BenchmarkSweep::new(strategy_from_config(config), targets)
}
