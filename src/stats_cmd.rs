use std::path::PathBuf;

use tracing::info;

use crate::BenchResult;
use crate::bench;
use crate::core::ExperimentConfig;
use crate::engine::ArtifactSet;
use crate::stats::{StatisticsAggregator, StatisticsReport};

/// Rebuild the statistics tables of a finished experiment.
///
/// Reads from the archive when cleanup already moved the per-step artifacts
/// there; tables always land in the working directory.
pub fn run(config_path: PathBuf) -> BenchResult<StatisticsReport> {
    let config = ExperimentConfig::load(&config_path)?;
    let artifacts = ArtifactSet::from_config(&config);
    let source = source_for(&artifacts)?;
    info!(source = %source.root().display(), "aggregating statistics");

    let sweep = bench::sweep_from_config(&config);
    let aggregator = StatisticsAggregator::new(&sweep, config.step_count());
    let report = aggregator.aggregate(&source)?;
    aggregator.write(&report, &artifacts)?;

    println!(
        "{} runtime row(s), {} step(s), {} graph(s)",
        report.runtime.rows.len(),
        report.codesize.rows.len(),
        report.graphs.len()
    );
    Ok(report)
}

fn source_for(artifacts: &ArtifactSet) -> BenchResult<ArtifactSet> {
    let archived = artifacts.archived();
    if archived.root().is_dir() && !archived.units()?.is_empty() {
        return Ok(archived);
    }
    Ok(artifacts.clone())
}
