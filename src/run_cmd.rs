use std::path::PathBuf;

use tracing::info;

use crate::core::ExperimentConfig;
use crate::engine::{Pipeline, PipelineReport};
use crate::stats::{CODESIZE_TABLE, GRAPH_TABLE, RUNTIME_NORMALIZED_TABLE, RUNTIME_TABLE};

/// Run a complete experiment. Errors are `BenchError::Config` before the
/// pipeline starts and `PipelineError` afterwards.
pub fn run(config_path: PathBuf) -> anyhow::Result<PipelineReport> {
    let config = ExperimentConfig::load(&config_path)?;
    info!(experiment = %config.name, steps = config.steps, workdir = %config.working_dir.display(), "starting experiment");

    let mut pipeline = Pipeline::from_config(&config)?;
    if let Err(e) = pipeline.abort_handle().install_interrupt_handler() {
        tracing::warn!(error = %e, "Ctrl-C will not abort the coloring retry");
    }
    let report = pipeline.run()?;

    let artifacts = pipeline.artifacts();
    println!("experiment {} done: {} unit(s), {} step(s)", config.name, report.units.len(), report.step_count);
    println!("  coloring attempts: {}", report.coloring_attempts);
    for (unit, outcome) in &report.reductions {
        let cover: usize = outcome.selections.iter().map(|s| s.selected.len()).sum();
        println!(
            "  {unit}: {} nodes, {cover} revealed, {} in complement",
            outcome.original_size,
            outcome.complement.len()
        );
    }
    for (step, binary) in &report.measurement_failures {
        println!("  no measurement for {binary} at step {step} (see err.txt)");
    }
    for table in [RUNTIME_TABLE, RUNTIME_NORMALIZED_TABLE, CODESIZE_TABLE, GRAPH_TABLE] {
        println!("  wrote {}", artifacts.table(table).display());
    }
    Ok(report)
}
