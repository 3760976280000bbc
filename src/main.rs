#![forbid(unsafe_code)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

use isec_bench::engine::PipelineError;
use isec_bench::{BenchError, reduce_cmd, run_cmd, stats_cmd};

#[derive(Parser, Debug)]
#[command(name = "isec-bench")]
#[command(about = "Progressive interference-graph reduction experiments for register allocation", long_about = None)]
struct Cli {
    /// Enable verbose logging (or set ISEC_BENCH_LOG)
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a complete experiment: compile, reduce, allocate per step, benchmark, aggregate
    Run {
        /// Path to the experiment configuration (TOML)
        #[arg(long)]
        config: PathBuf,
    },

    /// Run the greedy reduction on a single graph and print the selections
    Reduce {
        /// Graph export (adjacency list) or serialized graph (.json)
        #[arg(long)]
        graph: PathBuf,
        /// Node weights (`<node> <weight>` per line)
        #[arg(long)]
        weights: Option<PathBuf>,
        /// Number of reduction steps
        #[arg(long)]
        steps: usize,
        /// Score nodes by degree / weight
        #[arg(long)]
        weighted: bool,
        /// Write `<unit>.<step>.sel` files into this directory
        #[arg(long)]
        outdir: Option<PathBuf>,
        /// Write machine-readable JSON report to this file
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Rebuild the statistics tables of a finished experiment
    Stats {
        /// Path to the experiment configuration (TOML)
        #[arg(long)]
        config: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let env = std::env::var("ISEC_BENCH_LOG").unwrap_or_else(|_| {
        if verbose { "isec_bench=debug".to_string() } else { "isec_bench=info".to_string() }
    });
    let _ = tracing_subscriber::fmt()
        .with_span_events(FmtSpan::ACTIVE)
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_env_filter(EnvFilter::new(env))
        .try_init();
}

/// Process exit code for a failed command.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(e) = err.downcast_ref::<PipelineError>() {
        return e.exit_code();
    }
    match err.downcast_ref::<BenchError>() {
        Some(BenchError::Config(_)) => 2,
        _ => 1,
    }
}

fn main() {
    color_eyre::install().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: anyhow::Result<()> = match cli.command {
        Commands::Run { config } => run_cmd::run(config).map(|_| ()),
        Commands::Reduce { graph, weights, steps, weighted, outdir, json } => {
            reduce_cmd::run(graph, weights, steps, weighted, outdir, json)
                .map(|_| ())
                .map_err(anyhow::Error::from)
        }
        Commands::Stats { config } => stats_cmd::run(config).map(|_| ()).map_err(anyhow::Error::from),
    };

    if let Err(e) = result {
        eprintln!("{:#}", e);
        std::process::exit(exit_code(&e));
    }
}
