//! Graph reduction strategies.
//!
//! A strategy turns one unit's interference graph into an ordered list of
//! per-step node selections. Local strategies (`GreedyReduction`) are
//! deterministic and side-effect free; `ExternalPolicy` shells out to a learned
//! policy and may fail sporadically, which the pipeline absorbs by retrying.

pub mod external;
pub mod greedy;
pub mod mock;
pub mod traits;

// Re-export key types
pub use external::{ExternalPolicy, ExternalPolicyConfig};
pub use greedy::{GreedyReduction, Scoring, greedy_cover};
pub use mock::MockReduction;
pub use traits::{ReductionRequest, ReductionStrategy};

use crate::BenchResult;
use crate::core::{ExperimentConfig, ReductionKind};

/// Build the strategy selected in the experiment configuration.
pub fn from_config(config: &ExperimentConfig) -> BenchResult<Box<dyn ReductionStrategy>> {
    Ok(match config.reduction.strategy {
        ReductionKind::Greedy => Box::new(GreedyReduction::unweighted()),
        ReductionKind::WeightedGreedy => Box::new(GreedyReduction::weighted()),
        ReductionKind::External => {
            let command = config.reduction.command.clone().ok_or_else(|| {
                crate::BenchError::Config("external reduction requires `command`".into())
            })?;
            Box::new(ExternalPolicy::new(ExternalPolicyConfig {
                command,
                cwd: config.reduction.cwd.clone(),
                workdir: config.working_dir.clone(),
                timeout: config.tool_timeout(),
            }))
        }
    })
}
