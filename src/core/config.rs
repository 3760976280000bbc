//! Experiment configuration, loaded once from TOML and never mutated.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    pub name: String,
    pub working_dir: PathBuf,
    /// ISEC bound: the per-step loop runs `steps + 1` times.
    pub steps: usize,
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
    #[serde(default = "default_archive_dir")]
    pub archive_dir: String,
    /// Per-tool timeout in seconds, 0 disables it.
    #[serde(default)]
    pub tool_timeout_secs: u64,
    pub toolchain: ToolchainConfig,
    #[serde(rename = "link")]
    pub links: Vec<LinkTarget>,
    pub reduction: ReductionConfig,
    pub benchmark: BenchmarkConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolchainConfig {
    pub compiler: String,
    #[serde(default)]
    pub compile_flags: String,
    #[serde(default = "default_source_extensions")]
    pub source_extensions: Vec<String>,
    #[serde(default = "default_ir_extension")]
    pub ir_extension: String,
    pub codegen: String,
    #[serde(default)]
    pub extract_flags: String,
    #[serde(default)]
    pub allocate_flags: String,
    #[serde(default = "default_step_flag")]
    pub step_flag: String,
    pub linker: String,
    #[serde(default)]
    pub link_flags: String,
    #[serde(default = "default_graph_suffix")]
    pub graph_suffix: String,
    #[serde(default = "default_weights_suffix")]
    pub weights_suffix: String,
}

/// One binary linked from per-unit assembly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LinkTarget {
    pub output: String,
    /// IR stems whose assembly is linked together.
    pub inputs: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReductionKind {
    Greedy,
    WeightedGreedy,
    External,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReductionConfig {
    pub strategy: ReductionKind,
    /// Command template for the external policy.
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Absent or 0 retries without bound.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: None,
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BenchmarkKind {
    Harness,
    Perf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub strategy: BenchmarkKind,
    /// Harness case names of interest; empty keeps every case.
    #[serde(default)]
    pub cases: Vec<String>,
    #[serde(default = "default_perf")]
    pub perf: String,
    #[serde(default = "default_perf_events")]
    pub events: Vec<String>,
    #[serde(default)]
    pub targets: Vec<BenchTargetConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchTargetConfig {
    pub binary: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Marker substrings the toolchain writes next to spill code.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatisticsConfig {
    #[serde(default = "default_spill_markers")]
    pub spill_markers: Vec<String>,
    #[serde(default = "default_reload_markers")]
    pub reload_markers: Vec<String>,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        StatisticsConfig {
            spill_markers: default_spill_markers(),
            reload_markers: default_reload_markers(),
        }
    }
}

fn default_repetitions() -> u32 {
    2
}
fn default_archive_dir() -> String {
    "archive".to_string()
}
fn default_source_extensions() -> Vec<String> {
    vec!["cpp".to_string(), "c".to_string()]
}
fn default_ir_extension() -> String {
    "ll".to_string()
}
fn default_step_flag() -> String {
    "-pp2-isec".to_string()
}
fn default_graph_suffix() -> String {
    ".export.pp2graph".to_string()
}
fn default_weights_suffix() -> String {
    ".weights".to_string()
}
fn default_initial_backoff_ms() -> u64 {
    500
}
fn default_max_backoff_ms() -> u64 {
    30_000
}
fn default_multiplier() -> f64 {
    2.0
}
fn default_perf() -> String {
    "perf".to_string()
}
fn default_perf_events() -> Vec<String> {
    [
        "cache-references",
        "cache-misses",
        "cycles",
        "instructions",
        "branches",
        "branch-misses",
        "faults",
        "migrations",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
fn default_spill_markers() -> Vec<String> {
    vec!["-byte Spill".to_string()]
}
fn default_reload_markers() -> Vec<String> {
    vec!["-byte Reload".to_string(), "-byte Folded Reload".to_string()]
}

impl ExperimentConfig {
    /// Load from a TOML file; a relative `working_dir` is resolved against the file's directory.
    pub fn load(path: &Path) -> BenchResult<Self> {
        let s = std::fs::read_to_string(path)
            .map_err(|e| BenchError::Config(format!("{}: {e}", path.display())))?;
        let mut cfg = Self::from_toml_str(&s)?;
        if cfg.working_dir.is_relative() {
            let base = path.parent().unwrap_or_else(|| Path::new("."));
            cfg.working_dir = base.join(&cfg.working_dir);
        }
        Ok(cfg)
    }

    pub fn from_toml_str(s: &str) -> BenchResult<Self> {
        let cfg: ExperimentConfig = toml::from_str(s).map_err(|e| BenchError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> BenchResult<()> {
        if self.repetitions == 0 {
            return Err(BenchError::Config("repetitions must be at least 1".into()));
        }
        if self.links.is_empty() {
            return Err(BenchError::Config("at least one [[link]] target is required".into()));
        }
        if let Some(empty) = self.links.iter().find(|l| l.inputs.is_empty()) {
            return Err(BenchError::Config(format!("link target `{}` has no inputs", empty.output)));
        }
        if self.reduction.strategy == ReductionKind::External
            && self.reduction.command.as_deref().map(str::trim).unwrap_or("").is_empty()
        {
            return Err(BenchError::Config("external reduction requires `command`".into()));
        }
        if self.reduction.retry.multiplier < 1.0 {
            return Err(BenchError::Config("retry multiplier must be >= 1".into()));
        }
        if self.statistics.spill_markers.is_empty() || self.statistics.reload_markers.is_empty() {
            return Err(BenchError::Config("spill and reload markers must not be empty".into()));
        }
        if self.toolchain.graph_suffix.is_empty() {
            return Err(BenchError::Config("graph_suffix must not be empty".into()));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Number of allocation steps, including the unrevealed baseline.
    pub fn step_count(&self) -> usize {
        self.steps + 1
    }

    /// Benchmark targets, defaulting to every linked binary without options.
    pub fn bench_targets(&self) -> Vec<BenchTargetConfig> {
        if !self.benchmark.targets.is_empty() {
            return self.benchmark.targets.clone();
        }
        self.links
            .iter()
            .map(|l| BenchTargetConfig {
                binary: l.output.clone(),
                options: Vec::new(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
name = "harris"
working_dir = "bench/harris"
steps = 16

[toolchain]
compiler = "clang++"
compile_flags = "-O3 -S -emit-llvm"
codegen = "llc"
allocate_flags = "-O3 -filetype=asm -regalloc pp2"
linker = "clang++"
link_flags = "-L{home}/lib64 -lbenchmark"

[[link]]
output = "harris"
inputs = ["harrisKernel", "main"]

[reduction]
strategy = "greedy"

[benchmark]
strategy = "harness"
cases = ["BM_Harris"]
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = ExperimentConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(cfg.steps, 16);
        assert_eq!(cfg.step_count(), 17);
        assert_eq!(cfg.repetitions, 2);
        assert_eq!(cfg.archive_dir, "archive");
        assert_eq!(cfg.toolchain.ir_extension, "ll");
        assert_eq!(cfg.toolchain.step_flag, "-pp2-isec");
        assert_eq!(cfg.toolchain.graph_suffix, ".export.pp2graph");
        assert_eq!(cfg.statistics.reload_markers.len(), 2);
        assert!(cfg.reduction.retry.max_attempts.is_none());
        assert_eq!(cfg.benchmark.events.len(), 8);
    }

    #[test]
    fn test_bench_targets_default_to_links() {
        let cfg = ExperimentConfig::from_toml_str(MINIMAL).unwrap();
        let targets = cfg.bench_targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].binary, "harris");
        assert!(targets[0].options.is_empty());
    }

    #[test]
    fn test_external_requires_command() {
        let toml = MINIMAL.replace(r#"strategy = "greedy""#, r#"strategy = "external""#);
        let err = ExperimentConfig::from_toml_str(&toml).unwrap_err();
        assert!(err.to_string().contains("command"));
    }

    #[test]
    fn test_weighted_kind_parses() {
        let toml = MINIMAL.replace(r#"strategy = "greedy""#, r#"strategy = "weighted-greedy""#);
        let cfg = ExperimentConfig::from_toml_str(&toml).unwrap();
        assert_eq!(cfg.reduction.strategy, ReductionKind::WeightedGreedy);
    }

    #[test]
    fn test_zero_repetitions_rejected() {
        let toml = MINIMAL.replace("steps = 16", "steps = 16\nrepetitions = 0");
        assert!(ExperimentConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = MINIMAL.replace("steps = 16", "steps = 16\nisec = 3");
        assert!(ExperimentConfig::from_toml_str(&toml).is_err());
    }

    #[test]
    fn test_load_resolves_relative_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("experiment.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let cfg = ExperimentConfig::load(&path).unwrap();
        assert_eq!(cfg.working_dir, dir.path().join("bench/harris"));
    }
}
