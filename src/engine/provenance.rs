//! Provenance collection for experiment reproducibility.
//!
//! Written once per run as `experiment.json`: which tools and strategies
//! produced the artifacts, on which machine, and fingerprints of every
//! interference graph the reduction saw.

use std::path::Path;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::core::{ExperimentConfig, InterferenceGraph};
use crate::{BenchError, BenchResult, sha256_hex};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provenance {
    pub isec_bench: ToolInfo,
    pub compiler: Option<ToolInfo>,
    pub codegen: Option<ToolInfo>,
    pub linker: Option<ToolInfo>,
    pub system: SystemInfo,
    pub experiment: ExperimentInfo,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub graphs: Vec<GraphFingerprint>,
    /// Command line arguments used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cli_args: Vec<String>,
    /// ISO 8601 timestamp when provenance was collected
    pub collected_at: String,
}

/// Information about a tool/binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    /// First line of `--version`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// System/environment information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemInfo {
    pub os: String,
    pub arch: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_cores: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ram_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
}

impl Default for SystemInfo {
    fn default() -> Self {
        SystemInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            cpu_brand: None,
            cpu_cores: None,
            ram_bytes: None,
            hostname: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentInfo {
    pub name: String,
    pub steps: usize,
    pub repetitions: u32,
    pub reduction: String,
    pub benchmark: String,
}

impl ExperimentInfo {
    pub fn from_config(config: &ExperimentConfig, reduction: &str, benchmark: &str) -> Self {
        ExperimentInfo {
            name: config.name.clone(),
            steps: config.steps,
            repetitions: config.repetitions,
            reduction: reduction.to_string(),
            benchmark: benchmark.to_string(),
        }
    }
}

/// Identity of one exported interference graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphFingerprint {
    pub unit: String,
    pub sha256: String,
    pub nodes: usize,
    pub edges: usize,
}

impl GraphFingerprint {
    pub fn of(unit: &str, export: &Path, graph: &InterferenceGraph) -> BenchResult<Self> {
        let bytes = std::fs::read(export).map_err(|_| BenchError::ArtifactMissing {
            path: export.to_path_buf(),
        })?;
        Ok(GraphFingerprint {
            unit: unit.to_string(),
            sha256: sha256_hex(&bytes),
            nodes: graph.node_count(),
            edges: graph.edge_count(),
        })
    }
}

fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default()
}

fn self_info() -> ToolInfo {
    ToolInfo {
        name: "isec-bench".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
        path: std::env::current_exe()
            .ok()
            .and_then(|p| p.to_str().map(String::from)),
    }
}

/// Collect full provenance, asking each configured tool for its version.
pub fn collect(experiment: ExperimentInfo, config: &ExperimentConfig, graphs: Vec<GraphFingerprint>) -> Provenance {
    Provenance {
        isec_bench: self_info(),
        compiler: collect_tool_info(&config.toolchain.compiler),
        codegen: collect_tool_info(&config.toolchain.codegen),
        linker: collect_tool_info(&config.toolchain.linker),
        system: collect_system_info(),
        experiment,
        graphs,
        cli_args: std::env::args().collect(),
        collected_at: now_rfc3339(),
    }
}

/// Collect provenance with no shell-outs (for testing and mock toolchains).
pub fn collect_minimal(experiment: ExperimentInfo, graphs: Vec<GraphFingerprint>) -> Provenance {
    Provenance {
        isec_bench: self_info(),
        compiler: None,
        codegen: None,
        linker: None,
        system: SystemInfo::default(),
        experiment,
        graphs,
        cli_args: Vec::new(),
        collected_at: now_rfc3339(),
    }
}

impl Provenance {
    pub fn write(&self, path: &Path) -> BenchResult<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| BenchError::Message(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn collect_tool_info(program: &str) -> Option<ToolInfo> {
    let version = run_command(program, &["--version"]).and_then(|v| v.lines().next().map(str::to_string));
    let path = which_binary(program);
    if version.is_none() && path.is_none() {
        return None;
    }
    Some(ToolInfo {
        name: program.to_string(),
        version,
        path,
    })
}

/// Collect system information.
fn collect_system_info() -> SystemInfo {
    use sysinfo::System;

    let mut sys = System::new_all();
    sys.refresh_all();

    SystemInfo {
        os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        arch: std::env::consts::ARCH.to_string(),
        cpu_brand: sys.cpus().first().map(|c| c.brand().to_string()),
        cpu_cores: sys.physical_core_count().map(|c| c as u32),
        ram_bytes: Some(sys.total_memory()),
        hostname: System::host_name(),
    }
}

/// Run a command and capture stdout.
fn run_command(cmd: &str, args: &[&str]) -> Option<String> {
    Command::new(cmd)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Find binary path using `which`.
fn which_binary(name: &str) -> Option<String> {
    run_command("which", &[name])
}
