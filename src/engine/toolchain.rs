//! Toolchain abstraction for compiling, graph extraction, allocation and linking.
//!
//! A `Toolchain` wraps the external compiler, the code generator (which both
//! exports interference graphs and performs the step-indexed allocation) and
//! the linker. All four operations run inside the working directory and leave
//! their outputs there; the pipeline only sees the captured logs.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::{InterferenceGraph, LinkTarget, ToolchainConfig};
use crate::engine::pipeline::Stage;
use crate::engine::process::{describe, expand_template, home_dir, run_checked};
use crate::{BenchError, BenchResult};

/// Captured log of one successful tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolRun {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub elapsed_ms: u128,
}

/// Compiler, code generator and linker behind one interface.
pub trait Toolchain: Send + Sync {
    /// Returns the toolchain name (e.g., "command").
    fn name(&self) -> &'static str;

    /// Version line of the compiler, if detectable.
    fn version(&self) -> BenchResult<String>;

    /// Compile one source file to IR.
    fn compile(&self, workdir: &Path, source: &Path) -> BenchResult<ToolRun>;

    /// Export the interference graphs of one IR file.
    fn extract_graph(&self, workdir: &Path, ir: &Path) -> BenchResult<ToolRun>;

    /// Allocate registers for one IR file at `step`, writing `<stem>.s`.
    fn allocate(&self, workdir: &Path, ir: &Path, step: usize) -> BenchResult<ToolRun>;

    /// Link the current step's assembly into one binary.
    fn link(&self, workdir: &Path, target: &LinkTarget) -> BenchResult<ToolRun>;
}

/// Toolchain that shells out to the configured commands.
pub struct CommandToolchain {
    config: ToolchainConfig,
    timeout: Duration,
}

impl CommandToolchain {
    pub fn new(config: ToolchainConfig) -> Self {
        CommandToolchain {
            config,
            timeout: Duration::ZERO,
        }
    }

    /// Kill tools running longer than `timeout` (zero disables).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn flags(&self, flags: &str, workdir: &Path, step: Option<usize>) -> BenchResult<Vec<String>> {
        let mut vars = vec![
            ("home", home_dir()),
            ("workdir", workdir.to_string_lossy().into_owned()),
        ];
        if let Some(step) = step {
            vars.push(("step", step.to_string()));
        }
        expand_template(flags, &vars)
    }

    fn execute(&self, mut cmd: Command, workdir: &Path) -> BenchResult<ToolRun> {
        cmd.current_dir(workdir);
        let command = describe(&cmd);
        tracing::debug!(command = %command, "running tool");
        let output = run_checked(cmd, self.timeout)?;
        Ok(ToolRun {
            command,
            stdout: output.stdout,
            stderr: output.stderr,
            elapsed_ms: output.elapsed_ms,
        })
    }
}

/// Extract a version string from `--version` output: the first non-empty line.
pub fn parse_version_line(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

impl Toolchain for CommandToolchain {
    fn name(&self) -> &'static str {
        "command"
    }

    fn version(&self) -> BenchResult<String> {
        let output = Command::new(&self.config.compiler)
            .arg("--version")
            .output()
            .map_err(|e| BenchError::Message(format!("failed to run {} --version: {e}", self.config.compiler)))?;
        if !output.status.success() {
            return Err(BenchError::Message(format!(
                "{} --version failed with status: {}",
                self.config.compiler, output.status
            )));
        }
        parse_version_line(&String::from_utf8_lossy(&output.stdout))
            .ok_or_else(|| BenchError::Message("empty version output".into()))
    }

    fn compile(&self, workdir: &Path, source: &Path) -> BenchResult<ToolRun> {
        let mut cmd = Command::new(&self.config.compiler);
        cmd.args(self.flags(&self.config.compile_flags, workdir, None)?)
            .arg(source);
        self.execute(cmd, workdir)
    }

    fn extract_graph(&self, workdir: &Path, ir: &Path) -> BenchResult<ToolRun> {
        let mut cmd = Command::new(&self.config.codegen);
        cmd.args(self.flags(&self.config.extract_flags, workdir, None)?)
            .arg(ir);
        self.execute(cmd, workdir)
    }

    fn allocate(&self, workdir: &Path, ir: &Path, step: usize) -> BenchResult<ToolRun> {
        let mut cmd = Command::new(&self.config.codegen);
        cmd.args(self.flags(&self.config.allocate_flags, workdir, Some(step))?)
            .arg(&self.config.step_flag)
            .arg(step.to_string())
            .arg(ir);
        self.execute(cmd, workdir)
    }

    fn link(&self, workdir: &Path, target: &LinkTarget) -> BenchResult<ToolRun> {
        let mut cmd = Command::new(&self.config.linker);
        cmd.args(target.inputs.iter().map(|stem| format!("{stem}.s")))
            .args(self.flags(&self.config.link_flags, workdir, None)?)
            .arg("-o")
            .arg(&target.output);
        self.execute(cmd, workdir)
    }
}

/// Mock toolchain for testing purposes.
///
/// Writes plausible artifacts into the working directory without running
/// anything: IR files, one graph export per IR file, assembly whose spill count
/// shrinks with the step, and an empty "binary" per link target.
#[derive(Debug)]
pub struct MockToolchain {
    graph: InterferenceGraph,
    graph_suffix: String,
    base_spills: usize,
    fail_stage: Option<Stage>,
    fail_step: Option<usize>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockToolchain {
    fn default() -> Self {
        Self::new()
    }
}

impl MockToolchain {
    pub fn new() -> Self {
        let graph = InterferenceGraph::from_edges([1, 2, 3, 4], [(1, 2), (2, 3), (3, 4)])
            .unwrap_or_default();
        MockToolchain {
            graph,
            graph_suffix: ".export.pp2graph".to_string(),
            base_spills: 4,
            fail_stage: None,
            fail_step: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Graph written by every `extract_graph` call.
    pub fn with_graph(mut self, graph: InterferenceGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn with_base_spills(mut self, spills: usize) -> Self {
        self.base_spills = spills;
        self
    }

    /// Fail every call belonging to `stage`.
    pub fn failing_at(mut self, stage: Stage) -> Self {
        self.fail_stage = Some(stage);
        self
    }

    /// Fail allocation at one step only.
    pub fn failing_allocation_at(mut self, step: usize) -> Self {
        self.fail_stage = Some(Stage::Allocation);
        self.fail_step = Some(step);
        self
    }

    /// Every call made so far, as `"<stage>:<argument>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, stage: Stage, step: Option<usize>, what: String) -> BenchResult<()> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(what.clone());
        }
        let step_matches = self.fail_step.is_none() || self.fail_step == step;
        if self.fail_stage == Some(stage) && step_matches {
            return Err(BenchError::ToolInvocation {
                command: what,
                status: "exit status: 1".into(),
                diagnostics: format!("mock {} failure", stage.name()),
            });
        }
        Ok(())
    }

    fn assembly(&self, stem: &str, step: usize) -> String {
        let spills = self.base_spills.saturating_sub(step);
        let mut asm = format!("\t.file\t\"{stem}\"\n\t.text\n{stem}:\n");
        for i in 0..spills {
            asm.push_str(&format!("\tmovq\t%rax, {}(%rsp)    # 8-byte Spill\n", 8 * i));
            asm.push_str(&format!("\tmovq\t{}(%rsp), %rax    # 8-byte Reload\n", 8 * i));
        }
        asm.push_str("\tretq\n");
        asm
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

impl Toolchain for MockToolchain {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn version(&self) -> BenchResult<String> {
        Ok("mock-toolchain 1.0".to_string())
    }

    fn compile(&self, workdir: &Path, source: &Path) -> BenchResult<ToolRun> {
        self.record(Stage::Compile, None, format!("compile:{}", file_name_of(source)))?;
        let stem = stem_of(source);
        std::fs::write(workdir.join(format!("{stem}.ll")), format!("; ModuleID = '{stem}'\n"))?;
        Ok(ToolRun::default())
    }

    fn extract_graph(&self, workdir: &Path, ir: &Path) -> BenchResult<ToolRun> {
        let name = file_name_of(ir);
        self.record(Stage::GraphExtraction, None, format!("extract:{name}"))?;
        let export: PathBuf = workdir.join(format!("{name}.0{}", self.graph_suffix));
        std::fs::write(export, self.graph.to_adjlist())?;
        Ok(ToolRun::default())
    }

    fn allocate(&self, workdir: &Path, ir: &Path, step: usize) -> BenchResult<ToolRun> {
        self.record(
            Stage::Allocation,
            Some(step),
            format!("allocate:{}:{step}", file_name_of(ir)),
        )?;
        let stem = stem_of(ir);
        std::fs::write(workdir.join(format!("{stem}.s")), self.assembly(&stem, step))?;
        Ok(ToolRun {
            stdout: format!("allocated {stem} at step {step}\n"),
            ..ToolRun::default()
        })
    }

    fn link(&self, workdir: &Path, target: &LinkTarget) -> BenchResult<ToolRun> {
        self.record(Stage::Link, None, format!("link:{}", target.output))?;
        for stem in &target.inputs {
            let asm = workdir.join(format!("{stem}.s"));
            if !asm.exists() {
                return Err(BenchError::ToolInvocation {
                    command: format!("link:{}", target.output),
                    status: "exit status: 1".into(),
                    diagnostics: format!("no such file: {}", asm.display()),
                });
            }
        }
        std::fs::write(workdir.join(&target.output), "")?;
        Ok(ToolRun::default())
    }
}
