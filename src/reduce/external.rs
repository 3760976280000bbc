//! Out-of-process learned coloring policy.
//!
//! The policy is a black box reached through a command template. For each
//! call it receives the serialized graph and a fresh staging directory, and must
//! leave one `<unit>.<step>.sel` file per step there. Staging directories are
//! discarded after every attempt, so output of a failed attempt never reaches
//! the working directory.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::core::{ReductionOutcome, StepSelection, read_selection};
use crate::engine::process::{command_from_template, describe, home_dir, run_with_timeout};
use crate::{BenchError, BenchResult};

use super::traits::{ReductionRequest, ReductionStrategy};

/// Configuration for the external policy.
#[derive(Debug, Clone)]
pub struct ExternalPolicyConfig {
    /// Command template; placeholders: {graph}, {weights}, {outdir}, {steps},
    /// {unit}, {workdir}, {home}.
    pub command: String,
    /// Directory to run in; defaults to the working directory.
    pub cwd: Option<PathBuf>,
    pub workdir: PathBuf,
    pub timeout: Duration,
}

pub struct ExternalPolicy {
    config: ExternalPolicyConfig,
}

impl ExternalPolicy {
    pub fn new(config: ExternalPolicyConfig) -> Self {
        ExternalPolicy { config }
    }

    fn build_command(&self, request: &ReductionRequest<'_>, graph: &Path, weights: Option<&Path>, outdir: &Path) -> BenchResult<Command> {
        let vars = [
            ("graph", graph.to_string_lossy().into_owned()),
            (
                "weights",
                weights.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
            ),
            ("outdir", outdir.to_string_lossy().into_owned()),
            ("steps", request.steps.to_string()),
            ("unit", request.unit.to_string()),
            ("workdir", self.config.workdir.to_string_lossy().into_owned()),
            ("home", home_dir()),
        ];
        let mut cmd = command_from_template(&self.config.command, &vars)?;
        cmd.current_dir(self.config.cwd.as_deref().unwrap_or(&self.config.workdir))
            .env("WORKING_DIR", &self.config.workdir);
        Ok(cmd)
    }

    /// Read the per-step selection files left by the policy.
    fn read_outputs(&self, request: &ReductionRequest<'_>, outdir: &Path) -> BenchResult<ReductionOutcome> {
        let mut residual = request.graph.node_count();
        let mut selections = Vec::with_capacity(request.steps);
        for step in 0..request.steps {
            let path = outdir.join(format!("{}.{step}.sel", request.unit));
            let selected = read_selection(&path).map_err(|e| {
                BenchError::TransientReduction(format!("policy output for step {step}: {e}"))
            })?;
            residual = residual.saturating_sub(selected.len());
            selections.push(StepSelection {
                step,
                selected,
                freed: Vec::new(),
                residual_size: residual,
            });
        }
        let outcome = ReductionOutcome::new(request.graph, selections);
        outcome
            .validate(request.graph)
            .map_err(|e| BenchError::TransientReduction(format!("invalid policy output: {e}")))?;
        Ok(outcome)
    }
}

impl ReductionStrategy for ExternalPolicy {
    fn name(&self) -> &str {
        "external"
    }

    fn reduce(&self, request: &ReductionRequest<'_>) -> BenchResult<ReductionOutcome> {
        let graph = request.serialized.ok_or_else(|| {
            BenchError::Message("external policy needs a serialized graph".into())
        })?;
        if !graph.exists() {
            return Err(BenchError::ArtifactMissing {
                path: graph.to_path_buf(),
            });
        }

        let staging = tempfile::Builder::new()
            .prefix("isec-policy-")
            .tempdir()
            .map_err(|e| BenchError::TransientReduction(format!("failed to create staging dir: {e}")))?;

        let weights_path = match request.weights {
            Some(w) => {
                let p = staging.path().join(format!("{}.weights", request.unit));
                std::fs::write(&p, w.to_text())?;
                Some(p)
            }
            None => None,
        };

        let cmd = self.build_command(request, graph, weights_path.as_deref(), staging.path())?;
        let description = describe(&cmd);
        tracing::debug!(unit = request.unit, command = %description, "invoking external policy");

        let output = run_with_timeout(cmd, self.config.timeout)
            .map_err(|e| BenchError::TransientReduction(e.to_string()))?;
        if !output.success() {
            return Err(BenchError::TransientReduction(format!(
                "`{description}` exited with {}: {}",
                output.status,
                output.stderr.trim()
            )));
        }

        self.read_outputs(request, staging.path())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;
    use crate::core::{InterferenceGraph, SerializedGraph};

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\nset -e\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    fn setup(body: &str) -> (tempfile::TempDir, ExternalPolicy, InterferenceGraph, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let graph = InterferenceGraph::from_edges([1, 2, 3, 4], [(1, 2), (2, 3), (3, 4)]).unwrap();
        let graph_path = dir.path().join("f.graph.json");
        graph.to_serialized(None).write(&graph_path).unwrap();
        let script = write_script(dir.path(), "policy.sh", body);
        let policy = ExternalPolicy::new(ExternalPolicyConfig {
            command: format!("{} {{graph}} {{outdir}} {{unit}} {{steps}}", script.display()),
            cwd: None,
            workdir: dir.path().to_path_buf(),
            timeout: Duration::from_secs(30),
        });
        (dir, policy, graph, graph_path)
    }

    #[test]
    fn test_reads_policy_selections() {
        let (_dir, policy, graph, graph_path) =
            setup(r#"test -f "$1"; echo "2" > "$2/$3.0.sel"; echo "3 " > "$2/$3.1.sel""#);
        let request = ReductionRequest::new("f", &graph, 2).with_serialized(&graph_path);
        let outcome = policy.reduce(&request).unwrap();
        assert_eq!(outcome.selections[0].selected, vec![2]);
        assert_eq!(outcome.selections[1].selected, vec![3]);
        assert_eq!(outcome.selections[1].residual_size, 2);
        assert_eq!(outcome.complement, vec![1, 4]);
    }

    #[test]
    fn test_nonzero_exit_is_transient() {
        let (_dir, policy, graph, graph_path) = setup("echo flaky >&2; exit 1");
        let request = ReductionRequest::new("f", &graph, 1).with_serialized(&graph_path);
        match policy.reduce(&request) {
            Err(BenchError::TransientReduction(msg)) => assert!(msg.contains("flaky")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_step_file_is_transient() {
        let (_dir, policy, graph, graph_path) = setup(r#"echo "2" > "$2/$3.0.sel""#);
        let request = ReductionRequest::new("f", &graph, 2).with_serialized(&graph_path);
        assert!(matches!(policy.reduce(&request), Err(BenchError::TransientReduction(_))));
    }

    #[test]
    fn test_overlapping_selections_rejected() {
        let (_dir, policy, graph, graph_path) =
            setup(r#"echo "2" > "$2/$3.0.sel"; echo "2" > "$2/$3.1.sel""#);
        let request = ReductionRequest::new("f", &graph, 2).with_serialized(&graph_path);
        assert!(matches!(policy.reduce(&request), Err(BenchError::TransientReduction(_))));
    }

    #[test]
    fn test_missing_serialized_graph() {
        let (dir, policy, graph, _graph_path) = setup("true");
        let absent = dir.path().join("absent.graph.json");
        let request = ReductionRequest::new("f", &graph, 1).with_serialized(&absent);
        assert!(matches!(policy.reduce(&request), Err(BenchError::ArtifactMissing { .. })));
        let parsed = SerializedGraph::read(&absent);
        assert!(parsed.is_err());
    }
}
