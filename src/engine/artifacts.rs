//! File-based artifact namespace of one working directory.
//!
//! Every artifact a stage writes is named here, keyed by unit (or binary),
//! step index and kind, following the `<unit>.<step>.<ext>` convention.

use std::path::{Path, PathBuf};

use crate::core::ExperimentConfig;
use crate::{BenchError, BenchResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    GraphExport,
    NodeWeights,
    SerializedGraph,
    Selection,
    ReductionSummary,
    Assembly,
    CodeSizeReport,
    RuntimeReport,
    HardwareCounterReport,
}

impl ArtifactKind {
    /// File-name tail for step-indexed kinds.
    fn step_extension(self) -> Option<&'static str> {
        match self {
            ArtifactKind::Selection => Some("sel"),
            ArtifactKind::Assembly => Some("s"),
            ArtifactKind::CodeSizeReport => Some("size.json"),
            ArtifactKind::RuntimeReport => Some("bench.json"),
            ArtifactKind::HardwareCounterReport => Some("perf.txt"),
            _ => None,
        }
    }
}

pub const LOG_FILE: &str = "log.txt";
pub const ERR_FILE: &str = "err.txt";
pub const MANIFEST_FILE: &str = "experiment.json";
pub const ABORT_FILE: &str = "ABORT";

#[derive(Debug, Clone)]
pub struct ArtifactSet {
    root: PathBuf,
    graph_suffix: String,
    weights_suffix: String,
    ir_extension: String,
    archive_dir: String,
}

impl ArtifactSet {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactSet {
            root: root.into(),
            graph_suffix: ".export.pp2graph".to_string(),
            weights_suffix: ".weights".to_string(),
            ir_extension: "ll".to_string(),
            archive_dir: "archive".to_string(),
        }
    }

    pub fn from_config(config: &ExperimentConfig) -> Self {
        ArtifactSet {
            root: config.working_dir.clone(),
            graph_suffix: config.toolchain.graph_suffix.clone(),
            weights_suffix: config.toolchain.weights_suffix.clone(),
            ir_extension: config.toolchain.ir_extension.clone(),
            archive_dir: config.archive_dir.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn graph_export(&self, unit: &str) -> PathBuf {
        self.root.join(format!("{unit}{}", self.graph_suffix))
    }

    pub fn node_weights(&self, unit: &str) -> PathBuf {
        self.root.join(format!("{unit}{}", self.weights_suffix))
    }

    pub fn serialized_graph(&self, unit: &str) -> PathBuf {
        self.root.join(format!("{unit}.graph.json"))
    }

    pub fn reduction_summary(&self, unit: &str) -> PathBuf {
        self.root.join(format!("{unit}.reduction.json"))
    }

    /// Step-indexed artifact `<name>.<step>.<ext>`.
    pub fn step_artifact(&self, name: &str, step: usize, kind: ArtifactKind) -> PathBuf {
        let ext = kind.step_extension().unwrap_or("out");
        self.root.join(format!("{name}.{step}.{ext}"))
    }

    pub fn selection(&self, unit: &str, step: usize) -> PathBuf {
        self.step_artifact(unit, step, ArtifactKind::Selection)
    }

    pub fn assembly(&self, stem: &str, step: usize) -> PathBuf {
        self.step_artifact(stem, step, ArtifactKind::Assembly)
    }

    /// Assembly as written by the allocator before it is moved into the step namespace.
    pub fn live_assembly(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.s"))
    }

    pub fn code_size_report(&self, stem: &str, step: usize) -> PathBuf {
        self.step_artifact(stem, step, ArtifactKind::CodeSizeReport)
    }

    pub fn ir_file(&self, stem: &str) -> PathBuf {
        self.root.join(format!("{stem}.{}", self.ir_extension))
    }

    pub fn binary(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn table(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    pub fn log_file(&self) -> PathBuf {
        self.root.join(LOG_FILE)
    }

    pub fn err_file(&self) -> PathBuf {
        self.root.join(ERR_FILE)
    }

    pub fn manifest(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn abort_sentinel(&self) -> PathBuf {
        self.root.join(ABORT_FILE)
    }

    pub fn archive(&self) -> PathBuf {
        self.root.join(&self.archive_dir)
    }

    /// Fail with `ArtifactMissing` unless `path` exists.
    pub fn require(&self, path: &Path) -> BenchResult<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(BenchError::ArtifactMissing {
                path: path.to_path_buf(),
            })
        }
    }

    /// Regular files in the root, sorted by name.
    fn files(&self) -> BenchResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Files whose extension is one of `extensions`, sorted by name.
    pub fn files_with_extensions(&self, extensions: &[String]) -> BenchResult<Vec<PathBuf>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| extensions.iter().any(|x| x == e))
            })
            .collect())
    }

    /// Stems of the compiled IR files, sorted.
    pub fn ir_stems(&self) -> BenchResult<Vec<String>> {
        let exts = [self.ir_extension.clone()];
        Ok(self
            .files_with_extensions(&exts)?
            .iter()
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect())
    }

    /// Units that have a graph export, sorted.
    pub fn units(&self) -> BenchResult<Vec<String>> {
        Ok(self
            .files()?
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
            .filter_map(|n| n.strip_suffix(self.graph_suffix.as_str()))
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Which intermediate kind a file name belongs to, if any.
    pub fn classify(&self, file_name: &str) -> Option<ArtifactKind> {
        if file_name.ends_with(self.graph_suffix.as_str()) {
            return Some(ArtifactKind::GraphExport);
        }
        if file_name.ends_with(self.weights_suffix.as_str()) {
            return Some(ArtifactKind::NodeWeights);
        }
        if file_name.ends_with(".graph.json") {
            return Some(ArtifactKind::SerializedGraph);
        }
        if file_name.ends_with(".reduction.json") {
            return Some(ArtifactKind::ReductionSummary);
        }
        for kind in [
            ArtifactKind::CodeSizeReport,
            ArtifactKind::RuntimeReport,
            ArtifactKind::HardwareCounterReport,
            ArtifactKind::Selection,
            ArtifactKind::Assembly,
        ] {
            let ext = kind.step_extension().unwrap_or_default();
            let Some(head) = file_name.strip_suffix(ext).and_then(|h| h.strip_suffix('.')) else {
                continue;
            };
            let step_ok = head
                .rsplit_once('.')
                .is_some_and(|(name, step)| !name.is_empty() && !step.is_empty() && step.bytes().all(|b| b.is_ascii_digit()));
            if step_ok {
                return Some(kind);
            }
        }
        None
    }

    /// Files of one intermediate kind currently in the root, sorted.
    pub fn files_of_kind(&self, kind: ArtifactKind) -> BenchResult<Vec<PathBuf>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.classify(n) == Some(kind))
            })
            .collect())
    }

    /// Same naming rules, rooted at the archive directory.
    pub fn archived(&self) -> ArtifactSet {
        ArtifactSet {
            root: self.archive(),
            ..self.clone()
        }
    }

    /// Intermediate artifacts currently in the root, sorted.
    pub fn intermediate_files(&self) -> BenchResult<Vec<PathBuf>> {
        Ok(self
            .files()?
            .into_iter()
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| self.classify(n).is_some())
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_names() {
        let set = ArtifactSet::new("/w");
        assert_eq!(set.selection("main.ll.42", 3), PathBuf::from("/w/main.ll.42.3.sel"));
        assert_eq!(set.assembly("main", 0), PathBuf::from("/w/main.0.s"));
        assert_eq!(set.code_size_report("main", 7), PathBuf::from("/w/main.7.size.json"));
        assert_eq!(
            set.step_artifact("harris", 2, ArtifactKind::RuntimeReport),
            PathBuf::from("/w/harris.2.bench.json")
        );
        assert_eq!(set.graph_export("main.ll.42"), PathBuf::from("/w/main.ll.42.export.pp2graph"));
        assert_eq!(set.ir_file("main"), PathBuf::from("/w/main.ll"));
    }

    #[test]
    fn test_classify() {
        let set = ArtifactSet::new("/w");
        assert_eq!(set.classify("a.ll.1.export.pp2graph"), Some(ArtifactKind::GraphExport));
        assert_eq!(set.classify("a.ll.1.weights"), Some(ArtifactKind::NodeWeights));
        assert_eq!(set.classify("a.ll.1.graph.json"), Some(ArtifactKind::SerializedGraph));
        assert_eq!(set.classify("a.ll.1.12.sel"), Some(ArtifactKind::Selection));
        assert_eq!(set.classify("main.3.s"), Some(ArtifactKind::Assembly));
        assert_eq!(set.classify("main.3.size.json"), Some(ArtifactKind::CodeSizeReport));
        assert_eq!(set.classify("harris.0.bench.json"), Some(ArtifactKind::RuntimeReport));
        assert_eq!(set.classify("harris.0.perf.txt"), Some(ArtifactKind::HardwareCounterReport));
        assert_eq!(set.classify("main.s"), None);
        assert_eq!(set.classify("main.ll"), None);
        assert_eq!(set.classify("main.cpp"), None);
        assert_eq!(set.classify("runtime.csv"), None);
        assert_eq!(set.classify("log.txt"), None);
    }

    #[test]
    fn test_listing_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.ll", "a.ll", "c.cpp", "b.ll.9.export.pp2graph", "a.ll.3.export.pp2graph", "a.ll.3.0.sel"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        let set = ArtifactSet::new(dir.path());
        assert_eq!(set.ir_stems().unwrap(), vec!["a", "b"]);
        assert_eq!(set.units().unwrap(), vec!["a.ll.3", "b.ll.9"]);
        let sources = set.files_with_extensions(&["cpp".to_string()]).unwrap();
        assert_eq!(sources, vec![dir.path().join("c.cpp")]);
        let intermediate = set.intermediate_files().unwrap();
        assert_eq!(intermediate.len(), 3);
        let selections = set.files_of_kind(ArtifactKind::Selection).unwrap();
        assert_eq!(selections, vec![dir.path().join("a.ll.3.0.sel")]);
        assert_eq!(set.archived().root(), dir.path().join("archive"));
    }

    #[test]
    fn test_require() {
        let dir = tempfile::tempdir().unwrap();
        let set = ArtifactSet::new(dir.path());
        let missing = dir.path().join("nope");
        assert!(matches!(set.require(&missing), Err(BenchError::ArtifactMissing { .. })));
    }
}
