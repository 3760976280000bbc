use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::engine::toolchain::ToolRun;
use crate::{BenchError, BenchResult};

/// The two persistent log channels of a working directory.
///
/// `log.txt` receives stage banners and captured tool output, `err.txt` the
/// diagnostics of every failure. Both outlive the process.
pub struct RunLog {
    log_path: PathBuf,
    err_path: PathBuf,
}

impl RunLog {
    pub fn new<P: AsRef<Path>>(log_path: P, err_path: P) -> Self {
        RunLog {
            log_path: log_path.as_ref().to_path_buf(),
            err_path: err_path.as_ref().to_path_buf(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn err_path(&self) -> &Path {
        &self.err_path
    }

    /// Empty both files.
    pub fn truncate(&self) -> BenchResult<()> {
        for path in [&self.log_path, &self.err_path] {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            File::create(path)?;
        }
        Ok(())
    }

    fn append(path: &Path, text: &str) -> BenchResult<()> {
        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| BenchError::Message(format!("failed to open {}: {e}", path.display())))?;
        let mut w = BufWriter::new(file);
        w.write_all(text.as_bytes())?;
        if !text.ends_with('\n') {
            w.write_all(b"\n")?;
        }
        w.flush()?;
        Ok(())
    }

    /// Stage banner on the normal channel, e.g. `[COMPILE] main.cpp`.
    pub fn banner(&self, tag: &str, detail: &str) -> BenchResult<()> {
        Self::append(&self.log_path, &format!("[{tag}] {detail}"))
    }

    pub fn info(&self, text: &str) -> BenchResult<()> {
        Self::append(&self.log_path, text)
    }

    /// Captured output of a successful tool call.
    pub fn tool_output(&self, run: &ToolRun) -> BenchResult<()> {
        if run.stdout.trim().is_empty() && run.stderr.trim().is_empty() {
            return Ok(());
        }
        let mut text = format!("$ {}\n", run.command);
        text.push_str(&run.stdout);
        if !run.stderr.trim().is_empty() {
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text.push_str(&run.stderr);
        }
        Self::append(&self.log_path, &text)
    }

    /// A failure and its captured diagnostics on the error channel.
    pub fn failure(&self, context: &str, error: &BenchError) -> BenchResult<()> {
        let mut text = format!("{context}: {error}\n");
        if let Some(diagnostics) = error.diagnostics() {
            text.push_str(diagnostics);
        }
        Self::append(&self.err_path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channels_are_separate_and_appended() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"), dir.path().join("err.txt"));
        log.truncate().unwrap();
        log.banner("COMPILE", "main.cpp").unwrap();
        log.tool_output(&ToolRun {
            command: "clang++ main.cpp".into(),
            stdout: "ok\n".into(),
            ..ToolRun::default()
        })
        .unwrap();
        let err = BenchError::ToolInvocation {
            command: "llc main.ll".into(),
            status: "exit status: 1".into(),
            diagnostics: "error: bad IR".into(),
        };
        log.failure("Failed to process: main.ll", &err).unwrap();

        let normal = std::fs::read_to_string(log.log_path()).unwrap();
        assert_eq!(normal, "[COMPILE] main.cpp\n$ clang++ main.cpp\nok\n");
        let errors = std::fs::read_to_string(log.err_path()).unwrap();
        assert!(errors.starts_with("Failed to process: main.ll: `llc main.ll` failed"));
        assert!(errors.contains("error: bad IR"));
    }

    #[test]
    fn test_truncate_clears_previous_run() {
        let dir = tempfile::tempdir().unwrap();
        let log = RunLog::new(dir.path().join("log.txt"), dir.path().join("err.txt"));
        log.info("old run").unwrap();
        log.truncate().unwrap();
        assert_eq!(std::fs::read_to_string(log.log_path()).unwrap(), "");
        assert!(log.err_path().exists());
    }
}
