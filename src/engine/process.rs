//! Subprocess execution with captured output, timeout and peak-memory sampling.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use shlex::Shlex;

use crate::{BenchError, BenchResult};

/// Captured result of one finished process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed_ms: u128,
    pub peak_rss_bytes: Option<u64>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

/// Render a command for logs.
pub fn describe(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Split a flag string with shell quoting rules and expand `{name}` placeholders.
pub fn expand_template(template: &str, vars: &[(&str, String)]) -> BenchResult<Vec<String>> {
    let mut lexer = Shlex::new(template);
    let mut parts: Vec<String> = lexer.by_ref().collect();
    if lexer.had_error {
        return Err(BenchError::Config(format!("unbalanced quoting in `{template}`")));
    }
    for p in &mut parts {
        for (name, value) in vars {
            *p = p.replace(&format!("{{{name}}}"), value);
        }
    }
    Ok(parts)
}

/// Build a command from a template whose first word is the program.
pub fn command_from_template(template: &str, vars: &[(&str, String)]) -> BenchResult<Command> {
    let parts = expand_template(template, vars)?;
    let Some((program, args)) = parts.split_first() else {
        return Err(BenchError::Config("empty command template".into()));
    };
    let mut cmd = Command::new(program);
    cmd.args(args);
    Ok(cmd)
}

/// `$HOME`, for the `{home}` placeholder.
pub fn home_dir() -> String {
    std::env::var("HOME").unwrap_or_default()
}

fn drain<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<String>> {
    source.map(|mut r| {
        std::thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = r.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Run a command to completion, killing it once `timeout` elapses (zero disables).
///
/// Stdout and stderr are always captured. A non-zero exit is not an error here;
/// callers decide with [`require_success`].
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> BenchResult<ProcessOutput> {
    #[cfg(feature = "mem")]
    use sysinfo::{ProcessRefreshKind, RefreshKind, System};

    let description = describe(&cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let start = Instant::now();
    let mut child: Child = cmd
        .spawn()
        .map_err(|e| BenchError::Message(format!("failed to spawn `{description}`: {e}")))?;
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    #[cfg(feature = "mem")]
    let mut sys =
        System::new_with_specifics(RefreshKind::new().with_processes(ProcessRefreshKind::everything()));
    #[cfg(feature = "mem")]
    let pid = sysinfo::Pid::from_u32(child.id());
    #[cfg(feature = "mem")]
    let mut peak_rss: u64 = 0;

    loop {
        #[cfg(feature = "mem")]
        {
            sys.refresh_process(pid);
            if let Some(p) = sys.process(pid) {
                peak_rss = peak_rss.max(p.memory());
            }
        }

        if let Some(status) = child.try_wait()? {
            let elapsed_ms = start.elapsed().as_millis();
            return Ok(ProcessOutput {
                status,
                stdout: join(stdout),
                stderr: join(stderr),
                elapsed_ms,
                peak_rss_bytes: {
                    #[cfg(feature = "mem")]
                    {
                        Some(peak_rss).filter(|v| *v > 0)
                    }
                    #[cfg(not(feature = "mem"))]
                    {
                        None
                    }
                },
            });
        }

        if timeout.as_secs() > 0 && start.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            let diagnostics = join(stderr);
            return Err(BenchError::ToolInvocation {
                command: description,
                status: format!("timeout after {}s", timeout.as_secs()),
                diagnostics,
            });
        }

        std::thread::sleep(Duration::from_millis(20));
    }
}

/// Turn a non-zero exit into [`BenchError::ToolInvocation`] carrying stderr.
pub fn require_success(command: String, output: ProcessOutput) -> BenchResult<ProcessOutput> {
    if output.success() {
        return Ok(output);
    }
    let mut diagnostics = output.stderr;
    if diagnostics.trim().is_empty() {
        diagnostics = output.stdout;
    }
    Err(BenchError::ToolInvocation {
        command,
        status: output.status.to_string(),
        diagnostics,
    })
}

/// Run and require a zero exit.
pub fn run_checked(cmd: Command, timeout: Duration) -> BenchResult<ProcessOutput> {
    let description = describe(&cmd);
    let output = run_with_timeout(cmd, timeout)?;
    require_success(description, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_template_quotes_and_placeholders() {
        let parts = expand_template(
            r#"evaluate.py -data_dir {dir} -isec {steps} --name "a b""#,
            &[("dir", "/tmp/x".to_string()), ("steps", "16".to_string())],
        )
        .unwrap();
        assert_eq!(parts, vec!["evaluate.py", "-data_dir", "/tmp/x", "-isec", "16", "--name", "a b"]);
    }

    #[test]
    fn test_expand_template_unbalanced() {
        assert!(expand_template(r#"run "oops"#, &[]).is_err());
    }

    #[test]
    fn test_command_from_empty_template() {
        assert!(command_from_template("   ", &[]).is_err());
    }

    #[test]
    fn test_describe() {
        let mut cmd = Command::new("llc");
        cmd.arg("-O3").arg("main.ll");
        assert_eq!(describe(&cmd), "llc -O3 main.ll");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_captures_output() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo out; echo err 1>&2");
        let output = run_with_timeout(cmd, Duration::from_secs(10)).unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_run_checked_reports_stderr() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo broken 1>&2; exit 3");
        let err = run_checked(cmd, Duration::ZERO).unwrap_err();
        match err {
            BenchError::ToolInvocation { diagnostics, .. } => assert!(diagnostics.contains("broken")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_timeout_kills_process() {
        let mut cmd = Command::new("sleep");
        cmd.arg("5");
        let err = run_with_timeout(cmd, Duration::from_secs(1)).unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
