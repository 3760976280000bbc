//! Retry loop for the coloring stage and the operator abort channel.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::core::RetryConfig;
use crate::{BenchError, BenchResult};

const ABORT_POLL: Duration = Duration::from_millis(50);

/// Shared abort flag, optionally mirrored by a sentinel file.
///
/// Cloning shares the flag. The sentinel lets an operator stop a running
/// experiment from another shell by creating the file.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
    sentinel: Option<PathBuf>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sentinel(mut self, path: impl Into<PathBuf>) -> Self {
        self.sentinel = Some(path.into());
        self
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Route operator interrupts (Ctrl-C) to this handle.
    ///
    /// The first interrupt requests an abort, which the coloring retry loop
    /// picks up at its next check. A second interrupt exits with status 130.
    pub fn install_interrupt_handler(&self) -> BenchResult<()> {
        ctrlc::set_handler(interrupt_handler(Arc::clone(&self.flag)))
            .map_err(|e| BenchError::Message(format!("cannot install interrupt handler: {e}")))
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::SeqCst) || self.sentinel.as_ref().is_some_and(|p| p.exists())
    }

    /// Sleep for `duration`, waking early on abort. Returns `Aborted` if it fired.
    pub fn sleep(&self, duration: Duration) -> BenchResult<()> {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_aborted() {
                return Err(BenchError::Aborted);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep(ABORT_POLL.min(deadline - now));
        }
    }
}

fn interrupt_handler(flag: Arc<AtomicBool>) -> impl FnMut() + Send + 'static {
    move || {
        if flag.swap(true, Ordering::SeqCst) {
            tracing::warn!("second interrupt; exiting");
            std::process::exit(130);
        }
        tracing::warn!("interrupt received; aborting at the next retry check");
    }
}

/// Whether a failed attempt is worth repeating.
///
/// Missing inputs and bad configuration fail identically on every attempt.
pub fn is_retryable(error: &BenchError) -> bool {
    !matches!(
        error,
        BenchError::ArtifactMissing { .. } | BenchError::Aborted | BenchError::Config(_)
    )
}

/// Exponential backoff with an optional attempt bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// `None` retries until success or abort.
    pub max_attempts: Option<u32>,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        RetryPolicy {
            max_attempts: config.max_attempts.filter(|n| *n > 0),
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            multiplier: config.multiplier,
        }
    }

    /// No waiting between attempts.
    pub fn immediate() -> Self {
        RetryPolicy {
            max_attempts: None,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
            multiplier: 1.0,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts).filter(|n| *n > 0);
        self
    }

    /// Delay after the `failures`-th failed attempt (1-based).
    pub fn backoff(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(63) as i32;
        let factor = self.multiplier.max(1.0).powi(exp);
        let ms = (self.initial_backoff.as_millis() as f64 * factor).min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(ms as u64)
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }

    /// Run `op` until it succeeds, fails permanently, runs out of attempts, or is aborted.
    ///
    /// `on_failure` sees every retryable failure before the backoff sleep.
    pub fn run<T>(
        &self,
        abort: &AbortHandle,
        mut op: impl FnMut(u32) -> BenchResult<T>,
        mut on_failure: impl FnMut(u32, &BenchError),
    ) -> BenchResult<T> {
        let mut attempt = 0u32;
        loop {
            if abort.is_aborted() {
                return Err(BenchError::Aborted);
            }
            attempt += 1;
            let err = match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };
            if !is_retryable(&err) {
                return Err(err);
            }
            on_failure(attempt, &err);
            if self.exhausted(attempt) {
                return Err(err);
            }
            abort.sleep(self.backoff(attempt))?;
        }
    }
}
