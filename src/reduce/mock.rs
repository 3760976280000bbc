//! Mock reduction strategy for testing.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::core::ReductionOutcome;
use crate::{BenchError, BenchResult};

use super::greedy::GreedyReduction;
use super::traits::{ReductionRequest, ReductionStrategy};

/// Fails a configurable number of attempts, then answers like the greedy strategy.
pub struct MockReduction {
    inner: GreedyReduction,
    failures_before_success: usize,
    always_fail: bool,
    attempts: AtomicUsize,
}

impl Default for MockReduction {
    fn default() -> Self {
        Self::new()
    }
}

impl MockReduction {
    pub fn new() -> Self {
        MockReduction {
            inner: GreedyReduction::unweighted(),
            failures_before_success: 0,
            always_fail: false,
            attempts: AtomicUsize::new(0),
        }
    }

    /// Fail the first `n` calls.
    pub fn failing_first(mut self, n: usize) -> Self {
        self.failures_before_success = n;
        self
    }

    /// Fail every call.
    pub fn always_failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Number of `reduce` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ReductionStrategy for MockReduction {
    fn name(&self) -> &str {
        "mock"
    }

    fn reduce(&self, request: &ReductionRequest<'_>) -> BenchResult<ReductionOutcome> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.always_fail || attempt < self.failures_before_success {
            return Err(BenchError::TransientReduction(format!(
                "mock failure on attempt {}",
                attempt + 1
            )));
        }
        self.inner.reduce(request)
    }
}
