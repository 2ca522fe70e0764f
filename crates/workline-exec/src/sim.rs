//! Simulated work: a deterministic per-job delay and a periodic failure.

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;
use workline_core::{CancelSignal, Work};
use workline_model::{Job, JobId, Outcome};

use crate::error::ExecError;

#[derive(Debug, Clone)]
pub struct SimWork {
    base: Duration,
    step: Duration,
    spread: u64,
    fail_every: Option<u64>,
}

impl SimWork {
    pub const BASE: Duration = Duration::from_millis(80);
    pub const STEP: Duration = Duration::from_millis(40);
    pub const SPREAD: u64 = 5;
    pub const FAIL_EVERY: u64 = 9;

    /// `80ms + (id % 5) * 40ms`, failing every 9th job.
    pub fn new() -> Self {
        Self {
            base: Self::BASE,
            step: Self::STEP,
            spread: Self::SPREAD,
            fail_every: Some(Self::FAIL_EVERY),
        }
    }

    /// Same delay for every job, never fails.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base: delay,
            step: Duration::ZERO,
            spread: 1,
            fail_every: None,
        }
    }

    /// Fails jobs whose id is a multiple of `n`; `0` disables failures.
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    pub fn never_fail(mut self) -> Self {
        self.fail_every = None;
        self
    }

    pub fn delay_for(&self, id: JobId) -> Duration {
        let factor = id.checked_rem(self.spread).unwrap_or(0);
        let extra = u32::try_from(factor)
            .ok()
            .and_then(|f| self.step.checked_mul(f))
            .unwrap_or(Duration::MAX);
        self.base.saturating_add(extra)
    }

    fn fails(&self, id: JobId) -> bool {
        self.fail_every.is_some_and(|n| id % n == 0)
    }
}

impl Default for SimWork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Work for SimWork {
    fn name(&self) -> &str {
        "sim"
    }

    async fn run(&self, signal: CancelSignal, job: Job) -> Outcome {
        let delay = self.delay_for(job.id());
        trace!(target: "workline.exec.sim", job = job.id(), delay_ms = delay.as_millis() as u64, "sleep");

        tokio::select! {
            _ = signal.cancelled() => Outcome::Canceled,
            _ = tokio::time::sleep(delay) => {
                if self.fails(job.id()) {
                    Outcome::Failure(ExecError::Simulated.for_job(job.id()))
                } else {
                    Outcome::Success
                }
            }
        }
    }
}
