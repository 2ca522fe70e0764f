//! # Fan-in accounting.
//!
//! [`Tally`] is the incremental half of the Result Aggregator: it classifies
//! each [`JobResult`] into the running [`Summary`] and stamps the elapsed time
//! when the run's result stream closes. Results may arrive in any order.

use tokio::time::Instant;
use workline_model::{JobResult, Summary};

#[derive(Debug, Clone)]
pub struct Tally {
    summary: Summary,
    started: Instant,
}

impl Tally {
    pub fn new(jobs_requested: u64) -> Self {
        Self::starting_at(jobs_requested, Instant::now())
    }

    pub fn starting_at(jobs_requested: u64, started: Instant) -> Self {
        Self {
            summary: Summary::new(jobs_requested),
            started,
        }
    }

    pub fn record(&mut self, result: &JobResult) {
        self.summary.record(result.outcome.kind());
    }

    /// Totals so far, with `elapsed` measured up to now.
    pub fn snapshot(&self) -> Summary {
        Summary {
            elapsed: self.started.elapsed(),
            ..self.summary
        }
    }

    /// Final totals.
    pub fn finish(self) -> Summary {
        self.snapshot()
    }
}
