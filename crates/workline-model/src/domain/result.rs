use std::{fmt, time::Duration};

use crate::{JobId, Outcome, WorkerId};

/// Recorded outcome of one dispatched job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: JobId,
    pub outcome: Outcome,
    /// Wall time between dispatch to the worker and the outcome.
    pub cost: Duration,
    pub worker_id: WorkerId,
}

impl fmt::Display for JobResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "job={} worker={} outcome={} cost={:?}",
            self.job_id,
            self.worker_id,
            self.outcome.kind(),
            self.cost
        )?;
        if let Some(err) = self.outcome.error() {
            write!(f, " err={err}")?;
        }
        Ok(())
    }
}
