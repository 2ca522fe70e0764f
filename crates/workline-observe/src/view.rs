use std::borrow::Borrow;

use tracing::{error, info};
use workline_model::{JobResult, OutcomeKind, Summary};

const TARGET: &str = "workline.observe.result";

/// Field accessors used when logging a job result.
pub trait View {
    fn job(&self) -> u64;
    fn worker(&self) -> usize;
    fn cost_ms(&self) -> u64;
    fn kind(&self) -> OutcomeKind;
    fn as_reason(&self) -> &str;
}

impl<T> View for T
where
    T: Borrow<JobResult>,
{
    #[inline]
    fn job(&self) -> u64 {
        self.borrow().job_id
    }
    #[inline]
    fn worker(&self) -> usize {
        self.borrow().worker_id
    }
    #[inline]
    fn cost_ms(&self) -> u64 {
        u64::try_from(self.borrow().cost.as_millis()).unwrap_or(u64::MAX)
    }
    #[inline]
    fn kind(&self) -> OutcomeKind {
        self.borrow().outcome.kind()
    }
    #[inline]
    fn as_reason(&self) -> &str {
        match self.borrow().outcome.error() {
            Some(err) => match err {
                workline_model::JobError::Failed { reason, .. }
                | workline_model::JobError::Panicked { reason, .. } => reason,
            },
            None => "none",
        }
    }
}

#[inline]
pub fn message_for(kind: OutcomeKind) -> &'static str {
    match kind {
        OutcomeKind::Success => "job done",
        OutcomeKind::Failure => "job failed",
        OutcomeKind::Canceled => "job canceled",
    }
}

/// Logs one result: success and canceled at info, failure at error.
#[inline]
pub fn log_result<R: View>(r: R) {
    let msg = message_for(r.kind());

    match r.kind() {
        OutcomeKind::Success | OutcomeKind::Canceled => info!(
            target: TARGET,
            job = r.job(),
            worker = r.worker(),
            cost_ms = r.cost_ms(),
            "{msg}"
        ),
        OutcomeKind::Failure => error!(
            target: TARGET,
            job = r.job(),
            worker = r.worker(),
            cost_ms = r.cost_ms(),
            reason = r.as_reason(),
            "{msg}"
        ),
    }
}

pub fn log_summary(s: &Summary) {
    info!(
        target: TARGET,
        jobs_requested = s.jobs_requested,
        handled = s.handled,
        succeeded = s.succeeded,
        failed = s.failed,
        canceled = s.canceled,
        elapsed_ms = u64::try_from(s.elapsed.as_millis()).unwrap_or(u64::MAX),
        "run summary"
    );
}
