use std::time::Duration;

use async_channel::Receiver;
use tokio::{sync::mpsc::UnboundedSender, time::Instant};
use tracing::{debug, trace, warn};
use workline_model::{Job, JobResult, Outcome, WorkerId};

use crate::{
    cancel::CancelSignal,
    work::{Work, WorkRef},
};

const TARGET: &str = "workline.core.worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum WorkerExit {
    /// Job channel closed and empty.
    Drained,
    /// Run signal fired.
    Canceled,
    /// Nobody reads results anymore.
    Abandoned,
}

impl WorkerExit {
    pub(super) fn as_label(&self) -> &'static str {
        match self {
            WorkerExit::Drained => "drained",
            WorkerExit::Canceled => "canceled",
            WorkerExit::Abandoned => "abandoned",
        }
    }
}

pub(super) struct WorkerStats {
    pub id: WorkerId,
    pub delivered: u64,
    pub exit: WorkerExit,
}

pub(super) struct Worker {
    pub id: WorkerId,
    pub jobs: Receiver<Job>,
    pub results: UnboundedSender<JobResult>,
    pub signal: CancelSignal,
    pub work: WorkRef,
    pub grace: Option<Duration>,
}

impl Worker {
    pub(super) async fn run(self) -> WorkerStats {
        let mut delivered = 0u64;

        let exit = loop {
            let job = tokio::select! {
                biased;
                _ = self.signal.cancelled() => break WorkerExit::Canceled,
                received = self.jobs.recv() => match received {
                    Ok(job) => job,
                    Err(_) => break WorkerExit::Drained,
                },
            };

            let result = execute(self.id, job, &self.signal, self.work.as_ref(), self.grace).await;
            if self.results.send(result).is_err() {
                break WorkerExit::Abandoned;
            }
            delivered += 1;
        };

        WorkerStats {
            id: self.id,
            delivered,
            exit,
        }
    }
}

/// Runs one dispatched job to a [`JobResult`].
///
/// A job whose signal already fired is reported `Canceled` without invoking
/// the unit of work. With `grace` set, a unit still running `grace` after the
/// signal fired is dropped and the job reported `Canceled`.
pub(crate) async fn execute(
    worker_id: WorkerId,
    job: Job,
    signal: &CancelSignal,
    work: &dyn Work,
    grace: Option<Duration>,
) -> JobResult {
    let job_id = job.id();
    let started = Instant::now();
    trace!(target: TARGET, worker = worker_id, job = job_id, "job dispatched");

    let outcome = if signal.is_cancelled() {
        Outcome::Canceled
    } else {
        invoke(job, signal, work, grace).await
    };
    let cost = started.elapsed();

    match &outcome {
        Outcome::Success => {
            debug!(target: TARGET, worker = worker_id, job = job_id, cost_ms = cost.as_millis() as u64, "job done")
        }
        Outcome::Failure(e) => debug!(
            target: TARGET,
            worker = worker_id,
            job = job_id,
            cost_ms = cost.as_millis() as u64,
            reason = %e,
            "job failed"
        ),
        Outcome::Canceled => {
            debug!(target: TARGET, worker = worker_id, job = job_id, cost_ms = cost.as_millis() as u64, "job canceled")
        }
    }

    JobResult {
        job_id,
        outcome,
        cost,
        worker_id,
    }
}

async fn invoke(job: Job, signal: &CancelSignal, work: &dyn Work, grace: Option<Duration>) -> Outcome {
    let job_id = job.id();
    let mut fut = work.run(signal.clone(), job);
    let Some(grace) = grace else {
        return fut.await;
    };

    tokio::select! {
        biased;
        outcome = &mut fut => outcome,
        _ = expire(signal, grace) => {
            warn!(
                target: TARGET,
                job = job_id,
                work = work.name(),
                grace_ms = grace.as_millis() as u64,
                "unit of work ignored cancellation; abandoned after grace"
            );
            Outcome::Canceled
        }
    }
}

async fn expire(signal: &CancelSignal, grace: Duration) {
    signal.cancelled().await;
    tokio::time::sleep(grace).await;
}
