use std::time::Duration;

use async_channel::Receiver;
use tokio::{
    sync::mpsc::UnboundedSender,
    task::{JoinHandle, JoinSet},
};
use tracing::debug;
use workline_model::{Job, JobResult};

use crate::{cancel::CancelSignal, gate::Gate, work::WorkRef};

use super::{PoolReport, TARGET, worker::execute};

/// Task-per-job dispatch capped by a [`Gate`].
///
/// The dispatcher first takes a gate slot, then a job, then spawns a task
/// that runs the job and returns the slot. A job is never pulled off the
/// channel without a slot to run it in. The gate slot doubles as the
/// reported worker id.
#[derive(Debug, Clone, Copy)]
pub struct GatedPool {
    limit: usize,
    grace: Option<Duration>,
}

impl GatedPool {
    pub fn new(limit: usize) -> Self {
        Self { limit, grace: None }
    }

    pub fn with_grace(mut self, grace: Option<Duration>) -> Self {
        self.grace = grace;
        self
    }

    pub fn spawn(
        self,
        jobs: Receiver<Job>,
        results: UnboundedSender<JobResult>,
        signal: CancelSignal,
        work: WorkRef,
    ) -> JoinHandle<PoolReport> {
        let gate = Gate::new(self.limit);
        let grace = self.grace;

        tokio::spawn(async move {
            let mut report = PoolReport {
                workers: gate.limit(),
                ..Default::default()
            };
            let mut set = JoinSet::new();
            debug!(target: TARGET, limit = gate.limit(), work = work.name(), "gated dispatcher started");

            loop {
                let Ok(permit) = gate.acquire_or_cancel(&signal).await else {
                    break;
                };
                let job = tokio::select! {
                    biased;
                    _ = signal.cancelled() => break,
                    received = jobs.recv() => match received {
                        Ok(job) => job,
                        Err(_) => break,
                    },
                };

                let results = results.clone();
                let signal = signal.clone();
                let work = WorkRef::clone(&work);
                set.spawn(async move {
                    let result = execute(permit.slot(), job, &signal, work.as_ref(), grace).await;
                    let delivered = results.send(result).is_ok();
                    drop(permit);
                    u64::from(delivered)
                });

                while let Some(joined) = set.try_join_next() {
                    report.account(joined);
                }
            }
            drop(jobs);

            while let Some(joined) = set.join_next().await {
                report.account(joined);
            }
            drop(results);
            debug!(target: TARGET, delivered = report.delivered, panicked = report.panicked, "gated tasks exited; result channel released");
            report
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use tokio::sync::mpsc;
    use workline_model::Outcome;

    use super::*;
    use crate::{cancel::derive_run, producer::Producer, work::WorkFn};

    #[tokio::test(start_paused = true)]
    async fn caps_concurrency_at_limit() {
        let (signal, _guard) = derive_run(Duration::from_secs(3600));
        let (jobs_tx, jobs_rx) = async_channel::bounded(1);
        let (res_tx, mut res_rx) = mpsc::unbounded_channel();

        let current = Arc::new(AtomicUsize::new(0));
        let max = Arc::new(AtomicUsize::new(0));
        let work: WorkRef = WorkFn::arc("track", {
            let current = Arc::clone(&current);
            let max = Arc::clone(&max);
            move |_s: CancelSignal, _job: Job| {
                let current = Arc::clone(&current);
                let max = Arc::clone(&max);
                async move {
                    let now = current.fetch_add(1, Ordering::SeqCst) + 1;
                    max.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    current.fetch_sub(1, Ordering::SeqCst);
                    Outcome::Success
                }
            }
        });

        let pool = GatedPool::new(2).spawn(jobs_rx, res_tx, signal.clone(), work);
        Producer::new(10, signal).spawn(jobs_tx);

        let mut ids = HashSet::new();
        while let Some(r) = res_rx.recv().await {
            assert!((1..=2).contains(&r.worker_id));
            assert!(ids.insert(r.job_id));
        }
        assert_eq!(ids.len(), 10);
        assert_eq!(max.load(Ordering::SeqCst), 2);
        assert_eq!(pool.await.unwrap().delivered, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_dispatch() {
        let (signal, _guard) = derive_run(Duration::from_millis(50));
        let (jobs_tx, jobs_rx) = async_channel::bounded(1);
        let (res_tx, mut res_rx) = mpsc::unbounded_channel();

        let work: WorkRef = WorkFn::arc("slow", |signal: CancelSignal, _job: Job| async move {
            tokio::select! {
                _ = signal.cancelled() => Outcome::Canceled,
                _ = tokio::time::sleep(Duration::from_millis(200)) => Outcome::Success,
            }
        });

        let pool = GatedPool::new(4).spawn(jobs_rx, res_tx, signal.clone(), work);
        Producer::new(50, signal).spawn(jobs_tx);

        let mut handled = 0;
        while let Some(r) = res_rx.recv().await {
            assert_eq!(r.outcome, Outcome::Canceled);
            handled += 1;
        }
        assert_eq!(handled, 4);
        assert_eq!(pool.await.unwrap().delivered, 4);
    }
}
