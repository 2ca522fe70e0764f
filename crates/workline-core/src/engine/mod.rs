//! # Engine facade.
//!
//! Wires one run together:
//!
//! ```text
//! Engine::start(work)
//!   1. derive_run(cfg.timeout)            → CancelSignal + RunGuard
//!   2. job channel (bounded 1), result channel (unbounded)
//!   3. WorkerPool / GatedPool spawn       → closer handle
//!   4. Producer spawn                     → producer handle
//!   5. Run { results, tally, guard, .. }  ← returned to the caller
//!
//! Run::next()   → next result in arrival order (recorded into the tally)
//! Run::finish() → drain, join producer + closer, release guard → Summary
//! ```
//!
//! The result channel is unbounded so that handing a result to the
//! aggregator never suspends a worker: a worker can neither block on a
//! result nobody reads nor lose the result of a job it already ran. Its size
//! is bounded by the number of jobs.
//!
//! Dropping a [`Run`] without finishing it releases the guard, which fires
//! the signal; producer and workers observe it and wind down on their own.

use std::{fmt, time::Duration};

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{error, info, warn};
use uuid::Uuid;
use workline_model::{JobResult, RunConfig, Summary};

use crate::{
    aggregate::Tally,
    cancel::{CancelSignal, RunGuard, derive_run},
    pool::{Dispatch, GatedPool, PoolReport, WorkerPool},
    producer::Producer,
    work::{Work, WorkRef},
};

const TARGET: &str = "workline.core.engine";

/// Identifier attached to every log line of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0.simple())
    }
}

#[derive(Debug, Clone)]
pub struct Engine {
    cfg: RunConfig,
    dispatch: Dispatch,
    grace: Option<Duration>,
}

impl Engine {
    pub fn new(cfg: RunConfig) -> Self {
        Self {
            cfg,
            dispatch: Dispatch::default(),
            grace: None,
        }
    }

    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// See [`WorkerPool::with_grace`].
    pub fn with_grace(mut self, grace: Option<Duration>) -> Self {
        self.grace = grace;
        self
    }

    #[inline]
    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    #[inline]
    pub fn dispatch(&self) -> Dispatch {
        self.dispatch
    }

    /// Starts a run. Must be called from within a tokio runtime.
    pub fn start(&self, work: WorkRef) -> Run {
        let id = RunId::new();
        let (signal, guard) = derive_run(self.cfg.timeout());
        let tally = Tally::new(self.cfg.jobs());

        let (jobs_tx, jobs_rx) = async_channel::bounded(1);
        let (results_tx, results_rx) = mpsc::unbounded_channel();

        info!(
            target: TARGET,
            run = %id,
            jobs = self.cfg.jobs(),
            workers = self.cfg.workers(),
            timeout_ms = self.cfg.timeout().as_millis() as u64,
            dispatch = self.dispatch.as_label(),
            work = work.name(),
            "run start"
        );

        let pool = match self.dispatch {
            Dispatch::Pool => WorkerPool::new(self.cfg.workers())
                .with_grace(self.grace)
                .spawn(jobs_rx, results_tx, signal.clone(), work),
            Dispatch::Gated => GatedPool::new(self.cfg.workers())
                .with_grace(self.grace)
                .spawn(jobs_rx, results_tx, signal.clone(), work),
        };
        let producer = Producer::new(self.cfg.jobs(), signal.clone()).spawn(jobs_tx);

        Run {
            id,
            results: results_rx,
            tally,
            signal,
            guard,
            producer,
            pool,
        }
    }

    /// Starts a run and waits for its summary, discarding individual results.
    pub async fn run(&self, work: WorkRef) -> Summary {
        self.start(work).finish().await
    }
}

/// Handle to a run in progress: the result stream plus its cancellation guard.
#[must_use = "dropping the run cancels it"]
pub struct Run {
    id: RunId,
    results: mpsc::UnboundedReceiver<JobResult>,
    tally: Tally,
    signal: CancelSignal,
    guard: RunGuard,
    producer: JoinHandle<u64>,
    pool: JoinHandle<PoolReport>,
}

impl Run {
    #[inline]
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn signal(&self) -> CancelSignal {
        self.signal.clone()
    }

    /// Cancels the run. Jobs already dispatched still report a result.
    pub fn cancel(&self) {
        self.guard.cancel();
    }

    /// Totals of the results received so far.
    pub fn progress(&self) -> Summary {
        self.tally.snapshot()
    }

    /// Next result in arrival order; `None` once every execution slot has exited.
    pub async fn next(&mut self) -> Option<JobResult> {
        let result = self.results.recv().await?;
        self.tally.record(&result);
        Some(result)
    }

    /// Drains the remaining results and returns the final summary.
    pub async fn finish(mut self) -> Summary {
        while self.next().await.is_some() {}

        let Run {
            id,
            tally,
            signal,
            guard,
            producer,
            pool,
            ..
        } = self;
        let summary = tally.finish();

        let handed = match producer.await {
            Ok(n) => n,
            Err(e) => {
                error!(target: TARGET, run = %id, error = %e, "producer task failed");
                0
            }
        };
        let report = match pool.await {
            Ok(report) => report,
            Err(e) => {
                error!(target: TARGET, run = %id, error = %e, "pool closer failed");
                PoolReport::default()
            }
        };
        if report.panicked > 0 {
            warn!(target: TARGET, run = %id, panicked = report.panicked, "execution units died without reporting");
        }

        info!(
            target: TARGET,
            run = %id,
            handed,
            handled = summary.handled,
            succeeded = summary.succeeded,
            failed = summary.failed,
            canceled = summary.canceled,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            cause = signal.cause().map(|c| c.as_label()).unwrap_or("none"),
            "run finished"
        );
        drop(guard);
        summary
    }
}

impl fmt::Debug for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Run")
            .field("id", &self.id)
            .field("progress", &self.tally.snapshot())
            .field("cancelled", &self.signal.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_display() {
        let id = RunId::new();
        let s = id.to_string();
        assert!(s.starts_with("run-"));
        assert_eq!(s.len(), 4 + 32);
        assert_ne!(id, RunId::new());
    }

    #[test]
    fn builder_defaults() {
        let engine = Engine::new(RunConfig::default());
        assert_eq!(engine.dispatch(), Dispatch::Pool);
        assert_eq!(engine.config().workers(), 3);

        let gated = engine.with_dispatch(Dispatch::Gated);
        assert_eq!(gated.dispatch(), Dispatch::Gated);
    }
}
