//! # Fan-out of jobs onto execution slots.
//!
//! Two dispatch strategies share the same per-job execution path
//! ([`worker::execute`]) and the same shutdown contract:
//!
//! - [`WorkerPool`]: a fixed set of long-lived workers pulling from the job channel.
//! - [`GatedPool`]: one short-lived task per job, admitted through a [`Gate`](crate::Gate).
//!
//! ## Shutdown
//! ```text
//! job channel closed ──► worker drains and exits ─┐
//! signal fired       ──► worker exits             ├─► JoinSet empty ──► drop(results) ──► result channel closed
//! results receiver gone ─► worker exits ──────────┘
//! ```
//! The closer owns one result sender and drops it only after joining every
//! worker. A worker that panics still resolves its `JoinSet` entry, so the
//! closer cannot wait forever on a dead worker.

mod gated;
mod worker;

pub use gated::GatedPool;

use std::{str::FromStr, time::Duration};

use async_channel::Receiver;
use tokio::{
    sync::mpsc::UnboundedSender,
    task::{JoinError, JoinHandle, JoinSet},
};
use tracing::{debug, error, trace};
use workline_model::{Job, JobResult};

use crate::{cancel::CancelSignal, error::CoreError, work::WorkRef};

use self::worker::{Worker, WorkerStats};

const TARGET: &str = "workline.core.pool";

/// How jobs are spread over execution slots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Dispatch {
    /// Fixed pool of `workers` long-lived workers.
    #[default]
    Pool,
    /// One task per job, at most `workers` admitted at a time.
    Gated,
}

impl Dispatch {
    pub fn as_label(&self) -> &'static str {
        match self {
            Dispatch::Pool => "pool",
            Dispatch::Gated => "gated",
        }
    }
}

impl std::fmt::Display for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for Dispatch {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pool" | "workers" => Ok(Dispatch::Pool),
            "gated" | "gate" => Ok(Dispatch::Gated),
            _ => Err(CoreError::InvalidDispatch(s.to_string())),
        }
    }
}

/// What the closer observed once every execution slot had exited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolReport {
    /// Configured execution slots.
    pub workers: usize,
    /// Results handed to the aggregator by workers that returned normally.
    pub delivered: u64,
    /// Execution units that died by panic instead of returning.
    pub panicked: usize,
}

impl PoolReport {
    fn account(&mut self, joined: Result<u64, JoinError>) {
        match joined {
            Ok(delivered) => self.delivered += delivered,
            Err(e) if e.is_panic() => {
                self.panicked += 1;
                error!(target: TARGET, error = %e, "execution unit panicked; its job has no result");
            }
            Err(e) => {
                error!(target: TARGET, error = %e, "execution unit aborted");
            }
        }
    }
}

/// Fixed-size worker pool.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    size: usize,
    grace: Option<Duration>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        Self { size, grace: None }
    }

    /// Bounds how long a unit of work may run on after cancellation.
    ///
    /// `None` (default) trusts the unit to observe the signal itself.
    pub fn with_grace(mut self, grace: Option<Duration>) -> Self {
        self.grace = grace;
        self
    }

    /// Spawns `size` workers plus the closer task.
    ///
    /// The returned handle resolves after every worker has exited and the
    /// closer has released `results`.
    pub fn spawn(
        self,
        jobs: Receiver<Job>,
        results: UnboundedSender<JobResult>,
        signal: CancelSignal,
        work: WorkRef,
    ) -> JoinHandle<PoolReport> {
        let mut set = JoinSet::new();
        for id in 1..=self.size {
            let worker = Worker {
                id,
                jobs: jobs.clone(),
                results: results.clone(),
                signal: signal.clone(),
                work: WorkRef::clone(&work),
                grace: self.grace,
            };
            set.spawn(async move {
                let WorkerStats { id, delivered, exit } = worker.run().await;
                trace!(target: TARGET, worker = id, delivered, exit = exit.as_label(), "worker exited");
                delivered
            });
        }
        drop(jobs);
        debug!(target: TARGET, workers = self.size, work = work.name(), "worker pool started");

        let size = self.size;
        tokio::spawn(async move {
            let mut report = PoolReport {
                workers: size,
                ..Default::default()
            };
            while let Some(joined) = set.join_next().await {
                report.account(joined);
            }
            drop(results);
            debug!(target: TARGET, delivered = report.delivered, panicked = report.panicked, "all workers exited; result channel released");
            report
        })
    }
}
