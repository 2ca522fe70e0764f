//! Panic isolation for units of work.
//!
//! [`Guarded`] runs the wrapped unit in its own task, so a panic unwinds that
//! task only and comes back as a [`JoinError`](tokio::task::JoinError). It is
//! then reported as [`JobError::Panicked`] and the job still gets a result.
//!
//! The inner task is aborted if the guarded future is dropped (for example
//! when the pool's grace period runs out), so nothing outlives the job.

use std::{any::Any, sync::Arc};

use async_trait::async_trait;
use tokio_util::task::AbortOnDropHandle;
use tracing::warn;
use workline_core::{CancelSignal, Work};
use workline_model::{Job, JobError, Outcome};

pub struct Guarded<W> {
    inner: Arc<W>,
    name: String,
}

impl<W: Work> Guarded<W> {
    pub fn new(inner: W) -> Self {
        Self::from_arc(Arc::new(inner))
    }

    pub fn from_arc(inner: Arc<W>) -> Self {
        let name = format!("guarded:{}", inner.name());
        Self { inner, name }
    }

    pub fn arc(inner: W) -> Arc<Self> {
        Arc::new(Self::new(inner))
    }
}

#[async_trait]
impl<W: Work> Work for Guarded<W> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, signal: CancelSignal, job: Job) -> Outcome {
        let id = job.id();
        let inner = Arc::clone(&self.inner);
        let handle = AbortOnDropHandle::new(tokio::spawn(async move { inner.run(signal, job).await }));

        match handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let reason = if e.is_panic() {
                    panic_message(e.into_panic())
                } else {
                    e.to_string()
                };
                warn!(target: "workline.exec.guard", job = id, %reason, "unit of work panicked");
                Outcome::Failure(JobError::Panicked { job: id, reason })
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use workline_core::{Engine, WorkFn, derive_run};
    use workline_model::{OutcomeKind, RunConfig};

    use super::*;

    #[tokio::test]
    async fn panic_becomes_failure() {
        let work = Guarded::new(WorkFn::new("boom", |_signal: CancelSignal, job: Job| async move {
            if job.id() == 2 {
                panic!("bad job {}", job.id());
            }
            Outcome::Success
        }));
        let (signal, _guard) = derive_run(Duration::from_secs(5));

        assert_eq!(work.run(signal.clone(), Job::new(1)).await, Outcome::Success);
        assert_eq!(
            work.run(signal, Job::new(2)).await,
            Outcome::Failure(JobError::Panicked {
                job: 2,
                reason: "bad job 2".into()
            })
        );
        assert_eq!(work.name(), "guarded:boom");
    }

    #[tokio::test]
    async fn static_str_payload() {
        let work = Guarded::new(WorkFn::new("boom", |_signal: CancelSignal, job: Job| async move {
            if job.id() > 0 {
                panic!("static");
            }
            Outcome::Success
        }));
        let (signal, _guard) = derive_run(Duration::from_secs(5));

        let outcome = work.run(signal, Job::new(1)).await;
        assert_eq!(outcome.error().map(JobError::as_label), Some("job_panicked"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn engine_counts_panics_as_failures() {
        let work = Guarded::arc(WorkFn::new("flaky", |_signal: CancelSignal, job: Job| async move {
            assert!(job.id() % 3 != 0, "multiple of three");
            Outcome::Success
        }));
        let cfg = RunConfig::new(9, 3, Duration::from_secs(5)).unwrap();
        let mut run = Engine::new(cfg).start(work);

        let mut panicked = 0;
        while let Some(result) = run.next().await {
            if result.outcome.kind() == OutcomeKind::Failure {
                panicked += 1;
            }
        }
        let summary = run.finish().await;

        assert_eq!(panicked, 3);
        assert_eq!(summary.handled, 9);
        assert_eq!((summary.succeeded, summary.failed), (6, 3));
    }
}
