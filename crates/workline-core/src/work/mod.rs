//! # Unit of work.
//!
//! The engine is generic over what a job actually does. A [`Work`]
//! implementation receives the run's [`CancelSignal`] together with the
//! [`Job`] it owns, and must race its own blocking operations against the
//! signal, returning [`Outcome::Canceled`] instead of blocking indefinitely.
//!
//! A unit of work reports failure as [`Outcome::Failure`]; it does not panic.
//! Code that may panic should be wrapped (see `workline-exec`'s `Guarded`).
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use workline_core::{CancelSignal, Work, WorkFn, WorkRef};
//! use workline_model::{Job, Outcome};
//!
//! let work: WorkRef = WorkFn::arc("nap", |signal: CancelSignal, _job: Job| async move {
//!     tokio::select! {
//!         _ = signal.cancelled() => Outcome::Canceled,
//!         _ = tokio::time::sleep(Duration::from_millis(10)) => Outcome::Success,
//!     }
//! });
//! assert_eq!(work.name(), "nap");
//! ```

use std::{borrow::Cow, future::Future, sync::Arc};

use async_trait::async_trait;
use workline_model::{Job, Outcome};

use crate::cancel::CancelSignal;

/// Shared handle to a unit of work, cloned into every worker.
pub type WorkRef = Arc<dyn Work>;

#[async_trait]
pub trait Work: Send + Sync + 'static {
    /// Stable, human-readable name (used in logs).
    fn name(&self) -> &str;

    /// Executes one job.
    async fn run(&self, signal: CancelSignal, job: Job) -> Outcome;
}

/// Closure-backed unit of work.
///
/// Wraps `F: Fn(CancelSignal, Job) -> Fut`, producing a fresh future per job.
pub struct WorkFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> WorkFn<F> {
    pub fn new<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(CancelSignal, Job) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the unit of work and returns it as a shared handle.
    pub fn arc<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self>
    where
        F: Fn(CancelSignal, Job) -> Fut,
        Fut: Future<Output = Outcome>,
    {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut> Work for WorkFn<F>
where
    F: Fn(CancelSignal, Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Outcome> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, signal: CancelSignal, job: Job) -> Outcome {
        (self.f)(signal, job).await
    }
}
