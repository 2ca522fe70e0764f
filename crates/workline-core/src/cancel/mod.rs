//! # Run-level cancellation.
//!
//! [`derive_run`] creates the two halves of a run's cancellation state:
//!
//! - [`CancelSignal`]: cheap to clone, read-only, observed by the producer,
//!   every worker and every unit of work.
//! - [`RunGuard`]: the single owner. Explicit cancel goes through it, and its
//!   `Drop` stops the deadline timer and fires the signal, so no reader can
//!   outlive the run blocked on it.
//!
//! ```text
//! derive_run(timeout)
//!    ├─► timer task: sleep_until(deadline) ──► fire(Timeout)
//!    │              token.cancelled()      ──► exit (someone else fired)
//!    ├─► RunGuard::cancel()                ──► fire(Explicit)
//!    └─► drop(RunGuard)                    ──► abort timer, fire(Released)
//! ```
//!
//! The first `fire` records its cause (set-once); later ones only re-cancel
//! an already cancelled token, which is a no-op. The signal never goes back
//! to active.

use std::{
    fmt,
    sync::{Arc, OnceLock},
    time::Duration,
};

use tokio::{task::JoinHandle, time::Instant};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

/// Upper bound used when `now + timeout` does not fit into an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// What fired the signal first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The run deadline elapsed.
    Timeout,
    /// [`RunGuard::cancel`] was called.
    Explicit,
    /// The guard was dropped while the signal was still active.
    Released,
}

impl CancelCause {
    pub fn as_label(&self) -> &'static str {
        match self {
            CancelCause::Timeout => "timeout",
            CancelCause::Explicit => "explicit",
            CancelCause::Released => "released",
        }
    }
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Read-only view of a run's cancellation state.
///
/// Observing it never consumes anything: any number of clones may call
/// [`is_cancelled`](Self::is_cancelled) or await [`cancelled`](Self::cancelled)
/// any number of times, before or after it fires.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    token: CancellationToken,
    cause: Arc<OnceLock<CancelCause>>,
    deadline: Instant,
}

impl CancelSignal {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once the signal has fired; immediately if it already has.
    #[inline]
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Cause of cancellation, `None` while the signal is active.
    pub fn cause(&self) -> Option<CancelCause> {
        if self.token.is_cancelled() {
            self.cause.get().copied()
        } else {
            None
        }
    }

    /// Instant at which the signal fires on its own.
    #[inline]
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Time left until the deadline (zero once it has passed).
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

/// Owner half of a run's cancellation state.
///
/// Released exactly once, by `Drop`, on every exit path of the owner.
#[must_use = "dropping the guard cancels the run immediately"]
#[derive(Debug)]
pub struct RunGuard {
    signal: CancelSignal,
    timer: JoinHandle<()>,
}

impl RunGuard {
    /// Another read-only handle to the guarded signal.
    pub fn signal(&self) -> CancelSignal {
        self.signal.clone()
    }

    /// Fires the signal now. Idempotent.
    pub fn cancel(&self) {
        fire(&self.signal, CancelCause::Explicit);
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.timer.abort();
        fire(&self.signal, CancelCause::Released);
    }
}

/// Creates a signal that fires no later than `timeout` from now.
///
/// Must be called from within a tokio runtime: the deadline is driven by a
/// spawned timer task owned by the returned guard.
pub fn derive_run(timeout: Duration) -> (CancelSignal, RunGuard) {
    let now = Instant::now();
    let deadline = now
        .checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE);

    let signal = CancelSignal {
        token: CancellationToken::new(),
        cause: Arc::new(OnceLock::new()),
        deadline,
    };

    let timer = tokio::spawn({
        let signal = signal.clone();
        async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    fire(&signal, CancelCause::Timeout);
                    debug!(target: "workline.core.cancel", timeout_ms = timeout.as_millis() as u64, "run deadline reached");
                }
                _ = signal.cancelled() => {}
            }
        }
    });

    let guard = RunGuard {
        signal: signal.clone(),
        timer,
    };
    (signal, guard)
}

fn fire(signal: &CancelSignal, cause: CancelCause) {
    if signal.cause.set(cause).is_ok() {
        debug!(target: "workline.core.cancel", cause = cause.as_label(), "run signal fired");
    }
    signal.token.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_on_deadline() {
        let (signal, _guard) = derive_run(Duration::from_millis(50));
        assert!(!signal.is_cancelled());
        assert_eq!(signal.cause(), None);

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert!(!signal.is_cancelled());

        signal.cancelled().await;
        assert_eq!(signal.cause(), Some(CancelCause::Timeout));
        assert_eq!(signal.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_cancel_wins_over_deadline() {
        let (signal, guard) = derive_run(Duration::from_secs(10));
        guard.cancel();
        assert!(signal.is_cancelled());
        assert_eq!(signal.cause(), Some(CancelCause::Explicit));

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(signal.cause(), Some(CancelCause::Explicit));
    }

    #[tokio::test]
    async fn dropping_guard_releases() {
        let (signal, guard) = derive_run(Duration::from_secs(3600));
        let reader = signal.clone();
        drop(guard);

        assert!(reader.is_cancelled());
        assert_eq!(reader.cause(), Some(CancelCause::Released));
    }

    #[tokio::test(start_paused = true)]
    async fn cause_is_recorded_once() {
        let (signal, guard) = derive_run(Duration::from_millis(5));
        signal.cancelled().await;

        guard.cancel();
        drop(guard);
        assert_eq!(signal.cause(), Some(CancelCause::Timeout));
    }

    #[tokio::test]
    async fn observation_is_repeatable() {
        let (signal, guard) = derive_run(Duration::from_secs(3600));
        guard.cancel();

        for _ in 0..3 {
            signal.cancelled().await;
            assert!(signal.is_cancelled());
        }
        let clones: Vec<_> = (0..4).map(|_| guard.signal()).collect();
        assert!(clones.iter().all(CancelSignal::is_cancelled));
    }

    #[tokio::test]
    async fn huge_timeout_does_not_overflow() {
        let (signal, _guard) = derive_run(Duration::MAX);
        assert!(!signal.is_cancelled());
        assert!(signal.remaining() > Duration::from_secs(3600));
    }
}
