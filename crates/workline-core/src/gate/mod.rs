//! # Bounded-concurrency gate.
//!
//! A counting admission primitive: at most [`Gate::limit`] holders at a time.
//! Backed by [`tokio::sync::Semaphore`]; a [`GatePermit`] releases its slot
//! when dropped, so the protected section gives the slot back on every exit
//! path (return, `?`, cancellation of the enclosing future, panic unwind).
//!
//! Each permit also carries a 1-based [`slot`](GatePermit::slot) that is
//! unique among the permits alive at the same time; gated dispatch reports it
//! as the worker id.
//!
//! ## Example
//! ```rust
//! use workline_core::Gate;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let gate = Gate::new(2);
//! let a = gate.acquire().await.unwrap();
//! let b = gate.try_acquire().unwrap();
//! assert!(gate.try_acquire().is_err());
//! assert_eq!(gate.in_flight(), 2);
//! drop((a, b));
//! assert_eq!(gate.in_flight(), 0);
//! # }
//! ```

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::{cancel::CancelSignal, error::GateError};

#[derive(Clone, Debug)]
pub struct Gate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    sem: Arc<Semaphore>,
    limit: usize,
    /// Free slot ids; the top of the stack is handed out next.
    free: Mutex<Vec<usize>>,
}

impl GateInner {
    fn free(&self) -> MutexGuard<'_, Vec<usize>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Gate {
    /// Creates a gate admitting `limit` concurrent holders (clamped to at least 1).
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            inner: Arc::new(GateInner {
                sem: Arc::new(Semaphore::new(limit)),
                limit,
                free: Mutex::new((1..=limit).rev().collect()),
            }),
        }
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Number of permits currently held.
    pub fn in_flight(&self) -> usize {
        self.inner.limit - self.inner.sem.available_permits()
    }

    /// Waits for a free slot.
    pub async fn acquire(&self) -> Result<GatePermit, GateError> {
        let permit = Arc::clone(&self.inner.sem)
            .acquire_owned()
            .await
            .map_err(|_| GateError::Closed)?;
        Ok(self.admit(permit))
    }

    /// Waits for a free slot unless `signal` fires first.
    pub async fn acquire_or_cancel(&self, signal: &CancelSignal) -> Result<GatePermit, GateError> {
        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(GateError::Canceled),
            permit = self.acquire() => permit,
        }
    }

    /// Takes a slot only if one is free right now.
    pub fn try_acquire(&self) -> Result<GatePermit, GateError> {
        match Arc::clone(&self.inner.sem).try_acquire_owned() {
            Ok(permit) => Ok(self.admit(permit)),
            Err(TryAcquireError::Closed) => Err(GateError::Closed),
            Err(TryAcquireError::NoPermits) => Err(GateError::Exhausted),
        }
    }

    /// Runs `fut` while holding a slot.
    pub async fn scoped<F, T>(&self, fut: F) -> Result<T, GateError>
    where
        F: Future<Output = T>,
    {
        let _permit = self.acquire().await?;
        Ok(fut.await)
    }

    /// Fails all pending and future acquisitions. Held permits stay valid.
    pub fn close(&self) {
        self.inner.sem.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.sem.is_closed()
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let slot = self.inner.free().pop();
        debug_assert!(slot.is_some(), "semaphore admitted more holders than slots");
        GatePermit {
            slot: slot.unwrap_or(0),
            gate: Arc::clone(&self.inner),
            _permit: permit,
        }
    }
}

/// Proof of admission. Dropping it frees the slot.
#[must_use = "the slot is released as soon as the permit is dropped"]
#[derive(Debug)]
pub struct GatePermit {
    slot: usize,
    gate: Arc<GateInner>,
    // Dropped after `Drop::drop` returns the slot id to the free list.
    _permit: OwnedSemaphorePermit,
}

impl GatePermit {
    /// 1-based slot id, unique among concurrently held permits.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        if self.slot != 0 {
            self.gate.free().push(self.slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::cancel::derive_run;

    struct Occupancy {
        current: AtomicUsize,
        max: AtomicUsize,
    }

    impl Occupancy {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                current: AtomicUsize::new(0),
                max: AtomicUsize::new(0),
            })
        }

        fn enter(&self) {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.max.fetch_max(now, Ordering::SeqCst);
        }

        fn leave(&self) {
            self.current.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ten_callers_limit_two() {
        let gate = Gate::new(2);
        let occ = Occupancy::new();

        let mut set = tokio::task::JoinSet::new();
        for _ in 0..10 {
            let gate = gate.clone();
            let occ = Arc::clone(&occ);
            set.spawn(async move {
                let _permit = gate.acquire().await.unwrap();
                occ.enter();
                tokio::time::sleep(Duration::from_millis(20)).await;
                occ.leave();
            });
        }
        while let Some(joined) = set.join_next().await {
            joined.unwrap();
        }

        assert_eq!(occ.max.load(Ordering::SeqCst), 2);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn never_exceeds_limit_under_stress() {
        let gate = Gate::new(3);
        let occ = Occupancy::new();

        let mut set = tokio::task::JoinSet::new();
        for i in 0..200u64 {
            let gate = gate.clone();
            let occ = Arc::clone(&occ);
            set.spawn(async move {
                let permit = gate.acquire().await.unwrap();
                occ.enter();
                assert!(gate.in_flight() <= gate.limit());
                assert!((1..=3).contains(&permit.slot()));
                if i % 3 == 0 {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(Duration::from_micros(200)).await;
                }
                occ.leave();
            });
        }
        while let Some(joined) = set.join_next().await {
            joined.unwrap();
        }

        assert!(occ.max.load(Ordering::SeqCst) <= 3);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn slots_are_unique_among_holders() {
        let gate = Gate::new(4);
        let permits: Vec<_> = (0..4).map(|_| gate.try_acquire().unwrap()).collect();
        let slots: HashSet<_> = permits.iter().map(GatePermit::slot).collect();
        assert_eq!(slots, HashSet::from([1, 2, 3, 4]));

        drop(permits);
        let again = gate.try_acquire().unwrap();
        assert!((1..=4).contains(&again.slot()));
    }

    #[tokio::test]
    async fn try_acquire_reports_exhaustion() {
        let gate = Gate::new(1);
        let held = gate.try_acquire().unwrap();
        assert_eq!(gate.try_acquire().unwrap_err(), GateError::Exhausted);
        drop(held);
        assert!(gate.try_acquire().is_ok());
    }

    #[tokio::test]
    async fn release_on_early_return() {
        async fn fallible(gate: &Gate, fail: bool) -> Result<(), &'static str> {
            let _permit = gate.acquire().await.map_err(|_| "closed")?;
            if fail {
                return Err("early");
            }
            Ok(())
        }

        let gate = Gate::new(1);
        assert!(fallible(&gate, true).await.is_err());
        assert_eq!(gate.in_flight(), 0);
        assert!(fallible(&gate, false).await.is_ok());
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn scoped_holds_for_the_duration() {
        let gate = Gate::new(1);
        let seen = gate.scoped(async { gate.in_flight() }).await.unwrap();
        assert_eq!(seen, 1);
        assert_eq!(gate.in_flight(), 0);
    }

    #[tokio::test]
    async fn close_fails_waiters() {
        let gate = Gate::new(1);
        let _held = gate.acquire().await.unwrap();

        let waiter = tokio::spawn({
            let gate = gate.clone();
            async move { gate.acquire().await.map(|p| p.slot()) }
        });
        tokio::task::yield_now().await;
        gate.close();

        assert_eq!(waiter.await.unwrap(), Err(GateError::Closed));
        assert!(gate.is_closed());
        assert_eq!(gate.try_acquire().unwrap_err(), GateError::Closed);
    }

    #[tokio::test]
    async fn acquire_or_cancel_observes_signal() {
        let gate = Gate::new(1);
        let _held = gate.acquire().await.unwrap();
        let (signal, guard) = derive_run(Duration::from_secs(3600));
        guard.cancel();

        assert_eq!(
            gate.acquire_or_cancel(&signal).await.map(|p| p.slot()),
            Err(GateError::Canceled)
        );
    }

    #[test]
    fn zero_limit_is_clamped() {
        assert_eq!(Gate::new(0).limit(), 1);
    }
}
