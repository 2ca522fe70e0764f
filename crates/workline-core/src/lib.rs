//! # workline-core
//!
//! Bounded, cancellable job execution.
//!
//! ```text
//!  Engine::start(work)
//!     │
//!     ├─► derive_run(timeout) ──► CancelSignal (shared, read-only) + RunGuard (owned by Run)
//!     │
//!     ├─► Producer ── Job 1..=N ──► [job channel] ──► worker 1 ─┐
//!     │                                          ├──► worker 2 ─┼─► [result channel] ──► Run::next / finish
//!     │                                          └──► worker N ─┘        ▲
//!     │                                                                  │
//!     └─► closer: join all workers, then drop the last result sender ────┘
//! ```
//!
//! Every wait that is not "wait for normal completion" is raced against the
//! [`CancelSignal`]. The producer is the only owner of the job sender and the
//! closer the only owner of the last result sender, so each channel is closed
//! exactly once, by dropping.

mod error;
pub use error::{CoreError, GateError};

pub mod cancel;
pub use cancel::{CancelCause, CancelSignal, RunGuard, derive_run};

pub mod work;
pub use work::{Work, WorkFn, WorkRef};

pub mod producer;
pub use producer::Producer;

pub mod gate;
pub use gate::{Gate, GatePermit};

pub mod pool;
pub use pool::{Dispatch, GatedPool, PoolReport, WorkerPool};

pub mod aggregate;
pub use aggregate::Tally;

pub mod engine;
pub use engine::{Engine, Run, RunId};
