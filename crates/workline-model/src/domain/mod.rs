mod job;
pub use job::{Job, JobSeq};

mod outcome;
pub use outcome::{Outcome, OutcomeKind};

mod result;
pub use result::JobResult;

mod summary;
pub use summary::Summary;

/// Ordinal job identifier, unique per run (`1..=jobs`).
pub type JobId = u64;

/// Execution slot that handled a job.
///
/// 1-based: a worker index for pooled dispatch, a gate slot for gated dispatch.
pub type WorkerId = usize;
