use thiserror::Error;

use crate::JobId;

/// Rejected run configuration.
///
/// Raised before any execution unit is spawned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("jobs must be positive (got {0})")]
    NonPositiveJobs(i64),
    #[error("workers must be positive (got {0})")]
    NonPositiveWorkers(i64),
    #[error("timeout must be positive")]
    NonPositiveTimeout,
}

/// Cause attached to a failed job.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum JobError {
    #[error("job {job}: {reason}")]
    Failed { job: JobId, reason: String },
    #[error("job {job} panicked: {reason}")]
    Panicked { job: JobId, reason: String },
}

impl JobError {
    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Failed { .. } => "job_failed",
            JobError::Panicked { .. } => "job_panicked",
        }
    }

    pub fn job(&self) -> JobId {
        match self {
            JobError::Failed { job, .. } | JobError::Panicked { job, .. } => *job,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("empty duration")]
    Empty,
    #[error("invalid duration: {0}")]
    Invalid(String),
    #[error("missing unit in duration: {0} (expected: ns|us|ms|s|m|h)")]
    MissingUnit(String),
    #[error("unknown unit {unit:?} in duration {input}")]
    UnknownUnit { input: String, unit: String },
    #[error("duration out of range: {0}")]
    Overflow(String),
}
