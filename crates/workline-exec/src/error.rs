use thiserror::Error;
use workline_model::{JobError, JobId};

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("missing program")]
    MissingProgram,
    #[error("spawn failed: {0}")]
    Spawn(String),
    #[error("wait failed: {0}")]
    Wait(String),
    #[error("non-zero exit code: {code}")]
    NonZeroExit { code: i32 },
    #[error("killed by signal")]
    KilledBySignal,
    #[error("simulated failure")]
    Simulated,
}

impl ExecError {
    /// Attaches the failing job id.
    pub fn for_job(self, job: JobId) -> JobError {
        JobError::Failed {
            job,
            reason: self.to_string(),
        }
    }
}
