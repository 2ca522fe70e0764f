mod duration;
pub use duration::{parse_duration, parse_timeout};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Validated configuration of a single run.
///
/// Fields are private: a `RunConfig` can only be obtained through
/// [`RunConfig::new`] or `TryFrom<RawConfig>`, so every instance in the
/// program already satisfies `jobs > 0`, `workers > 0`, `timeout > 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawConfig", into = "RawConfig")]
pub struct RunConfig {
    jobs: u64,
    workers: usize,
    timeout: Duration,
}

impl RunConfig {
    pub const DEFAULT_JOBS: u64 = 9;
    pub const DEFAULT_WORKERS: usize = 3;
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

    pub fn new(jobs: u64, workers: usize, timeout: Duration) -> Result<Self, ConfigError> {
        if jobs == 0 {
            return Err(ConfigError::NonPositiveJobs(0));
        }
        if workers == 0 {
            return Err(ConfigError::NonPositiveWorkers(0));
        }
        if timeout.is_zero() {
            return Err(ConfigError::NonPositiveTimeout);
        }
        Ok(Self {
            jobs,
            workers,
            timeout,
        })
    }

    /// Number of jobs the producer will generate (ids `1..=jobs`).
    #[inline]
    pub fn jobs(&self) -> u64 {
        self.jobs
    }

    /// Number of concurrent execution slots.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run-level deadline, measured from the moment the run starts.
    #[inline]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            jobs: Self::DEFAULT_JOBS,
            workers: Self::DEFAULT_WORKERS,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

/// Unvalidated configuration as it arrives from flags, env or a config file.
///
/// Counts are signed so that negative input reaches validation instead of
/// failing as a parse error somewhere upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConfig {
    pub jobs: i64,
    pub workers: i64,
    pub timeout: Duration,
}

impl TryFrom<RawConfig> for RunConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        if raw.jobs <= 0 {
            return Err(ConfigError::NonPositiveJobs(raw.jobs));
        }
        if raw.workers <= 0 {
            return Err(ConfigError::NonPositiveWorkers(raw.workers));
        }
        let workers = usize::try_from(raw.workers)
            .map_err(|_| ConfigError::NonPositiveWorkers(raw.workers))?;
        RunConfig::new(raw.jobs as u64, workers, raw.timeout)
    }
}

impl From<RunConfig> for RawConfig {
    fn from(cfg: RunConfig) -> Self {
        Self {
            jobs: i64::try_from(cfg.jobs).unwrap_or(i64::MAX),
            workers: i64::try_from(cfg.workers).unwrap_or(i64::MAX),
            timeout: cfg.timeout,
        }
    }
}
