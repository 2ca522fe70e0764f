use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

use crate::OutcomeKind;

/// Classified totals of a run.
///
/// `handled == succeeded + failed + canceled` holds after every
/// [`record`](Summary::record); `handled <= jobs_requested` holds for every
/// run driven by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub jobs_requested: u64,
    pub handled: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub canceled: u64,
    pub elapsed: Duration,
}

impl Summary {
    pub fn new(jobs_requested: u64) -> Self {
        Self {
            jobs_requested,
            ..Default::default()
        }
    }

    pub fn record(&mut self, kind: OutcomeKind) {
        self.handled += 1;
        match kind {
            OutcomeKind::Success => self.succeeded += 1,
            OutcomeKind::Failure => self.failed += 1,
            OutcomeKind::Canceled => self.canceled += 1,
        }
    }

    /// Checks the accounting identities.
    pub fn is_consistent(&self) -> bool {
        self.handled == self.succeeded + self.failed + self.canceled
            && self.handled <= self.jobs_requested
    }

    /// `true` when every requested job was handled.
    pub fn is_complete(&self) -> bool {
        self.handled == self.jobs_requested
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "jobsRequested={} handled={} succeeded={} failed={} canceled={} elapsed={:?}",
            self.jobs_requested,
            self.handled,
            self.succeeded,
            self.failed,
            self.canceled,
            self.elapsed
        )
    }
}
