use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::JobError;

/// Terminal state of a dispatched job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The unit of work finished without error.
    Success,
    /// The unit of work was attempted and failed.
    Failure(JobError),
    /// The run was canceled before the unit of work could finish.
    ///
    /// Covers both "canceled before start" and "canceled mid-flight".
    Canceled,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success => OutcomeKind::Success,
            Outcome::Failure(_) => OutcomeKind::Failure,
            Outcome::Canceled => OutcomeKind::Canceled,
        }
    }

    #[inline]
    pub fn error(&self) -> Option<&JobError> {
        match self {
            Outcome::Failure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Result<(), JobError>> for Outcome {
    fn from(res: Result<(), JobError>) -> Self {
        match res {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::Failure(e),
        }
    }
}

/// Field-less classification of an [`Outcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutcomeKind {
    Success,
    Failure,
    Canceled,
}

impl OutcomeKind {
    /// Returns a short symbolic identifier, used in report lines and log fields.
    pub fn as_label(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Failure => "failure",
            OutcomeKind::Canceled => "canceled",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds() {
        assert_eq!(Outcome::Success.kind(), OutcomeKind::Success);
        assert_eq!(Outcome::Canceled.kind(), OutcomeKind::Canceled);

        let failed = Outcome::Failure(JobError::Failed {
            job: 9,
            reason: "boom".into(),
        });
        assert_eq!(failed.kind(), OutcomeKind::Failure);
        assert_eq!(failed.error().map(JobError::job), Some(9));
        assert!(Outcome::Success.error().is_none());
    }

    #[test]
    fn from_result() {
        assert_eq!(Outcome::from(Ok(())), Outcome::Success);
        let err = JobError::Failed {
            job: 1,
            reason: "x".into(),
        };
        assert_eq!(Outcome::from(Err(err.clone())), Outcome::Failure(err));
    }

    #[test]
    fn serde_labels() {
        let json = serde_json::to_string(&OutcomeKind::Canceled).unwrap();
        assert_eq!(json, r#""canceled""#);

        let back: OutcomeKind = serde_json::from_str(r#""failure""#).unwrap();
        assert_eq!(back, OutcomeKind::Failure);
        assert_eq!(back.to_string(), "failure");
    }
}
