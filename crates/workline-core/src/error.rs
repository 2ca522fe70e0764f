use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid dispatch mode: {0} (expected: pool|gated)")]
    InvalidDispatch(String),
}

/// Reasons a [`Gate`](crate::Gate) did not hand out a permit.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GateError {
    #[error("gate closed")]
    Closed,
    #[error("gate acquisition canceled")]
    Canceled,
    #[error("no free gate slot")]
    Exhausted,
}
