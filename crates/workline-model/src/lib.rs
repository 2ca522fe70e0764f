//! Data model shared by the workline engine, its stock units of work and the CLI.
//!
//! Nothing in here spawns or awaits; these are plain values moved between the
//! producer, the workers and the aggregator.

mod config;
pub use config::{RawConfig, RunConfig, parse_duration, parse_timeout};

mod domain;
pub use domain::*;

mod error;
pub use error::{ConfigError, JobError, ParseDurationError};
