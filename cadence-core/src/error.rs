//! Error taxonomy for `cadence-core`.
//!
//! Most of the core's failure modes are spec'd as recoverable and surface
//! as `Option`/`bool` (handle-invalid, enqueue-rejected, cycle-skipped).
//! The few cases spec calls out as fatal or as needing a surfaced cause are
//! typed errors here, built with `thiserror` as the teacher crate does.

use std::fmt::Debug;

/// The step processor exceeded its configured iteration bound without
/// converging. Indicates a producer/consumer cycle between commands.
#[derive(thiserror::Error, Debug)]
#[error("step processor exceeded max_step_depth ({max_depth}) after {steps_run} steps; a producer/consumer cycle is likely")]
pub struct StepError {
    pub max_depth: u32,
    pub steps_run: u32,
}

/// A cycle was found in a dependency graph submitted to [`crate::depsort::sort`].
#[derive(thiserror::Error, Debug)]
#[error("dependency graph contains a cycle among {cycle:?}")]
pub struct CycleError<N: Debug> {
    pub cycle: Vec<N>,
}

/// Errors produced while decoding a snapshot buffer.
#[derive(thiserror::Error, Debug)]
pub enum SnapshotError {
    #[error("unexpected end of buffer while reading {0}")]
    Truncated(&'static str),
    #[error("string length {0} exceeds remaining buffer")]
    InvalidLength(u32),
    #[error("utf-8 decoding failed: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors produced by the resource catalog.
#[derive(thiserror::Error, Debug)]
pub enum ResourceError {
    #[error("cannot unregister key with ref_count {0} > 0")]
    StillReferenced(u32),
    #[error("key is not registered in the catalog")]
    UnknownKey,
}
