//! Worker invocation
//!
//! A worker computes the fields for one partition. Production workers
//! are isolated OS processes (`ProcessWorker`): the native interpolation
//! routine relies on library-global state and is only safe to call once
//! per process, so isolation is a correctness requirement.
//!
//! The orchestrator only sees the `WorkerLauncher` trait, which keeps the
//! process plumbing out of the partition/merge logic.

pub mod process;

use std::io;
use std::time::Instant;
use thiserror::Error;

use crate::interpolation::InterpolationError;
use crate::models::{Fields, InterpolationRequest};
use crate::protocol::ProtocolError;

pub use process::{ProcessWorker, WorkerCommand};

/// Root cause of a worker failure
#[derive(Debug, Error)]
pub enum WorkerFailure {
    #[error("cannot spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("i/o with worker failed: {0}")]
    Io(#[from] io::Error),

    #[error("worker exited with status {code}")]
    ExitStatus { code: i32 },

    #[error("worker was terminated by a signal")]
    Signaled,

    #[error("worker exceeded its deadline and was killed")]
    TimedOut,

    #[error("worker output rejected: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("worker returned {actual} points, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),
}

/// A failed worker, identified by its partition ordinal
#[derive(Debug, Error)]
#[error("worker #{ordinal} failed: {failure}")]
pub struct WorkerError {
    /// Partition index the worker was responsible for
    pub ordinal: usize,
    #[source]
    pub failure: WorkerFailure,
}

impl WorkerError {
    pub fn new(ordinal: usize, failure: impl Into<WorkerFailure>) -> Self {
        Self {
            ordinal,
            failure: failure.into(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.failure, WorkerFailure::TimedOut)
    }
}

/// Runs one worker to completion
///
/// Implementations are shared by reference across the orchestrator's
/// threads, hence `Sync`.
pub trait WorkerLauncher: Sync {
    /// Compute fields for `request` as worker number `ordinal`
    ///
    /// When `deadline` is set, a worker still running at that instant
    /// must be stopped and reported as `WorkerFailure::TimedOut`.
    fn launch(
        &self,
        ordinal: usize,
        request: &InterpolationRequest,
        deadline: Option<Instant>,
    ) -> Result<Fields, WorkerError>;
}

impl<L: WorkerLauncher + ?Sized> WorkerLauncher for &L {
    fn launch(
        &self,
        ordinal: usize,
        request: &InterpolationRequest,
        deadline: Option<Instant>,
    ) -> Result<Fields, WorkerError> {
        (**self).launch(ordinal, request, deadline)
    }
}
