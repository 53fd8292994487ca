//! FFI (Foreign Function Interface) module
//!
//! Entry points for a host process in another language runtime.
//!
//! - `c_api`: C ABI, results handed out as pinned pointers
//! - `orchestrator`: PyO3 bindings (feature `pyo3`), results copied
//!
//! # Design Principles
//!
//! 1. **Minimal boundary**: interpolate and finalize, nothing else
//! 2. **Validate inputs**: null pointers, counts and paths are checked
//!    before anything crosses into the core
//! 3. **Failure is never a result**: a failed call hands back no
//!    pointers at all
//! 4. **Process-scoped pins**: one handoff per process, released only
//!    by the host's shutdown call

pub mod c_api;
#[cfg(feature = "pyo3")]
pub mod orchestrator;
pub mod types;

use std::os::raw::c_int;
use std::sync::{Mutex, OnceLock, PoisonError};
use thiserror::Error;

use crate::config::ConfigError;
use crate::handoff::{ForeignHandoff, HandoffError, PinRegistry};
use crate::interpolation::InterpolationError;
use crate::models::GridError;
use crate::orchestrator::OrchestrationError;

pub use c_api::{
    fieldsplit_clear_last_error, fieldsplit_finalize, fieldsplit_interpolate,
    fieldsplit_last_error, fieldsplit_read_binary_info,
};
pub use types::{FieldsplitBinaryInfo, FieldsplitFields, FieldsplitGrid, FieldsplitRequest};

pub const FIELDSPLIT_OK: c_int = 0;
pub const FIELDSPLIT_ERR_INVALID_ARGUMENT: c_int = 1;
pub const FIELDSPLIT_ERR_CONFIG: c_int = 2;
pub const FIELDSPLIT_ERR_PARTITION: c_int = 3;
pub const FIELDSPLIT_ERR_WORKER: c_int = 4;
pub const FIELDSPLIT_ERR_HANDOFF: c_int = 5;
pub const FIELDSPLIT_ERR_PANIC: c_int = 6;
pub const FIELDSPLIT_ERR_BACKEND: c_int = 7;

/// Errors surfaced to a foreign caller
#[derive(Debug, Error)]
pub enum FfiError {
    #[error("null pointer passed for `{0}`")]
    NullPointer(&'static str),

    #[error("unknown binary type code {0}")]
    UnknownBinaryType(c_int),

    #[error("invalid point count {0}")]
    InvalidPointCount(c_int),

    #[error("invalid worker count {0}")]
    InvalidWorkerCount(c_int),

    #[error("info filename is not valid UTF-8")]
    NonUtf8Path,

    #[error("invalid grid: {0}")]
    Grid(#[from] GridError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("interpolation failed: {0}")]
    Orchestration(#[from] OrchestrationError),

    #[error("export failed: {0}")]
    Handoff(#[from] HandoffError),

    #[error("backend call failed: {0}")]
    Backend(#[from] InterpolationError),

    #[error("internal panic during interpolation")]
    Panicked,
}

impl FfiError {
    /// Non-zero status returned across the C boundary
    pub fn status_code(&self) -> c_int {
        match self {
            FfiError::NullPointer(_)
            | FfiError::UnknownBinaryType(_)
            | FfiError::InvalidPointCount(_)
            | FfiError::InvalidWorkerCount(_)
            | FfiError::NonUtf8Path
            | FfiError::Grid(_) => FIELDSPLIT_ERR_INVALID_ARGUMENT,
            FfiError::Config(_) => FIELDSPLIT_ERR_CONFIG,
            FfiError::Orchestration(OrchestrationError::Partition(_)) => FIELDSPLIT_ERR_PARTITION,
            FfiError::Orchestration(_) => FIELDSPLIT_ERR_WORKER,
            FfiError::Handoff(_) => FIELDSPLIT_ERR_HANDOFF,
            FfiError::Backend(_) => FIELDSPLIT_ERR_BACKEND,
            FfiError::Panicked => FIELDSPLIT_ERR_PANIC,
        }
    }
}

static SHARED_HANDOFF: OnceLock<Mutex<ForeignHandoff>> = OnceLock::new();

/// The process-wide handoff behind the C entry points
pub(crate) fn shared_handoff() -> &'static Mutex<ForeignHandoff> {
    SHARED_HANDOFF.get_or_init(|| Mutex::new(ForeignHandoff::new(PinRegistry::new())))
}

/// Release every buffer exported through the C boundary
///
/// No-op (returns 0) if nothing was ever exported.
pub fn release_shared() -> usize {
    match SHARED_HANDOFF.get() {
        Some(handoff) => handoff
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .release(),
        None => 0,
    }
}
