//! Interpolation backends
//!
//! The numerical interpolation itself lives outside this crate. This
//! module defines the narrow call contract the worker process uses, and
//! the two implementations of it:
//!
//! - **native** (cargo feature `native`): the external `fuka_exporter`
//!   library. Single-shot per process because of library-global state.
//! - **synthetic**: a closed-form stand-in used to exercise the pipeline
//!   on hosts without the native library.

#[cfg(feature = "native")]
pub mod native;
pub mod synthetic;

use std::path::Path;
use thiserror::Error;

use crate::models::{BinaryInfo, BinaryType, Fields, FieldsError, InterpolationRequest};

#[cfg(feature = "native")]
pub use native::NativeInterpolator;
pub use synthetic::SyntheticInterpolator;

/// Errors raised by an interpolation backend
#[derive(Debug, Error)]
pub enum InterpolationError {
    #[error("native interpolation already ran in this process; spawn a fresh worker")]
    AlreadyUsed,

    #[error("native library returned no data for '{field}'")]
    MissingOutput { field: &'static str },

    #[error("grid of {points} points exceeds the native library's index range")]
    GridTooLarge { points: usize },

    #[error("path {0:?} cannot be passed to the native library")]
    InvalidPath(String),

    #[error("{backend} backend does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    #[error("backend produced an inconsistent field set: {0}")]
    Fields(#[from] FieldsError),
}

/// Computes the 22 quantities on the points of a request
pub trait Interpolator {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    /// Evaluate all fields on `request.grid`
    ///
    /// The result must cover exactly `request.grid.len()` points.
    fn interpolate(&self, request: &InterpolationRequest) -> Result<Fields, InterpolationError>;

    /// Read component masses and positions from an info file
    fn binary_info(
        &self,
        _info_filename: &Path,
        _binary_type: BinaryType,
    ) -> Result<BinaryInfo, InterpolationError> {
        Err(InterpolationError::Unsupported {
            backend: self.name(),
            operation: "binary info",
        })
    }
}
