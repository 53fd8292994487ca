//! Fieldsplit Core - Rust Engine
//!
//! Parallel interpolation of binary initial data onto arbitrary grids.
//! A request's grid is split into contiguous partitions, each partition is
//! interpolated by an isolated worker process, and the partial results are
//! merged back in partition order.
//!
//! # Architecture
//!
//! - **models**: Domain types (Grid, Partition, Fields, InterpolationRequest)
//! - **protocol**: Framed binary encoding exchanged with workers
//! - **interpolation**: The per-process interpolation backends
//! - **worker**: Launching one worker per partition
//! - **orchestrator**: Fan-out, fail-fast and in-order merge
//! - **handoff**: Pinned buffers for callers reading raw pointers
//! - **ffi**: C ABI (and optional PyO3) entry points
//!
//! # Critical Invariants
//!
//! 1. Partitions are contiguous, ordered and cover every point exactly once
//! 2. Merged output is identical no matter which worker finishes first
//! 3. Any worker failure fails the whole request; no partial results
//! 4. Exported buffers never move or change until released

// Module declarations
pub mod config;
pub mod ffi;
pub mod handoff;
pub mod interpolation;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod protocol;
pub mod worker;

// Re-exports for convenience
pub use config::{ConfigError, Settings};
pub use handoff::{ForeignFieldsHandle, ForeignHandoff, HandoffError, PinRegistry};
pub use interpolation::{InterpolationError, Interpolator, SyntheticInterpolator};
pub use models::{
    BinaryInfo, BinaryType, FieldName, Fields, FieldsError, Grid, GridError,
    InterpolationRequest, Partition, PartitionError, PartitionPlan, FIELD_COUNT,
};
pub use orchestrator::{orchestrate, OrchestrationError, Orchestrator, OrchestratorConfig};
pub use protocol::ProtocolError;
pub use worker::{ProcessWorker, WorkerCommand, WorkerError, WorkerFailure, WorkerLauncher};

#[cfg(feature = "native")]
pub use interpolation::NativeInterpolator;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn fieldsplit_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PyOrchestrator>()?;
    m.add_function(wrap_pyfunction!(ffi::orchestrator::interpolate, m)?)?;
    m.add_function(wrap_pyfunction!(ffi::orchestrator::finalize, m)?)?;
    Ok(())
}
