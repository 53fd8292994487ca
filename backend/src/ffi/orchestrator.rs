//! PyO3 wrapper for Orchestrator
//!
//! Python hosts get copies of the merged fields as lists, so nothing is
//! pinned on their behalf; `finalize` still releases whatever the C entry
//! points exported in the same process.
//!
//! `interpolate(request, n_workers)` mirrors the C entry point and reads
//! the worker program and timeout from the environment; the
//! `Orchestrator` class takes them as arguments instead.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Settings;
use crate::models::{
    BinaryType, Fields, Grid, InterpolationRequest, DEFAULT_INTERPOLATION_OFFSET,
    DEFAULT_INTERPOLATION_ORDER, DEFAULT_RELATIVE_DR_SPACING,
};
use crate::orchestrator::{Orchestrator as RustOrchestrator, OrchestratorConfig};
use crate::worker::{ProcessWorker, WorkerCommand};

// ========================================================================
// PyDict Extraction Helpers
// ========================================================================

fn extract_required<'py, T>(dict: &Bound<'py, PyDict>, key: &str) -> PyResult<T>
where
    T: FromPyObject<'py>,
{
    dict.get_item(key)?
        .ok_or_else(|| PyValueError::new_err(format!("Missing required field '{key}'")))?
        .extract()
}

fn extract_with_default<'py, T>(dict: &Bound<'py, PyDict>, key: &str, default: T) -> PyResult<T>
where
    T: FromPyObject<'py>,
{
    match dict.get_item(key)? {
        Some(value) => value.extract(),
        None => Ok(default),
    }
}

/// Build a request from the dict shape documented on `Orchestrator`
fn parse_request(dict: &Bound<'_, PyDict>) -> PyResult<InterpolationRequest> {
    let binary_type: String = extract_required(dict, "binary_type")?;
    let binary_type: BinaryType = binary_type
        .parse()
        .map_err(|err| PyValueError::new_err(err.to_string()))?;

    let grid = Grid::new(
        extract_required(dict, "x")?,
        extract_required(dict, "y")?,
        extract_required(dict, "z")?,
    )
    .map_err(|err| PyValueError::new_err(err.to_string()))?;
    let info_filename: PathBuf = extract_required(dict, "info_filename")?;

    Ok(InterpolationRequest::new(binary_type, grid, info_filename)
        .with_interpolation_offset(extract_with_default(
            dict,
            "interpolation_offset",
            DEFAULT_INTERPOLATION_OFFSET,
        )?)
        .with_interpolation_order(extract_with_default(
            dict,
            "interpolation_order",
            DEFAULT_INTERPOLATION_ORDER,
        )?)
        .with_relative_dr_spacing(extract_with_default(
            dict,
            "relative_dr_spacing",
            DEFAULT_RELATIVE_DR_SPACING,
        )?))
}

fn fields_to_py<'py>(py: Python<'py>, fields: &Fields) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    for (name, values) in fields.iter() {
        dict.set_item(name.as_str(), values.to_vec())?;
    }
    Ok(dict)
}

/// Python wrapper for the Rust orchestrator
///
/// # Example (from Python)
///
/// ```python
/// from fieldsplit_core_rs import Orchestrator, finalize
///
/// orch = Orchestrator(4, worker_program="/opt/fieldsplit/bin/fieldsplit")
/// fields = orch.interpolate({
///     "binary_type": "bns",
///     "info_filename": "bns.info",
///     "x": xs, "y": ys, "z": zs,
/// })
/// print(fields["alpha"][:4])
/// finalize()
/// ```
#[pyclass(name = "Orchestrator")]
pub struct PyOrchestrator {
    inner: RustOrchestrator<ProcessWorker>,
}

#[pymethods]
impl PyOrchestrator {
    /// Create an orchestrator running `n_workers` worker processes
    ///
    /// Raises ValueError if `timeout_secs` is not a positive number.
    #[new]
    #[pyo3(signature = (n_workers, worker_program=None, timeout_secs=None))]
    fn new(
        n_workers: usize,
        worker_program: Option<PathBuf>,
        timeout_secs: Option<f64>,
    ) -> PyResult<Self> {
        let command = match worker_program {
            Some(program) => WorkerCommand::for_program(program),
            None => WorkerCommand::default(),
        };
        let mut config = OrchestratorConfig::new(n_workers);
        if let Some(secs) = timeout_secs {
            let timeout = Some(secs)
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                .ok_or_else(|| PyValueError::new_err(format!("invalid timeout {secs}")))?;
            config = config.with_timeout(timeout);
        }
        Ok(Self {
            inner: RustOrchestrator::new(ProcessWorker::new(command), config),
        })
    }

    #[getter]
    fn n_workers(&self) -> usize {
        self.inner.config().worker_count
    }

    /// Interpolate a request dict, returning `{field_name: [float, ...]}`
    ///
    /// Raises ValueError for a malformed request and RuntimeError when
    /// partitioning or any worker fails.
    fn interpolate<'py>(
        &self,
        py: Python<'py>,
        request: &Bound<'py, PyDict>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let request = parse_request(request)?;
        let fields = py
            .allow_threads(|| self.inner.orchestrate(&request))
            .map_err(|err| PyRuntimeError::new_err(err.to_string()))?;
        fields_to_py(py, &fields)
    }
}

/// Interpolate a request dict with settings from the environment
#[pyfunction]
pub fn interpolate<'py>(
    py: Python<'py>,
    request: &Bound<'py, PyDict>,
    n_workers: usize,
) -> PyResult<Bound<'py, PyDict>> {
    let settings = Settings::from_env().map_err(|err| PyValueError::new_err(err.to_string()))?;
    let mut config = OrchestratorConfig::new(n_workers);
    if let Some(timeout) = settings.timeout {
        config = config.with_timeout(timeout);
    }
    let orchestrator = PyOrchestrator {
        inner: RustOrchestrator::new(ProcessWorker::new(settings.worker_command()), config),
    };
    orchestrator.interpolate(py, request)
}

/// Release every buffer pinned for foreign callers; returns the count
#[pyfunction]
pub fn finalize() -> usize {
    super::release_shared()
}
