//! Binding to the external `fuka_exporter` library
//!
//! The library keeps global state across calls, so one process may call
//! `interpolate_FUKA_ID` at most once. `NativeInterpolator` enforces that
//! with a process-wide flag; parallelism comes from spawning one worker
//! process per partition.

use std::ffi::CString;
use std::os::raw::{c_char, c_double, c_int};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use super::{InterpolationError, Interpolator};
use crate::models::{
    BinaryInfo, BinaryType, FieldName, Fields, InterpolationRequest, FIELD_COUNT,
};

static INTERPOLATION_CLAIMED: AtomicBool = AtomicBool::new(false);

#[repr(C)]
struct RawGrid {
    x: *mut c_double,
    y: *mut c_double,
    z: *mut c_double,
    n_points: c_int,
}

#[repr(C)]
struct RawRequest {
    binary_type: c_int,
    info_filename: *mut c_char,
    grid: *mut RawGrid,
    interpolation_offset: c_double,
    interpolation_order: c_int,
    relative_dr_spacing: c_double,
}

/// Same layout as the header's 22 consecutive `double *` members
#[repr(C)]
struct RawFields {
    columns: [*mut c_double; FIELD_COUNT],
}

#[repr(C)]
struct RawBinaryInfo {
    mass1: c_double,
    mass2: c_double,
    position_x1: c_double,
    position_x2: c_double,
}

extern "C" {
    fn interpolate_FUKA_ID(req: *mut RawRequest) -> RawFields;
    fn free_fields(fields: *mut RawFields);
    fn read_binary_info(binary_type: c_int, info_filename: *mut c_char) -> RawBinaryInfo;
}

fn raw_binary_type(binary_type: BinaryType) -> c_int {
    match binary_type {
        BinaryType::Bns => 0,
        BinaryType::Bbh => 1,
        BinaryType::Bhns => 2,
    }
}

fn c_path(path: &Path) -> Result<CString, InterpolationError> {
    let text = path
        .to_str()
        .ok_or_else(|| InterpolationError::InvalidPath(path.display().to_string()))?;
    CString::new(text).map_err(|_| InterpolationError::InvalidPath(text.to_string()))
}

/// Interpolator backed by `libfuka_exporter`
#[derive(Debug, Default)]
pub struct NativeInterpolator;

impl NativeInterpolator {
    pub fn new() -> Self {
        Self
    }
}

impl Interpolator for NativeInterpolator {
    fn name(&self) -> &'static str {
        "native"
    }

    fn interpolate(&self, request: &InterpolationRequest) -> Result<Fields, InterpolationError> {
        let n_points = request.grid.len();
        let raw_points = c_int::try_from(n_points)
            .map_err(|_| InterpolationError::GridTooLarge { points: n_points })?;
        let filename = c_path(&request.info_filename)?;

        if INTERPOLATION_CLAIMED.swap(true, Ordering::SeqCst) {
            return Err(InterpolationError::AlreadyUsed);
        }

        // The library reads but never writes through these pointers.
        let mut grid = RawGrid {
            x: request.grid.x().as_ptr() as *mut c_double,
            y: request.grid.y().as_ptr() as *mut c_double,
            z: request.grid.z().as_ptr() as *mut c_double,
            n_points: raw_points,
        };
        let mut raw_request = RawRequest {
            binary_type: raw_binary_type(request.binary_type),
            info_filename: filename.as_ptr() as *mut c_char,
            grid: &mut grid,
            interpolation_offset: request.interpolation_offset,
            interpolation_order: request.interpolation_order,
            relative_dr_spacing: request.relative_dr_spacing,
        };

        debug!(points = n_points, kind = %request.binary_type, "calling interpolate_FUKA_ID");
        // SAFETY: every pointer in `raw_request` outlives the call; the
        // returned arrays are either null or hold `n_points` doubles.
        let mut raw_fields = unsafe { interpolate_FUKA_ID(&mut raw_request) };

        let copied = copy_columns(&raw_fields, n_points);
        if raw_fields.columns.iter().all(|ptr| !ptr.is_null()) {
            // SAFETY: arrays were allocated by the library for this call.
            unsafe { free_fields(&mut raw_fields) };
        }
        Ok(Fields::from_columns(copied?)?)
    }

    fn binary_info(
        &self,
        info_filename: &Path,
        binary_type: BinaryType,
    ) -> Result<BinaryInfo, InterpolationError> {
        let filename = c_path(info_filename)?;
        // SAFETY: `filename` is a valid NUL-terminated string for the call.
        let raw = unsafe {
            read_binary_info(raw_binary_type(binary_type), filename.as_ptr() as *mut c_char)
        };
        Ok(BinaryInfo {
            mass1: raw.mass1,
            mass2: raw.mass2,
            position_x1: raw.position_x1,
            position_x2: raw.position_x2,
        })
    }
}

fn copy_columns(
    raw: &RawFields,
    n_points: usize,
) -> Result<[Vec<f64>; FIELD_COUNT], InterpolationError> {
    let mut columns: [Vec<f64>; FIELD_COUNT] = Default::default();
    for ((name, column), ptr) in FieldName::ALL
        .into_iter()
        .zip(columns.iter_mut())
        .zip(raw.columns)
    {
        if ptr.is_null() {
            return Err(InterpolationError::MissingOutput {
                field: name.as_str(),
            });
        }
        // SAFETY: non-null columns hold `n_points` initialized doubles.
        *column = unsafe { std::slice::from_raw_parts(ptr, n_points) }.to_vec();
    }
    Ok(columns)
}
