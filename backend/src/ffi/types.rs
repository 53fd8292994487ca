//! C-compatible mirrors of the request and result types
//!
//! Layouts match the host header: a grid of three coordinate arrays, a
//! request pointing at that grid, and a result holding one `double *` per
//! field in canonical order.

use std::ffi::CStr;
use std::os::raw::{c_char, c_double, c_int};
use std::slice;

use super::FfiError;
use crate::handoff::ForeignFieldsHandle;
use crate::models::{BinaryInfo, BinaryType, FieldName, Grid, InterpolationRequest, FIELD_COUNT};

/// Raw code for `BinaryType::Bns`
pub const FIELDSPLIT_BNS: c_int = 0;
/// Raw code for `BinaryType::Bbh`
pub const FIELDSPLIT_BBH: c_int = 1;
/// Raw code for `BinaryType::Bhns`
pub const FIELDSPLIT_BHNS: c_int = 2;

/// Grid as seen by the host: three arrays of `n_points` doubles
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FieldsplitGrid {
    pub x: *const c_double,
    pub y: *const c_double,
    pub z: *const c_double,
    pub n_points: c_int,
}

/// Interpolation request as seen by the host
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FieldsplitRequest {
    pub binary_type: c_int,
    /// NUL-terminated, UTF-8 path of the initial-data info file
    pub info_filename: *const c_char,
    pub grid: *const FieldsplitGrid,
    pub interpolation_offset: c_double,
    pub interpolation_order: c_int,
    pub relative_dr_spacing: c_double,
}

/// Interpolated fields handed back to the host
///
/// All pointers are null after a failed call. After a successful call
/// each holds `n_points` doubles and stays valid until
/// `fieldsplit_finalize`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldsplitFields {
    pub alpha: *const c_double,
    pub beta_x: *const c_double,
    pub beta_y: *const c_double,
    pub beta_z: *const c_double,
    pub gamma_xx: *const c_double,
    pub gamma_xy: *const c_double,
    pub gamma_xz: *const c_double,
    pub gamma_yy: *const c_double,
    pub gamma_yz: *const c_double,
    pub gamma_zz: *const c_double,
    pub k_xx: *const c_double,
    pub k_xy: *const c_double,
    pub k_xz: *const c_double,
    pub k_yy: *const c_double,
    pub k_yz: *const c_double,
    pub k_zz: *const c_double,
    pub rho: *const c_double,
    pub epsilon: *const c_double,
    pub pressure: *const c_double,
    pub v_x: *const c_double,
    pub v_y: *const c_double,
    pub v_z: *const c_double,
    pub n_points: usize,
}

/// Component masses and positions of a binary
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FieldsplitBinaryInfo {
    pub mass1: c_double,
    pub mass2: c_double,
    pub position_x1: c_double,
    pub position_x2: c_double,
}

impl From<BinaryInfo> for FieldsplitBinaryInfo {
    fn from(info: BinaryInfo) -> Self {
        Self {
            mass1: info.mass1,
            mass2: info.mass2,
            position_x1: info.position_x1,
            position_x2: info.position_x2,
        }
    }
}

impl Default for FieldsplitFields {
    fn default() -> Self {
        Self::empty()
    }
}

impl FieldsplitFields {
    /// All-null result, the state after any failure
    pub fn empty() -> Self {
        let null = std::ptr::null();
        Self {
            alpha: null,
            beta_x: null,
            beta_y: null,
            beta_z: null,
            gamma_xx: null,
            gamma_xy: null,
            gamma_xz: null,
            gamma_yy: null,
            gamma_yz: null,
            gamma_zz: null,
            k_xx: null,
            k_xy: null,
            k_xz: null,
            k_yy: null,
            k_yz: null,
            k_zz: null,
            rho: null,
            epsilon: null,
            pressure: null,
            v_x: null,
            v_y: null,
            v_z: null,
            n_points: 0,
        }
    }

    /// Point the result at the pinned columns of an export
    pub fn from_handle(handle: &ForeignFieldsHandle<'_>) -> Self {
        let mut fields = Self::empty();
        for (name, buffer) in handle.iter() {
            *fields.column_mut(name) = buffer.as_ptr();
        }
        fields.n_points = handle.n_points();
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.columns().iter().all(|ptr| ptr.is_null())
    }

    pub fn column(&self, name: FieldName) -> *const c_double {
        self.columns()[name.index()]
    }

    fn columns(&self) -> [*const c_double; FIELD_COUNT] {
        [
            self.alpha,
            self.beta_x,
            self.beta_y,
            self.beta_z,
            self.gamma_xx,
            self.gamma_xy,
            self.gamma_xz,
            self.gamma_yy,
            self.gamma_yz,
            self.gamma_zz,
            self.k_xx,
            self.k_xy,
            self.k_xz,
            self.k_yy,
            self.k_yz,
            self.k_zz,
            self.rho,
            self.epsilon,
            self.pressure,
            self.v_x,
            self.v_y,
            self.v_z,
        ]
    }

    fn column_mut(&mut self, name: FieldName) -> &mut *const c_double {
        match name {
            FieldName::Alpha => &mut self.alpha,
            FieldName::BetaX => &mut self.beta_x,
            FieldName::BetaY => &mut self.beta_y,
            FieldName::BetaZ => &mut self.beta_z,
            FieldName::GammaXX => &mut self.gamma_xx,
            FieldName::GammaXY => &mut self.gamma_xy,
            FieldName::GammaXZ => &mut self.gamma_xz,
            FieldName::GammaYY => &mut self.gamma_yy,
            FieldName::GammaYZ => &mut self.gamma_yz,
            FieldName::GammaZZ => &mut self.gamma_zz,
            FieldName::KXX => &mut self.k_xx,
            FieldName::KXY => &mut self.k_xy,
            FieldName::KXZ => &mut self.k_xz,
            FieldName::KYY => &mut self.k_yy,
            FieldName::KYZ => &mut self.k_yz,
            FieldName::KZZ => &mut self.k_zz,
            FieldName::Rho => &mut self.rho,
            FieldName::Epsilon => &mut self.epsilon,
            FieldName::Pressure => &mut self.pressure,
            FieldName::VX => &mut self.v_x,
            FieldName::VY => &mut self.v_y,
            FieldName::VZ => &mut self.v_z,
        }
    }
}

pub fn binary_type_from_raw(code: c_int) -> Result<BinaryType, FfiError> {
    match code {
        FIELDSPLIT_BNS => Ok(BinaryType::Bns),
        FIELDSPLIT_BBH => Ok(BinaryType::Bbh),
        FIELDSPLIT_BHNS => Ok(BinaryType::Bhns),
        other => Err(FfiError::UnknownBinaryType(other)),
    }
}

pub fn binary_type_to_raw(binary_type: BinaryType) -> c_int {
    match binary_type {
        BinaryType::Bns => FIELDSPLIT_BNS,
        BinaryType::Bbh => FIELDSPLIT_BBH,
        BinaryType::Bhns => FIELDSPLIT_BHNS,
    }
}

/// Copy a host request into an owned `InterpolationRequest`
///
/// # Safety
///
/// `request` must be null or point to a valid `FieldsplitRequest` whose
/// `grid` is null or points to a valid `FieldsplitGrid`, whose coordinate
/// pointers are null or hold `n_points` doubles, and whose
/// `info_filename` is null or NUL-terminated.
pub unsafe fn request_from_raw(
    request: *const FieldsplitRequest,
) -> Result<InterpolationRequest, FfiError> {
    let request = request.as_ref().ok_or(FfiError::NullPointer("request"))?;
    let binary_type = binary_type_from_raw(request.binary_type)?;
    let grid = grid_from_raw(request.grid)?;

    let info_filename = path_from_raw(request.info_filename)?;

    Ok(InterpolationRequest::new(binary_type, grid, info_filename)
        .with_interpolation_offset(request.interpolation_offset)
        .with_interpolation_order(request.interpolation_order)
        .with_relative_dr_spacing(request.relative_dr_spacing))
}

/// Borrow a NUL-terminated UTF-8 path
///
/// # Safety
///
/// `path` must be null or point to a NUL-terminated string that outlives
/// the returned borrow.
pub unsafe fn path_from_raw<'a>(path: *const c_char) -> Result<&'a str, FfiError> {
    if path.is_null() {
        return Err(FfiError::NullPointer("info_filename"));
    }
    CStr::from_ptr(path).to_str().map_err(|_| FfiError::NonUtf8Path)
}

unsafe fn grid_from_raw(grid: *const FieldsplitGrid) -> Result<Grid, FfiError> {
    let grid = grid.as_ref().ok_or(FfiError::NullPointer("grid"))?;
    let n_points = usize::try_from(grid.n_points)
        .ok()
        .filter(|&n| n > 0)
        .ok_or(FfiError::InvalidPointCount(grid.n_points))?;
    let x = coordinates(grid.x, n_points, "grid.x")?;
    let y = coordinates(grid.y, n_points, "grid.y")?;
    let z = coordinates(grid.z, n_points, "grid.z")?;
    Ok(Grid::new(x, y, z)?)
}

unsafe fn coordinates(
    ptr: *const c_double,
    n_points: usize,
    name: &'static str,
) -> Result<Vec<f64>, FfiError> {
    if ptr.is_null() {
        return Err(FfiError::NullPointer(name));
    }
    Ok(slice::from_raw_parts(ptr, n_points).to_vec())
}
