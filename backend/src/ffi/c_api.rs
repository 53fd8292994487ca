//! C entry points
//!
//! ```c
//! int         fieldsplit_interpolate(const FieldsplitRequest *req, int n_workers,
//!                                    FieldsplitFields *out);
//! void        fieldsplit_finalize(void);
//! const char *fieldsplit_last_error(void);
//! void        fieldsplit_clear_last_error(void);
//! int         fieldsplit_read_binary_info(int binary_type, const char *info_filename,
//!                                         FieldsplitBinaryInfo *out);
//! ```
//!
//! Worker program and timeout come from the environment (see
//! [`crate::config`]). Every call returns `FIELDSPLIT_OK` or a non-zero
//! status; the message of the calling thread's most recent failure is kept
//! until its next successful call or an explicit clear.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::ptr;
use std::sync::PoisonError;
use tracing::{error, info};

use super::types::{
    binary_type_from_raw, path_from_raw, request_from_raw, FieldsplitBinaryInfo,
    FieldsplitFields, FieldsplitRequest,
};
use super::{release_shared, shared_handoff, FfiError, FIELDSPLIT_OK};
use crate::config::Settings;
use crate::interpolation::Interpolator;
use crate::logging::init_tracing;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::worker::ProcessWorker;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn store_error(err: &FfiError) -> c_int {
    let message = CString::new(err.to_string().replace('\0', " ")).ok();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
    err.status_code()
}

fn clear_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// Message of the calling thread's most recent failure, or null
///
/// The pointer stays valid until the thread's next call into this library.
#[no_mangle]
pub extern "C" fn fieldsplit_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| {
        slot.borrow()
            .as_ref()
            .map_or(ptr::null(), |message| message.as_ptr())
    })
}

#[no_mangle]
pub extern "C" fn fieldsplit_clear_last_error() {
    clear_error();
}

/// Interpolate `req` across `n_workers` worker processes
///
/// On success `*out` points at pinned arrays that stay valid until
/// [`fieldsplit_finalize`]. On failure `*out` is all-null and a non-zero
/// status is returned.
///
/// # Safety
///
/// `req` must be null or point to a valid request (see
/// [`request_from_raw`]); `out` must be null or point to writable storage
/// for one `FieldsplitFields`.
#[no_mangle]
pub unsafe extern "C" fn fieldsplit_interpolate(
    req: *const FieldsplitRequest,
    n_workers: c_int,
    out: *mut FieldsplitFields,
) -> c_int {
    init_tracing();
    if out.is_null() {
        return store_error(&FfiError::NullPointer("out"));
    }
    out.write(FieldsplitFields::empty());

    let result = panic::catch_unwind(AssertUnwindSafe(|| interpolate_into(req, n_workers)))
        .unwrap_or(Err(FfiError::Panicked));
    match result {
        Ok(fields) => {
            out.write(fields);
            clear_error();
            FIELDSPLIT_OK
        }
        Err(err) => {
            error!(error = %err, "interpolation request failed");
            store_error(&err)
        }
    }
}

unsafe fn interpolate_into(
    req: *const FieldsplitRequest,
    n_workers: c_int,
) -> Result<FieldsplitFields, FfiError> {
    let request = request_from_raw(req)?;
    let worker_count = usize::try_from(n_workers)
        .ok()
        .filter(|&n| n > 0)
        .ok_or(FfiError::InvalidWorkerCount(n_workers))?;

    let settings = Settings::from_env()?;
    let mut config = OrchestratorConfig::new(worker_count);
    if let Some(timeout) = settings.timeout {
        config = config.with_timeout(timeout);
    }
    let orchestrator = Orchestrator::new(ProcessWorker::new(settings.worker_command()), config);
    let fields = orchestrator.orchestrate(&request)?;

    let handoff = shared_handoff()
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    let handle = handoff.export(fields)?;
    Ok(FieldsplitFields::from_handle(&handle))
}

/// Free every array handed out by [`fieldsplit_interpolate`]
///
/// Safe to call more than once, and before any interpolation.
#[no_mangle]
pub extern "C" fn fieldsplit_finalize() {
    let released = panic::catch_unwind(release_shared).unwrap_or(0);
    info!(released, "fieldsplit finalized");
}

/// Read component masses and positions from an info file
///
/// Needs the `native` backend; other builds report `FIELDSPLIT_ERR_BACKEND`.
/// On failure `*out` is zeroed.
///
/// # Safety
///
/// `info_filename` must be null or NUL-terminated; `out` must be null or
/// point to writable storage for one `FieldsplitBinaryInfo`.
#[no_mangle]
pub unsafe extern "C" fn fieldsplit_read_binary_info(
    binary_type: c_int,
    info_filename: *const c_char,
    out: *mut FieldsplitBinaryInfo,
) -> c_int {
    init_tracing();
    if out.is_null() {
        return store_error(&FfiError::NullPointer("out"));
    }
    out.write(FieldsplitBinaryInfo::default());

    let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<_, FfiError> {
        let binary_type = binary_type_from_raw(binary_type)?;
        let path = path_from_raw(info_filename)?;
        Ok(info_backend().binary_info(Path::new(path), binary_type)?)
    }))
    .unwrap_or(Err(FfiError::Panicked));
    match result {
        Ok(info) => {
            out.write(info.into());
            clear_error();
            FIELDSPLIT_OK
        }
        Err(err) => {
            error!(error = %err, "binary info request failed");
            store_error(&err)
        }
    }
}

#[cfg(feature = "native")]
fn info_backend() -> impl Interpolator {
    crate::interpolation::NativeInterpolator::new()
}

#[cfg(not(feature = "native"))]
fn info_backend() -> impl Interpolator {
    crate::interpolation::SyntheticInterpolator::new()
}
