//! Foreign memory handoff
//!
//! Exposes merged fields to a caller that reads them through raw
//! pointers. Every exported column is moved into its own heap buffer and
//! kept there, unmoved, until the caller signals `release`.
//!
//! # Critical Invariants
//!
//! 1. **Stable addresses**: an exported pointer stays valid and its
//!    contents unchanged until the next `release`
//! 2. **No aliasing**: every exported column owns a distinct allocation
//! 3. **Process-scoped lifetime**: exports accumulate across requests;
//!    only `release` frees them, and releasing twice is a no-op
//!
//! Rust callers get this for free from the borrow checker: a
//! `ForeignFieldsHandle` borrows the `ForeignHandoff` it came from, and
//! `release` needs `&mut self`.

use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::{FieldName, Fields, FIELD_COUNT};

/// Errors raised by the handoff
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandoffError {
    #[error("nothing to export: field set has no points")]
    EmptyExport,
}

// ============================================================================
// Pin Registry
// ============================================================================

/// Owner of every buffer handed out to the foreign caller
///
/// Starts empty; the first pin initializes it and `release` tears it
/// down again. Boxed slices never move when the registry's own list
/// grows, so addresses handed out stay put.
#[derive(Debug, Default)]
pub struct PinRegistry {
    buffers: Mutex<Option<Vec<Box<[f64]>>>>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `values` and return its stable address
    pub fn pin(&self, values: Vec<f64>) -> ExportedBuffer {
        let buffer = values.into_boxed_slice();
        let exported = ExportedBuffer {
            ptr: buffer.as_ptr(),
            len: buffer.len(),
        };
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(Vec::new)
            .push(buffer);
        exported
    }

    /// Number of buffers currently pinned
    pub fn pinned(&self) -> usize {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, Vec::len)
    }

    /// Whether anything has been pinned since the last release
    pub fn is_initialized(&self) -> bool {
        self.buffers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Free every pinned buffer; returns how many were freed
    pub fn release(&mut self) -> usize {
        self.buffers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map_or(0, |buffers| buffers.len())
    }
}

// ============================================================================
// Exported Views
// ============================================================================

/// Address and length of one pinned column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportedBuffer {
    ptr: *const f64,
    len: usize,
}

impl ExportedBuffer {
    pub fn as_ptr(&self) -> *const f64 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The 22 pinned columns of one export
///
/// Borrows the handoff that pinned them; the addresses are valid for
/// as long as this handle (or any copy of its raw pointers taken before
/// `release`) is in use.
#[derive(Debug)]
pub struct ForeignFieldsHandle<'a> {
    buffers: [ExportedBuffer; FIELD_COUNT],
    n_points: usize,
    _pins: PhantomData<&'a PinRegistry>,
}

impl<'a> ForeignFieldsHandle<'a> {
    pub fn n_points(&self) -> usize {
        self.n_points
    }

    pub fn buffer(&self, name: FieldName) -> ExportedBuffer {
        self.buffers[name.index()]
    }

    /// `(name, buffer)` pairs in canonical order
    pub fn iter(&self) -> impl Iterator<Item = (FieldName, ExportedBuffer)> + '_ {
        FieldName::ALL.into_iter().zip(self.buffers.iter().copied())
    }

    /// Read back one column
    pub fn values(&self, name: FieldName) -> &'a [f64] {
        let buffer = self.buffer(name);
        // SAFETY: the buffer is owned by a registry borrowed for 'a and
        // cannot be released while that borrow is live.
        unsafe { std::slice::from_raw_parts(buffer.ptr, buffer.len) }
    }
}

// ============================================================================
// Handoff
// ============================================================================

/// Converts merged fields into pinned, foreign-readable buffers
///
/// # Example
/// ```
/// use fieldsplit_core_rs::handoff::{ForeignHandoff, PinRegistry};
/// use fieldsplit_core_rs::{FieldName, Fields};
///
/// let mut handoff = ForeignHandoff::new(PinRegistry::new());
/// {
///     let handle = handoff.export(Fields::from_fn(4, |_, i| i as f64).unwrap()).unwrap();
///     assert_eq!(handle.values(FieldName::Rho), &[0.0, 1.0, 2.0, 3.0]);
/// }
/// assert_eq!(handoff.release(), 22);
/// assert_eq!(handoff.release(), 0);
/// ```
#[derive(Debug, Default)]
pub struct ForeignHandoff {
    registry: PinRegistry,
}

impl ForeignHandoff {
    pub fn new(registry: PinRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PinRegistry {
        &self.registry
    }

    /// Pin every column of `fields` and return their addresses
    ///
    /// # Errors
    ///
    /// Returns `EmptyExport` for a field set without points, which has no
    /// meaningful address to hand out.
    pub fn export(&self, fields: Fields) -> Result<ForeignFieldsHandle<'_>, HandoffError> {
        let n_points = fields.n_points();
        if n_points == 0 {
            return Err(HandoffError::EmptyExport);
        }
        let buffers = fields.into_columns().map(|column| self.registry.pin(column));
        debug!(points = n_points, pinned = self.registry.pinned(), "fields exported");
        Ok(ForeignFieldsHandle {
            buffers,
            n_points,
            _pins: PhantomData,
        })
    }

    /// Free everything exported so far; safe to call repeatedly
    pub fn release(&mut self) -> usize {
        let released = self.registry.release();
        info!(released, "pinned buffers released");
        released
    }
}
