// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # pinbuf C FFI Bindings
//!
//! C-compatible bridge between pinbuf exports and a host runtime that speaks
//! a `Py_buffer`-style buffer protocol.
//!
//! A Rust embedder turns an [`Export`] into an opaque [`PinbufExport`] with
//! [`export_into_raw`]; from then on the host owns it through
//! `pinbuf_export_retain` / `pinbuf_export_release`. Every successful
//! `pinbuf_get_buffer` takes one more reference, dropped again by
//! `pinbuf_release_buffer`. The storage pin is released exactly once, when
//! the last reference goes.
//!
//! # Safety
//!
//! All public functions are `unsafe` and require the caller to uphold the
//! invariants documented in each function's safety comment.

mod logging;

pub use logging::*;

use std::ffi::CStr;
use std::os::raw::{c_char, c_int, c_void};
use std::ptr;

use libc::ssize_t;
use pinbuf::{AccessFlags, Error, Export, HostHandle, LayoutDescriptor, Record, StorageId};

/// Opaque handle to an export owned by the host
#[repr(C)]
pub struct PinbufExport {
    _private: [u8; 0],
}

/// Error codes returned by pinbuf C functions
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinbufError {
    /// Operation completed successfully
    PinbufOk = 0,
    /// Invalid argument provided (null pointer, invalid value)
    PinbufInvalidArgument = 1,
    /// Generic operation failure
    PinbufOperationFailed = 3,

    // === Configuration errors (10-19) ===
    /// Malformed log filter directive
    PinbufInvalidFilter = 10,

    // === Layout errors (30-39) ===
    /// Record field has no primitive layout code
    PinbufUnsupportedType = 30,
    /// Malformed layout descriptor text
    PinbufInvalidDescriptor = 31,

    // === Storage errors (40-49) ===
    /// Index outside the valid range
    PinbufIndexOutOfRange = 40,
    /// Storage is pinned by live exports
    PinbufStoragePinned = 41,
    /// Storage identity no longer resolves
    PinbufStorageExpired = 42,

    // === Export errors (50-59) ===
    /// Write or reverse-order access requested
    PinbufUnsupportedAccessMode = 50,
}

impl From<&Error> for PinbufError {
    fn from(err: &Error) -> Self {
        match err {
            Error::UnsupportedType { .. } => PinbufError::PinbufUnsupportedType,
            Error::InvalidDescriptor(_) => PinbufError::PinbufInvalidDescriptor,
            Error::IndexOutOfRange { .. } => PinbufError::PinbufIndexOutOfRange,
            Error::StoragePinned { .. } => PinbufError::PinbufStoragePinned,
            Error::StorageExpired(_) => PinbufError::PinbufStorageExpired,
            Error::UnsupportedAccessMode(_) => PinbufError::PinbufUnsupportedAccessMode,
        }
    }
}

impl From<Error> for PinbufError {
    fn from(err: Error) -> Self {
        PinbufError::from(&err)
    }
}

// =======================================================================
// Request flags (PyBUF_* compatible)
// =======================================================================

pub const PINBUF_BUF_SIMPLE: c_int = 0x0000;
pub const PINBUF_BUF_WRITABLE: c_int = 0x0001;
pub const PINBUF_BUF_FORMAT: c_int = 0x0004;
pub const PINBUF_BUF_ND: c_int = 0x0008;
pub const PINBUF_BUF_STRIDES: c_int = 0x0018;
pub const PINBUF_BUF_C_CONTIGUOUS: c_int = 0x0038;
pub const PINBUF_BUF_F_CONTIGUOUS: c_int = 0x0058;
pub const PINBUF_BUF_ANY_CONTIGUOUS: c_int = 0x0098;

/// Buffer view filled by `pinbuf_get_buffer`; field layout mirrors `Py_buffer`.
///
/// `len` is the element count.
#[repr(C)]
#[derive(Debug)]
pub struct PinbufBuffer {
    pub buf: *const c_void,
    /// Export reference held by this view; NULL when the request failed
    pub obj: *mut PinbufExport,
    pub len: ssize_t,
    pub itemsize: ssize_t,
    /// Always 1
    pub readonly: c_int,
    pub ndim: c_int,
    /// Element format, or NULL when `PINBUF_BUF_FORMAT` was not requested
    pub format: *const c_char,
    pub shape: *const ssize_t,
    pub strides: *const ssize_t,
    pub suboffsets: *const ssize_t,
    pub internal: *mut c_void,
}

impl Default for PinbufBuffer {
    fn default() -> Self {
        Self {
            buf: ptr::null(),
            obj: ptr::null_mut(),
            len: 0,
            itemsize: 0,
            readonly: 1,
            ndim: 0,
            format: ptr::null(),
            shape: ptr::null(),
            strides: ptr::null(),
            suboffsets: ptr::null(),
            internal: ptr::null_mut(),
        }
    }
}

// =======================================================================
// Rust-side entry points
// =======================================================================

/// Hand `export` to the host with one external reference.
///
/// The returned pointer is released with `pinbuf_export_release`.
pub fn export_into_raw<T: Record>(export: Export<T>) -> *mut PinbufExport {
    HostHandle::new(export).into_raw().cast::<PinbufExport>()
}

/// Like [`export_into_raw`], running `hook` once after the final release.
pub fn export_into_raw_with_hook<T, F>(export: Export<T>, hook: F) -> *mut PinbufExport
where
    T: Record,
    F: FnOnce(StorageId) + Send + 'static,
{
    HostHandle::with_release_hook(export, hook)
        .into_raw()
        .cast::<PinbufExport>()
}

unsafe fn handle_ref<'a>(export: *const PinbufExport) -> Option<&'a HostHandle> {
    export.cast::<HostHandle>().as_ref()
}

// =======================================================================
// Reference counting
// =======================================================================

/// Take one more reference to an export.
///
/// # Safety
/// - `export` must be a live handle from `export_into_raw` (or NULL).
#[no_mangle]
pub unsafe extern "C" fn pinbuf_export_retain(export: *mut PinbufExport) -> PinbufError {
    if export.is_null() {
        return PinbufError::PinbufInvalidArgument;
    }
    HostHandle::retain(export.cast::<HostHandle>());
    PinbufError::PinbufOk
}

/// Drop one reference; the last one releases the storage pin.
///
/// # Safety
/// - `export` must be a live handle from `export_into_raw` (or NULL).
/// - The caller's reference must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn pinbuf_export_release(export: *mut PinbufExport) -> PinbufError {
    if export.is_null() {
        return PinbufError::PinbufInvalidArgument;
    }
    HostHandle::release(export.cast::<HostHandle>());
    PinbufError::PinbufOk
}

// =======================================================================
// Queries
// =======================================================================

/// Element count of the export, 0 for NULL.
///
/// # Safety
/// - `export` must be a live handle from `export_into_raw` (or NULL).
#[no_mangle]
pub unsafe extern "C" fn pinbuf_export_len(export: *const PinbufExport) -> usize {
    handle_ref(export).map_or(0, |h| h.exporter().len())
}

/// Element size in bytes, 0 for NULL.
///
/// # Safety
/// - `export` must be a live handle from `export_into_raw` (or NULL).
#[no_mangle]
pub unsafe extern "C" fn pinbuf_export_itemsize(export: *const PinbufExport) -> usize {
    handle_ref(export).map_or(0, |h| h.exporter().itemsize())
}

/// Identity of the exported storage, 0 for NULL.
///
/// # Safety
/// - `export` must be a live handle from `export_into_raw` (or NULL).
#[no_mangle]
pub unsafe extern "C" fn pinbuf_export_storage_id(export: *const PinbufExport) -> u64 {
    handle_ref(export).map_or(0, |h| h.exporter().storage_id().get())
}

/// Element format string, valid while the export is alive. NULL for NULL.
///
/// # Safety
/// - `export` must be a live handle from `export_into_raw` (or NULL).
#[no_mangle]
pub unsafe extern "C" fn pinbuf_export_format(export: *const PinbufExport) -> *const c_char {
    handle_ref(export).map_or(ptr::null(), |h| {
        h.exporter().descriptor().format_cstr().as_ptr()
    })
}

// =======================================================================
// Buffer protocol
// =======================================================================

/// Fill `view` for a host buffer request.
///
/// On success `view->obj` holds a new reference to `export` that must be
/// dropped with `pinbuf_release_buffer`. On failure `view->obj` is NULL and
/// nothing needs releasing. Write and Fortran-order requests always fail
/// with `PINBUF_UNSUPPORTED_ACCESS_MODE`.
///
/// # Safety
/// - `export` must be a live handle from `export_into_raw` (or NULL).
/// - `view` must point to writable memory for one `PinbufBuffer` (or NULL).
#[no_mangle]
pub unsafe extern "C" fn pinbuf_get_buffer(
    export: *mut PinbufExport,
    view: *mut PinbufBuffer,
    flags: c_int,
) -> PinbufError {
    let Some(view) = view.as_mut() else {
        return PinbufError::PinbufInvalidArgument;
    };
    *view = PinbufBuffer::default();
    let Some(handle) = handle_ref(export) else {
        return PinbufError::PinbufInvalidArgument;
    };

    let flags = AccessFlags::from_bits(flags as u32);
    let info = match handle.exporter().get_buffer(flags) {
        Ok(info) => info,
        Err(err) => {
            log::debug!("[pinbuf-c] get_buffer refused: {}", err);
            return PinbufError::from(&err);
        }
    };

    HostHandle::retain(export.cast::<HostHandle>());
    view.buf = info.buf.cast::<c_void>();
    view.obj = export;
    view.len = info.len as ssize_t;
    view.itemsize = info.itemsize as ssize_t;
    view.readonly = c_int::from(info.readonly);
    view.ndim = info.ndim as c_int;
    view.format = info.format.map_or(ptr::null(), CStr::as_ptr);
    view.shape = info.shape.as_ptr().cast::<ssize_t>();
    view.strides = info.strides.as_ptr().cast::<ssize_t>();
    PinbufError::PinbufOk
}

/// Drop the reference a successful `pinbuf_get_buffer` put in `view->obj`.
///
/// Safe to call twice or on a failed request: `view->obj` is reset to NULL.
///
/// # Safety
/// - `view` must point to a `PinbufBuffer` filled by `pinbuf_get_buffer` (or NULL).
#[no_mangle]
pub unsafe extern "C" fn pinbuf_release_buffer(view: *mut PinbufBuffer) {
    let Some(view) = view.as_mut() else {
        return;
    };
    let obj = std::mem::replace(&mut view.obj, ptr::null_mut());
    if !obj.is_null() {
        HostHandle::release(obj.cast::<HostHandle>());
    }
}

// =======================================================================
// Layout helpers
// =======================================================================

/// Check that `format` is a canonical layout descriptor.
///
/// # Safety
/// - `format` must be a valid null-terminated C string or NULL.
#[no_mangle]
pub unsafe extern "C" fn pinbuf_format_validate(format: *const c_char) -> PinbufError {
    if format.is_null() {
        return PinbufError::PinbufInvalidArgument;
    }
    let Ok(text) = CStr::from_ptr(format).to_str() else {
        return PinbufError::PinbufInvalidDescriptor;
    };
    match LayoutDescriptor::parse(text) {
        Ok(_) => PinbufError::PinbufOk,
        Err(err) => PinbufError::from(&err),
    }
}

/// Byte size of one element described by `format`, or -1 if malformed or
/// too large for `ssize_t`.
///
/// This is the sum of the run sizes; it does not include padding.
///
/// # Safety
/// - `format` must be a valid null-terminated C string or NULL.
#[no_mangle]
pub unsafe extern "C" fn pinbuf_format_packed_size(format: *const c_char) -> ssize_t {
    if format.is_null() {
        return -1;
    }
    let Ok(text) = CStr::from_ptr(format).to_str() else {
        return -1;
    };
    LayoutDescriptor::parse(text)
        .ok()
        .and_then(|d| d.packed_size())
        .and_then(|size| ssize_t::try_from(size).ok())
        .unwrap_or(-1)
}
