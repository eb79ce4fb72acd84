// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pinned read-only export of one storage slice.

use std::ffi::CStr;
use std::fmt;
use std::mem;
use std::ptr::NonNull;
use std::slice;
use std::sync::Arc;

use super::flags::AccessFlags;
use crate::error::{Error, Result};
use crate::layout::{LayoutDescriptor, Record};
use crate::storage::buffer::StorageCore;
use crate::storage::{StorageBuffer, StorageId};

/// Buffer description handed to the host.
///
/// Borrowed from the [`Export`] (or [`BufferExporter`]) that produced it;
/// every pointer stays valid for as long as that export is alive.
#[derive(Debug, Clone, Copy)]
pub struct BufferInfo<'a> {
    /// Base address of the first element.
    pub buf: *const u8,
    /// Element count.
    pub len: usize,
    /// Element size in bytes; also the stride.
    pub itemsize: usize,
    pub ndim: usize,
    pub shape: &'a [isize; 1],
    pub strides: &'a [isize; 1],
    /// Element format, only when [`AccessFlags::FORMAT`] was requested.
    pub format: Option<&'a CStr>,
    /// Always `true`.
    pub readonly: bool,
}

/// Type-erased export surface used by host bridges.
pub trait BufferExporter: Send + Sync {
    fn storage_id(&self) -> StorageId;

    /// Element count.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn itemsize(&self) -> usize;

    fn descriptor(&self) -> &LayoutDescriptor;

    fn get_buffer(&self, flags: AccessFlags) -> Result<BufferInfo<'_>>;
}

/// Read-only zero-copy export of one [`StorageBuffer`].
///
/// Holds a strong reference to the storage memory and one pin on it: the
/// memory cannot be freed or mutated until the export is dropped, so the
/// captured base address and length stay valid for its whole life. The
/// export does not keep the storage *identity* alive; once every
/// `Arc<StorageBuffer<T>>` is gone, registries stop resolving it.
pub struct Export<T: Record> {
    core: Arc<StorageCore<T>>,
    base: NonNull<T>,
    len: usize,
    shape: [isize; 1],
    strides: [isize; 1],
    format: Arc<LayoutDescriptor>,
}

// SAFETY: `base` points into the pinned storage, which no thread can mutate
// or free while the export holds its pin and strong reference. T is
// Send + Sync through the Record bound.
unsafe impl<T: Record> Send for Export<T> {}
unsafe impl<T: Record> Sync for Export<T> {}

impl<T: Record> Export<T> {
    pub(crate) fn new(storage: &StorageBuffer<T>, format: Arc<LayoutDescriptor>) -> Self {
        let core = Arc::clone(storage.core());
        let (base, len) = core.pin();
        let itemsize = mem::size_of::<T>();
        log::debug!(
            "[export] storage {} exported ({} x {} bytes, format {:?})",
            core.id(),
            len,
            itemsize,
            format.format()
        );
        Self {
            core,
            base,
            len,
            shape: [len as isize],
            strides: [itemsize as isize],
            format,
        }
    }

    /// The exported elements.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: base/len were captured under the storage read lock and the
        // pin keeps every mutation out until this export is dropped.
        unsafe { slice::from_raw_parts(self.base.as_ptr(), self.len) }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn itemsize(&self) -> usize {
        mem::size_of::<T>()
    }

    #[must_use]
    pub fn format(&self) -> &str {
        self.format.format()
    }

    #[must_use]
    pub fn descriptor(&self) -> &Arc<LayoutDescriptor> {
        &self.format
    }

    #[must_use]
    pub fn is_readonly(&self) -> bool {
        true
    }

    #[must_use]
    pub fn storage_id(&self) -> StorageId {
        self.core.id()
    }

    /// Describe the exported memory for the host.
    ///
    /// Write access and reverse-order requests are rejected outright.
    pub fn get_buffer(&self, flags: AccessFlags) -> Result<BufferInfo<'_>> {
        if !flags.is_supported() {
            log::debug!(
                "[export] storage {} rejected access mode {}",
                self.core.id(),
                flags
            );
            return Err(Error::UnsupportedAccessMode(flags));
        }
        Ok(BufferInfo {
            buf: self.base.as_ptr().cast_const().cast::<u8>(),
            len: self.len,
            itemsize: self.itemsize(),
            ndim: 1,
            shape: &self.shape,
            strides: &self.strides,
            format: flags
                .contains(AccessFlags::FORMAT)
                .then(|| self.format.format_cstr()),
            readonly: true,
        })
    }
}

impl<T: Record> BufferExporter for Export<T> {
    fn storage_id(&self) -> StorageId {
        Export::storage_id(self)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn itemsize(&self) -> usize {
        Export::itemsize(self)
    }

    fn descriptor(&self) -> &LayoutDescriptor {
        &self.format
    }

    fn get_buffer(&self, flags: AccessFlags) -> Result<BufferInfo<'_>> {
        Export::get_buffer(self, flags)
    }
}

impl<T: Record> Drop for Export<T> {
    fn drop(&mut self) {
        self.core.unpin();
        log::trace!("[export] storage {} export released", self.core.id());
    }
}

impl<T: Record> fmt::Debug for Export<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Export")
            .field("storage", &self.core.id())
            .field("len", &self.len)
            .field("itemsize", &self.itemsize())
            .field("format", &self.format.format())
            .finish()
    }
}
