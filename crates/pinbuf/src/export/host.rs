// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! External reference-count wrapper around one export.
//!
//! A host runtime keeps its own reference count on the objects it is
//! handed. [`HostHandle`] carries that count: `retain` only bumps it, and
//! the final `release` drops the wrapped export (releasing its pin) and
//! then runs the optional release hook exactly once.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{self, AtomicUsize, Ordering};

use super::slice::BufferExporter;
use crate::storage::StorageId;

type ReleaseHook = Box<dyn FnOnce(StorageId) + Send>;

/// Export owned through an external reference count.
pub struct HostHandle {
    refs: AtomicUsize,
    exporter: Box<dyn BufferExporter>,
    on_release: Mutex<Option<ReleaseHook>>,
}

impl HostHandle {
    /// Wrap `exporter` with an external count of one.
    pub fn new<E>(exporter: E) -> Box<Self>
    where
        E: BufferExporter + 'static,
    {
        Box::new(Self {
            refs: AtomicUsize::new(1),
            exporter: Box::new(exporter),
            on_release: Mutex::new(None),
        })
    }

    /// Wrap `exporter`; `hook` runs with the storage identity after the
    /// final release has dropped the export.
    pub fn with_release_hook<E, F>(exporter: E, hook: F) -> Box<Self>
    where
        E: BufferExporter + 'static,
        F: FnOnce(StorageId) + Send + 'static,
    {
        let handle = Self::new(exporter);
        *handle.on_release.lock() = Some(Box::new(hook));
        handle
    }

    /// Hand ownership of the initial reference to the host.
    #[must_use]
    pub fn into_raw(self: Box<Self>) -> *mut HostHandle {
        Box::into_raw(self)
    }

    /// Take one more external reference. Does not pin again.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`into_raw`](Self::into_raw) and still hold
    /// at least one reference.
    pub unsafe fn retain(handle: *const HostHandle) {
        let previous = (*handle).refs.fetch_add(1, Ordering::Relaxed);
        log::trace!("[host] retain ({} -> {})", previous, previous + 1);
    }

    /// Drop one external reference; returns `true` when it was the last and
    /// the handle has been freed.
    ///
    /// # Safety
    ///
    /// `handle` must come from [`into_raw`](Self::into_raw), hold at least
    /// one reference, and not be used again after this returns `true`.
    pub unsafe fn release(handle: *mut HostHandle) -> bool {
        let previous = (*handle).refs.fetch_sub(1, Ordering::Release);
        debug_assert!(previous > 0, "release without matching reference");
        if previous != 1 {
            log::trace!("[host] release ({} -> {})", previous, previous - 1);
            return false;
        }
        atomic::fence(Ordering::Acquire);

        let HostHandle {
            exporter,
            on_release,
            ..
        } = *Box::from_raw(handle);
        let id = exporter.storage_id();
        drop(exporter);
        log::debug!("[host] storage {} handle freed", id);
        if let Some(hook) = on_release.into_inner() {
            hook(id);
        }
        true
    }

    /// Current external reference count.
    #[must_use]
    pub fn external_refs(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn exporter(&self) -> &dyn BufferExporter {
        self.exporter.as_ref()
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostHandle")
            .field("storage", &self.exporter.storage_id())
            .field("refs", &self.refs.load(Ordering::Relaxed))
            .finish()
    }
}
