// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Contiguous, growable storage buffer with a process-unique identity.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::fmt;
use std::ops::{Bound, Deref, Range, RangeBounds};
use std::ptr::NonNull;
use std::slice;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::id::{IdSource, StorageId};
use crate::error::{Error, Result};

/// Single contiguous array of `T` plus an immutable identity.
///
/// Buffers are only ever handed out as `Arc<StorageBuffer<T>>` by the
/// factories below or by a [`StorageRegistry`](crate::StorageRegistry);
/// there is no `Clone`, so an identity always names exactly one buffer.
///
/// # Identity and memory
///
/// The buffer value is the identity handle: it is what registries track and
/// it is destroyed with the last `Arc<StorageBuffer<T>>`. The element memory
/// lives in a shared core that [`Export`](crate::Export)s also hold, so an
/// export keeps the memory readable after the identity has expired.
///
/// # Pinning
///
/// While an export of the buffer is alive its memory is handed out to a
/// foreign reader, so the buffer is frozen: every mutation fails with
/// [`Error::StoragePinned`]. Pins are taken under the read lock and checked
/// under the write lock, so a pin never observes a mutation in progress and
/// a mutation never starts while a pin exists.
pub struct StorageBuffer<T> {
    core: Arc<StorageCore<T>>,
}

/// Element memory and pin count shared by a buffer and its exports.
pub(crate) struct StorageCore<T> {
    id: StorageId,
    data: RwLock<Vec<T>>,
    pins: AtomicUsize,
}

impl<T: Copy> StorageBuffer<T> {
    fn from_vec(data: Vec<T>) -> Self {
        let id = IdSource::global().next_id();
        log::trace!("[storage] {} created with {} element(s)", id, data.len());
        Self {
            core: Arc::new(StorageCore {
                id,
                data: RwLock::new(data),
                pins: AtomicUsize::new(0),
            }),
        }
    }

    /// New empty buffer.
    #[must_use]
    pub fn create() -> Arc<Self> {
        Arc::new(Self::from_vec(Vec::new()))
    }

    /// New empty buffer with room for `capacity` elements.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Arc<Self> {
        Arc::new(Self::from_vec(Vec::with_capacity(capacity)))
    }

    /// New buffer holding a copy of `items`.
    pub fn create_from<I>(items: I) -> Arc<Self>
    where
        I: IntoIterator<Item = T>,
    {
        Arc::new(Self::from_vec(items.into_iter().collect()))
    }

    #[must_use]
    pub fn id(&self) -> StorageId {
        self.core.id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.core.data.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.data.read().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.core.data.read().capacity()
    }

    /// Number of live exports pinning this buffer.
    #[must_use]
    pub fn pin_count(&self) -> usize {
        self.core.pins.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<T> {
        self.core.data.read().get(index).copied()
    }

    /// Overwrite one element in place.
    ///
    /// Refused with `StoragePinned` while exported, like structural changes,
    /// since exports hand out shared `&[T]` over the same memory.
    pub fn set(&self, index: usize, value: T) -> Result<()> {
        let mut data = self.write()?;
        let len = data.len();
        let slot = data
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    pub fn append(&self, value: T) -> Result<()> {
        self.write()?.push(value);
        Ok(())
    }

    /// Append every item, returning how many were added.
    pub fn append_from<I>(&self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
    {
        let mut data = self.write()?;
        let before = data.len();
        data.extend(items);
        Ok(data.len() - before)
    }

    /// Insert before `index`; `index == len` appends.
    pub fn insert(&self, index: usize, value: T) -> Result<()> {
        let mut data = self.write()?;
        if index > data.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: data.len(),
            });
        }
        data.insert(index, value);
        Ok(())
    }

    /// Insert every item before `index`, preserving their order.
    pub fn insert_from<I>(&self, index: usize, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = T>,
    {
        let mut data = self.write()?;
        let before = data.len();
        if index > before {
            return Err(Error::IndexOutOfRange { index, len: before });
        }
        let tail = data.split_off(index);
        data.extend(items);
        data.extend(tail);
        Ok(data.len() - before)
    }

    pub fn remove(&self, index: usize) -> Result<T> {
        let mut data = self.write()?;
        if index >= data.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: data.len(),
            });
        }
        Ok(data.remove(index))
    }

    /// Remove a range of elements, returning how many were removed.
    pub fn remove_range<R>(&self, range: R) -> Result<usize>
    where
        R: RangeBounds<usize>,
    {
        let mut data = self.write()?;
        let range = resolve_range(&range, data.len())?;
        let removed = range.len();
        data.drain(range);
        Ok(removed)
    }

    pub fn reserve(&self, additional: usize) -> Result<()> {
        self.write()?.reserve(additional);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.write()?.clear();
        Ok(())
    }

    /// Copy a sub-range into an independent buffer with a fresh identity.
    ///
    /// The copy is not registered anywhere; pinning does not prevent copying.
    pub fn copy_range<R>(&self, range: R) -> Result<Arc<Self>>
    where
        R: RangeBounds<usize>,
    {
        let data = self.core.data.read();
        let range = resolve_range(&range, data.len())?;
        Ok(Arc::new(Self::from_vec(data[range].to_vec())))
    }

    /// Read access for iteration and slicing.
    pub fn read(&self) -> StorageReadGuard<'_, T> {
        StorageReadGuard {
            guard: self.core.data.read(),
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        self.core.data.read().clone()
    }

    /// Shared core, for exports.
    pub(crate) fn core(&self) -> &Arc<StorageCore<T>> {
        &self.core
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>> {
        let guard = self.core.data.write();
        let pins = self.core.pins.load(Ordering::Acquire);
        if pins > 0 {
            log::debug!(
                "[storage] {} mutation refused: {} live export(s)",
                self.core.id,
                pins
            );
            return Err(Error::StoragePinned {
                id: self.core.id,
                pins,
            });
        }
        Ok(guard)
    }
}

impl<T> StorageCore<T> {
    #[must_use]
    pub(crate) fn id(&self) -> StorageId {
        self.id
    }

    /// Take one pin and capture the current base address and length.
    ///
    /// The pair stays valid until the matching [`unpin`](Self::unpin).
    pub(crate) fn pin(&self) -> (NonNull<T>, usize) {
        let data = self.data.read();
        let pins = self.pins.fetch_add(1, Ordering::AcqRel) + 1;
        log::trace!("[storage] {} pinned ({} pin(s))", self.id, pins);
        let base = NonNull::new(data.as_ptr().cast_mut()).unwrap_or(NonNull::dangling());
        (base, data.len())
    }

    pub(crate) fn unpin(&self) {
        let previous = self.pins.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(previous > 0, "unpin without matching pin");
        log::trace!("[storage] {} unpinned ({} pin(s))", self.id, previous - 1);
    }
}

impl<T> Drop for StorageBuffer<T> {
    fn drop(&mut self) {
        log::trace!("[storage] {} identity dropped", self.core.id);
    }
}

impl<T> Drop for StorageCore<T> {
    fn drop(&mut self) {
        log::trace!("[storage] {} memory released", self.id);
    }
}

impl<T> fmt::Debug for StorageBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBuffer")
            .field("id", &self.core.id)
            .field("len", &self.core.data.read().len())
            .field("pins", &self.core.pins.load(Ordering::Relaxed))
            .finish()
    }
}

/// Shared read access to a buffer's elements.
///
/// Derefs to `[T]`, so the full slice API (random access, `iter`, `chunks`,
/// ...) is available. Mutations block while a guard is held.
pub struct StorageReadGuard<'a, T> {
    guard: RwLockReadGuard<'a, Vec<T>>,
}

impl<T> StorageReadGuard<'_, T> {
    /// Iterator starting at `offset`, clamped to the length.
    pub fn iter_from(&self, offset: usize) -> slice::Iter<'_, T> {
        let start = offset.min(self.guard.len());
        self.guard[start..].iter()
    }
}

impl<T> Deref for StorageReadGuard<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.guard.as_slice()
    }
}

fn resolve_range<R: RangeBounds<usize>>(range: &R, len: usize) -> Result<Range<usize>> {
    let start = match range.start_bound() {
        Bound::Included(&start) => start,
        Bound::Excluded(&start) => start.saturating_add(1),
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&end) => end.saturating_add(1),
        Bound::Excluded(&end) => end,
        Bound::Unbounded => len,
    };
    if end > len {
        return Err(Error::IndexOutOfRange { index: end, len });
    }
    if start > end {
        return Err(Error::IndexOutOfRange { index: start, len });
    }
    Ok(start..end)
}
