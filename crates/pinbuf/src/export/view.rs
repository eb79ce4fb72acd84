// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Ordered set of storage slices exported one at a time.

use std::fmt;
use std::sync::Arc;

use super::slice::Export;
use crate::error::{Error, Result};
use crate::layout::{register_record, LayoutDescriptor, Record};
use crate::registry::StorageRegistry;
use crate::storage::{StorageBuffer, StorageId};

/// Slices captured at construction plus the element type's cached format.
///
/// The view holds strong references, so its slices outlive any registry
/// entry that named them. Each [`export`](Self::export) pins one slice.
pub struct StorageView<T: Record> {
    slices: Vec<Arc<StorageBuffer<T>>>,
    format: Arc<LayoutDescriptor>,
}

impl<T: Record> StorageView<T> {
    /// Build a view over `slices`, registering `T`'s layout.
    ///
    /// Fails with [`Error::UnsupportedType`] when `T` has a field with no
    /// primitive code.
    pub fn new(slices: Vec<Arc<StorageBuffer<T>>>) -> Result<Self> {
        let format = register_record::<T>()?;
        log::debug!(
            "[view] {} view over {} slice(s)",
            T::type_name(),
            slices.len()
        );
        Ok(Self { slices, format })
    }

    /// Build a view by locating each identity once in `registry`.
    ///
    /// Fails with [`Error::StorageExpired`] on the first identity that no
    /// longer resolves.
    pub fn capture<I>(registry: &StorageRegistry<T>, ids: I) -> Result<Self>
    where
        I: IntoIterator<Item = StorageId>,
    {
        let slices = ids
            .into_iter()
            .map(|id| registry.locate(id).ok_or(Error::StorageExpired(id)))
            .collect::<Result<Vec<_>>>()?;
        Self::new(slices)
    }

    #[must_use]
    pub fn slice_count(&self) -> usize {
        self.slices.len()
    }

    #[must_use]
    pub fn slice(&self, index: usize) -> Option<&Arc<StorageBuffer<T>>> {
        self.slices.get(index)
    }

    pub fn slices(&self) -> impl Iterator<Item = &Arc<StorageBuffer<T>>> + '_ {
        self.slices.iter()
    }

    /// Sum of the current slice lengths.
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.slices.iter().map(|s| s.len()).sum()
    }

    #[must_use]
    pub fn format(&self) -> &LayoutDescriptor {
        &self.format
    }

    /// Export slice `index`, pinning it until the export is dropped.
    pub fn export(&self, index: usize) -> Result<Export<T>> {
        let storage = self.slices.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.slices.len(),
        })?;
        Ok(Export::new(storage, Arc::clone(&self.format)))
    }
}

impl<T: Record> fmt::Debug for StorageView<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageView")
            .field("record", &T::type_name())
            .field(
                "slices",
                &self.slices.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .field("format", &self.format.format())
            .finish()
    }
}
