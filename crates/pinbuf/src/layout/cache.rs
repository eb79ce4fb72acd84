// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrent per-type cache of compiled layout descriptors.
//!
//! Compilation is a pure function of the record's field list, so the first
//! successful compile for a type is kept for the life of the process and
//! every later lookup is a read-locked hash probe. Failed compilations are
//! not cached; they fail the same way on every attempt.

use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use super::descriptor::LayoutDescriptor;
use super::field::Record;
use crate::error::Result;

/// Cache hit/miss statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct LookupStats {
    pub hits: u64,
    pub misses: u64,
    pub last_miss_ns: u64,
}

/// Per-type descriptor cache keyed by [`TypeId`].
#[derive(Default)]
pub struct DescriptorCache {
    inner: RwLock<HashMap<TypeId, Arc<LayoutDescriptor>>>,
    stats: RwLock<LookupStats>,
}

impl DescriptorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache used by [`LayoutDescriptor::of`].
    pub fn global() -> &'static DescriptorCache {
        static CACHE: OnceLock<DescriptorCache> = OnceLock::new();
        CACHE.get_or_init(DescriptorCache::new)
    }

    pub fn get_or_compile<T: Record>(&self) -> Result<Arc<LayoutDescriptor>> {
        self.get_or_try_build(TypeId::of::<T>(), LayoutDescriptor::compile_record::<T>)
    }

    pub fn get_or_try_build<F>(&self, key: TypeId, build: F) -> Result<Arc<LayoutDescriptor>>
    where
        F: FnOnce() -> Result<LayoutDescriptor>,
    {
        if let Some(hit) = self.try_peek(key) {
            self.record_hit();
            return Ok(hit);
        }

        let mut cache = self.inner.write();
        if let Some(hit) = cache.get(&key) {
            self.record_hit();
            return Ok(Arc::clone(hit));
        }

        let start = Instant::now();
        let built = Arc::new(build()?);
        cache.insert(key, Arc::clone(&built));
        self.record_miss(start);
        Ok(built)
    }

    #[must_use]
    pub fn contains<T: Record>(&self) -> bool {
        self.inner.read().contains_key(&TypeId::of::<T>())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    #[must_use]
    pub fn stats(&self) -> LookupStats {
        *self.stats.read()
    }

    fn try_peek(&self, key: TypeId) -> Option<Arc<LayoutDescriptor>> {
        self.inner.read().get(&key).map(Arc::clone)
    }

    fn record_hit(&self) {
        let mut stats = self.stats.write();
        stats.hits = stats.hits.saturating_add(1);
    }

    fn record_miss(&self, start: Instant) {
        let mut stats = self.stats.write();
        stats.misses = stats.misses.saturating_add(1);
        stats.last_miss_ns = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
    }
}
