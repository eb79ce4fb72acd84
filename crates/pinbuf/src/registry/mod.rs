// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Weak identity registry for storage buffers.
//!
//! # Architecture
//!
//! ```text
//! StorageRegistry<T> (cheap clone, shared handle)
//! +-- shared: Arc<RegistryShared<T>>
//!     +-- table: Mutex<RegistryTable<T>>
//!     |   +-- entries: HashMap<StorageId, Weak<StorageBuffer<T>>>
//!     +-- config: RegistryConfig
//!     +-- counters (created / located / misses / purged)
//! ```
//!
//! The registry never keeps a buffer alive. Entries stay in the table after
//! their buffer is destroyed and simply stop resolving; they are removed by
//! [`StorageRegistry::purge_expired`] or, when configured, by a sweep on
//! `create` once the table reaches the purge threshold.
//!
//! # Thread Safety
//!
//! The mutex guards only the table. Buffer contents are behind each
//! buffer's own lock, so a `locate` never waits on a reader or writer of
//! the buffer it returns.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use crate::config::RegistryConfig;
use crate::storage::{StorageBuffer, StorageId};

/// Registry counters snapshot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Buffers created through this registry.
    pub created: u64,
    /// Successful `locate` calls.
    pub located: u64,
    /// `locate` calls for absent or expired identities.
    pub misses: u64,
    /// Stale entries removed by purges and threshold sweeps.
    pub purged: u64,
}

struct RegistryTable<T> {
    entries: HashMap<StorageId, Weak<StorageBuffer<T>>>,
}

impl<T> RegistryTable<T> {
    fn purge(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, weak| weak.strong_count() > 0);
        before - self.entries.len()
    }
}

struct RegistryShared<T> {
    table: Mutex<RegistryTable<T>>,
    config: RegistryConfig,
    created: AtomicU64,
    located: AtomicU64,
    misses: AtomicU64,
    purged: AtomicU64,
}

/// Identity to buffer mapping holding only non-owning references.
///
/// Cloning the handle shares the same table.
pub struct StorageRegistry<T> {
    shared: Arc<RegistryShared<T>>,
}

impl<T> Clone for StorageRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Copy> Default for StorageRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> StorageRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        log::debug!(
            "[registry] new registry (capacity={}, purge_threshold={:?})",
            config.table_capacity,
            config.purge_threshold
        );
        Self {
            shared: Arc::new(RegistryShared {
                table: Mutex::new(RegistryTable {
                    entries: HashMap::with_capacity(config.table_capacity),
                }),
                config,
                created: AtomicU64::new(0),
                located: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                purged: AtomicU64::new(0),
            }),
        }
    }

    /// Create an empty buffer and register it.
    pub fn create(&self) -> Arc<StorageBuffer<T>> {
        self.register(StorageBuffer::with_capacity(
            self.shared.config.buffer_capacity,
        ))
    }

    /// Create a buffer holding a copy of `items` and register it.
    pub fn create_from<I>(&self, items: I) -> Arc<StorageBuffer<T>>
    where
        I: IntoIterator<Item = T>,
    {
        self.register(StorageBuffer::create_from(items))
    }

    pub fn create_from_slice(&self, items: &[T]) -> Arc<StorageBuffer<T>> {
        self.create_from(items.iter().copied())
    }

    /// Strong handle to a live buffer, or `None` if the identity is unknown
    /// to this registry or its buffer has been destroyed.
    pub fn locate(&self, id: StorageId) -> Option<Arc<StorageBuffer<T>>> {
        let found = {
            let table = self.shared.table.lock();
            table.entries.get(&id).and_then(Weak::upgrade)
        };
        match found {
            Some(storage) => {
                self.shared.located.fetch_add(1, Ordering::Relaxed);
                Some(storage)
            }
            None => {
                self.shared.misses.fetch_add(1, Ordering::Relaxed);
                log::trace!("[registry] locate {} missed", id);
                None
            }
        }
    }

    /// Table entries, including expired ones not yet purged.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.table.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shared.table.lock().entries.is_empty()
    }

    /// Entries whose buffer is still alive.
    #[must_use]
    pub fn live_count(&self) -> usize {
        let table = self.shared.table.lock();
        table
            .entries
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    /// Drop entries whose buffer has been destroyed; returns how many.
    pub fn purge_expired(&self) -> usize {
        let removed = self.shared.table.lock().purge();
        self.shared
            .purged
            .fetch_add(removed as u64, Ordering::Relaxed);
        if removed > 0 {
            log::debug!("[registry] purged {} expired entr(ies)", removed);
        }
        removed
    }

    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            created: self.shared.created.load(Ordering::Relaxed),
            located: self.shared.located.load(Ordering::Relaxed),
            misses: self.shared.misses.load(Ordering::Relaxed),
            purged: self.shared.purged.load(Ordering::Relaxed),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.shared.config
    }

    /// True when both handles refer to the same table.
    #[must_use]
    pub fn shares_table_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    fn register(&self, storage: Arc<StorageBuffer<T>>) -> Arc<StorageBuffer<T>> {
        let id = storage.id();
        let swept = {
            let mut table = self.shared.table.lock();
            let swept = match self.shared.config.purge_threshold {
                Some(threshold) if table.entries.len() >= threshold => table.purge(),
                _ => 0,
            };
            table.entries.insert(id, Arc::downgrade(&storage));
            swept
        };
        if swept > 0 {
            self.shared.purged.fetch_add(swept as u64, Ordering::Relaxed);
            log::debug!("[registry] threshold sweep removed {} expired entr(ies)", swept);
        }
        self.shared.created.fetch_add(1, Ordering::Relaxed);
        log::debug!("[registry] registered storage {}", id);
        storage
    }
}

impl<T> fmt::Debug for StorageRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageRegistry")
            .field("entries", &self.shared.table.lock().entries.len())
            .field("config", &self.shared.config)
            .finish()
    }
}
