// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Storage identities and the process-scoped source that issues them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::FIRST_STORAGE_ID;

/// Process-unique, immutable identity of a storage buffer. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageId(u64);

impl StorageId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Rebuild an identity received over FFI; `None` for the reserved zero.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Option<Self> {
        if raw == 0 {
            None
        } else {
            Some(Self(raw))
        }
    }
}

impl fmt::Display for StorageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic identity counter.
///
/// The process holds exactly one of these ([`IdSource::global`]); it starts
/// at [`FIRST_STORAGE_ID`], only ever increments, and never hands out the
/// same value twice, so identities stay unique across every element type.
#[derive(Debug)]
pub struct IdSource {
    next: AtomicU64,
}

impl IdSource {
    /// Source starting at `first` (zero is bumped to one).
    #[must_use]
    pub const fn new(first: u64) -> Self {
        let first = if first == 0 { 1 } else { first };
        Self {
            next: AtomicU64::new(first),
        }
    }

    pub fn global() -> &'static IdSource {
        static GLOBAL: IdSource = IdSource::new(FIRST_STORAGE_ID);
        &GLOBAL
    }

    pub fn next_id(&self) -> StorageId {
        // Uniqueness only needs atomicity of the increment, not ordering
        // with respect to other memory.
        StorageId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Identity the next call to [`next_id`](Self::next_id) would return.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Relaxed)
    }
}
