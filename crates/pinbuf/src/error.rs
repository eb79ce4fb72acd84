// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type for layout compilation, storage mutation and buffer export.
//!
//! Looking up an expired storage identity is not an error: the registry
//! reports it as `None` because expiry is the normal end of a buffer's life.

use crate::export::AccessFlags;
use crate::layout::ScalarKind;
use crate::storage::StorageId;

/// pinbuf error.
///
/// # Example
///
/// ```rust
/// use pinbuf::{Error, StorageBuffer};
///
/// let storage = StorageBuffer::<u32>::create();
/// match storage.remove(3) {
///     Err(Error::IndexOutOfRange { index, len }) => assert_eq!((index, len), (3, 0)),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // ========================================================================
    // Layout Errors
    // ========================================================================
    /// A leaf field has no primitive code; raised when the record type is
    /// registered or compiled, never when a buffer is exported.
    UnsupportedType {
        /// Record type being compiled.
        record: &'static str,
        /// Dotted path of the offending leaf (e.g. `header.stamp[2]`).
        field: String,
        /// Type tag that has no code.
        kind: ScalarKind,
    },
    /// Descriptor text does not follow the canonical `(count code)* [0 code]` grammar.
    InvalidDescriptor(String),

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Index (or range end) outside `[0, len)`.
    IndexOutOfRange { index: usize, len: usize },
    /// Mutation refused because read-only exports of the buffer are alive.
    StoragePinned { id: StorageId, pins: usize },
    /// Storage identity no longer resolves to a live buffer.
    StorageExpired(StorageId),

    // ========================================================================
    // Export Errors
    // ========================================================================
    /// Host asked for write access or a non-forward memory order.
    UnsupportedAccessMode(AccessFlags),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::UnsupportedType {
                record,
                field,
                kind,
            } => write!(
                f,
                "Unsupported field type: {}.{} has type {} with no primitive code",
                record,
                field,
                kind.name()
            ),
            Error::InvalidDescriptor(msg) => write!(f, "Invalid layout descriptor: {}", msg),
            Error::IndexOutOfRange { index, len } => {
                write!(f, "Index {} out of range (len {})", index, len)
            }
            Error::StoragePinned { id, pins } => write!(
                f,
                "Storage {} is pinned by {} live export(s) and cannot be mutated",
                id, pins
            ),
            Error::StorageExpired(id) => write!(f, "Storage {} has expired", id),
            Error::UnsupportedAccessMode(flags) => write!(
                f,
                "Unsupported access mode {:#06x}: only read-only forward-contiguous access is exported",
                flags.bits()
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Convenient alias for results using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
