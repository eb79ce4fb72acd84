// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read-only zero-copy export chain.
//!
//! ```text
//! StorageView<T>  --export(i)-->  Export<T>  --HostHandle::new-->  HostHandle
//!   slices[]                        pin + Arc                        external refs
//! ```
//!
//! Every export pins exactly one storage slice for its whole life and only
//! ever grants read-only, forward-contiguous, one-dimensional access.

pub mod flags;
pub mod host;
pub mod slice;
pub mod view;

pub use flags::AccessFlags;
pub use host::HostHandle;
pub use slice::{BufferExporter, BufferInfo, Export};
pub use view::StorageView;

#[cfg(test)]
mod tests;
