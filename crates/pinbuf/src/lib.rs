// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # pinbuf - Layout descriptors and pinned zero-copy buffer exports
//!
//! `pinbuf` turns a fixed-layout record type into a compact run-length
//! format string (Python `struct` alphabet) and manages contiguous,
//! growable buffers of such records that can be handed to a foreign host
//! runtime as read-only, zero-copy views.
//!
//! ## Quick Start
//!
//! ```rust
//! use pinbuf::{AccessFlags, Record, StorageRegistry, StorageView};
//!
//! #[derive(Clone, Copy, Record)]
//! #[repr(C)]
//! struct Sample {
//!     tag: u8,
//!     values: [i32; 2],
//! }
//!
//! # fn main() -> pinbuf::Result<()> {
//! let registry = StorageRegistry::<Sample>::new();
//! let storage = registry.create();
//! storage.append(Sample { tag: 1, values: [10, 20] })?;
//!
//! let view = StorageView::new(vec![storage])?;
//! let export = view.export(0)?;
//! let info = export.get_buffer(AccessFlags::FORMAT)?;
//! assert_eq!(info.format.map(|f| f.to_bytes()), Some(&b"B2i0i"[..]));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +-------------------+      +--------------------+
//! |  #[derive(Record)] | ---> |  layout (compiler) |  field types -> "c2i0i"
//! +-------------------+      +--------------------+
//!                                      |
//! +-------------------+      +--------------------+      +------------------+
//! |  StorageRegistry  | ---> |   StorageBuffer    | ---> | StorageView      |
//! |  id -> Weak<..>   |      |   Vec<T> + id      |      |   -> Export (pin)|
//! +-------------------+      +--------------------+      +------------------+
//!                                                                 |
//!                                                        HostHandle (pinbuf-c)
//! ```
//!
//! ## Modules Overview
//!
//! - [`layout`] - primitive codes, record reflection, descriptor compiler and cache
//! - [`storage`] - identity source and the contiguous storage buffer
//! - [`registry`] - weak identity table for re-acquiring live buffers
//! - [`export`] - views, pinned exports and the external-refcount wrapper
//! - [`config`] - constants and registry configuration

// Allow the derive macro to work inside this crate's tests
extern crate self as pinbuf;

/// Constants and runtime configuration.
pub mod config;
/// Error type shared by every layer.
pub mod error;
/// Read-only zero-copy export chain (View -> Export -> HostHandle).
pub mod export;
/// Layout descriptor compiler, primitive code table and per-type cache.
pub mod layout;
/// Weak identity registry for storage buffers.
pub mod registry;
/// Contiguous growable storage with process-unique identity.
pub mod storage;

pub use config::{RegistryConfig, RegistryConfigBuilder};
pub use error::{Error, Result};
pub use export::{AccessFlags, BufferExporter, BufferInfo, Export, HostHandle, StorageView};
pub use layout::{
    register_record, CodeTable, DescriptorCache, FieldLayout, FieldType, LayoutDescriptor, Leaf,
    LeafKind, PrimitiveCode, Record, Run, ScalarKind,
};
pub use registry::{RegistryStats, StorageRegistry};
pub use storage::{IdSource, StorageBuffer, StorageId, StorageReadGuard};

// Derive macro (for #[derive(pinbuf::Record)])
pub use pinbuf_codegen::Record;

/// pinbuf version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
