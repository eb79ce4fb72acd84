// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout descriptor compiler.
//!
//! Turns the ordered leaf fields of a fixed-layout record into the
//! run-length format string consumed by buffer exports:
//!
//! | Fields                 | Descriptor |
//! |------------------------|------------|
//! | `i32, i32, i32`        | `3i0i`     |
//! | `c_char, i32, i32`     | `c2i0i`    |
//! | `i32, i32, f64`        | `2id0P`    |
//! | (none)                 | (empty)    |
//!
//! Provides [`PrimitiveCode`] and [`CodeTable`] for the type-tag mapping,
//! [`Record`]/[`FieldLayout`] for reflection, [`LayoutDescriptor`] for the
//! compiled form and [`DescriptorCache`] for per-type memoization.

pub mod cache;
pub mod code;
pub mod descriptor;
pub mod field;

pub use cache::{DescriptorCache, LookupStats};
pub use code::{CodeTable, PrimitiveCode, ScalarKind};
pub use descriptor::{LayoutDescriptor, Run};
pub use field::{flatten, FieldLayout, FieldType, Leaf, LeafKind, Record};

use std::sync::Arc;

use crate::error::Result;

/// Compile an already flattened leaf list with a custom code table.
pub fn compile(record: &'static str, leaves: &[Leaf], table: &CodeTable) -> Result<LayoutDescriptor> {
    LayoutDescriptor::compile(record, leaves, table)
}

/// Register record type `T`: compile and cache its descriptor.
///
/// This is where an unsupported field type surfaces. Views call it on
/// construction, so exports never fail on layout.
pub fn register_record<T: Record>() -> Result<Arc<LayoutDescriptor>> {
    match LayoutDescriptor::of::<T>() {
        Ok(descriptor) => {
            log::debug!(
                "[layout] registered {} as {:?} (max item size {})",
                T::type_name(),
                descriptor.format(),
                descriptor.max_item_size()
            );
            Ok(descriptor)
        }
        Err(err) => {
            log::warn!("[layout] cannot register {}: {}", T::type_name(), err);
            Err(err)
        }
    }
}
