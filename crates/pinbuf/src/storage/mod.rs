// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Contiguous storage buffers and their identities.
//!
//! A [`StorageBuffer`] is a growable `Vec`-backed array of one fixed element
//! type. Its iteration shape is the slice iterator exposed through
//! [`StorageReadGuard`]; there is no container hierarchy beyond that.

pub mod buffer;
pub mod id;

pub use buffer::{StorageBuffer, StorageReadGuard};
pub use id::{IdSource, StorageId};
