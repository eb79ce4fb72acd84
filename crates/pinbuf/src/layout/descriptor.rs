// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layout descriptor: run-length encoded primitive codes plus alignment filler.
//!
//! Grammar of the rendered text:
//!
//! ```text
//! descriptor := run* filler?
//! run        := count? code          count is decimal >= 2, omitted when 1
//! filler     := '0' code             code of the largest element size
//! ```
//!
//! Adjacent runs never share a code, and the filler is present exactly when
//! the descriptor is non-empty and its largest element exceeds one byte.

use std::ffi::{CStr, CString};
use std::fmt;
use std::sync::Arc;

use super::cache::DescriptorCache;
use super::code::{CodeTable, PrimitiveCode};
use super::field::{flatten, Leaf, LeafKind, Record};
use crate::config::FILLER_PREFIX;
use crate::error::{Error, Result};

/// Maximal group of consecutive fields sharing one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub code: PrimitiveCode,
    pub count: usize,
}

impl Run {
    fn render_into(self, out: &mut String) {
        if self.count > 1 {
            out.push_str(&self.count.to_string());
        }
        out.push(self.code.as_char());
    }
}

/// Compiled layout of a record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutDescriptor {
    runs: Vec<Run>,
    max_item_size: usize,
    format: CString,
}

impl LayoutDescriptor {
    /// Fold a flat code sequence into maximal runs.
    pub fn from_codes<I>(codes: I) -> Self
    where
        I: IntoIterator<Item = PrimitiveCode>,
    {
        Self::from_runs(codes.into_iter().map(|code| Run { code, count: 1 }))
    }

    fn from_runs<I>(runs: I) -> Self
    where
        I: IntoIterator<Item = Run>,
    {
        let mut merged: Vec<Run> = Vec::new();
        let mut max_item_size = 0;
        for run in runs.into_iter().filter(|run| run.count > 0) {
            max_item_size = max_item_size.max(run.code.size());
            match merged.last_mut() {
                Some(last) if last.code == run.code => {
                    last.count = last.count.saturating_add(run.count);
                }
                _ => merged.push(run),
            }
        }

        let mut text = String::with_capacity(merged.len() * 2 + 2);
        for run in &merged {
            run.render_into(&mut text);
        }
        if !merged.is_empty() {
            if let Some(filler) = PrimitiveCode::filler_for(max_item_size) {
                text.push(FILLER_PREFIX);
                text.push(filler.as_char());
            }
        }

        Self {
            runs: merged,
            max_item_size,
            // Rendered text is pure ASCII from the code alphabet and digits.
            format: CString::new(text).unwrap_or_default(),
        }
    }

    /// Compile flattened leaves of `record` against `table`.
    pub fn compile(record: &'static str, leaves: &[Leaf], table: &CodeTable) -> Result<Self> {
        let codes = leaves
            .iter()
            .map(|leaf| match leaf.kind {
                LeafKind::Pointer => Ok(PrimitiveCode::Pointer),
                LeafKind::Scalar(kind) => {
                    table
                        .lookup(kind)
                        .ok_or_else(|| Error::UnsupportedType {
                            record,
                            field: leaf.path.clone(),
                            kind,
                        })
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_codes(codes))
    }

    /// Compile `T` with the global code table, bypassing the cache.
    pub fn compile_record<T: Record>() -> Result<Self> {
        let leaves = flatten(T::fields());
        Self::compile(T::type_name(), &leaves, CodeTable::global())
    }

    /// Cached descriptor of `T`.
    pub fn of<T: Record>() -> Result<Arc<Self>> {
        DescriptorCache::global().get_or_compile::<T>()
    }

    /// Parse canonical descriptor text.
    ///
    /// Non-canonical spellings (`1i`, `ii`, a missing or wrong filler)
    /// are rejected so that `parse(d.format()) == d` is the only round trip.
    pub fn parse(text: &str) -> Result<Self> {
        let mut runs: Vec<Run> = Vec::new();
        let mut filler = None;
        let mut digits = String::new();

        for (pos, c) in text.char_indices() {
            if filler.is_some() {
                return Err(invalid(text, pos, "text after filler run"));
            }
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let Some(code) = PrimitiveCode::from_char(c) else {
                return Err(invalid(text, pos, "unknown code"));
            };
            if digits == "0" {
                filler = Some(code);
            } else {
                let count = if digits.is_empty() {
                    1
                } else {
                    digits
                        .parse::<usize>()
                        .map_err(|_| invalid(text, pos, "repeat count overflow"))?
                };
                if runs.last().is_some_and(|last| last.code == code) {
                    return Err(invalid(text, pos, "run repeats the previous code"));
                }
                runs.push(Run { code, count });
            }
            digits.clear();
        }
        if !digits.is_empty() {
            return Err(invalid(text, text.len(), "count without code"));
        }

        let parsed = Self::from_runs(runs);
        if parsed.format() != text {
            return Err(Error::InvalidDescriptor(format!(
                "{:?} is not canonical (expected {:?})",
                text,
                parsed.format()
            )));
        }
        Ok(parsed)
    }

    #[must_use]
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// Largest element size across all runs, 0 when empty.
    #[must_use]
    pub fn max_item_size(&self) -> usize {
        self.max_item_size
    }

    /// Code of the trailing filler run, if any.
    #[must_use]
    pub fn filler(&self) -> Option<PrimitiveCode> {
        if self.runs.is_empty() {
            None
        } else {
            PrimitiveCode::filler_for(self.max_item_size)
        }
    }

    /// Descriptor text.
    #[must_use]
    pub fn format(&self) -> &str {
        // Built from a String in from_runs, always valid UTF-8.
        self.format.to_str().unwrap_or_default()
    }

    /// Descriptor text as a NUL-terminated string for foreign hosts.
    #[must_use]
    pub fn format_cstr(&self) -> &CStr {
        &self.format
    }

    /// Flat code sequence, runs expanded.
    pub fn codes(&self) -> impl Iterator<Item = PrimitiveCode> + '_ {
        self.runs
            .iter()
            .flat_map(|run| std::iter::repeat(run.code).take(run.count))
    }

    /// Number of leaf fields described, `None` if it overflows `usize`.
    #[must_use]
    pub fn field_count(&self) -> Option<usize> {
        self.runs
            .iter()
            .try_fold(0usize, |total, run| total.checked_add(run.count))
    }

    /// Sum of element sizes without padding, `None` if it overflows `usize`.
    #[must_use]
    pub fn packed_size(&self) -> Option<usize> {
        self.runs.iter().try_fold(0usize, |total, run| {
            run.count
                .checked_mul(run.code.size())
                .and_then(|bytes| total.checked_add(bytes))
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl fmt::Display for LayoutDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.format())
    }
}

fn invalid(text: &str, pos: usize, reason: &str) -> Error {
    Error::InvalidDescriptor(format!("{:?} at byte {}: {}", text, pos, reason))
}
