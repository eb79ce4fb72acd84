// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive codes (Python `struct` alphabet) and the runtime table that
//! maps reflected scalar type tags onto them.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::config::POINTER_SIZE;

/// One-character tag for a fixed-size scalar or pointer-sized field.
///
/// See <https://docs.python.org/3/library/struct.html#format-characters>.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveCode {
    Char,
    UInt8,
    Bool,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Pointer,
}

impl PrimitiveCode {
    pub const ALL: [PrimitiveCode; 12] = [
        PrimitiveCode::Char,
        PrimitiveCode::UInt8,
        PrimitiveCode::Bool,
        PrimitiveCode::Int16,
        PrimitiveCode::UInt16,
        PrimitiveCode::Int32,
        PrimitiveCode::UInt32,
        PrimitiveCode::Int64,
        PrimitiveCode::UInt64,
        PrimitiveCode::Float32,
        PrimitiveCode::Float64,
        PrimitiveCode::Pointer,
    ];

    /// ASCII character used in descriptor text.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PrimitiveCode::Char => 'c',
            PrimitiveCode::UInt8 => 'B',
            PrimitiveCode::Bool => '?',
            PrimitiveCode::Int16 => 'h',
            PrimitiveCode::UInt16 => 'H',
            PrimitiveCode::Int32 => 'i',
            PrimitiveCode::UInt32 => 'I',
            PrimitiveCode::Int64 => 'q',
            PrimitiveCode::UInt64 => 'Q',
            PrimitiveCode::Float32 => 'f',
            PrimitiveCode::Float64 => 'd',
            PrimitiveCode::Pointer => 'P',
        }
    }

    /// Byte size of one element with this code.
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            PrimitiveCode::Char | PrimitiveCode::UInt8 | PrimitiveCode::Bool => 1,
            PrimitiveCode::Int16 | PrimitiveCode::UInt16 => 2,
            PrimitiveCode::Int32 | PrimitiveCode::UInt32 | PrimitiveCode::Float32 => 4,
            PrimitiveCode::Int64 | PrimitiveCode::UInt64 | PrimitiveCode::Float64 => 8,
            PrimitiveCode::Pointer => POINTER_SIZE,
        }
    }

    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        Self::ALL.into_iter().find(|code| code.as_char() == c)
    }

    /// Code used by the trailing filler run for a maximum element size.
    ///
    /// Sizes of one byte need no filler.
    #[must_use]
    pub const fn filler_for(max_size: usize) -> Option<Self> {
        match max_size {
            0 | 1 => None,
            2 => Some(PrimitiveCode::Int16),
            3 | 4 => Some(PrimitiveCode::Int32),
            _ => Some(PrimitiveCode::Pointer),
        }
    }
}

impl fmt::Display for PrimitiveCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Type tag of a non-pointer leaf field, as produced by record reflection.
///
/// Wider than the code alphabet: tags such as `I8` or `Char32` can be
/// reflected but have no code, so compiling them fails with
/// [`Error::UnsupportedType`](crate::Error::UnsupportedType).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// C `char` (`std::ffi::c_char`).
    Char,
    I8,
    U8,
    Bool,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    I128,
    U128,
    F32,
    F64,
    /// Rust `char` (4-byte Unicode scalar value).
    Char32,
}

impl ScalarKind {
    #[cfg(target_pointer_width = "64")]
    pub const USIZE: ScalarKind = ScalarKind::U64;
    #[cfg(target_pointer_width = "64")]
    pub const ISIZE: ScalarKind = ScalarKind::I64;
    #[cfg(target_pointer_width = "32")]
    pub const USIZE: ScalarKind = ScalarKind::U32;
    #[cfg(target_pointer_width = "32")]
    pub const ISIZE: ScalarKind = ScalarKind::I32;

    /// Rust spelling of the tag, used in diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Char => "c_char",
            ScalarKind::I8 => "i8",
            ScalarKind::U8 => "u8",
            ScalarKind::Bool => "bool",
            ScalarKind::I16 => "i16",
            ScalarKind::U16 => "u16",
            ScalarKind::I32 => "i32",
            ScalarKind::U32 => "u32",
            ScalarKind::I64 => "i64",
            ScalarKind::U64 => "u64",
            ScalarKind::I128 => "i128",
            ScalarKind::U128 => "u128",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::Char32 => "char",
        }
    }
}

/// Runtime lookup table from scalar type tag to primitive code.
///
/// The process-wide table ([`CodeTable::global`]) is built once on first
/// use; custom tables can be passed to [`compile`](super::compile).
#[derive(Debug, Clone, Default)]
pub struct CodeTable {
    entries: HashMap<ScalarKind, PrimitiveCode>,
}

impl CodeTable {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Table with the standard `struct` mapping.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::empty();
        table.register(ScalarKind::Char, PrimitiveCode::Char);
        table.register(ScalarKind::U8, PrimitiveCode::UInt8);
        table.register(ScalarKind::Bool, PrimitiveCode::Bool);
        table.register(ScalarKind::I16, PrimitiveCode::Int16);
        table.register(ScalarKind::U16, PrimitiveCode::UInt16);
        table.register(ScalarKind::I32, PrimitiveCode::Int32);
        table.register(ScalarKind::U32, PrimitiveCode::UInt32);
        table.register(ScalarKind::I64, PrimitiveCode::Int64);
        table.register(ScalarKind::U64, PrimitiveCode::UInt64);
        table.register(ScalarKind::F32, PrimitiveCode::Float32);
        table.register(ScalarKind::F64, PrimitiveCode::Float64);
        table
    }

    /// Shared standard table.
    pub fn global() -> &'static CodeTable {
        static TABLE: OnceLock<CodeTable> = OnceLock::new();
        TABLE.get_or_init(CodeTable::standard)
    }

    /// Map `kind` to `code`, returning the previous mapping.
    pub fn register(&mut self, kind: ScalarKind, code: PrimitiveCode) -> Option<PrimitiveCode> {
        self.entries.insert(kind, code)
    }

    #[must_use]
    pub fn lookup(&self, kind: ScalarKind) -> Option<PrimitiveCode> {
        self.entries.get(&kind).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
