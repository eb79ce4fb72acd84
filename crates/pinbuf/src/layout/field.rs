// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Record reflection: the field list a record type exposes and its
//! flattening into leaf fields in memory order.

use super::code::ScalarKind;

/// Field type classification
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    /// Non-pointer primitive.
    Scalar(ScalarKind),
    /// Any pointer, reference or function pointer. The pointee is irrelevant.
    Pointer,
    /// Embedded record, flattened in place.
    Nested(fn() -> &'static [FieldLayout]),
}

/// One declared field of a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldLayout {
    pub name: &'static str,
    pub field_type: FieldType,
    /// Element count of a fixed-size array field, 1 otherwise.
    pub repeat: usize,
}

impl FieldLayout {
    #[must_use]
    pub const fn scalar(name: &'static str, kind: ScalarKind) -> Self {
        Self {
            name,
            field_type: FieldType::Scalar(kind),
            repeat: 1,
        }
    }

    #[must_use]
    pub const fn pointer(name: &'static str) -> Self {
        Self {
            name,
            field_type: FieldType::Pointer,
            repeat: 1,
        }
    }

    #[must_use]
    pub const fn nested(name: &'static str, fields: fn() -> &'static [FieldLayout]) -> Self {
        Self {
            name,
            field_type: FieldType::Nested(fields),
            repeat: 1,
        }
    }

    /// Same field declared as an array of `count` elements.
    #[must_use]
    pub const fn repeated(mut self, count: usize) -> Self {
        self.repeat = count;
        self
    }
}

/// Reflection contract for fixed-layout record types.
///
/// `fields()` must list the fields in memory order, which for Rust structs
/// means `#[repr(C)]`. Implement it with `#[derive(pinbuf::Record)]` or by
/// hand:
///
/// ```rust
/// use pinbuf::{FieldLayout, Record, ScalarKind};
///
/// #[derive(Clone, Copy)]
/// #[repr(C)]
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Record for Point {
///     fn type_name() -> &'static str {
///         "Point"
///     }
///
///     fn fields() -> &'static [FieldLayout] {
///         static FIELDS: [FieldLayout; 2] = [
///             FieldLayout::scalar("x", ScalarKind::I32),
///             FieldLayout::scalar("y", ScalarKind::I32),
///         ];
///         &FIELDS
///     }
/// }
///
/// assert_eq!(pinbuf::LayoutDescriptor::of::<Point>().unwrap().format(), "2i0i");
/// ```
pub trait Record: Copy + Send + Sync + 'static {
    fn type_name() -> &'static str;

    fn fields() -> &'static [FieldLayout];
}

/// Leaf type after flattening.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafKind {
    Scalar(ScalarKind),
    Pointer,
}

/// Flattened leaf field with its dotted path (`pose.position[1]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    pub path: String,
    pub kind: LeafKind,
}

impl Leaf {
    #[must_use]
    pub fn scalar(path: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            path: path.into(),
            kind: LeafKind::Scalar(kind),
        }
    }

    #[must_use]
    pub fn pointer(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: LeafKind::Pointer,
        }
    }
}

/// Flatten declared fields into leaves, expanding arrays and nested records.
#[must_use]
pub fn flatten(fields: &[FieldLayout]) -> Vec<Leaf> {
    let mut leaves = Vec::new();
    flatten_into(fields, "", &mut leaves);
    leaves
}

fn flatten_into(fields: &[FieldLayout], prefix: &str, out: &mut Vec<Leaf>) {
    for field in fields {
        for element in 0..field.repeat {
            let path = if field.repeat > 1 {
                format!("{}{}[{}]", prefix, field.name, element)
            } else {
                format!("{}{}", prefix, field.name)
            };
            match field.field_type {
                FieldType::Scalar(kind) => out.push(Leaf::scalar(path, kind)),
                FieldType::Pointer => out.push(Leaf::pointer(path)),
                FieldType::Nested(inner) => flatten_into(inner(), &format!("{}.", path), out),
            }
        }
    }
}

macro_rules! scalar_record {
    ($($ty:ty => $kind:expr),* $(,)?) => {
        $(
            impl Record for $ty {
                fn type_name() -> &'static str {
                    stringify!($ty)
                }

                fn fields() -> &'static [FieldLayout] {
                    static FIELDS: [FieldLayout; 1] = [FieldLayout::scalar("value", $kind)];
                    &FIELDS
                }
            }
        )*
    };
}

// Plain scalars are single-field records so buffers of numbers can be exported directly.
scalar_record! {
    u8 => ScalarKind::U8,
    bool => ScalarKind::Bool,
    i16 => ScalarKind::I16,
    u16 => ScalarKind::U16,
    i32 => ScalarKind::I32,
    u32 => ScalarKind::U32,
    i64 => ScalarKind::I64,
    u64 => ScalarKind::U64,
    f32 => ScalarKind::F32,
    f64 => ScalarKind::F64,
}
