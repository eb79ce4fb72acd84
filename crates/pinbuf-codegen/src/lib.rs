// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

extern crate proc_macro;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Data, DeriveInput, Expr, Fields, GenericArgument, PathArguments, Type,
};

/// Reflected shape of one declared field.
struct FieldShape {
    /// `::pinbuf::FieldLayout` constructor call (repeat 1).
    layout: TokenStream2,
    /// Element count expression for array fields.
    repeat: Option<TokenStream2>,
}

/// `#[derive(Record)]` macro: generates the `pinbuf::Record` field list
///
/// Supports:
/// - Primitive types: u8, bool, i16, u16, i32, u32, i64, u64, f32, f64,
///   usize/isize (target width), `c_char`
/// - Pointers: `*const T`, `*mut T`, `&T`, `fn(..)`, `NonNull<T>`, `Option<&T>`
/// - Fixed-size arrays `[T; N]` (flattened into N leaves)
/// - Any other path type is treated as a nested `Record` and flattened in place
///
/// `i8`, `i128`, `u128` and `char` are reflected but have no layout code;
/// registering such a record fails with `Error::UnsupportedType`.
///
/// # Panics
///
/// Never panics; unsupported input becomes a compile error. The struct must be
/// `#[repr(C)]` (declaration order is memory order), not packed, and not generic.
///
/// Example:
/// ```ignore
/// use pinbuf::Record;
///
/// #[derive(Clone, Copy, Record)]
/// #[repr(C)]
/// struct Sample {
///     kind: std::ffi::c_char,
///     values: [i32; 2],
/// }
/// // descriptor: "c2i0i"
/// ```
#[proc_macro_derive(Record)]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let type_name = name.to_string();

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic types",
        ));
    }
    check_repr(input)?;

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Record can only be derived for structs",
            ))
        }
    };

    let named: Vec<(String, &Type)> = match fields {
        Fields::Named(f) => f
            .named
            .iter()
            .filter_map(|field| field.ident.as_ref().map(|id| (id.to_string(), &field.ty)))
            .collect(),
        Fields::Unnamed(f) => f
            .unnamed
            .iter()
            .enumerate()
            .map(|(idx, field)| (idx.to_string(), &field.ty))
            .collect(),
        Fields::Unit => Vec::new(),
    };

    let layouts = named
        .iter()
        .map(|(field_name, ty)| {
            let shape = field_shape(field_name, ty)?;
            let layout = shape.layout;
            Ok(match shape.repeat {
                Some(count) => quote! { #layout.repeated(#count) },
                None => layout,
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;
    let field_count = layouts.len();

    Ok(quote! {
        impl ::pinbuf::Record for #name {
            fn type_name() -> &'static str {
                #type_name
            }

            fn fields() -> &'static [::pinbuf::FieldLayout] {
                static FIELDS: [::pinbuf::FieldLayout; #field_count] = [#(#layouts),*];
                &FIELDS
            }
        }
    })
}

/// Require `#[repr(C)]` and reject `packed`.
fn check_repr(input: &DeriveInput) -> syn::Result<()> {
    let mut has_c = false;
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("repr")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("C") {
                has_c = true;
            } else if meta.path.is_ident("packed") {
                return Err(meta.error("Record layouts must not be packed"));
            } else if meta.input.peek(syn::token::Paren) {
                // align(N) and friends: consume the argument list
                let content;
                syn::parenthesized!(content in meta.input);
                let _: TokenStream2 = content.parse()?;
            }
            Ok(())
        })?;
    }
    if has_c {
        Ok(())
    } else {
        Err(syn::Error::new_spanned(
            &input.ident,
            "Record requires #[repr(C)] so that field order matches memory order",
        ))
    }
}

/// Map a field type to its layout constructor.
fn field_shape(name: &str, ty: &Type) -> syn::Result<FieldShape> {
    match ty {
        Type::Paren(inner) => field_shape(name, &inner.elem),
        Type::Group(inner) => field_shape(name, &inner.elem),
        Type::Ptr(_) | Type::Reference(_) | Type::BareFn(_) => Ok(FieldShape {
            layout: quote! { ::pinbuf::FieldLayout::pointer(#name) },
            repeat: None,
        }),
        Type::Array(array) => {
            let inner = field_shape(name, &array.elem)?;
            let len: &Expr = &array.len;
            let repeat = match inner.repeat {
                Some(inner_count) => quote! { (#len) * (#inner_count) },
                None => quote! { #len },
            };
            Ok(FieldShape {
                layout: inner.layout,
                repeat: Some(repeat),
            })
        }
        Type::Path(type_path) if type_path.qself.is_none() => {
            let Some(segment) = type_path.path.segments.last() else {
                return Err(syn::Error::new_spanned(ty, "Empty type path"));
            };
            if let Some(kind) = scalar_kind(&segment.ident.to_string()) {
                return Ok(FieldShape {
                    layout: quote! { ::pinbuf::FieldLayout::scalar(#name, #kind) },
                    repeat: None,
                });
            }
            if is_pointer_path(segment) {
                return Ok(FieldShape {
                    layout: quote! { ::pinbuf::FieldLayout::pointer(#name) },
                    repeat: None,
                });
            }
            Ok(FieldShape {
                layout: quote! {
                    ::pinbuf::FieldLayout::nested(#name, <#ty as ::pinbuf::Record>::fields)
                },
                repeat: None,
            })
        }
        _ => Err(syn::Error::new_spanned(
            ty,
            format!("Unsupported field type for Record: {}", quote! { #ty }),
        )),
    }
}

/// Scalar type tag for primitive idents.
fn scalar_kind(ident: &str) -> Option<TokenStream2> {
    let kind = match ident {
        "c_char" => quote! { ::pinbuf::ScalarKind::Char },
        "i8" => quote! { ::pinbuf::ScalarKind::I8 },
        "u8" => quote! { ::pinbuf::ScalarKind::U8 },
        "bool" => quote! { ::pinbuf::ScalarKind::Bool },
        "i16" => quote! { ::pinbuf::ScalarKind::I16 },
        "u16" => quote! { ::pinbuf::ScalarKind::U16 },
        "i32" => quote! { ::pinbuf::ScalarKind::I32 },
        "u32" => quote! { ::pinbuf::ScalarKind::U32 },
        "i64" => quote! { ::pinbuf::ScalarKind::I64 },
        "u64" => quote! { ::pinbuf::ScalarKind::U64 },
        "i128" => quote! { ::pinbuf::ScalarKind::I128 },
        "u128" => quote! { ::pinbuf::ScalarKind::U128 },
        "f32" => quote! { ::pinbuf::ScalarKind::F32 },
        "f64" => quote! { ::pinbuf::ScalarKind::F64 },
        "char" => quote! { ::pinbuf::ScalarKind::Char32 },
        "usize" => quote! { ::pinbuf::ScalarKind::USIZE },
        "isize" => quote! { ::pinbuf::ScalarKind::ISIZE },
        _ => return None,
    };
    Some(kind)
}

/// `NonNull<T>`, and `Option<P>` where `P` is itself pointer-like (niche-optimized).
fn is_pointer_path(segment: &syn::PathSegment) -> bool {
    if segment.ident == "NonNull" {
        return true;
    }
    if segment.ident != "Option" {
        return false;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return false;
    };
    match args.args.first() {
        Some(GenericArgument::Type(Type::Reference(_) | Type::BareFn(_))) => true,
        Some(GenericArgument::Type(Type::Path(inner))) => inner
            .path
            .segments
            .last()
            .is_some_and(|s| s.ident == "NonNull"),
        _ => false,
    }
}
