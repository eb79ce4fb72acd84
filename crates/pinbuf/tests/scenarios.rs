// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end scenarios: derived records, registry, views and exports.

use pinbuf::{
    AccessFlags, Error, LayoutDescriptor, PrimitiveCode, Record, StorageBuffer, StorageRegistry,
    StorageView,
};
use std::ffi::c_char;

#[derive(Debug, Clone, Copy, PartialEq, Record)]
#[repr(C)]
struct Ints {
    a: i32,
    b: i32,
    c: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Record)]
#[repr(C)]
struct Labelled {
    label: c_char,
    a: i32,
    b: i32,
}

#[derive(Debug, Clone, Copy, Record)]
#[repr(C)]
struct Nothing;

#[derive(Debug, Clone, Copy, PartialEq, Record)]
#[repr(C)]
struct Mixed {
    a: i32,
    b: i32,
    weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Record)]
#[repr(C)]
struct Shorts {
    tag: u8,
    pair: [i16; 2],
}

#[derive(Debug, Clone, Copy, Record)]
#[repr(C)]
struct Node {
    value: u32,
    next: *const Node,
}

// SAFETY: the pointer is an opaque address, never dereferenced here.
unsafe impl Send for Node {}
unsafe impl Sync for Node {}

#[test]
fn test_three_ints() {
    let descriptor = LayoutDescriptor::of::<Ints>().unwrap();
    assert_eq!(descriptor.format(), "3i0i");
    assert_eq!(descriptor.runs().len(), 1);
    assert_eq!(descriptor.max_item_size(), 4);
}

#[test]
fn test_char_then_ints() {
    assert_eq!(LayoutDescriptor::of::<Labelled>().unwrap().format(), "c2i0i");
}

#[test]
fn test_empty_record() {
    let descriptor = LayoutDescriptor::of::<Nothing>().unwrap();
    assert_eq!(descriptor.format(), "");
    assert!(descriptor.filler().is_none());
}

#[test]
fn test_filler_uses_global_maximum() {
    let descriptor = LayoutDescriptor::of::<Mixed>().unwrap();
    assert_eq!(descriptor.format(), "2id0P");
    assert_eq!(descriptor.filler(), Some(PrimitiveCode::Pointer));
}

#[test]
fn test_two_byte_filler() {
    assert_eq!(LayoutDescriptor::of::<Shorts>().unwrap().format(), "B2h0h");
}

#[test]
fn test_pointer_field() {
    assert_eq!(LayoutDescriptor::of::<Node>().unwrap().format(), "IP0P");
}

#[test]
fn test_parse_round_trip_of_derived_formats() {
    for format in [
        LayoutDescriptor::of::<Ints>().unwrap().format().to_owned(),
        LayoutDescriptor::of::<Labelled>().unwrap().format().to_owned(),
        LayoutDescriptor::of::<Mixed>().unwrap().format().to_owned(),
    ] {
        let parsed = LayoutDescriptor::parse(&format).unwrap();
        assert_eq!(parsed.format(), format);
    }
}

#[test]
fn test_export_index_past_end() {
    let registry = StorageRegistry::<Ints>::new();
    let view = StorageView::new(vec![registry.create(), registry.create()]).unwrap();
    let count = view.slice_count();
    assert!(matches!(
        view.export(count),
        Err(Error::IndexOutOfRange { index: 2, len: 2 })
    ));
}

#[test]
fn test_export_outlives_creator_handle() {
    let registry = StorageRegistry::<Labelled>::new();
    let storage = registry.create();
    storage
        .append_from((0..10).map(|i| Labelled {
            label: b'x' as c_char,
            a: i,
            b: -i,
        }))
        .unwrap();
    let id = storage.id();

    let export = StorageView::new(vec![storage]).unwrap().export(0).unwrap();
    assert!(registry.locate(id).is_none());

    let info = export.get_buffer(AccessFlags::FORMAT | AccessFlags::STRIDES).unwrap();
    assert_eq!(info.len, 10);
    assert_eq!(info.format.unwrap().to_bytes(), b"c2i0i");
    assert_eq!(export.as_slice()[9].b, -9);
}

#[test]
fn test_append_then_freeze() {
    let storage = StorageBuffer::<Mixed>::create();
    storage
        .append(Mixed {
            a: 1,
            b: 2,
            weight: 3.0,
        })
        .unwrap();

    let view = StorageView::new(vec![std::sync::Arc::clone(&storage)]).unwrap();
    let export = view.export(0).unwrap();
    assert!(matches!(
        storage.clear(),
        Err(Error::StoragePinned { pins: 1, .. })
    ));
    assert_eq!(export.len(), 1);

    drop(export);
    storage.clear().unwrap();
    assert!(storage.is_empty());
}
