// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com
//! Tests for views, exports and host handles.

use super::*;
use crate::error::Error;
use crate::Record;
use crate::registry::StorageRegistry;
use crate::storage::StorageBuffer;
use std::ffi::c_char;
use std::mem;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Record)]
#[repr(C)]
struct Triple {
    x: i32,
    y: i32,
    z: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Record)]
#[repr(C)]
struct Tagged {
    tag: c_char,
    a: i32,
    b: i32,
}

#[derive(Debug, Clone, Copy, Record)]
#[repr(C)]
struct Glyph {
    code: char,
}

fn triple(n: i32) -> Triple {
    Triple { x: n, y: n + 1, z: n + 2 }
}

#[test]
fn test_export_describes_slice() {
    let registry = StorageRegistry::<Triple>::new();
    let storage = registry.create_from((0..4).map(triple));

    let view = StorageView::new(vec![Arc::clone(&storage)]).unwrap();
    assert_eq!(view.slice_count(), 1);
    assert_eq!(view.format().format(), "3i0i");

    let export = view.export(0).unwrap();
    let info = export.get_buffer(AccessFlags::FORMAT).unwrap();
    assert_eq!(info.len, 4);
    assert_eq!(info.itemsize, mem::size_of::<Triple>());
    assert_eq!(info.ndim, 1);
    assert_eq!(info.shape, &[4]);
    assert_eq!(info.strides, &[12]);
    assert_eq!(info.format.unwrap().to_str().unwrap(), "3i0i");
    assert!(info.readonly);
    assert!(export.is_readonly());
    assert_eq!(info.buf, storage.read().as_ptr().cast::<u8>());
    assert_eq!(export.as_slice()[2], triple(2));
}

#[test]
fn test_format_only_when_requested() {
    let storage = StorageBuffer::create_from([triple(0)]);
    let view = StorageView::new(vec![storage]).unwrap();
    let export = view.export(0).unwrap();

    assert!(export.get_buffer(AccessFlags::SIMPLE).unwrap().format.is_none());
    assert!(export
        .get_buffer(AccessFlags::C_CONTIGUOUS)
        .unwrap()
        .format
        .is_none());
    assert!(export
        .get_buffer(AccessFlags::ANY_CONTIGUOUS | AccessFlags::FORMAT)
        .unwrap()
        .format
        .is_some());
}

#[test]
fn test_multi_slice_view() {
    let registry = StorageRegistry::<Tagged>::new();
    let tagged = |tag: u8| Tagged {
        tag: tag as c_char,
        a: 1,
        b: 2,
    };
    let first = registry.create_from([tagged(b'a')]);
    let second = registry.create_from([tagged(b'b'), tagged(b'c')]);

    let view = StorageView::capture(&registry, [first.id(), second.id()]).unwrap();
    assert_eq!(view.slice_count(), 2);
    assert_eq!(view.total_len(), 3);
    assert_eq!(view.format().format(), "c2i0i");

    let export = view.export(1).unwrap();
    assert_eq!(export.len(), 2);
    assert_eq!(export.storage_id(), second.id());
    assert_eq!(export.format(), "c2i0i");

    assert_eq!(
        view.export(2).map(|_| ()),
        Err(Error::IndexOutOfRange { index: 2, len: 2 })
    );
}

#[test]
fn test_export_outlives_storage_identity() {
    let registry = StorageRegistry::<Triple>::new();
    let storage = registry.create_from((0..3).map(triple));
    let id = storage.id();

    let view = StorageView::new(vec![storage]).unwrap();
    let export = view.export(0).unwrap();
    assert!(registry.locate(id).is_some());

    // Drop every identity handle; only the export remains
    drop(view);
    assert!(registry.locate(id).is_none());
    assert_eq!(registry.live_count(), 0);

    assert_eq!(export.storage_id(), id);
    assert_eq!(
        export.as_slice().to_vec(),
        (0..3).map(triple).collect::<Vec<_>>()
    );
    let info = export.get_buffer(AccessFlags::FORMAT).unwrap();
    assert_eq!(info.buf, export.as_slice().as_ptr().cast::<u8>());
    assert_eq!(info.len, 3);
}

#[test]
fn test_capture_of_expired_identity_fails() {
    let registry = StorageRegistry::<Triple>::new();
    let id = registry.create().id();
    assert!(registry.locate(id).is_none());
    assert_eq!(
        StorageView::capture(&registry, [id]).map(|_| ()),
        Err(Error::StorageExpired(id))
    );
}

#[test]
fn test_export_pins_storage() {
    let storage = StorageBuffer::create_from([triple(1)]);
    let view = StorageView::new(vec![Arc::clone(&storage)]).unwrap();
    assert_eq!(storage.pin_count(), 0);

    let a = view.export(0).unwrap();
    let b = view.export(0).unwrap();
    assert_eq!(storage.pin_count(), 2);
    assert!(matches!(
        storage.append(triple(2)),
        Err(Error::StoragePinned { pins: 2, .. })
    ));

    drop(a);
    assert_eq!(storage.pin_count(), 1);
    assert!(storage.set(0, triple(5)).is_err());

    drop(b);
    assert_eq!(storage.pin_count(), 0);
    storage.append(triple(2)).unwrap();
    assert_eq!(storage.len(), 2);
}

#[test]
fn test_rejected_access_modes() {
    let storage = StorageBuffer::create_from([triple(0)]);
    let view = StorageView::new(vec![storage]).unwrap();
    let export = view.export(0).unwrap();

    for flags in [
        AccessFlags::WRITABLE,
        AccessFlags::F_CONTIGUOUS,
        AccessFlags::WRITABLE | AccessFlags::FORMAT,
    ] {
        assert_eq!(
            export.get_buffer(flags).map(|_| ()),
            Err(Error::UnsupportedAccessMode(flags))
        );
    }
}

#[test]
fn test_unsupported_record_fails_at_view_construction() {
    let storage = StorageBuffer::create_from([Glyph { code: 'x' }]);
    let err = StorageView::new(vec![storage]).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType { record: "Glyph", .. }));
}

#[test]
fn test_empty_slice_export() {
    let storage = StorageBuffer::<Triple>::create();
    let view = StorageView::new(vec![storage]).unwrap();
    let export = view.export(0).unwrap();
    assert!(export.is_empty());
    assert!(export.as_slice().is_empty());
    assert_eq!(export.get_buffer(AccessFlags::ND).unwrap().shape, &[0]);
}

#[test]
fn test_exports_read_across_threads() {
    let storage = StorageBuffer::create_from((0..64).map(triple));
    let view = StorageView::new(vec![storage]).unwrap();
    let export = Arc::new(view.export(0).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let export = Arc::clone(&export);
            thread::spawn(move || export.as_slice().iter().map(|t| t.x as i64).sum::<i64>())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), (0..64).sum::<i64>());
    }
}

#[test]
fn test_host_handle_retain_does_not_repin() {
    let storage = StorageBuffer::create_from([triple(0), triple(3)]);
    let view = StorageView::new(vec![Arc::clone(&storage)]).unwrap();
    let released = Arc::new(AtomicUsize::new(0));

    let hook_count = Arc::clone(&released);
    let expected = storage.id();
    let raw = HostHandle::with_release_hook(view.export(0).unwrap(), move |id| {
        assert_eq!(id, expected);
        hook_count.fetch_add(1, Ordering::SeqCst);
    })
    .into_raw();

    unsafe {
        for _ in 0..3 {
            HostHandle::retain(raw);
        }
        assert_eq!((*raw).external_refs(), 4);
        assert_eq!(storage.pin_count(), 1);
        assert_eq!((*raw).exporter().len(), 2);

        for _ in 0..3 {
            assert!(!HostHandle::release(raw));
        }
        assert_eq!(released.load(Ordering::SeqCst), 0);
        assert_eq!(storage.pin_count(), 1);

        assert!(HostHandle::release(raw));
    }
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(storage.pin_count(), 0);
    storage.append(triple(6)).unwrap();
}

#[test]
fn test_host_handle_keeps_memory_alive() {
    let registry = StorageRegistry::<Triple>::new();
    let storage = registry.create_from([triple(7)]);
    let id = storage.id();
    let view = StorageView::new(vec![storage]).unwrap();
    let raw = HostHandle::new(view.export(0).unwrap()).into_raw();
    drop(view);
    assert!(registry.locate(id).is_none());

    let exporter = unsafe { (*raw).exporter() };
    assert_eq!(exporter.storage_id(), id);
    assert_eq!(exporter.itemsize(), 12);
    assert_eq!(exporter.descriptor().format(), "3i0i");
    let info = exporter.get_buffer(AccessFlags::FORMAT).unwrap();
    assert_eq!(info.format.unwrap().to_bytes(), b"3i0i");
    let first = unsafe { *info.buf.cast::<Triple>() };
    assert_eq!(first, triple(7));

    assert!(unsafe { HostHandle::release(raw) });
}
