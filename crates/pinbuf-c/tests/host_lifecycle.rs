// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Host-side buffer protocol lifecycle: the host takes views and extra
// references, the storage stays pinned until the very last release.

use pinbuf::{Record, StorageRegistry, StorageView};
use pinbuf_c::*;
use std::ffi::CStr;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Record)]
#[repr(C)]
struct Reading {
    sensor: u16,
    samples: [i16; 3],
    value: f64,
}

fn reading(n: u16) -> Reading {
    Reading {
        sensor: n,
        samples: [1, 2, 3],
        value: f64::from(n) * 0.5,
    }
}

#[test]
fn test_get_buffer_fills_view() {
    let registry = StorageRegistry::<Reading>::new();
    let storage = registry.create_from((0..5).map(reading));
    let view = StorageView::new(vec![Arc::clone(&storage)]).unwrap();
    let export = export_into_raw(view.export(0).unwrap());

    let mut buffer = PinbufBuffer::default();
    unsafe {
        let rc = pinbuf_get_buffer(
            export,
            &mut buffer,
            PINBUF_BUF_FORMAT | PINBUF_BUF_C_CONTIGUOUS,
        );
        assert_eq!(rc, PinbufError::PinbufOk);
        assert_eq!(buffer.obj, export);
        assert_eq!(buffer.len, 5);
        assert_eq!(buffer.itemsize as usize, std::mem::size_of::<Reading>());
        assert_eq!(buffer.readonly, 1);
        assert_eq!(buffer.ndim, 1);
        assert_eq!(*buffer.shape, 5);
        assert_eq!(*buffer.strides, buffer.itemsize);
        assert!(buffer.suboffsets.is_null());
        assert_eq!(CStr::from_ptr(buffer.format).to_str().unwrap(), "H3hd0P");

        let third = *buffer.buf.cast::<Reading>().add(2);
        assert_eq!(third, reading(2));

        assert_eq!(pinbuf_export_len(export), 5);
        assert_eq!(pinbuf_export_storage_id(export), storage.id().get());
        assert_eq!(CStr::from_ptr(pinbuf_export_format(export)).to_bytes(), b"H3hd0P");

        pinbuf_release_buffer(&mut buffer);
        assert!(buffer.obj.is_null());
        assert_eq!(storage.pin_count(), 1);

        assert_eq!(pinbuf_export_release(export), PinbufError::PinbufOk);
    }
    assert_eq!(storage.pin_count(), 0);
}

#[test]
fn test_rejected_request_holds_no_reference() {
    let storage = pinbuf::StorageBuffer::create_from([reading(1)]);
    let view = StorageView::new(vec![Arc::clone(&storage)]).unwrap();
    let released = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&released);
    let export = export_into_raw_with_hook(view.export(0).unwrap(), move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut buffer = PinbufBuffer::default();
    unsafe {
        for flags in [
            PINBUF_BUF_WRITABLE,
            PINBUF_BUF_F_CONTIGUOUS,
            PINBUF_BUF_WRITABLE | PINBUF_BUF_FORMAT,
        ] {
            let rc = pinbuf_get_buffer(export, &mut buffer, flags);
            assert_eq!(rc, PinbufError::PinbufUnsupportedAccessMode);
            assert!(buffer.obj.is_null());
            pinbuf_release_buffer(&mut buffer);
        }
        assert_eq!(released.load(Ordering::SeqCst), 0);

        pinbuf_export_release(export);
    }
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert_eq!(storage.pin_count(), 0);
}

#[test]
fn test_format_absent_without_format_flag() {
    let storage = pinbuf::StorageBuffer::create_from([reading(1)]);
    let view = StorageView::new(vec![storage]).unwrap();
    let export = export_into_raw(view.export(0).unwrap());

    let mut buffer = PinbufBuffer::default();
    unsafe {
        assert_eq!(
            pinbuf_get_buffer(export, &mut buffer, PINBUF_BUF_SIMPLE),
            PinbufError::PinbufOk
        );
        assert!(buffer.format.is_null());
        pinbuf_release_buffer(&mut buffer);
        pinbuf_export_release(export);
    }
}

#[test]
fn test_release_hook_runs_once_after_all_references() {
    let registry = StorageRegistry::<Reading>::new();
    let storage = registry.create_from([reading(4)]);
    let id = storage.id();
    let view = StorageView::new(vec![storage]).unwrap();

    let released = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&released);
    let export = export_into_raw_with_hook(view.export(0).unwrap(), move |released_id| {
        assert_eq!(released_id, id);
        counter.fetch_add(1, Ordering::SeqCst);
    });
    drop(view);
    assert!(registry.locate(id).is_none());

    let mut views: Vec<PinbufBuffer> = (0..3).map(|_| PinbufBuffer::default()).collect();
    unsafe {
        assert_eq!(pinbuf_export_retain(export), PinbufError::PinbufOk);
        for view in &mut views {
            assert_eq!(
                pinbuf_get_buffer(export, view, PINBUF_BUF_FORMAT),
                PinbufError::PinbufOk
            );
        }

        pinbuf_export_release(export);
        pinbuf_export_release(export);
        for view in &mut views[..2] {
            pinbuf_release_buffer(view);
        }
        assert_eq!(released.load(Ordering::SeqCst), 0);
        let still_readable = *views[2].buf.cast::<Reading>();
        assert_eq!(still_readable, reading(4));

        pinbuf_release_buffer(&mut views[2]);
        // Already released, must be a no-op
        pinbuf_release_buffer(&mut views[2]);
    }
    assert_eq!(released.load(Ordering::SeqCst), 1);
}

#[test]
fn test_null_arguments() {
    unsafe {
        let mut buffer = PinbufBuffer::default();
        assert_eq!(
            pinbuf_get_buffer(ptr::null_mut(), &mut buffer, PINBUF_BUF_SIMPLE),
            PinbufError::PinbufInvalidArgument
        );
        assert_eq!(
            pinbuf_export_retain(ptr::null_mut()),
            PinbufError::PinbufInvalidArgument
        );
        assert_eq!(pinbuf_export_itemsize(ptr::null()), 0);
    }
}
