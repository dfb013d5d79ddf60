/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Reference-counted heap blocks behind the engine double's handle types.
//!
//! A handle is the address of a [`Shared<T>`], stored in the first pointer of a value slot. Null stands for the empty value of
//! the type (empty string, invalid callable, empty packed array). The count lives at offset 0, so it can be adjusted without
//! knowing `T`.

use std::cell::UnsafeCell;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

#[repr(C)]
pub(crate) struct Shared<T> {
    refs: AtomicUsize,
    data: UnsafeCell<T>,
}

impl<T> Shared<T> {
    /// Allocates a block with one reference.
    pub fn into_raw(data: T) -> *mut c_void {
        let block = Box::new(Self {
            refs: AtomicUsize::new(1),
            data: UnsafeCell::new(data),
        });
        Box::into_raw(block) as *mut c_void
    }

    /// Releases one reference; frees the block on the last one. Null is a no-op.
    ///
    /// # Safety
    /// `handle` must be null or come from [`Shared::<T>::into_raw()`], with the exact same `T`.
    pub unsafe fn release(handle: *mut c_void) {
        if handle.is_null() {
            return;
        }

        let block = handle as *mut Self;

        // SAFETY: live block, per contract.
        let previous = unsafe { (*block).refs.fetch_sub(1, Ordering::AcqRel) };
        if previous == 1 {
            // SAFETY: last reference is gone.
            drop(unsafe { Box::from_raw(block) });
        }
    }

    /// # Safety
    /// `handle` must be a live, non-null block of this `T`, and the returned reference must not overlap with another one.
    pub unsafe fn data<'a>(handle: *mut c_void) -> &'a mut T {
        // SAFETY: per contract.
        unsafe { &mut *(*(handle as *mut Self)).data.get() }
    }
}

/// Adds a reference. Null is a no-op.
///
/// # Safety
/// `handle` must be null or a live block.
pub(crate) unsafe fn acquire(handle: *mut c_void) {
    if !handle.is_null() {
        // SAFETY: `refs` is at offset 0 of every block.
        unsafe { (*(handle as *const AtomicUsize)).fetch_add(1, Ordering::AcqRel) };
    }
}

/// # Safety
/// `handle` must be a live, non-null block.
pub(crate) unsafe fn ref_count(handle: *mut c_void) -> usize {
    // SAFETY: `refs` is at offset 0 of every block.
    unsafe { (*(handle as *const AtomicUsize)).load(Ordering::Acquire) }
}

/// Reads the handle stored at the start of a value slot.
///
/// # Safety
/// `slot` must point to at least one readable pointer.
pub(crate) unsafe fn read_handle(slot: *const c_void) -> *mut c_void {
    // SAFETY: per contract.
    unsafe { ptr::read_unaligned(slot as *const *mut c_void) }
}

/// Writes `handle` into a value slot of `slot_size` bytes; the remaining bytes are zeroed.
///
/// # Safety
/// `slot` must point to `slot_size` writable bytes, with `slot_size` at least one pointer.
pub(crate) unsafe fn write_handle(slot: *mut c_void, slot_size: usize, handle: *mut c_void) {
    // SAFETY: per contract.
    unsafe {
        ptr::write_bytes(slot as *mut u8, 0, slot_size);
        ptr::write_unaligned(slot as *mut *mut c_void, handle);
    }
}
