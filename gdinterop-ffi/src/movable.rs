/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::marker::PhantomData;
use std::mem::size_of;

use crate::native::NativeValue;

/// Owned, relocatable storage of one native value.
///
/// Holds the exact bytes of an `N` and nothing else, so it can be moved, sent across threads or embedded in other structs like any
/// plain-old-data blob. It does not run destructors: the owner decides when the engine-side value is released, via
/// [`destroy_in_place()`](Self::destroy_in_place).
///
/// [`native()`](Self::native) and [`native_mut()`](Self::native_mut) are the only places where the bytes are reinterpreted as `N`.
#[repr(transparent)]
pub struct Movable<N: NativeValue> {
    storage: N::Storage,
    _marker: PhantomData<N>,
}

// SAFETY: engine-side builtin data is refcounted atomically and copy-on-write; moving the bytes to another thread is equivalent to
// moving the owning reference. Concurrent mutation is still excluded by `&mut` access.
unsafe impl<N: NativeValue> Send for Movable<N> {}
// SAFETY: shared access only hands out `&N` through an `unsafe` accessor whose contract excludes concurrent destruction.
unsafe impl<N: NativeValue> Sync for Movable<N> {}

impl<N: NativeValue> Movable<N> {
    const SIZE_MATCHES: () = assert!(
        size_of::<N>() == size_of::<N::Storage>(),
        "native value must be a transparent wrapper of its storage"
    );

    /// Takes ownership of `native`.
    pub fn from_native(native: N) -> Self {
        #[allow(clippy::let_unit_value)]
        let _ = Self::SIZE_MATCHES;

        Self {
            storage: native.into_storage(),
            _marker: PhantomData,
        }
    }

    /// Gives ownership back as a native value.
    ///
    /// # Safety
    /// The storage must still hold a live value, i.e. [`destroy_in_place()`](Self::destroy_in_place) has not been called.
    pub unsafe fn into_native(self) -> N {
        // SAFETY: the storage came from `into_storage()` of a live `N`.
        unsafe { N::from_storage(self.storage) }
    }

    /// Reinterprets the storage as the native value.
    ///
    /// # Safety
    /// The storage must still hold a live value, and no other thread may destroy it while the reference exists.
    #[inline]
    pub unsafe fn native(&self) -> &N {
        // SAFETY: `N` is a transparent wrapper around `N::Storage` (checked in `from_native`); liveness is up to the caller.
        unsafe { &*(&self.storage as *const N::Storage as *const N) }
    }

    /// Mutable variant of [`native()`](Self::native).
    ///
    /// # Safety
    /// See [`native()`](Self::native).
    #[inline]
    pub unsafe fn native_mut(&mut self) -> &mut N {
        // SAFETY: see `native()`.
        unsafe { &mut *(&mut self.storage as *mut N::Storage as *mut N) }
    }

    /// Releases the engine-side value. The bytes stay, but must not be interpreted again.
    ///
    /// # Safety
    /// Must be called at most once, and only while the value is live.
    pub unsafe fn destroy_in_place(&mut self) {
        // SAFETY: forwarded to caller.
        unsafe { self.native_mut().destroy() };
    }
}
