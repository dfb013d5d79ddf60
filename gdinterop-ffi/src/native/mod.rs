/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Native value representations: `#[repr(transparent)]` wrappers over engine-sized opaque storage.
//!
//! These types expose the raw engine operations of each builtin (size, element access, conversion), but do not manage lifetime:
//! they have no `Drop`, and are not `Clone`. Ownership lives one layer up, either in a [`Movable`](crate::Movable) held by a tracked
//! wrapper, or in an RAII type of `gdinterop-core`.

mod callable;
mod containers;
mod packed;
mod strings;
mod variant;

pub use callable::{NativeCallable, NativeSignal};
pub use containers::{NativeArray, NativeDictionary};
pub use packed::*;
pub use strings::{NativeNodePath, NativeString, NativeStringName, ScratchStringName};
pub use variant::{NativeVariant, VARIANT_PAYLOAD_OFFSET, is_inline_type};

use std::ffi::c_int;

use crate as sys;
use crate::VariantType;
use crate::bind_cache::PtrBuiltinMethod;
use crate::lifecycle;

/// A builtin engine value with fixed native layout.
///
/// # Safety
/// - The implementor must be `#[repr(transparent)]` over `Storage`, which must have the engine's size for `VARIANT_TYPE`.
/// - `from_storage` must only be fed bytes that were produced by `into_storage` of a live value.
pub unsafe trait NativeValue: Sized + 'static {
    /// Raw storage, sized from the API manifest.
    type Storage: Copy + 'static;

    const VARIANT_TYPE: VariantType;

    /// # Safety
    /// `storage` must hold a live value of this type.
    unsafe fn from_storage(storage: Self::Storage) -> Self;

    fn into_storage(self) -> Self::Storage;

    fn sys(&self) -> sys::GDExtensionTypePtr {
        sys::force_mut_ptr(self as *const Self as sys::GDExtensionConstTypePtr)
    }

    fn sys_mut(&mut self) -> sys::GDExtensionTypePtr {
        self as *mut Self as sys::GDExtensionTypePtr
    }

    fn sys_const(&self) -> sys::GDExtensionConstTypePtr {
        self as *const Self as sys::GDExtensionConstTypePtr
    }

    /// Constructs an empty value with the engine's default constructor.
    fn new_default() -> Self {
        // SAFETY: default constructor writes a complete value.
        unsafe {
            Self::new_with_init(|dst| lifecycle::construct_default(Self::VARIANT_TYPE, dst))
        }
    }

    /// Copy-constructs a new value. For refcounted builtins, the result shares engine-side data with `self`.
    fn clone_native(&self) -> Self {
        let src = self.sys_const();

        // SAFETY: copy constructor writes a complete value from a live source.
        unsafe {
            Self::new_with_init(|dst| lifecycle::construct_copy(Self::VARIANT_TYPE, dst, src))
        }
    }

    /// Releases the engine-side resources.
    ///
    /// # Safety
    /// The value must be live, and must not be used afterwards (except for overwriting it).
    unsafe fn destroy(&mut self) {
        // SAFETY: forwarded to caller.
        unsafe { lifecycle::destroy(Self::VARIANT_TYPE, self.sys_mut()) };
    }

    /// Creates uninitialized storage and lets `init` construct a value in it.
    ///
    /// # Safety
    /// `init` must fully initialize the storage as a value of this type.
    unsafe fn new_with_init(init: impl FnOnce(sys::GDExtensionUninitializedTypePtr)) -> Self {
        let mut raw = std::mem::MaybeUninit::<Self::Storage>::uninit();
        init(raw.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);

        // SAFETY: initialized by `init`.
        unsafe { Self::from_storage(raw.assume_init()) }
    }

    /// Reads a value from a raw slot, copy-constructing it. The slot stays owned by its owner.
    ///
    /// # Safety
    /// `ptr` must point to a live value of this type.
    unsafe fn copy_from_sys(ptr: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        unsafe {
            Self::new_with_init(|dst| lifecycle::construct_copy(Self::VARIANT_TYPE, dst, ptr))
        }
    }

    /// Moves the value out of a raw slot, taking over its ownership. The slot must not be destroyed afterwards.
    ///
    /// # Safety
    /// `ptr` must point to a live value of this type, owned by the caller.
    unsafe fn take_from_sys(ptr: sys::GDExtensionTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        unsafe { Self::from_storage(std::ptr::read(ptr as *const Self::Storage)) }
    }

    /// Moves the value into an uninitialized raw slot, which becomes its owner.
    ///
    /// # Safety
    /// `dst` must point to writable, uninitialized storage of this type.
    unsafe fn move_into_sys(self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { std::ptr::write(dst as *mut Self::Storage, self.into_storage()) };
    }
}

/// Implements [`NativeValue`] for a `#[repr(transparent)]` struct with a single `opaque` field.
macro_rules! impl_native_value {
    ($Native:ident, $Opaque:ident, $Variant:ident) => {
        // SAFETY: `$Native` is `#[repr(transparent)]` over its single opaque field.
        unsafe impl $crate::native::NativeValue for $Native {
            type Storage = $crate::types::$Opaque;

            const VARIANT_TYPE: $crate::VariantType = $crate::VariantType::$Variant;

            unsafe fn from_storage(storage: Self::Storage) -> Self {
                Self { opaque: storage }
            }

            fn into_storage(self) -> Self::Storage {
                self.opaque
            }
        }

        $crate::static_assert_eq_size_align!($Native, $crate::types::$Opaque);
    };
}

pub(crate) use impl_native_value;

/// Fetches a builtin method through a call-site local cache cell.
macro_rules! builtin_method {
    ($Variant:ident, $name:literal, $hash:literal) => {{
        static CELL: $crate::BindCell<$crate::PtrBuiltinMethod> = $crate::BindCell::new();
        $crate::resolve_builtin_method(&CELL, $crate::VariantType::$Variant, $name, $hash)
    }};
}

pub(crate) use builtin_method;

/// Invokes a builtin method by pointer call.
///
/// # Safety
/// `base` must be a live value of the method's type; `args` and `ret` must match its signature.
pub(crate) unsafe fn call_builtin(
    method: PtrBuiltinMethod,
    base: sys::GDExtensionTypePtr,
    args: &[sys::GDExtensionConstTypePtr],
    ret: sys::GDExtensionTypePtr,
) {
    // SAFETY: forwarded to caller.
    unsafe { method(base, args.as_ptr(), ret, args.len() as c_int) };
}

/// Calls a builtin method returning `int`, without arguments.
///
/// # Safety
/// See [`call_builtin`].
pub(crate) unsafe fn call_builtin_int(method: PtrBuiltinMethod, base: sys::GDExtensionTypePtr) -> i64 {
    let mut ret: i64 = 0;

    // SAFETY: forwarded to caller.
    unsafe { call_builtin(method, base, &[], &mut ret as *mut i64 as sys::GDExtensionTypePtr) };
    ret
}

/// Returns `len` as a checked index argument.
pub(crate) fn index_arg(index: usize) -> sys::GDExtensionInt {
    sys::conv::usize_to_int(index)
}
