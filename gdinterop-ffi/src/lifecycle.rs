/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Default construction, copy construction and destruction of builtin types, cached per variant type.

use crate as sys;
use crate::bind_cache::{
    BindCell, PtrConstructor, PtrDestructor, resolve_builtin_constructor,
    resolve_builtin_destructor,
};
use crate::VariantType;

const VARIANT_TYPE_COUNT: usize = VariantType::ALL.len();

/// Constructor index of the default constructor, for every builtin type.
pub const DEFAULT_CONSTRUCTOR: i32 = 0;

/// Constructor index of the copy constructor, for every builtin type.
pub const COPY_CONSTRUCTOR: i32 = 1;

/// Default constructor, copy constructor and destructor cells for one variant type.
pub struct BuiltinLifecycle {
    default_ctor: BindCell<PtrConstructor>,
    copy_ctor: BindCell<PtrConstructor>,
    destructor: BindCell<PtrDestructor>,
}

impl BuiltinLifecycle {
    const fn new() -> Self {
        Self {
            default_ctor: BindCell::new(),
            copy_ctor: BindCell::new(),
            destructor: BindCell::new(),
        }
    }

    /// Lifecycle cells of `variant_type`.
    pub fn of(variant_type: VariantType) -> &'static Self {
        static TABLE: [BuiltinLifecycle; VARIANT_TYPE_COUNT] =
            [const { BuiltinLifecycle::new() }; VARIANT_TYPE_COUNT];

        &TABLE[variant_type as usize]
    }

    pub fn default_constructor(&self, variant_type: VariantType) -> PtrConstructor {
        resolve_builtin_constructor(&self.default_ctor, variant_type, DEFAULT_CONSTRUCTOR)
    }

    pub fn copy_constructor(&self, variant_type: VariantType) -> PtrConstructor {
        resolve_builtin_constructor(&self.copy_ctor, variant_type, COPY_CONSTRUCTOR)
    }

    pub fn destructor(&self, variant_type: VariantType) -> PtrDestructor {
        resolve_builtin_destructor(&self.destructor, variant_type)
    }
}

/// Default-constructs a value of `variant_type` into `dst`.
///
/// # Safety
/// `dst` must point to writable, uninitialized storage of the type's size.
pub unsafe fn construct_default(variant_type: VariantType, dst: sys::GDExtensionUninitializedTypePtr) {
    let ctor = BuiltinLifecycle::of(variant_type).default_constructor(variant_type);

    // SAFETY: see function contract; the default constructor takes no arguments.
    unsafe { ctor(dst, std::ptr::null()) };
}

/// Copy-constructs `src` into `dst`. For refcounted types, both then share the same engine-side data.
///
/// # Safety
/// `dst` must point to writable, uninitialized storage; `src` must point to a live value of `variant_type`.
pub unsafe fn construct_copy(
    variant_type: VariantType,
    dst: sys::GDExtensionUninitializedTypePtr,
    src: sys::GDExtensionConstTypePtr,
) {
    let ctor = BuiltinLifecycle::of(variant_type).copy_constructor(variant_type);
    let args = [src];

    // SAFETY: see function contract.
    unsafe { ctor(dst, args.as_ptr()) };
}

/// Runs the constructor `cell` (index `index`) with `args`.
///
/// # Safety
/// `dst` must point to writable, uninitialized storage; `args` must match the constructor's parameter list.
pub unsafe fn construct_with(
    cell: &BindCell<PtrConstructor>,
    variant_type: VariantType,
    index: i32,
    dst: sys::GDExtensionUninitializedTypePtr,
    args: &[sys::GDExtensionConstTypePtr],
) {
    let ctor = resolve_builtin_constructor(cell, variant_type, index);

    // SAFETY: see function contract.
    unsafe { ctor(dst, args.as_ptr()) };
}

/// Destroys the value of `variant_type` at `ptr`.
///
/// # Safety
/// `ptr` must point to a live value, which is no longer used afterwards.
pub unsafe fn destroy(variant_type: VariantType, ptr: sys::GDExtensionTypePtr) {
    let dtor = BuiltinLifecycle::of(variant_type).destructor(variant_type);

    // SAFETY: see function contract.
    unsafe { dtor(ptr) };
}
