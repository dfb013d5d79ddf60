/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::c_void;

use crate as sys;
use crate::bind_cache::{BindCell, PtrConstructor, PtrOperatorEvaluator, resolve_builtin_operator};
use crate::native::{NativeStringName, NativeValue, builtin_method, call_builtin, call_builtin_int, impl_native_value};
use crate::{VariantOperator, VariantType, interface_fn, lifecycle};

/// Engine `Callable`: either a bound method (object + name) or a custom callable.
#[repr(transparent)]
pub struct NativeCallable {
    opaque: sys::types::OpaqueCallable,
}

impl_native_value!(NativeCallable, OpaqueCallable, Callable);

impl NativeCallable {
    /// Creates a custom callable. The engine takes over `info.callable_userdata` and eventually calls `info.free_func` on it.
    ///
    /// # Safety
    /// All function pointers in `info` must be valid for the userdata, and remain valid until `free_func` has been called.
    pub unsafe fn from_custom(info: &mut sys::GDExtensionCallableCustomInfo2) -> Self {
        let create = interface_fn!(callable_custom_create2);

        // SAFETY: forwarded to caller.
        unsafe { Self::new_with_init(|dst| create(dst, info as *mut _)) }
    }

    /// Userdata of a custom callable created with `token`; null if the callable is not such a custom callable.
    pub fn custom_userdata(&self, token: *mut c_void) -> *mut c_void {
        let get_userdata = interface_fn!(callable_custom_get_userdata);

        // SAFETY: the engine validates the token and returns null on mismatch.
        unsafe { get_userdata(self.sys_const(), token) }
    }

    pub fn is_valid(&self) -> bool {
        let method = builtin_method!(Callable, "is_valid", 3918633141);
        let mut valid = sys::SYS_FALSE;

        // SAFETY: `is_valid() -> bool`.
        unsafe {
            call_builtin(
                method,
                self.sys(),
                &[],
                &mut valid as *mut sys::GDExtensionBool as sys::GDExtensionTypePtr,
            )
        };
        sys::conv::bool_from_sys(valid)
    }

    /// Declared argument count, `0` if unknown.
    pub fn argument_count(&self) -> i64 {
        let method = builtin_method!(Callable, "get_argument_count", 3173160232);

        // SAFETY: `get_argument_count() -> int`.
        unsafe { call_builtin_int(method, self.sys()) }
    }

    pub fn hash(&self) -> u32 {
        let method = builtin_method!(Callable, "hash", 3173160232);

        // SAFETY: `hash() -> int`.
        unsafe { call_builtin_int(method, self.sys()) as u32 }
    }

    /// Engine-side `==`, which for custom callables delegates to their `equal_func`.
    pub fn equals(&self, other: &Self) -> bool {
        static EQ: BindCell<PtrOperatorEvaluator> = BindCell::new();
        let eq = resolve_builtin_operator(
            &EQ,
            VariantOperator::Equal,
            VariantType::Callable,
            VariantType::Callable,
        );

        let mut result = sys::SYS_FALSE;

        // SAFETY: operands are live callables; result is a bool slot.
        unsafe {
            eq(
                self.sys_const(),
                other.sys_const(),
                &mut result as *mut sys::GDExtensionBool as sys::GDExtensionTypePtr,
            )
        };
        sys::conv::bool_from_sys(result)
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Engine `Signal`: object + signal name.
#[repr(transparent)]
pub struct NativeSignal {
    opaque: sys::types::OpaqueSignal,
}

impl_native_value!(NativeSignal, OpaqueSignal, Signal);

impl NativeSignal {
    /// Signal `name` on `object`.
    ///
    /// # Safety
    /// `object` must be null or point to a live engine object.
    pub unsafe fn from_object_signal(object: sys::GDExtensionObjectPtr, name: &NativeStringName) -> Self {
        static CTOR: BindCell<PtrConstructor> = BindCell::new();
        let args = [
            &object as *const sys::GDExtensionObjectPtr as sys::GDExtensionConstTypePtr,
            name.sys_const(),
        ];

        // SAFETY: constructor 2 of Signal takes (Object, StringName).
        unsafe {
            Self::new_with_init(|dst| {
                lifecycle::construct_with(&CTOR, VariantType::Signal, 2, dst, &args)
            })
        }
    }

    pub fn name(&self) -> NativeStringName {
        let method = builtin_method!(Signal, "get_name", 2002593661);

        // SAFETY: `get_name() -> StringName`.
        unsafe { NativeStringName::new_with_init(|dst| call_builtin(method, self.sys(), &[], dst)) }
    }

    /// Instance ID of the owning object, `0` for a null signal.
    pub fn object_id(&self) -> u64 {
        let method = builtin_method!(Signal, "get_object_id", 2944547224);

        // SAFETY: `get_object_id() -> int`.
        unsafe { call_builtin_int(method, self.sys()) as u64 }
    }
}
