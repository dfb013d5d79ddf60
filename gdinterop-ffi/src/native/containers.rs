/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate as sys;
use crate::native::{
    NativeValue, NativeVariant, builtin_method, call_builtin, call_builtin_int, impl_native_value,
    index_arg,
};
use crate::{VariantType, interface_fn};

/// Engine `Array`: refcounted, shared (not copy-on-write) list of variants.
#[repr(transparent)]
pub struct NativeArray {
    opaque: sys::types::OpaqueArray,
}

impl_native_value!(NativeArray, OpaqueArray, Array);

impl NativeArray {
    pub fn len(&self) -> usize {
        let method = builtin_method!(Array, "size", 3173160232);

        // SAFETY: `size()` takes no arguments and returns `int`.
        unsafe { call_builtin_int(method, self.sys()) as usize }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resizes the array; new elements are `Nil`.
    pub fn resize(&mut self, new_len: usize) {
        let method = builtin_method!(Array, "resize", 848867239);
        let len = index_arg(new_len);
        let mut err: i64 = 0;

        // SAFETY: `resize(int) -> Error`.
        unsafe {
            call_builtin(
                method,
                self.sys_mut(),
                &[&len as *const i64 as sys::GDExtensionConstTypePtr],
                &mut err as *mut i64 as sys::GDExtensionTypePtr,
            )
        };
    }

    pub fn clear(&mut self) {
        let method = builtin_method!(Array, "clear", 3218959716);

        // SAFETY: `clear()` takes no arguments, returns nothing.
        unsafe { call_builtin(method, self.sys_mut(), &[], std::ptr::null_mut()) };
    }

    /// Shallow (`deep = false`) or deep copy into a new, independent array.
    pub fn duplicate(&self, deep: bool) -> Self {
        let method = builtin_method!(Array, "duplicate", 636440122);
        let deep = sys::conv::bool_to_sys(deep);

        // SAFETY: `duplicate(bool) -> Array`; the engine constructs the return value.
        unsafe {
            Self::new_with_init(|dst| {
                call_builtin(
                    method,
                    self.sys(),
                    &[&deep as *const sys::GDExtensionBool as sys::GDExtensionConstTypePtr],
                    dst,
                )
            })
        }
    }

    /// Pointer to the element at `index`, or null if out of bounds.
    pub fn element_ptr(&self, index: usize) -> *const NativeVariant {
        let index_fn = interface_fn!(array_operator_index_const);

        // SAFETY: the engine bounds-checks and returns null on failure.
        unsafe { index_fn(self.sys_const(), index_arg(index)) as *const NativeVariant }
    }

    /// Mutable pointer to the element at `index`, or null if out of bounds.
    pub fn element_ptr_mut(&mut self, index: usize) -> *mut NativeVariant {
        let index_fn = interface_fn!(array_operator_index);

        // SAFETY: the engine bounds-checks and returns null on failure.
        unsafe { index_fn(self.sys_mut(), index_arg(index)) as *mut NativeVariant }
    }

    /// Restricts elements to `element_type`. Must be called on an empty array.
    pub fn set_typed(&mut self, element_type: VariantType) {
        let set_typed = interface_fn!(array_set_typed);
        let class_name = sys::ScratchStringName::new("");
        let script = NativeVariant::nil();

        // SAFETY: all pointers are live during the call.
        unsafe {
            set_typed(
                self.sys_mut(),
                element_type.sys(),
                class_name.as_const_ptr(),
                script.variant_sys_const(),
            )
        };
    }

    /// Element type if the array is typed, `Nil` otherwise.
    pub fn element_type(&self) -> VariantType {
        let method = builtin_method!(Array, "get_typed_builtin", 3173160232);

        // SAFETY: `get_typed_builtin() -> int`.
        let ord = unsafe { call_builtin_int(method, self.sys()) };
        VariantType::try_from_ord(ord as i32).unwrap_or(VariantType::Nil)
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Engine `Dictionary`: refcounted, shared, insertion-ordered map of variants.
#[repr(transparent)]
pub struct NativeDictionary {
    opaque: sys::types::OpaqueDictionary,
}

impl_native_value!(NativeDictionary, OpaqueDictionary, Dictionary);

impl NativeDictionary {
    pub fn len(&self) -> usize {
        let method = builtin_method!(Dictionary, "size", 3173160232);

        // SAFETY: `size()` takes no arguments and returns `int`.
        unsafe { call_builtin_int(method, self.sys()) as usize }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        let method = builtin_method!(Dictionary, "clear", 3218959716);

        // SAFETY: `clear()` takes no arguments, returns nothing.
        unsafe { call_builtin(method, self.sys_mut(), &[], std::ptr::null_mut()) };
    }

    pub fn duplicate(&self, deep: bool) -> Self {
        let method = builtin_method!(Dictionary, "duplicate", 830099069);
        let deep = sys::conv::bool_to_sys(deep);

        // SAFETY: `duplicate(bool) -> Dictionary`.
        unsafe {
            Self::new_with_init(|dst| {
                call_builtin(
                    method,
                    self.sys(),
                    &[&deep as *const sys::GDExtensionBool as sys::GDExtensionConstTypePtr],
                    dst,
                )
            })
        }
    }

    /// All keys, in insertion order.
    pub fn keys(&self) -> NativeArray {
        let method = builtin_method!(Dictionary, "keys", 4144163970);

        // SAFETY: `keys() -> Array`.
        unsafe { NativeArray::new_with_init(|dst| call_builtin(method, self.sys(), &[], dst)) }
    }

    pub fn has(&self, key: &NativeVariant) -> bool {
        let method = builtin_method!(Dictionary, "has", 3680194679);
        let mut found = sys::SYS_FALSE;

        // SAFETY: `has(Variant) -> bool`.
        unsafe {
            call_builtin(
                method,
                self.sys(),
                &[key.sys_const()],
                &mut found as *mut sys::GDExtensionBool as sys::GDExtensionTypePtr,
            )
        };
        sys::conv::bool_from_sys(found)
    }

    /// Copy of the value under `key`, or `None` if absent.
    ///
    /// The engine's const index operator aborts on missing keys, so lookups go through `has()` and `get()`.
    pub fn get(&self, key: &NativeVariant) -> Option<NativeVariant> {
        if !self.has(key) {
            return None;
        }

        let method = builtin_method!(Dictionary, "get", 2205440559);
        let default = NativeVariant::nil();
        let mut value = NativeVariant::nil();

        // SAFETY: `get(Variant, Variant) -> Variant`; the return slot holds a `Nil` that the engine overwrites.
        unsafe {
            call_builtin(
                method,
                self.sys(),
                &[key.sys_const(), default.sys_const()],
                value.sys_mut(),
            )
        };
        Some(value)
    }

    /// Pointer to the value under `key`, inserting `Nil` if absent.
    pub fn get_or_insert_ptr(&mut self, key: &NativeVariant) -> *mut NativeVariant {
        let index_fn = interface_fn!(dictionary_operator_index);

        // SAFETY: non-const index inserts missing keys.
        unsafe { index_fn(self.sys_mut(), key.variant_sys_const()) as *mut NativeVariant }
    }

    pub fn erase(&mut self, key: &NativeVariant) -> bool {
        let method = builtin_method!(Dictionary, "erase", 1776646889);
        let mut erased = sys::SYS_FALSE;

        // SAFETY: `erase(Variant) -> bool`.
        unsafe {
            call_builtin(
                method,
                self.sys_mut(),
                &[key.sys_const()],
                &mut erased as *mut sys::GDExtensionBool as sys::GDExtensionTypePtr,
            )
        };
        sys::conv::bool_from_sys(erased)
    }
}
