/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::c_char;

use crate as sys;
use crate::bind_cache::{BindCell, PtrConstructor};
use crate::native::{NativeValue, builtin_method, call_builtin_int, impl_native_value};
use crate::{VariantType, interface_fn, lifecycle};

/// Engine `String`: refcounted, copy-on-write UTF-32 buffer.
#[repr(transparent)]
pub struct NativeString {
    opaque: sys::types::OpaqueString,
}

impl_native_value!(NativeString, OpaqueString, String);

impl NativeString {
    /// Creates a new engine string holding a deep copy of `s`.
    pub fn from_str(s: &str) -> Self {
        let string_new = interface_fn!(string_new_with_utf8_chars_and_len);

        // SAFETY: the engine copies `s` into fresh storage.
        unsafe {
            Self::new_with_init(|dst| {
                string_new(
                    dst as sys::GDExtensionUninitializedStringPtr,
                    s.as_ptr() as *const c_char,
                    sys::conv::usize_to_int(s.len()),
                )
            })
        }
    }

    /// Copies the contents into a Rust string.
    pub fn to_rust_string(&self) -> String {
        let to_utf8 = interface_fn!(string_to_utf8_chars);
        let self_ptr = self.sys_const() as sys::GDExtensionConstStringPtr;

        // SAFETY: first call only queries the length; second call writes at most `len` bytes.
        unsafe {
            let len = to_utf8(self_ptr, std::ptr::null_mut(), 0);
            let len = usize::try_from(len).unwrap_or(0);
            if len == 0 {
                return String::new();
            }

            let mut buf = vec![0u8; len];
            to_utf8(self_ptr, buf.as_mut_ptr() as *mut c_char, sys::conv::usize_to_int(len));

            String::from_utf8(buf).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }

    /// Number of characters (code points).
    pub fn len(&self) -> usize {
        let method = builtin_method!(String, "length", 3173160232);

        // SAFETY: `length()` takes no arguments and returns `int`.
        let len = unsafe { call_builtin_int(method, self.sys()) };
        len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_string_name(name: &NativeStringName) -> Self {
        static CTOR: BindCell<PtrConstructor> = BindCell::new();
        let args = [name.sys_const()];

        // SAFETY: constructor 2 of String takes one StringName.
        unsafe {
            Self::new_with_init(|dst| {
                lifecycle::construct_with(&CTOR, VariantType::String, 2, dst, &args)
            })
        }
    }

    pub fn from_node_path(path: &NativeNodePath) -> Self {
        static CTOR: BindCell<PtrConstructor> = BindCell::new();
        let args = [path.sys_const()];

        // SAFETY: constructor 3 of String takes one NodePath.
        unsafe {
            Self::new_with_init(|dst| {
                lifecycle::construct_with(&CTOR, VariantType::String, 3, dst, &args)
            })
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Engine `StringName`: interned string; equal names share one pointer.
#[repr(transparent)]
pub struct NativeStringName {
    opaque: sys::types::OpaqueStringName,
}

impl_native_value!(NativeStringName, OpaqueStringName, StringName);

impl NativeStringName {
    pub fn from_str(s: &str) -> Self {
        let string_name_new = interface_fn!(string_name_new_with_utf8_chars_and_len);

        // SAFETY: the engine interns a copy of `s`.
        unsafe {
            Self::new_with_init(|dst| {
                string_name_new(
                    dst as sys::GDExtensionUninitializedStringNamePtr,
                    s.as_ptr() as *const c_char,
                    sys::conv::usize_to_int(s.len()),
                )
            })
        }
    }

    pub fn from_string(string: &NativeString) -> Self {
        static CTOR: BindCell<PtrConstructor> = BindCell::new();
        let args = [string.sys_const()];

        // SAFETY: constructor 2 of StringName takes one String.
        unsafe {
            Self::new_with_init(|dst| {
                lifecycle::construct_with(&CTOR, VariantType::StringName, 2, dst, &args)
            })
        }
    }

    pub fn to_rust_string(&self) -> String {
        with_temp_string(NativeString::from_string_name(self), |s| s.to_rust_string())
    }

    pub fn string_name_sys(&self) -> sys::GDExtensionConstStringNamePtr {
        self.sys_const() as sys::GDExtensionConstStringNamePtr
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Engine `NodePath`: pre-parsed path of names and subnames.
#[repr(transparent)]
pub struct NativeNodePath {
    opaque: sys::types::OpaqueNodePath,
}

impl_native_value!(NativeNodePath, OpaqueNodePath, NodePath);

impl NativeNodePath {
    pub fn from_string(string: &NativeString) -> Self {
        static CTOR: BindCell<PtrConstructor> = BindCell::new();
        let args = [string.sys_const()];

        // SAFETY: constructor 2 of NodePath takes one String.
        unsafe {
            Self::new_with_init(|dst| {
                lifecycle::construct_with(&CTOR, VariantType::NodePath, 2, dst, &args)
            })
        }
    }

    pub fn from_str(s: &str) -> Self {
        with_temp_string(NativeString::from_str(s), Self::from_string)
    }

    pub fn to_rust_string(&self) -> String {
        with_temp_string(NativeString::from_node_path(self), |s| s.to_rust_string())
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Short-lived `StringName`, destroyed on drop. Used for symbol lookups.
pub struct ScratchStringName {
    inner: NativeStringName,
}

impl ScratchStringName {
    pub fn new(s: &str) -> Self {
        Self {
            inner: NativeStringName::from_str(s),
        }
    }

    pub fn as_const_ptr(&self) -> sys::GDExtensionConstStringNamePtr {
        self.inner.string_name_sys()
    }

    pub fn native(&self) -> &NativeStringName {
        &self.inner
    }
}

impl Drop for ScratchStringName {
    fn drop(&mut self) {
        // SAFETY: constructed in `new()`, destroyed exactly once here.
        unsafe { self.inner.destroy() };
    }
}

fn with_temp_string<R>(mut temp: NativeString, f: impl FnOnce(&NativeString) -> R) -> R {
    let result = f(&temp);

    // SAFETY: `temp` is owned here and not used afterwards.
    unsafe { temp.destroy() };
    result
}
