/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::builtin::{NodePath, StringName, Variant};
use crate::meta::Marshal;
use crate::meta::error::ConvertError;
use crate::sys;
use crate::sys::{NativeString, NativeValue, VariantType};

/// Engine `String`: copy-on-write, refcounted Unicode string.
///
/// Unlike the other heap-backed builtins, strings are not tracked for disposal; they are released on drop only.
pub struct GString {
    native: NativeString,
}

impl GString {
    /// Empty string.
    pub fn new() -> Self {
        Self::from_native(NativeString::new_default())
    }

    /// Number of characters (Unicode code points).
    pub fn len(&self) -> usize {
        self.native.len()
    }

    pub fn is_empty(&self) -> bool {
        self.native.is_empty()
    }

    pub(crate) fn from_native(native: NativeString) -> Self {
        Self { native }
    }

    pub(crate) fn native(&self) -> &NativeString {
        &self.native
    }

    pub fn string_sys(&self) -> sys::GDExtensionConstStringPtr {
        self.native.sys_const() as sys::GDExtensionConstStringPtr
    }

    /// Takes over the string at `src`. The slot must not be destroyed by anyone else afterwards.
    ///
    /// # Safety
    /// `src` must point to a live string, owned by the caller.
    pub unsafe fn from_sys_taking_ownership(src: sys::GDExtensionTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_native(unsafe { NativeString::take_from_sys(src) })
    }

    /// Copies the string at `src`, which stays with its owner.
    ///
    /// # Safety
    /// `src` must point to a live string.
    pub unsafe fn from_sys_copying(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_native(unsafe { NativeString::copy_from_sys(src) })
    }
}

impl Marshal for GString {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::String
    }

    fn to_variant(&self) -> Variant {
        Variant::from_builtin(&self.native)
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        variant.try_to_builtin::<NativeString>().map(Self::from_native)
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { self.native.clone_native().move_into_sys(dst) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        Ok(unsafe { Self::from_sys_copying(src) })
    }
}

impl Default for GString {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for GString {
    fn clone(&self) -> Self {
        Self::from_native(self.native.clone_native())
    }
}

impl Drop for GString {
    fn drop(&mut self) {
        // SAFETY: owned, not used afterwards.
        unsafe { self.native.destroy() };
    }
}

impl PartialEq for GString {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for GString {}

impl fmt::Display for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.native.to_rust_string())
    }
}

/// Uses string representation (with quotes).
impl fmt::Debug for GString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Conversion from/into other string types

impl From<&str> for GString {
    fn from(s: &str) -> Self {
        Self::from_native(NativeString::from_str(s))
    }
}

impl From<String> for GString {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&String> for GString {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<&GString> for String {
    fn from(s: &GString) -> Self {
        s.native.to_rust_string()
    }
}

impl From<&StringName> for GString {
    fn from(name: &StringName) -> Self {
        name.with_native(|native| Self::from_native(NativeString::from_string_name(native)))
    }
}

impl From<&NodePath> for GString {
    fn from(path: &NodePath) -> Self {
        path.with_native(|native| Self::from_native(NativeString::from_node_path(native)))
    }
}
