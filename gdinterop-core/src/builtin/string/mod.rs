/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Engine string types, and marshalling of Rust `String`.
//!
//! Strings always cross the boundary as deep copies: converting a Rust string creates a fresh engine string, and reading an engine
//! string copies its contents into Rust memory.

mod gstring;
mod node_path;
mod string_name;

pub use gstring::GString;
pub use node_path::NodePath;
pub use string_name::StringName;

use crate::builtin::Variant;
use crate::meta::Marshal;
use crate::meta::error::ConvertError;
use crate::sys;
use crate::sys::{NativeString, NativeValue, VariantType};

impl Marshal for String {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::String
    }

    fn to_variant(&self) -> Variant {
        GString::from(self.as_str()).to_variant()
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        GString::try_from_variant(variant).map(|s| s.to_string())
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        let native = NativeString::from_str(self);

        // SAFETY: forwarded to caller; the slot becomes the owner of the fresh string.
        unsafe { native.move_into_sys(dst) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller; the borrowed string is only read.
        let borrowed = unsafe { &*(src as *const NativeString) };
        Ok(borrowed.to_rust_string())
    }
}
