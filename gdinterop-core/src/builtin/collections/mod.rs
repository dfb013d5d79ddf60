/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Arrays, dictionaries and packed arrays.
//!
//! All containers are shared, refcounted engine values. To keep ownership unambiguous at the boundary, conversions to and from
//! `Variant` store and extract shallow duplicates: after `to_variant()` or `from_variant()`, mutating one side never shows on the
//! other. Raw pointer slots receive a copy-constructed handle, like any other engine call argument.

mod array;
mod dictionary;
mod packed_array;

pub use array::{Array, VarArray};
pub use dictionary::{Dictionary, TypedDictionary};
pub use packed_array::*;

use crate::builtin::Variant;
use crate::sys::{NativeValue, NativeVariant};

/// Replaces the variant stored at `slot`, releasing the previous value.
///
/// # Safety
/// `slot` must point to a live variant element of a container, with no other references to it.
pub(crate) unsafe fn replace_variant_slot(slot: *mut NativeVariant, value: Variant) {
    // SAFETY: see function contract; after `destroy()`, the slot is overwritten without being read.
    unsafe {
        (*slot).destroy();
        value.move_into_var_sys(slot as crate::sys::GDExtensionUninitializedVariantPtr);
    }
}
