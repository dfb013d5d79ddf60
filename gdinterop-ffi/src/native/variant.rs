/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Raw engine `Variant`: an `i32` type tag at offset 0, followed by the payload at offset 8.
//!
//! Small value types live in the payload directly ("inline"); everything else is a pointer or refcounted handle owned by the
//! variant. Inline variants can be copied bitwise and need no destructor, which the fast paths below exploit.

use std::mem::size_of;

use crate as sys;
use crate::bind_cache::{type_from_variant_fn, variant_from_type_fn};
use crate::native::{NativeString, NativeStringName, NativeValue};
use crate::{VariantOperator, VariantType, interface_fn};

/// Byte offset of the payload inside a variant.
pub const VARIANT_PAYLOAD_OFFSET: usize = 8;

#[repr(transparent)]
pub struct NativeVariant {
    opaque: sys::types::OpaqueVariant,
}

// SAFETY: `NativeVariant` is `#[repr(transparent)]` over `OpaqueVariant`. Lifecycle methods are overridden, since variants are not
// constructed through builtin constructor tables.
unsafe impl NativeValue for NativeVariant {
    type Storage = sys::types::OpaqueVariant;

    // A variant has no tag of its own; `Nil` is what an empty one holds.
    const VARIANT_TYPE: VariantType = VariantType::Nil;

    unsafe fn from_storage(storage: Self::Storage) -> Self {
        Self { opaque: storage }
    }

    fn into_storage(self) -> Self::Storage {
        self.opaque
    }

    fn new_default() -> Self {
        Self::nil()
    }

    fn clone_native(&self) -> Self {
        if is_inline_type(self.get_type()) {
            return Self { opaque: self.opaque };
        }

        let new_copy = interface_fn!(variant_new_copy);

        // SAFETY: `self` is live; `new_copy` fully initializes the destination.
        unsafe {
            Self::new_with_init(|dst| {
                new_copy(dst as sys::GDExtensionUninitializedVariantPtr, self.variant_sys_const())
            })
        }
    }

    unsafe fn destroy(&mut self) {
        if is_inline_type(self.get_type()) {
            return;
        }

        let variant_destroy = interface_fn!(variant_destroy);

        // SAFETY: forwarded to caller.
        unsafe { variant_destroy(self.variant_sys_mut()) };
        self.opaque = sys::types::OpaqueVariant::zeroed();
    }

    unsafe fn copy_from_sys(ptr: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        let source = unsafe { &*(ptr as *const Self) };
        source.clone_native()
    }
}

crate::static_assert_eq_size_align!(NativeVariant, sys::types::OpaqueVariant);

impl NativeVariant {
    /// The `Nil` variant. Its bit pattern is all zeros, so no engine call is needed.
    pub const fn nil() -> Self {
        Self {
            opaque: sys::types::OpaqueVariant::zeroed(),
        }
    }

    /// Tag read directly from the first 4 bytes.
    pub fn get_type(&self) -> VariantType {
        let tag = self.raw_tag();
        match VariantType::try_from_ord(tag) {
            Some(ty) => ty,
            None => {
                // Tag outside this build's enum (e.g. newer engine); ask the engine.
                let get_type = interface_fn!(variant_get_type);

                // SAFETY: `self` is a live variant.
                let ord = unsafe { get_type(self.variant_sys_const()) };
                VariantType::try_from_ord(ord).unwrap_or(VariantType::Nil)
            }
        }
    }

    /// Raw tag ordinal, without validation.
    pub fn raw_tag(&self) -> i32 {
        let bytes = self.opaque.as_bytes();
        i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    pub fn is_nil(&self) -> bool {
        self.raw_tag() == VariantType::Nil as i32
    }

    /// Builds an inline variant without going through the engine.
    ///
    /// # Safety
    /// `variant_type` must be an inline type (see [`is_inline_type`]) whose engine payload layout is exactly `T`.
    pub unsafe fn from_inline<T: Copy>(variant_type: VariantType, payload: T) -> Self {
        debug_assert!(is_inline_type(variant_type), "{variant_type:?} is not inline");
        debug_assert!(VARIANT_PAYLOAD_OFFSET + size_of::<T>() <= size_of::<Self>());

        let mut variant = Self::nil();
        let base = &mut variant as *mut Self as *mut u8;

        // SAFETY: both writes stay within the variant's storage (asserted above); unaligned writes cover any `T`.
        unsafe {
            std::ptr::write_unaligned(base as *mut i32, variant_type.sys());
            std::ptr::write_unaligned(base.add(VARIANT_PAYLOAD_OFFSET) as *mut T, payload);
        }
        variant
    }

    /// Reads the payload of an inline variant.
    ///
    /// # Safety
    /// The variant must hold an inline type whose engine payload layout is exactly `T`.
    pub unsafe fn read_inline<T: Copy>(&self) -> T {
        debug_assert!(VARIANT_PAYLOAD_OFFSET + size_of::<T>() <= size_of::<Self>());
        let base = self as *const Self as *const u8;

        // SAFETY: see function contract.
        unsafe { std::ptr::read_unaligned(base.add(VARIANT_PAYLOAD_OFFSET) as *const T) }
    }

    /// Converts a typed native value into a new variant, via the engine's per-type converter.
    pub fn from_type<N: NativeValue>(value: &N) -> Self {
        let convert = variant_from_type_fn(N::VARIANT_TYPE);

        // SAFETY: `value` is live and of the converter's type; converter initializes the destination.
        unsafe {
            Self::new_with_init(|dst| {
                convert(dst as sys::GDExtensionUninitializedVariantPtr, value.sys())
            })
        }
    }

    /// Extracts a typed native value, or `None` if the tag does not match.
    pub fn to_type<N: NativeValue>(&self) -> Option<N> {
        if self.get_type() != N::VARIANT_TYPE {
            return None;
        }

        let convert = type_from_variant_fn(N::VARIANT_TYPE);

        // SAFETY: tag matches; converter initializes the destination with an independent value.
        let value = unsafe { N::new_with_init(|dst| convert(dst, self.variant_sys())) };
        Some(value)
    }

    /// Engine's `str()` of the value.
    pub fn stringify(&self) -> String {
        let stringify = interface_fn!(variant_stringify);

        // SAFETY: `variant_stringify` constructs a String into the uninitialized destination.
        let mut out = unsafe {
            NativeString::new_with_init(|dst| {
                stringify(self.variant_sys_const(), dst as sys::GDExtensionStringPtr)
            })
        };
        let result = out.to_rust_string();

        // SAFETY: local string, not used afterwards.
        unsafe { out.destroy() };
        result
    }

    pub fn hash(&self) -> i64 {
        let hash = interface_fn!(variant_hash);

        // SAFETY: `self` is live.
        unsafe { hash(self.variant_sys_const()) }
    }

    /// Evaluates `self <op> rhs`; `None` if the engine does not support the operator for these types.
    pub fn evaluate(&self, op: VariantOperator, rhs: &NativeVariant) -> Option<NativeVariant> {
        let evaluate = interface_fn!(variant_evaluate);
        let mut valid = sys::SYS_FALSE;

        // SAFETY: operands are live; the engine initializes the result in all cases.
        let mut result = unsafe {
            Self::new_with_init(|dst| {
                evaluate(
                    op.sys(),
                    self.variant_sys_const(),
                    rhs.variant_sys_const(),
                    dst as sys::GDExtensionUninitializedVariantPtr,
                    &mut valid,
                )
            })
        };

        if sys::conv::bool_from_sys(valid) {
            Some(result)
        } else {
            // SAFETY: result was initialized by the engine and is discarded here.
            unsafe { result.destroy() };
            None
        }
    }

    /// Dynamic call of `method` on the contained value.
    ///
    /// The returned variant is owned by the caller, also on error (it is then `Nil`).
    pub fn call(
        &mut self,
        method: &NativeStringName,
        args: &[&NativeVariant],
    ) -> Result<NativeVariant, sys::GDExtensionCallError> {
        let call = interface_fn!(variant_call);
        let arg_ptrs: Vec<sys::GDExtensionConstVariantPtr> =
            args.iter().map(|a| a.variant_sys_const()).collect();
        let mut err = sys::default_call_error();

        let self_ptr = self.variant_sys_mut();

        // SAFETY: all pointers are live for the call; the engine initializes the return slot.
        let ret = unsafe {
            Self::new_with_init(|dst| {
                call(
                    self_ptr,
                    method.string_name_sys(),
                    arg_ptrs.as_ptr(),
                    sys::conv::usize_to_int(arg_ptrs.len()),
                    dst as sys::GDExtensionUninitializedVariantPtr,
                    &mut err,
                )
            })
        };

        if err.error == sys::GDEXTENSION_CALL_OK {
            Ok(ret)
        } else {
            Err(err)
        }
    }

    pub fn variant_sys(&self) -> sys::GDExtensionVariantPtr {
        sys::force_mut_ptr(self.variant_sys_const())
    }

    pub fn variant_sys_mut(&mut self) -> sys::GDExtensionVariantPtr {
        self as *mut Self as sys::GDExtensionVariantPtr
    }

    pub fn variant_sys_const(&self) -> sys::GDExtensionConstVariantPtr {
        self as *const Self as sys::GDExtensionConstVariantPtr
    }
}

/// Whether values of `variant_type` are stored entirely inside the variant, with no engine-side allocation.
///
/// Such variants are bitwise copyable and have no destructor.
pub const fn is_inline_type(variant_type: VariantType) -> bool {
    use VariantType as T;

    matches!(
        variant_type,
        T::Nil
            | T::Bool
            | T::Int
            | T::Float
            | T::Vector2
            | T::Vector2i
            | T::Rect2
            | T::Rect2i
            | T::Vector3
            | T::Vector3i
            | T::Vector4
            | T::Vector4i
            | T::Plane
            | T::Quaternion
            | T::Color
            | T::Rid
    )
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_zero() {
        let nil = NativeVariant::nil();
        assert!(nil.is_nil());
        assert_eq!(nil.raw_tag(), 0);
        assert!(nil.opaque.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn inline_round_trip_without_engine() {
        let v = unsafe { NativeVariant::from_inline(VariantType::Int, -7i64) };
        assert_eq!(v.raw_tag(), VariantType::Int as i32);
        assert_eq!(v.get_type(), VariantType::Int);
        assert_eq!(unsafe { v.read_inline::<i64>() }, -7);

        // Inline clone and destroy must not touch the engine (which is not loaded in unit tests).
        let mut copy = v.clone_native();
        assert_eq!(unsafe { copy.read_inline::<i64>() }, -7);
        unsafe { copy.destroy() };
    }

    #[test]
    fn inline_classification() {
        assert!(is_inline_type(VariantType::Color));
        assert!(is_inline_type(VariantType::Rid));
        assert!(!is_inline_type(VariantType::String));
        assert!(!is_inline_type(VariantType::Transform2D));
        assert!(!is_inline_type(VariantType::Object));
        assert!(!is_inline_type(VariantType::PackedByteArray));
    }
}
