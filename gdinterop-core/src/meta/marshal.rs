/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::builtin::{Half, Variant};
use crate::meta::conversion_registry;
use crate::meta::error::{ConvertError, FromFfiError, FromVariantError};
use crate::sys;
use crate::sys::VariantType;

/// A type that can be converted to and from [`Variant`] and raw pointer slots.
///
/// Types with a native engine representation implement all methods directly. Other types (typed arrays and dictionaries, user
/// types) implement the trait without a body, which makes every conversion go through the [conversion
/// registry](crate::meta::conversion_registry). Such types must be registered during startup, see
/// [`ExtensionLibrary::register_conversions()`](crate::init::ExtensionLibrary::register_conversions).
///
/// Conversions are expected to round-trip: `T::from_variant(&value.to_variant()) == value`.
#[diagnostic::on_unimplemented(
    message = "`Marshal` is needed to pass `{Self}` to the engine",
    note = "implement `Marshal` without a body and register conversion slots at startup"
)]
pub trait Marshal: Sized + 'static {
    /// `false` for types that implement all conversions themselves.
    #[doc(hidden)]
    const VIA_REGISTRY: bool = true;

    /// Variant type holding values of `Self`. `Nil` if it is not fixed (e.g. for [`Variant`] itself).
    fn variant_type() -> VariantType {
        VariantType::Nil
    }

    /// Converts to a new variant that independently owns its resources.
    ///
    /// # Panics
    /// If `Self` has no conversion path.
    fn to_variant(&self) -> Variant {
        self.try_to_variant()
            .unwrap_or_else(|err| panic!("Marshal::to_variant() failed -- {err}"))
    }

    /// Like [`to_variant()`](Self::to_variant), but reports a missing conversion path as error.
    fn try_to_variant(&self) -> Result<Variant, ConvertError> {
        if Self::VIA_REGISTRY {
            conversion_registry::get::<Self>().map(|slots| (slots.to_variant)(self))
        } else {
            Ok(self.to_variant())
        }
    }

    /// Converts from a variant, returning `Err` if the variant holds another type or the value is out of domain.
    ///
    /// The variant is not modified. Heap-backed results own their data.
    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        let slots = conversion_registry::get::<Self>()?;
        (slots.from_variant)(variant)
    }

    /// ⚠️ Converts from a variant.
    ///
    /// # Panics
    /// If the conversion fails.
    fn from_variant(variant: &Variant) -> Self {
        Self::try_from_variant(variant)
            .unwrap_or_else(|err| panic!("Marshal::from_variant() failed -- {err}"))
    }

    /// Writes the native representation of `self` into `dst`, which owns an independent copy afterwards.
    ///
    /// # Safety
    /// `dst` must point to writable, uninitialized storage for the native type of `Self`.
    ///
    /// # Panics
    /// If `Self` has no conversion path.
    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        let slots = conversion_registry::get::<Self>()
            .unwrap_or_else(|err| panic!("Marshal::write_to_ptr() failed -- {err}"));

        // SAFETY: forwarded to caller.
        unsafe { (slots.write_ptr)(self, dst) }
    }

    /// Reads a value from a raw slot, which stays owned by its owner.
    ///
    /// # Safety
    /// `src` must point to a live value of the native type of `Self`.
    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        let slots = conversion_registry::get::<Self>()?;

        // SAFETY: forwarded to caller.
        unsafe { (slots.read_ptr)(src) }
    }

    /// ⚠️ Reads a value from a raw slot.
    ///
    /// # Safety
    /// See [`try_read_from_ptr()`](Self::try_read_from_ptr).
    ///
    /// # Panics
    /// If the conversion fails.
    unsafe fn read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        unsafe { Self::try_read_from_ptr(src) }
            .unwrap_or_else(|err| panic!("Marshal::read_from_ptr() failed -- {err}"))
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Free functions

/// Converts `value` to a new, independently owned [`Variant`].
///
/// # Panics
/// If `T` has no conversion path.
pub fn to_variant<T: Marshal>(value: &T) -> Variant {
    value.to_variant()
}

/// Converts `value` to a [`Variant`]; an unsupported type is an `Err`.
pub fn try_to_variant<T: Marshal>(value: &T) -> Result<Variant, ConvertError> {
    value.try_to_variant()
}

/// ⚠️ Converts `variant` to `T`.
///
/// # Panics
/// If the variant does not hold a `T`, or `T` has no conversion path.
pub fn from_variant<T: Marshal>(variant: &Variant) -> T {
    T::from_variant(variant)
}

/// Converts `variant` to `T`, returning `Err` on failure.
pub fn try_from_variant<T: Marshal>(variant: &Variant) -> Result<T, ConvertError> {
    T::try_from_variant(variant)
}

/// Writes the native representation of `value` into the typed slot `dst`.
///
/// Strings are deep-copied, containers copy-constructed, objects passed as raw pointer.
///
/// # Safety
/// `dst` must point to writable, uninitialized storage for the native type of `T`. The caller is responsible for the slot's
/// contents afterwards.
pub unsafe fn to_unmanaged_ptr<T: Marshal>(dst: sys::GDExtensionUninitializedTypePtr, value: &T) {
    // SAFETY: forwarded to caller.
    unsafe { value.write_to_ptr(dst) }
}

/// ⚠️ Reads the typed slot `src` into an owned `T`. The slot is left untouched.
///
/// # Safety
/// `src` must point to a live value of the native type of `T`.
///
/// # Panics
/// If the conversion fails.
pub unsafe fn from_unmanaged_ptr<T: Marshal>(src: sys::GDExtensionConstTypePtr) -> T {
    // SAFETY: forwarded to caller.
    unsafe { T::read_from_ptr(src) }
}

/// Reads the typed slot `src` into an owned `T`, returning `Err` on failure.
///
/// # Safety
/// `src` must point to a live value of the native type of `T`.
pub unsafe fn try_from_unmanaged_ptr<T: Marshal>(
    src: sys::GDExtensionConstTypePtr,
) -> Result<T, ConvertError> {
    // SAFETY: forwarded to caller.
    unsafe { T::try_read_from_ptr(src) }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Slot helpers

/// Writes a plain value into a raw slot.
///
/// # Safety
/// `dst` must be valid for writes of `T`, and aligned for it.
#[inline]
pub(crate) unsafe fn write_slot<T: Copy>(dst: sys::GDExtensionUninitializedTypePtr, value: T) {
    // SAFETY: see function contract.
    unsafe { std::ptr::write(dst as *mut T, value) }
}

/// Reads a plain value from a raw slot.
///
/// # Safety
/// `src` must be valid for reads of `T`, and aligned for it.
#[inline]
pub(crate) unsafe fn read_slot<T: Copy>(src: sys::GDExtensionConstTypePtr) -> T {
    // SAFETY: see function contract.
    unsafe { std::ptr::read(src as *const T) }
}

/// Implements [`Marshal`] for a `Copy` type stored inline in variants, whose pointer-slot layout is the type itself.
macro_rules! impl_marshal_inline {
    ($T:ty, $Variant:ident) => {
        impl $crate::meta::Marshal for $T {
            const VIA_REGISTRY: bool = false;

            fn variant_type() -> $crate::sys::VariantType {
                $crate::sys::VariantType::$Variant
            }

            fn to_variant(&self) -> $crate::builtin::Variant {
                // SAFETY: `$T` has the engine's payload layout of `$Variant`.
                unsafe { $crate::builtin::Variant::from_inline($crate::sys::VariantType::$Variant, *self) }
            }

            fn try_from_variant(
                variant: &$crate::builtin::Variant,
            ) -> Result<Self, $crate::meta::error::ConvertError> {
                // SAFETY: `$T` has the engine's payload layout of `$Variant`.
                unsafe { variant.try_read_inline::<Self>($crate::sys::VariantType::$Variant) }
            }

            unsafe fn write_to_ptr(&self, dst: $crate::sys::GDExtensionUninitializedTypePtr) {
                // SAFETY: forwarded to caller.
                unsafe { $crate::meta::write_slot(dst, *self) }
            }

            unsafe fn try_read_from_ptr(
                src: $crate::sys::GDExtensionConstTypePtr,
            ) -> Result<Self, $crate::meta::error::ConvertError> {
                // SAFETY: forwarded to caller.
                Ok(unsafe { $crate::meta::read_slot::<Self>(src) })
            }
        }
    };
}

/// Implements [`Marshal`] for a `Copy` value type that variants store out of line (e.g. `Transform3D`).
///
/// Variant conversion goes through the engine's per-type converters.
macro_rules! impl_marshal_boxed {
    ($T:ty, $Variant:ident) => {
        impl $crate::meta::Marshal for $T {
            const VIA_REGISTRY: bool = false;

            fn variant_type() -> $crate::sys::VariantType {
                $crate::sys::VariantType::$Variant
            }

            fn to_variant(&self) -> $crate::builtin::Variant {
                // SAFETY: `$T` has the engine's layout of `$Variant`.
                unsafe {
                    $crate::builtin::Variant::from_value_ptr(
                        $crate::sys::VariantType::$Variant,
                        self as *const Self as $crate::sys::GDExtensionConstTypePtr,
                    )
                }
            }

            fn try_from_variant(
                variant: &$crate::builtin::Variant,
            ) -> Result<Self, $crate::meta::error::ConvertError> {
                let mut value = std::mem::MaybeUninit::<Self>::uninit();

                // SAFETY: `$T` has the engine's layout of `$Variant`; the converter fully initializes `value` on success.
                unsafe {
                    variant.try_write_value_ptr(
                        $crate::sys::VariantType::$Variant,
                        value.as_mut_ptr() as $crate::sys::GDExtensionUninitializedTypePtr,
                    )?;
                    Ok(value.assume_init())
                }
            }

            unsafe fn write_to_ptr(&self, dst: $crate::sys::GDExtensionUninitializedTypePtr) {
                // SAFETY: forwarded to caller.
                unsafe { $crate::meta::write_slot(dst, *self) }
            }

            unsafe fn try_read_from_ptr(
                src: $crate::sys::GDExtensionConstTypePtr,
            ) -> Result<Self, $crate::meta::error::ConvertError> {
                // SAFETY: forwarded to caller.
                Ok(unsafe { $crate::meta::read_slot::<Self>(src) })
            }
        }
    };
}

pub(crate) use {impl_marshal_boxed, impl_marshal_inline};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Primitives

impl Marshal for bool {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::Bool
    }

    fn to_variant(&self) -> Variant {
        // SAFETY: bool payload is a single byte; remaining payload bytes stay zero.
        unsafe { Variant::from_inline(VariantType::Bool, sys::conv::bool_to_sys(*self)) }
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        // SAFETY: bool payload is a single byte.
        let raw = unsafe { variant.try_read_inline::<sys::GDExtensionBool>(VariantType::Bool)? };
        Ok(sys::conv::bool_from_sys(raw))
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { write_slot(dst, sys::conv::bool_to_sys(*self)) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        Ok(sys::conv::bool_from_sys(unsafe { read_slot::<sys::GDExtensionBool>(src) }))
    }
}

// All integer kinds widen to i64 and narrow back with `as`: the bit pattern is kept, out-of-range values wrap.
macro_rules! impl_marshal_int {
    ($($T:ty),* $(,)?) => {
        $(
            impl Marshal for $T {
                const VIA_REGISTRY: bool = false;

                fn variant_type() -> VariantType {
                    VariantType::Int
                }

                fn to_variant(&self) -> Variant {
                    // SAFETY: int payload is an i64.
                    unsafe { Variant::from_inline(VariantType::Int, *self as i64) }
                }

                fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
                    // SAFETY: int payload is an i64.
                    let wide = unsafe { variant.try_read_inline::<i64>(VariantType::Int)? };
                    Ok(wide as $T)
                }

                unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
                    // SAFETY: forwarded to caller.
                    unsafe { write_slot(dst, *self as i64) }
                }

                unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
                    // SAFETY: forwarded to caller.
                    Ok(unsafe { read_slot::<i64>(src) } as $T)
                }
            }
        )*
    };
}

impl_marshal_int!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! impl_marshal_float {
    ($($T:ty),* $(,)?) => {
        $(
            impl Marshal for $T {
                const VIA_REGISTRY: bool = false;

                fn variant_type() -> VariantType {
                    VariantType::Float
                }

                fn to_variant(&self) -> Variant {
                    // SAFETY: float payload is an f64.
                    unsafe { Variant::from_inline(VariantType::Float, *self as f64) }
                }

                fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
                    // SAFETY: float payload is an f64.
                    let wide = unsafe { variant.try_read_inline::<f64>(VariantType::Float)? };
                    Ok(wide as $T)
                }

                unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
                    // SAFETY: forwarded to caller.
                    unsafe { write_slot(dst, *self as f64) }
                }

                unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
                    // SAFETY: forwarded to caller.
                    Ok(unsafe { read_slot::<f64>(src) } as $T)
                }
            }
        )*
    };
}

impl_marshal_float!(f32, f64);

impl Marshal for Half {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::Float
    }

    fn to_variant(&self) -> Variant {
        self.to_f64().to_variant()
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        f64::try_from_variant(variant).map(Half::from_f64)
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { write_slot(dst, self.to_f64()) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        Ok(Half::from_f64(unsafe { read_slot::<f64>(src) }))
    }
}

/// Stored as its scalar value. Reading a value that is not a Unicode scalar fails, since `char` cannot represent it.
impl Marshal for char {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::Int
    }

    fn to_variant(&self) -> Variant {
        (*self as u32).to_variant()
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        let scalar = u32::try_from_variant(variant)?;
        char::from_u32(scalar).ok_or_else(|| FromVariantError::BadValue.into_error(variant))
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { (*self as u32).write_to_ptr(dst) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        let scalar = unsafe { u32::try_read_from_ptr(src)? };
        char::from_u32(scalar).ok_or_else(|| FromFfiError::Char.into_error())
    }
}

/// Return type of functions without a result. Only `Nil` converts back.
impl Marshal for () {
    const VIA_REGISTRY: bool = false;

    fn to_variant(&self) -> Variant {
        Variant::nil()
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        if variant.is_nil() {
            Ok(())
        } else {
            Err(FromVariantError::BadType {
                expected: VariantType::Nil,
                actual: variant.get_type(),
            }
            .into_error(variant))
        }
    }

    unsafe fn write_to_ptr(&self, _dst: sys::GDExtensionUninitializedTypePtr) {}

    unsafe fn try_read_from_ptr(_src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        Ok(())
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Option

/// Types with a null state in their native representation (object pointers).
///
/// `Option<T>` of such types maps `None` to a `Nil` variant and a null pointer slot.
pub trait NullableMarshal: Marshal {
    /// # Safety
    /// `dst` must point to writable, uninitialized storage for the native type of `Self`.
    unsafe fn write_null_to_ptr(dst: sys::GDExtensionUninitializedTypePtr);

    /// # Safety
    /// `src` must point to a live value of the native type of `Self`.
    unsafe fn is_null_ptr(src: sys::GDExtensionConstTypePtr) -> bool;

    /// Whether `variant` represents `None`: `Nil`, or a null value of this type.
    fn is_null_variant(variant: &Variant) -> bool {
        variant.is_nil()
    }
}

impl<T: NullableMarshal> Marshal for Option<T> {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        T::variant_type()
    }

    fn to_variant(&self) -> Variant {
        match self {
            Some(inner) => inner.to_variant(),
            None => Variant::nil(),
        }
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        if T::is_null_variant(variant) {
            return Ok(None);
        }

        T::try_from_variant(variant).map(Some)
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe {
            match self {
                Some(inner) => inner.write_to_ptr(dst),
                None => T::write_null_to_ptr(dst),
            }
        }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        unsafe {
            if T::is_null_ptr(src) {
                return Ok(None);
            }

            T::try_read_from_ptr(src).map(Some)
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::mem::MaybeUninit;

    fn through_slot<T: Marshal, U: Marshal>(value: T) -> U {
        // Slot large enough for any primitive kind.
        let mut slot = MaybeUninit::<[u64; 2]>::zeroed();
        let dst = slot.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr;

        unsafe {
            value.write_to_ptr(dst);
            U::read_from_ptr(dst as sys::GDExtensionConstTypePtr)
        }
    }

    #[test]
    fn slot_stores_ints_as_i64() {
        let mut slot = MaybeUninit::<i64>::uninit();
        unsafe {
            (-5i8).write_to_ptr(slot.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);
            assert_eq!(slot.assume_init(), -5);
        }
    }

    #[test]
    fn slot_truncates_like_as() {
        let high_bit: u64 = 0x8000_0000_0000_0001;

        assert_eq!(through_slot::<u64, i64>(high_bit), i64::MIN + 1);
        assert_eq!(through_slot::<u64, u32>(high_bit), 1);
        assert_eq!(through_slot::<u64, u8>(high_bit), 1);
        assert_eq!(through_slot::<i64, u16>(-1), u16::MAX);
        assert_eq!(through_slot::<u32, i8>(0x1ff), -1);
    }

    #[test]
    fn slot_bool_is_one_byte() {
        let mut slot = MaybeUninit::<u8>::uninit();
        unsafe {
            true.write_to_ptr(slot.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);
            assert_eq!(slot.assume_init(), 1);
        }

        assert!(through_slot::<bool, bool>(true));
        assert!(!through_slot::<bool, bool>(false));
    }

    #[test]
    fn slot_char_rejects_surrogates() {
        assert_eq!(through_slot::<char, char>('ß'), 'ß');

        let mut slot = MaybeUninit::<i64>::new(0xD800);
        let result = unsafe { char::try_read_from_ptr(slot.as_mut_ptr() as sys::GDExtensionConstTypePtr) };

        let err = result.expect_err("surrogate is not a char");
        assert!(err.to_string().contains("char"), "{err}");
    }

    #[test]
    fn slot_floats_widen_to_f64() {
        let mut slot = MaybeUninit::<f64>::uninit();
        unsafe {
            1.5f32.write_to_ptr(slot.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);
            assert_eq!(slot.assume_init(), 1.5);
        }

        assert_eq!(through_slot::<Half, Half>(Half::from_f32(0.25)).to_f32(), 0.25);
        assert!(through_slot::<f64, f32>(f64::NAN).is_nan());
        assert_eq!(through_slot::<f64, f32>(f64::INFINITY), f32::INFINITY);
    }

    proptest! {
        #[test]
        fn int_narrowing_matches_as_cast(value in any::<i64>()) {
            prop_assert_eq!(through_slot::<i64, i8>(value), value as i8);
            prop_assert_eq!(through_slot::<i64, u16>(value), value as u16);
            prop_assert_eq!(through_slot::<i64, i32>(value), value as i32);
            prop_assert_eq!(through_slot::<i64, u64>(value), value as u64);
        }

        #[test]
        fn unsigned_widening_preserves_bits(value in any::<u64>()) {
            prop_assert_eq!(through_slot::<u64, u64>(value), value);
            prop_assert_eq!(through_slot::<u64, i64>(value), value as i64);
        }

        #[test]
        fn float_narrowing_matches_as_cast(value in any::<f64>()) {
            let narrowed = through_slot::<f64, f32>(value);
            if value.is_nan() {
                prop_assert!(narrowed.is_nan());
            } else {
                prop_assert_eq!(narrowed, value as f32);
            }
        }
    }
}
