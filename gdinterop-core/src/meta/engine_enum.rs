/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::builtin::Variant;
use crate::meta::error::{ConvertError, FromVariantError};
use crate::meta::{Marshal, read_slot, write_slot};
use crate::sys;

mod sealed {
    pub trait Sealed {}
}

/// Integer type backing an [`EngineEnum`]: any of the 1, 2, 4 or 8 byte integers.
///
/// The bits are sign-extended to `i64` regardless of signedness, the way the engine stores enum values; narrowing truncates.
pub trait EnumRepr: Copy + Eq + std::fmt::Debug + sealed::Sealed + 'static {
    /// Reinterprets the bits as the signed integer of the same width, then sign-extends.
    fn to_wide(self) -> i64;

    /// Truncates to the width of `Self`.
    fn from_wide(wide: i64) -> Self;
}

macro_rules! impl_enum_repr {
    ($($T:ty as $Signed:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $T {}

            impl EnumRepr for $T {
                #[inline]
                fn to_wide(self) -> i64 {
                    self as $Signed as i64
                }

                #[inline]
                fn from_wide(wide: i64) -> Self {
                    wide as $T
                }
            }
        )*
    };
}

impl_enum_repr!(
    i8 as i8,
    i16 as i16,
    i32 as i32,
    i64 as i64,
    u8 as i8,
    u16 as i16,
    u32 as i32,
    u64 as i64,
);

/// Fieldless enum whose values cross the engine boundary as integers.
///
/// Usually derived with `#[derive(EngineEnum)]`, which also implements [`Marshal`] through the helpers in this module. The
/// storage width follows the enum's `#[repr]` attribute (`i32` if absent).
pub trait EngineEnum: Copy + Sized + 'static {
    type Repr: EnumRepr;

    fn ord(self) -> Self::Repr;

    /// `None` if `ord` does not name an enumerator.
    fn try_from_ord(ord: Self::Repr) -> Option<Self>;
}

/// [`Marshal::to_variant()`] of an engine enum.
pub fn enum_to_variant<E: EngineEnum>(value: &E) -> Variant {
    value.ord().to_wide().to_variant()
}

/// [`Marshal::try_from_variant()`] of an engine enum.
pub fn enum_try_from_variant<E: EngineEnum>(variant: &Variant) -> Result<E, ConvertError> {
    let wide = i64::try_from_variant(variant)?;

    E::try_from_ord(E::Repr::from_wide(wide))
        .ok_or_else(|| FromVariantError::InvalidEnum.into_error(variant))
}

/// [`Marshal::write_to_ptr()`] of an engine enum.
///
/// # Safety
/// `dst` must be valid for writes of `i64`.
pub unsafe fn enum_write_to_ptr<E: EngineEnum>(value: &E, dst: sys::GDExtensionUninitializedTypePtr) {
    // SAFETY: forwarded to caller.
    unsafe { write_slot(dst, value.ord().to_wide()) }
}

/// [`Marshal::try_read_from_ptr()`] of an engine enum.
///
/// # Safety
/// `src` must be valid for reads of `i64`.
pub unsafe fn enum_try_read_from_ptr<E: EngineEnum>(
    src: sys::GDExtensionConstTypePtr,
) -> Result<E, ConvertError> {
    // SAFETY: forwarded to caller.
    let wide = unsafe { read_slot::<i64>(src) };

    E::try_from_ord(E::Repr::from_wide(wide)).ok_or_else(|| {
        ConvertError::new(format!(
            "{wide} is not a valid {}",
            std::any::type_name::<E>()
        ))
    })
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Copy, Clone, Eq, PartialEq, Debug)]
    #[repr(u8)]
    enum Layer {
        Ground = 1,
        Sky = 200,
    }

    impl EngineEnum for Layer {
        type Repr = u8;

        fn ord(self) -> u8 {
            self as u8
        }

        fn try_from_ord(ord: u8) -> Option<Self> {
            match ord {
                1 => Some(Self::Ground),
                200 => Some(Self::Sky),
                _ => None,
            }
        }
    }

    #[test]
    fn unsigned_repr_is_sign_extended() {
        let mut slot = std::mem::MaybeUninit::<i64>::uninit();
        unsafe {
            enum_write_to_ptr(&Layer::Sky, slot.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);
            assert_eq!(slot.assume_init(), -56);

            let back: Layer = enum_try_read_from_ptr(slot.as_ptr() as sys::GDExtensionConstTypePtr)
                .expect("valid enumerator");
            assert_eq!(back, Layer::Sky);
        }
    }

    #[test]
    fn invalid_ordinal_is_rejected() {
        let slot = std::mem::MaybeUninit::<i64>::new(7);
        let result: Result<Layer, _> =
            unsafe { enum_try_read_from_ptr(slot.as_ptr() as sys::GDExtensionConstTypePtr) };

        let err = result.expect_err("7 is not a Layer");
        assert!(err.to_string().contains("Layer"), "{err}");
    }

    #[test]
    fn variant_round_trip() {
        let variant = enum_to_variant(&Layer::Ground);
        assert_eq!(variant.get_type(), sys::VariantType::Int);
        assert_eq!(i64::from_variant(&variant), 1);
        assert_eq!(enum_try_from_variant::<Layer>(&variant).ok(), Some(Layer::Ground));
    }

    proptest! {
        #[test]
        fn repr_round_trips_through_wide(a in any::<u8>(), b in any::<i16>(), c in any::<u32>(), d in any::<i64>()) {
            prop_assert_eq!(u8::from_wide(a.to_wide()), a);
            prop_assert_eq!(i16::from_wide(b.to_wide()), b);
            prop_assert_eq!(u32::from_wide(c.to_wide()), c);
            prop_assert_eq!(i64::from_wide(d.to_wide()), d);
            prop_assert_eq!(c.to_wide(), c as i32 as i64);
        }
    }
}
