/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Ownership entry points, disposal, `Clone` and [`Marshal`](crate::meta::Marshal) for a builtin that wraps
/// `Tracked<$Native>` in a field named `inner`.
///
/// The wrapper must provide `fn from_tracked(Tracked<$Native>) -> Self`.
macro_rules! impl_tracked_builtin {
    ($Builtin:ty, $Native:ty) => {
        impl $Builtin {
            /// Takes over the value at `src`. The slot must not be destroyed by anyone else afterwards.
            ///
            /// # Safety
            /// `src` must point to a live value of this type, owned by the caller.
            pub unsafe fn from_sys_taking_ownership(src: $crate::sys::GDExtensionTypePtr) -> Self {
                // SAFETY: forwarded to caller.
                Self::from_tracked(unsafe { $crate::lifetime::Tracked::from_sys_taking_ownership(src) })
            }

            /// Copies the value at `src`, which stays with its owner.
            ///
            /// # Safety
            /// `src` must point to a live value of this type.
            pub unsafe fn from_sys_copying(src: $crate::sys::GDExtensionConstTypePtr) -> Self {
                // SAFETY: forwarded to caller.
                Self::from_tracked(unsafe { $crate::lifetime::Tracked::from_sys_copying(src) })
            }

            /// Releases the native value now. Later calls and the eventual drop are no-ops; any other use panics.
            pub fn dispose(&self) {
                self.inner.dispose();
            }

            pub fn is_disposed(&self) -> bool {
                self.inner.is_disposed()
            }

            pub(crate) fn from_native(native: $Native) -> Self {
                Self::from_tracked($crate::lifetime::Tracked::new(native))
            }
        }

        impl Clone for $Builtin {
            fn clone(&self) -> Self {
                Self::from_native(self.inner.clone_native())
            }
        }

        impl $crate::meta::Marshal for $Builtin {
            const VIA_REGISTRY: bool = false;

            fn variant_type() -> $crate::sys::VariantType {
                <$Native as $crate::sys::NativeValue>::VARIANT_TYPE
            }

            fn to_variant(&self) -> $crate::builtin::Variant {
                self.inner.with(|native| $crate::builtin::Variant::from_builtin(native))
            }

            fn try_from_variant(
                variant: &$crate::builtin::Variant,
            ) -> Result<Self, $crate::meta::error::ConvertError> {
                variant.try_to_builtin::<$Native>().map(Self::from_native)
            }

            unsafe fn write_to_ptr(&self, dst: $crate::sys::GDExtensionUninitializedTypePtr) {
                let copy = self.inner.clone_native();

                // SAFETY: forwarded to caller.
                unsafe { $crate::sys::NativeValue::move_into_sys(copy, dst) }
            }

            unsafe fn try_read_from_ptr(
                src: $crate::sys::GDExtensionConstTypePtr,
            ) -> Result<Self, $crate::meta::error::ConvertError> {
                // SAFETY: forwarded to caller.
                Ok(unsafe { Self::from_sys_copying(src) })
            }
        }
    };
}

pub(crate) use impl_tracked_builtin;
