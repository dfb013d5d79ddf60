/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

// Packed arrays are copy-on-write on the engine side. Converting them to variants or pointer slots shares the buffer, which is
// copied on the first write from either side.

use std::fmt;

use crate::builtin::macros::impl_tracked_builtin;
use crate::builtin::{Color, GString, Variant, Vector2, Vector3, Vector4};
use crate::lifetime::Tracked;
use crate::sys;
use crate::sys::{NativeString, NativeValue};

/// Element type of a packed array, with its in-buffer representation.
pub trait PackedElement: Sized {
    /// # Safety
    /// `src` must point to a live element.
    #[doc(hidden)]
    unsafe fn read_element(src: sys::GDExtensionConstTypePtr) -> Self;

    /// # Safety
    /// `dst` must point to a live element, which is overwritten.
    #[doc(hidden)]
    unsafe fn write_element(&self, dst: sys::GDExtensionTypePtr);
}

macro_rules! impl_packed_element_copy {
    ($($T:ty),* $(,)?) => {
        $(
            impl PackedElement for $T {
                unsafe fn read_element(src: sys::GDExtensionConstTypePtr) -> Self {
                    // SAFETY: forwarded to caller.
                    unsafe { std::ptr::read(src as *const Self) }
                }

                unsafe fn write_element(&self, dst: sys::GDExtensionTypePtr) {
                    // SAFETY: forwarded to caller; plain data needs no destruction.
                    unsafe { std::ptr::write(dst as *mut Self, *self) }
                }
            }
        )*
    };
}

impl_packed_element_copy!(u8, i32, i64, f32, f64, Vector2, Vector3, Vector4, Color);

impl PackedElement for GString {
    unsafe fn read_element(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        unsafe { GString::from_sys_copying(src) }
    }

    unsafe fn write_element(&self, dst: sys::GDExtensionTypePtr) {
        let copy = self.native().clone_native();

        // SAFETY: forwarded to caller; the old string is released before the slot is overwritten.
        unsafe {
            (*(dst as *mut NativeString)).destroy();
            copy.move_into_sys(dst as sys::GDExtensionUninitializedTypePtr);
        }
    }
}

macro_rules! impl_packed_array {
    (
        $(#[$attr:meta])*
        $PackedArray:ident, $Native:ident, $Element:ty
    ) => {
        $(#[$attr])*
        pub struct $PackedArray {
            inner: Tracked<sys::$Native>,
        }

        impl $PackedArray {
            pub fn new() -> Self {
                Self::from_native(sys::$Native::new_default())
            }

            pub fn len(&self) -> usize {
                self.inner.with(|a| a.len())
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Returns the element at `index`, or `None` if out of bounds.
            pub fn get(&self, index: usize) -> Option<$Element> {
                self.inner.with(|a| {
                    let ptr = a.element_ptr(index);

                    // SAFETY: non-null element pointers are live while the array is borrowed.
                    (!ptr.is_null()).then(|| unsafe { <$Element>::read_element(ptr) })
                })
            }

            /// ⚠️ Returns the element at `index`.
            ///
            /// # Panics
            /// If `index` is out of bounds.
            pub fn at(&self, index: usize) -> $Element {
                let len = self.len();
                self.get(index).unwrap_or_else(|| {
                    panic!(concat!(stringify!($PackedArray), " index {} out of bounds (len {})"), index, len)
                })
            }

            /// ⚠️ Overwrites the element at `index`.
            ///
            /// # Panics
            /// If `index` is out of bounds.
            pub fn set(&mut self, index: usize, value: &$Element) {
                self.inner.with_mut(|a| {
                    let ptr = a.element_ptr_mut(index);
                    assert!(!ptr.is_null(), "{} index {index} out of bounds", stringify!($PackedArray));

                    // SAFETY: checked above.
                    unsafe { value.write_element(ptr) };
                });
            }

            pub fn push(&mut self, value: &$Element) {
                self.inner.with_mut(|a| {
                    let len = a.len();
                    a.resize(len + 1);

                    // SAFETY: `len` is in bounds after resizing; the new element is default-initialized.
                    unsafe { value.write_element(a.element_ptr_mut(len)) };
                });
            }

            pub fn to_vec(&self) -> Vec<$Element> {
                (0..self.len()).map(|i| self.at(i)).collect()
            }

            fn from_tracked(inner: Tracked<sys::$Native>) -> Self {
                Self { inner }
            }
        }

        impl_tracked_builtin!($PackedArray, sys::$Native);

        impl Default for $PackedArray {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<&[$Element]> for $PackedArray {
            fn from(values: &[$Element]) -> Self {
                let mut native = sys::$Native::new_default();
                native.resize(values.len());

                for (i, value) in values.iter().enumerate() {
                    // SAFETY: `i` is in bounds after resizing.
                    unsafe { value.write_element(native.element_ptr_mut(i)) };
                }

                Self::from_native(native)
            }
        }

        impl PartialEq for $PackedArray {
            fn eq(&self, other: &Self) -> bool {
                let lhs = self.inner.with(|a| Variant::from_builtin(a));
                let rhs = other.inner.with(|a| Variant::from_builtin(a));
                lhs == rhs
            }
        }

        impl fmt::Debug for $PackedArray {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let variant = self.inner.with(|a| Variant::from_builtin(a));
                write!(f, "{variant}")
            }
        }
    };
}

impl_packed_array!(
    /// Packed array of bytes.
    PackedByteArray, NativePackedByteArray, u8
);
impl_packed_array!(
    /// Packed array of 32-bit integers.
    PackedInt32Array, NativePackedInt32Array, i32
);
impl_packed_array!(
    /// Packed array of 64-bit integers.
    PackedInt64Array, NativePackedInt64Array, i64
);
impl_packed_array!(
    /// Packed array of 32-bit floats.
    PackedFloat32Array, NativePackedFloat32Array, f32
);
impl_packed_array!(
    /// Packed array of 64-bit floats.
    PackedFloat64Array, NativePackedFloat64Array, f64
);
impl_packed_array!(
    /// Packed array of strings. Elements are deep-copied on read and write.
    PackedStringArray, NativePackedStringArray, GString
);
impl_packed_array!(PackedVector2Array, NativePackedVector2Array, Vector2);
impl_packed_array!(PackedVector3Array, NativePackedVector3Array, Vector3);
impl_packed_array!(PackedVector4Array, NativePackedVector4Array, Vector4);
impl_packed_array!(PackedColorArray, NativePackedColorArray, Color);
