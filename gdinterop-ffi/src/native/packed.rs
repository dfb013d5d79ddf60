/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Packed arrays: copy-on-write contiguous buffers of one element type.

use crate as sys;
use crate::interface_fn;
use crate::native::{NativeValue, builtin_method, call_builtin, call_builtin_int, impl_native_value, index_arg};

macro_rules! impl_native_packed_array {
    (
        $Native:ident,
        $Opaque:ident,
        $Variant:ident,
        index: $index_fn:ident,
        index_const: $index_const_fn:ident
    ) => {
        #[doc = concat!("Engine `", stringify!($Variant), "`.")]
        #[repr(transparent)]
        pub struct $Native {
            opaque: sys::types::$Opaque,
        }

        impl_native_value!($Native, $Opaque, $Variant);

        impl $Native {
            pub fn len(&self) -> usize {
                let method = builtin_method!($Variant, "size", 3173160232);

                // SAFETY: `size()` takes no arguments and returns `int`.
                unsafe { call_builtin_int(method, self.sys()) as usize }
            }

            pub fn is_empty(&self) -> bool {
                self.len() == 0
            }

            /// Resizes the buffer; new elements are zero/default-initialized by the engine.
            pub fn resize(&mut self, new_len: usize) {
                let method = builtin_method!($Variant, "resize", 848867239);
                let len = index_arg(new_len);
                let mut ret: i64 = 0;

                // SAFETY: `resize(int) -> int`.
                unsafe {
                    call_builtin(
                        method,
                        self.sys_mut(),
                        &[&len as *const i64 as sys::GDExtensionConstTypePtr],
                        &mut ret as *mut i64 as sys::GDExtensionTypePtr,
                    )
                };
            }

            /// Pointer to the element at `index`, or null if out of bounds. Triggers copy-on-write.
            pub fn element_ptr_mut(&mut self, index: usize) -> sys::GDExtensionTypePtr {
                let index_fn = interface_fn!($index_fn);

                // SAFETY: the engine bounds-checks and returns null on failure.
                unsafe { index_fn(self.sys_mut(), index_arg(index)) as sys::GDExtensionTypePtr }
            }

            /// Pointer to the element at `index`, or null if out of bounds.
            pub fn element_ptr(&self, index: usize) -> sys::GDExtensionConstTypePtr {
                let index_fn = interface_fn!($index_const_fn);

                // SAFETY: the engine bounds-checks and returns null on failure.
                unsafe { index_fn(self.sys_const(), index_arg(index)) as sys::GDExtensionConstTypePtr }
            }
        }
    };
}

impl_native_packed_array!(
    NativePackedByteArray, OpaquePackedByteArray, PackedByteArray,
    index: packed_byte_array_operator_index,
    index_const: packed_byte_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedInt32Array, OpaquePackedInt32Array, PackedInt32Array,
    index: packed_int32_array_operator_index,
    index_const: packed_int32_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedInt64Array, OpaquePackedInt64Array, PackedInt64Array,
    index: packed_int64_array_operator_index,
    index_const: packed_int64_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedFloat32Array, OpaquePackedFloat32Array, PackedFloat32Array,
    index: packed_float32_array_operator_index,
    index_const: packed_float32_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedFloat64Array, OpaquePackedFloat64Array, PackedFloat64Array,
    index: packed_float64_array_operator_index,
    index_const: packed_float64_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedStringArray, OpaquePackedStringArray, PackedStringArray,
    index: packed_string_array_operator_index,
    index_const: packed_string_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedVector2Array, OpaquePackedVector2Array, PackedVector2Array,
    index: packed_vector2_array_operator_index,
    index_const: packed_vector2_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedVector3Array, OpaquePackedVector3Array, PackedVector3Array,
    index: packed_vector3_array_operator_index,
    index_const: packed_vector3_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedVector4Array, OpaquePackedVector4Array, PackedVector4Array,
    index: packed_vector4_array_operator_index,
    index_const: packed_vector4_array_operator_index_const
);
impl_native_packed_array!(
    NativePackedColorArray, OpaquePackedColorArray, PackedColorArray,
    index: packed_color_array_operator_index,
    index_const: packed_color_array_operator_index_const
);
