/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Function table loaded through `get_proc_address` at initialization.

use std::ffi::{c_char, c_void};

use crate::*;

macro_rules! interface_table {
    (
        $(
            $( #[$attr:meta] )*
            fn $name:ident( $( $param:ident : $ParamTy:ty ),* $(,)? ) $( -> $Ret:ty )?;
        )*
    ) => {
        /// Engine functions available to the extension, loaded by name.
        ///
        /// Fields are `None` if the engine does not provide the function; use [`interface_fn!`](crate::interface_fn) for access.
        #[allow(non_snake_case)]
        #[derive(Copy, Clone)]
        pub struct GDExtensionInterface {
            $(
                $( #[$attr] )*
                pub $name: Option<unsafe extern "C" fn( $( $param: $ParamTy ),* ) $( -> $Ret )?>,
            )*
        }

        impl GDExtensionInterface {
            /// Loads every function of the table.
            ///
            /// # Safety
            /// `get_proc_address` must return function pointers matching the C signatures of the requested names.
            pub unsafe fn load(get_proc_address: GetProcAddressFn) -> Self {
                Self {
                    $(
                        $name: unsafe {
                            let raw = get_proc_address(concat!(stringify!($name), "\0").as_ptr() as *const c_char);
                            std::mem::transmute::<
                                GDExtensionInterfaceFunctionPtr,
                                Option<unsafe extern "C" fn( $( $ParamTy ),* ) $( -> $Ret )?>
                            >(raw)
                        },
                    )*
                }
            }

            /// Names of functions that the engine did not provide.
            pub fn missing_functions(&self) -> Vec<&'static str> {
                let mut missing = Vec::new();
                $(
                    if self.$name.is_none() {
                        missing.push(stringify!($name));
                    }
                )*
                missing
            }
        }
    };
}

pub type GetProcAddressFn =
    unsafe extern "C" fn(p_function_name: *const c_char) -> GDExtensionInterfaceFunctionPtr;

interface_table! {
    fn get_godot_version(r_godot_version: *mut GDExtensionGodotVersion);

    // Logging.
    fn print_error(p_description: *const c_char, p_function: *const c_char, p_file: *const c_char, p_line: i32, p_editor_notify: GDExtensionBool);
    fn print_warning(p_description: *const c_char, p_function: *const c_char, p_file: *const c_char, p_line: i32, p_editor_notify: GDExtensionBool);
    fn print_script_error(p_description: *const c_char, p_function: *const c_char, p_file: *const c_char, p_line: i32, p_editor_notify: GDExtensionBool);

    // Variant.
    fn variant_new_copy(r_dest: GDExtensionUninitializedVariantPtr, p_src: GDExtensionConstVariantPtr);
    fn variant_new_nil(r_dest: GDExtensionUninitializedVariantPtr);
    fn variant_destroy(p_self: GDExtensionVariantPtr);
    fn variant_call(
        p_self: GDExtensionVariantPtr,
        p_method: GDExtensionConstStringNamePtr,
        p_args: *const GDExtensionConstVariantPtr,
        p_argument_count: GDExtensionInt,
        r_return: GDExtensionUninitializedVariantPtr,
        r_error: *mut GDExtensionCallError,
    );
    fn variant_evaluate(
        p_op: GDExtensionVariantOperator,
        p_a: GDExtensionConstVariantPtr,
        p_b: GDExtensionConstVariantPtr,
        r_return: GDExtensionUninitializedVariantPtr,
        r_valid: *mut GDExtensionBool,
    );
    fn variant_get_type(p_self: GDExtensionConstVariantPtr) -> GDExtensionVariantType;
    fn variant_hash(p_self: GDExtensionConstVariantPtr) -> GDExtensionInt;
    fn variant_stringify(p_self: GDExtensionConstVariantPtr, r_ret: GDExtensionStringPtr);
    fn get_variant_from_type_constructor(p_type: GDExtensionVariantType) -> GDExtensionVariantFromTypeConstructorFunc;
    fn get_variant_to_type_constructor(p_type: GDExtensionVariantType) -> GDExtensionTypeFromVariantConstructorFunc;

    // Builtin lookups.
    fn variant_get_ptr_operator_evaluator(
        p_operator: GDExtensionVariantOperator,
        p_type_a: GDExtensionVariantType,
        p_type_b: GDExtensionVariantType,
    ) -> GDExtensionPtrOperatorEvaluator;
    fn variant_get_ptr_builtin_method(
        p_type: GDExtensionVariantType,
        p_method: GDExtensionConstStringNamePtr,
        p_hash: GDExtensionInt,
    ) -> GDExtensionPtrBuiltInMethod;
    fn variant_get_ptr_constructor(p_type: GDExtensionVariantType, p_constructor: i32) -> GDExtensionPtrConstructor;
    fn variant_get_ptr_destructor(p_type: GDExtensionVariantType) -> GDExtensionPtrDestructor;
    fn variant_get_ptr_utility_function(p_function: GDExtensionConstStringNamePtr, p_hash: GDExtensionInt) -> GDExtensionPtrUtilityFunction;

    // Strings.
    fn string_new_with_utf8_chars_and_len(r_dest: GDExtensionUninitializedStringPtr, p_contents: *const c_char, p_size: GDExtensionInt);
    fn string_to_utf8_chars(p_self: GDExtensionConstStringPtr, r_text: *mut c_char, p_max_write_length: GDExtensionInt) -> GDExtensionInt;
    fn string_name_new_with_utf8_chars_and_len(r_dest: GDExtensionUninitializedStringNamePtr, p_contents: *const c_char, p_size: GDExtensionInt);

    // Containers.
    fn array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> GDExtensionVariantPtr;
    fn array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> GDExtensionVariantPtr;
    fn array_set_typed(
        p_self: GDExtensionTypePtr,
        p_type: GDExtensionVariantType,
        p_class_name: GDExtensionConstStringNamePtr,
        p_script: GDExtensionConstVariantPtr,
    );
    fn dictionary_operator_index(p_self: GDExtensionTypePtr, p_key: GDExtensionConstVariantPtr) -> GDExtensionVariantPtr;
    fn dictionary_operator_index_const(p_self: GDExtensionConstTypePtr, p_key: GDExtensionConstVariantPtr) -> GDExtensionVariantPtr;

    fn packed_byte_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> *mut u8;
    fn packed_byte_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> *const u8;
    fn packed_int32_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> *mut i32;
    fn packed_int32_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> *const i32;
    fn packed_int64_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> *mut i64;
    fn packed_int64_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> *const i64;
    fn packed_float32_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> *mut f32;
    fn packed_float32_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> *const f32;
    fn packed_float64_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> *mut f64;
    fn packed_float64_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> *const f64;
    fn packed_string_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> GDExtensionStringPtr;
    fn packed_string_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> GDExtensionStringPtr;
    fn packed_vector2_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;
    fn packed_vector2_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;
    fn packed_vector3_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;
    fn packed_vector3_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;
    fn packed_vector4_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;
    fn packed_vector4_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;
    fn packed_color_array_operator_index(p_self: GDExtensionTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;
    fn packed_color_array_operator_index_const(p_self: GDExtensionConstTypePtr, p_index: GDExtensionInt) -> GDExtensionTypePtr;

    // Objects.
    fn object_destroy(p_o: GDExtensionObjectPtr);
    fn object_get_instance_id(p_object: GDExtensionConstObjectPtr) -> GDObjectInstanceID;
    fn object_get_instance_from_id(p_instance_id: GDObjectInstanceID) -> GDExtensionObjectPtr;
    fn object_cast_to(p_object: GDExtensionConstObjectPtr, p_class_tag: *mut c_void) -> GDExtensionObjectPtr;
    fn object_method_bind_ptrcall(
        p_method_bind: GDExtensionMethodBindPtr,
        p_instance: GDExtensionObjectPtr,
        p_args: *const GDExtensionConstTypePtr,
        r_ret: GDExtensionTypePtr,
    );
    fn object_method_bind_call(
        p_method_bind: GDExtensionMethodBindPtr,
        p_instance: GDExtensionObjectPtr,
        p_args: *const GDExtensionConstVariantPtr,
        p_arg_count: GDExtensionInt,
        r_ret: GDExtensionUninitializedVariantPtr,
        r_error: *mut GDExtensionCallError,
    );
    fn classdb_construct_object(p_classname: GDExtensionConstStringNamePtr) -> GDExtensionObjectPtr;
    fn classdb_get_method_bind(
        p_classname: GDExtensionConstStringNamePtr,
        p_methodname: GDExtensionConstStringNamePtr,
        p_hash: GDExtensionInt,
    ) -> GDExtensionMethodBindPtr;
    fn classdb_get_class_tag(p_classname: GDExtensionConstStringNamePtr) -> *mut c_void;

    // Callables.
    fn callable_custom_create2(r_callable: GDExtensionUninitializedTypePtr, p_callable_custom_info: *mut GDExtensionCallableCustomInfo2);
    fn callable_custom_get_userdata(p_callable: GDExtensionConstTypePtr, p_token: *mut c_void) -> *mut c_void;
}
