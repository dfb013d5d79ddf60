/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Subset of `gdextension_interface.h` used by the value layer.
//!
//! Names and signatures follow the C header, so that the engine's documentation applies verbatim. Pointer typedefs that are
//! `void*` in C are distinct opaque pointee types here, so that a `Variant` pointer cannot silently be passed where a `StringName`
//! pointer is expected.

#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals)]

use std::ffi::{c_char, c_int, c_void};

macro_rules! opaque_pointees {
    ($( $Pointee:ident => $Ptr:ident, $ConstPtr:ident $(, $UninitPtr:ident)?; )*) => {
        $(
            #[repr(C)]
            #[doc(hidden)]
            pub struct $Pointee {
                _private: [u8; 0],
            }

            pub type $Ptr = *mut $Pointee;
            pub type $ConstPtr = *const $Pointee;
            $( pub type $UninitPtr = *mut $Pointee; )?
        )*
    };
}

opaque_pointees! {
    __GdextVariant => GDExtensionVariantPtr, GDExtensionConstVariantPtr, GDExtensionUninitializedVariantPtr;
    __GdextStringName => GDExtensionStringNamePtr, GDExtensionConstStringNamePtr, GDExtensionUninitializedStringNamePtr;
    __GdextString => GDExtensionStringPtr, GDExtensionConstStringPtr, GDExtensionUninitializedStringPtr;
    __GdextObject => GDExtensionObjectPtr, GDExtensionConstObjectPtr, GDExtensionUninitializedObjectPtr;
    __GdextType => GDExtensionTypePtr, GDExtensionConstTypePtr, GDExtensionUninitializedTypePtr;
}

pub type GDExtensionMethodBindPtr = *const c_void;
pub type GDExtensionClassLibraryPtr = *mut c_void;

pub type GDExtensionInt = i64;
pub type GDExtensionBool = u8;
pub type GDObjectInstanceID = u64;

pub type GDExtensionVariantType = i32;
pub type GDExtensionVariantOperator = i32;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Call errors

pub type GDExtensionCallErrorType = i32;

pub const GDEXTENSION_CALL_OK: GDExtensionCallErrorType = 0;
pub const GDEXTENSION_CALL_ERROR_INVALID_METHOD: GDExtensionCallErrorType = 1;
pub const GDEXTENSION_CALL_ERROR_INVALID_ARGUMENT: GDExtensionCallErrorType = 2;
pub const GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS: GDExtensionCallErrorType = 3;
pub const GDEXTENSION_CALL_ERROR_TOO_FEW_ARGUMENTS: GDExtensionCallErrorType = 4;
pub const GDEXTENSION_CALL_ERROR_INSTANCE_IS_NULL: GDExtensionCallErrorType = 5;
pub const GDEXTENSION_CALL_ERROR_METHOD_NOT_CONST: GDExtensionCallErrorType = 6;

#[repr(C)]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct GDExtensionCallError {
    pub error: GDExtensionCallErrorType,
    pub argument: i32,
    pub expected: i32,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Version

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GDExtensionGodotVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub string: *const c_char,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Pointer-call function types (returned by lookups)

pub type GDExtensionVariantFromTypeConstructorFunc = Option<
    unsafe extern "C" fn(r_dest: GDExtensionUninitializedVariantPtr, p_src: GDExtensionTypePtr),
>;
pub type GDExtensionTypeFromVariantConstructorFunc = Option<
    unsafe extern "C" fn(r_dest: GDExtensionUninitializedTypePtr, p_src: GDExtensionVariantPtr),
>;
pub type GDExtensionPtrOperatorEvaluator = Option<
    unsafe extern "C" fn(
        p_left: GDExtensionConstTypePtr,
        p_right: GDExtensionConstTypePtr,
        r_result: GDExtensionTypePtr,
    ),
>;
pub type GDExtensionPtrBuiltInMethod = Option<
    unsafe extern "C" fn(
        p_base: GDExtensionTypePtr,
        p_args: *const GDExtensionConstTypePtr,
        r_return: GDExtensionTypePtr,
        p_argument_count: c_int,
    ),
>;
pub type GDExtensionPtrConstructor = Option<
    unsafe extern "C" fn(
        p_base: GDExtensionUninitializedTypePtr,
        p_args: *const GDExtensionConstTypePtr,
    ),
>;
pub type GDExtensionPtrDestructor = Option<unsafe extern "C" fn(p_base: GDExtensionTypePtr)>;
pub type GDExtensionPtrUtilityFunction = Option<
    unsafe extern "C" fn(
        r_return: GDExtensionTypePtr,
        p_args: *const GDExtensionConstTypePtr,
        p_argument_count: c_int,
    ),
>;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Custom callables

pub type GDExtensionCallableCustomCall = Option<
    unsafe extern "C" fn(
        callable_userdata: *mut c_void,
        p_args: *const GDExtensionConstVariantPtr,
        p_argument_count: GDExtensionInt,
        r_return: GDExtensionVariantPtr,
        r_error: *mut GDExtensionCallError,
    ),
>;
pub type GDExtensionCallableCustomIsValid =
    Option<unsafe extern "C" fn(callable_userdata: *mut c_void) -> GDExtensionBool>;
pub type GDExtensionCallableCustomFree =
    Option<unsafe extern "C" fn(callable_userdata: *mut c_void)>;
pub type GDExtensionCallableCustomHash =
    Option<unsafe extern "C" fn(callable_userdata: *mut c_void) -> u32>;
pub type GDExtensionCallableCustomEqual = Option<
    unsafe extern "C" fn(
        callable_userdata_a: *mut c_void,
        callable_userdata_b: *mut c_void,
    ) -> GDExtensionBool,
>;
pub type GDExtensionCallableCustomLessThan = GDExtensionCallableCustomEqual;
pub type GDExtensionCallableCustomToString = Option<
    unsafe extern "C" fn(
        callable_userdata: *mut c_void,
        r_is_valid: *mut GDExtensionBool,
        r_out: GDExtensionStringPtr,
    ),
>;
pub type GDExtensionCallableCustomGetArgumentCount = Option<
    unsafe extern "C" fn(
        callable_userdata: *mut c_void,
        r_is_valid: *mut GDExtensionBool,
    ) -> GDExtensionInt,
>;

#[repr(C)]
#[derive(Copy, Clone)]
pub struct GDExtensionCallableCustomInfo2 {
    pub callable_userdata: *mut c_void,
    pub token: *mut c_void,
    pub object_id: GDObjectInstanceID,
    pub call_func: GDExtensionCallableCustomCall,
    pub is_valid_func: GDExtensionCallableCustomIsValid,
    pub free_func: GDExtensionCallableCustomFree,
    pub hash_func: GDExtensionCallableCustomHash,
    pub equal_func: GDExtensionCallableCustomEqual,
    pub less_than_func: GDExtensionCallableCustomLessThan,
    pub to_string_func: GDExtensionCallableCustomToString,
    pub get_argument_count_func: GDExtensionCallableCustomGetArgumentCount,
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Entry point

pub type GDExtensionInterfaceFunctionPtr = Option<unsafe extern "C" fn()>;
pub type GDExtensionInterfaceGetProcAddress = Option<
    unsafe extern "C" fn(p_function_name: *const c_char) -> GDExtensionInterfaceFunctionPtr,
>;

pub type GDExtensionInitializationLevel = i32;

pub const GDEXTENSION_INITIALIZATION_CORE: GDExtensionInitializationLevel = 0;
pub const GDEXTENSION_INITIALIZATION_SERVERS: GDExtensionInitializationLevel = 1;
pub const GDEXTENSION_INITIALIZATION_SCENE: GDExtensionInitializationLevel = 2;
pub const GDEXTENSION_INITIALIZATION_EDITOR: GDExtensionInitializationLevel = 3;
pub const GDEXTENSION_MAX_INITIALIZATION_LEVEL: GDExtensionInitializationLevel = 4;

pub type GDExtensionInitializeCallback =
    Option<unsafe extern "C" fn(userdata: *mut c_void, p_level: GDExtensionInitializationLevel)>;

#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct GDExtensionInitialization {
    pub minimum_initialization_level: GDExtensionInitializationLevel,
    pub userdata: *mut c_void,
    pub initialize: GDExtensionInitializeCallback,
    pub deinitialize: GDExtensionInitializeCallback,
}

pub type GDExtensionInitializationFunction = Option<
    unsafe extern "C" fn(
        p_get_proc_address: GDExtensionInterfaceGetProcAddress,
        p_library: GDExtensionClassLibraryPtr,
        r_initialization: *mut GDExtensionInitialization,
    ) -> GDExtensionBool,
>;
