/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! In-process stand-in for the engine side of the GDExtension interface.
//!
//! Implements the functions that the library loads through `get_proc_address`, with the memory layouts of a single-precision
//! 64-bit engine build. Values live in reference-counted heap blocks; objects in an instance database. Lookups and printed
//! messages are recorded, so that tests can observe caching and diagnostics.

mod interface;
mod objects;
mod shared;
mod variant;

pub(crate) mod builtins;

use std::collections::HashMap;
use std::ffi::{CStr, c_char, c_void};

use gdinterop::builtin::{VariantOperator, VariantType};
use gdinterop::sys;
use gdinterop::sys::Global;

use self::interface::*;

/// Resolves an interface function by name, like the pointer handed to a GDExtension entry point.
///
/// # Safety
/// `p_function_name` must be a null-terminated string.
pub unsafe extern "C" fn get_proc_address(p_function_name: *const c_char) -> sys::GDExtensionInterfaceFunctionPtr {
    // SAFETY: per contract.
    let name = unsafe { CStr::from_ptr(p_function_name) };

    macro_rules! table {
        (@fn $func:ident) => { $func as *const () };
        (@fn $func:ident = $generic:expr) => { $generic as *const () };
        ($name:expr; $( $func:ident $( = $generic:expr )? ),* $(,)?) => {
            match $name {
                $(
                    stringify!($func) => table!(@fn $func $( = $generic )?),
                )*
                _ => return None,
            }
        };
    }

    let Ok(name) = name.to_str() else {
        return None;
    };

    use gdinterop::builtin::{Color, Vector2, Vector3, Vector4};
    use builtins::StringHandle;

    let function: *const () = table!(name;
        get_godot_version,
        print_error,
        print_warning,
        print_script_error,
        variant_new_copy,
        variant_new_nil,
        variant_destroy,
        variant_call,
        variant_evaluate,
        variant_get_type,
        variant_hash,
        variant_stringify,
        get_variant_from_type_constructor,
        get_variant_to_type_constructor,
        variant_get_ptr_operator_evaluator,
        variant_get_ptr_builtin_method,
        variant_get_ptr_constructor,
        variant_get_ptr_destructor,
        variant_get_ptr_utility_function,
        string_new_with_utf8_chars_and_len,
        string_to_utf8_chars,
        string_name_new_with_utf8_chars_and_len,
        array_operator_index,
        array_operator_index_const,
        array_set_typed,
        dictionary_operator_index,
        dictionary_operator_index_const,
        packed_byte_array_operator_index = packed_operator_index::<u8>,
        packed_byte_array_operator_index_const = packed_operator_index_const::<u8>,
        packed_int32_array_operator_index = packed_operator_index::<i32>,
        packed_int32_array_operator_index_const = packed_operator_index_const::<i32>,
        packed_int64_array_operator_index = packed_operator_index::<i64>,
        packed_int64_array_operator_index_const = packed_operator_index_const::<i64>,
        packed_float32_array_operator_index = packed_operator_index::<f32>,
        packed_float32_array_operator_index_const = packed_operator_index_const::<f32>,
        packed_float64_array_operator_index = packed_operator_index::<f64>,
        packed_float64_array_operator_index_const = packed_operator_index_const::<f64>,
        packed_string_array_operator_index = packed_operator_index::<StringHandle>,
        packed_string_array_operator_index_const = packed_operator_index_const::<StringHandle>,
        packed_vector2_array_operator_index = packed_operator_index::<Vector2>,
        packed_vector2_array_operator_index_const = packed_operator_index_const::<Vector2>,
        packed_vector3_array_operator_index = packed_operator_index::<Vector3>,
        packed_vector3_array_operator_index_const = packed_operator_index_const::<Vector3>,
        packed_vector4_array_operator_index = packed_operator_index::<Vector4>,
        packed_vector4_array_operator_index_const = packed_operator_index_const::<Vector4>,
        packed_color_array_operator_index = packed_operator_index::<Color>,
        packed_color_array_operator_index_const = packed_operator_index_const::<Color>,
        object_destroy,
        object_get_instance_id,
        object_get_instance_from_id,
        object_cast_to,
        object_method_bind_ptrcall,
        object_method_bind_call,
        classdb_construct_object,
        classdb_get_method_bind,
        classdb_get_class_tag,
        callable_custom_create2,
        callable_custom_get_userdata,
    );

    // SAFETY: all entries are `unsafe extern "C"` functions; the caller transmutes back to the signature of the name.
    Some(unsafe { std::mem::transmute::<*const (), unsafe extern "C" fn()>(function) })
}

static LIBRARY_TOKEN: u8 = 0;

/// Library pointer passed next to [`get_proc_address`].
pub fn library() -> sys::GDExtensionClassLibraryPtr {
    &LIBRARY_TOKEN as *const u8 as *mut c_void
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Recorded lookups

/// A function lookup that went through the engine.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Lookup {
    BuiltinMethod(VariantType, String),
    MethodBind(String, String),
    Constructor(VariantType, i32),
    Destructor(VariantType),
    Operator(VariantOperator, VariantType, VariantType),
    Utility(String),
    VariantFromType(VariantType),
    TypeFromVariant(VariantType),
    ClassTag(String),
}

static LOOKUPS: Global<HashMap<Lookup, usize>> = Global::default();

fn record_lookup(lookup: Lookup) {
    *LOOKUPS.write().entry(lookup).or_default() += 1;
}

/// How often the library asked the engine for this function.
pub fn lookup_count(lookup: &Lookup) -> usize {
    LOOKUPS.read().get(lookup).copied().unwrap_or(0)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Recorded messages

/// Text that reached the engine's output.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum Message {
    Print(String),
    Warning(String),
    Error(String),
    ScriptError(String),
}

impl Message {
    pub fn text(&self) -> &str {
        match self {
            Self::Print(text) | Self::Warning(text) | Self::Error(text) | Self::ScriptError(text) => text,
        }
    }
}

static MESSAGES: Global<Vec<Message>> = Global::default();

fn record_message(message: Message) {
    eprintln!("[engine] {message:?}");
    MESSAGES.write().push(message);
}

/// All messages printed so far in this process.
pub fn messages() -> Vec<Message> {
    MESSAGES.read().clone()
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Object database

/// Number of objects that have been constructed and not yet destroyed.
pub fn live_objects() -> usize {
    objects::live_count()
}

/// Number of objects destroyed so far.
pub fn destroyed_objects() -> usize {
    objects::destroyed_count()
}

/// Engine-side reference count of a live refcounted object.
pub fn reference_count(instance_id: u64) -> Option<i64> {
    objects::reference_count(instance_id)
}
