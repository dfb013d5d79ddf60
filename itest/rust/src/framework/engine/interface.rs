/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Functions of the GDExtension interface table, with the signatures of `gdextension_interface.h`.

use std::ffi::{CStr, c_char, c_void};
use std::mem::size_of;
use std::ptr;

use gdinterop::builtin::{VariantOperator, VariantType};
use gdinterop::sys;

use super::builtins::{
    self, CustomCallable, EngineElement, array_data, dictionary_data, make_unique, new_string, text_of,
};
use super::shared::{Shared, read_handle, write_handle};
use super::variant::{self, RawVariant, slot_size};
use super::{Lookup, Message, objects, record_lookup, record_message};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Version and logging

static VERSION_STRING: &CStr = c"Godot Engine v4.3.stable.official";

pub(super) unsafe extern "C" fn get_godot_version(r_godot_version: *mut sys::GDExtensionGodotVersion) {
    let version = sys::GDExtensionGodotVersion {
        major: 4,
        minor: 3,
        patch: 0,
        string: VERSION_STRING.as_ptr(),
    };

    // SAFETY: the extension passes a writable struct.
    unsafe { ptr::write(r_godot_version, version) };
}

/// # Safety
/// `text` must be null or a null-terminated string.
unsafe fn c_text(text: *const c_char) -> String {
    if text.is_null() {
        return String::new();
    }

    // SAFETY: per contract.
    unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
}

pub(super) unsafe extern "C" fn print_error(
    p_description: *const c_char,
    _p_function: *const c_char,
    _p_file: *const c_char,
    _p_line: i32,
    _p_editor_notify: sys::GDExtensionBool,
) {
    // SAFETY: the extension passes null-terminated strings.
    record_message(Message::Error(unsafe { c_text(p_description) }));
}

pub(super) unsafe extern "C" fn print_warning(
    p_description: *const c_char,
    _p_function: *const c_char,
    _p_file: *const c_char,
    _p_line: i32,
    _p_editor_notify: sys::GDExtensionBool,
) {
    // SAFETY: the extension passes null-terminated strings.
    record_message(Message::Warning(unsafe { c_text(p_description) }));
}

pub(super) unsafe extern "C" fn print_script_error(
    p_description: *const c_char,
    _p_function: *const c_char,
    _p_file: *const c_char,
    _p_line: i32,
    _p_editor_notify: sys::GDExtensionBool,
) {
    // SAFETY: the extension passes null-terminated strings.
    record_message(Message::ScriptError(unsafe { c_text(p_description) }));
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Variant

/// # Safety
/// `ptr` must point to a live variant.
unsafe fn variant_ref<'a, P>(ptr: *const P) -> &'a RawVariant {
    // SAFETY: per contract.
    unsafe { &*(ptr as *const RawVariant) }
}

pub(super) unsafe extern "C" fn variant_new_copy(
    r_dest: sys::GDExtensionUninitializedVariantPtr,
    p_src: sys::GDExtensionConstVariantPtr,
) {
    // SAFETY: live source, uninitialized destination.
    unsafe { ptr::write(r_dest as *mut RawVariant, variant_ref(p_src).clone()) };
}

pub(super) unsafe extern "C" fn variant_new_nil(r_dest: sys::GDExtensionUninitializedVariantPtr) {
    // SAFETY: uninitialized destination.
    unsafe { ptr::write(r_dest as *mut RawVariant, RawVariant::nil()) };
}

pub(super) unsafe extern "C" fn variant_destroy(p_self: sys::GDExtensionVariantPtr) {
    // SAFETY: the extension gives up the variant.
    unsafe { ptr::drop_in_place(p_self as *mut RawVariant) };
}

pub(super) unsafe extern "C" fn variant_call(
    p_self: sys::GDExtensionVariantPtr,
    p_method: sys::GDExtensionConstStringNamePtr,
    p_args: *const sys::GDExtensionConstVariantPtr,
    p_argument_count: sys::GDExtensionInt,
    r_return: sys::GDExtensionUninitializedVariantPtr,
    r_error: *mut sys::GDExtensionCallError,
) {
    // SAFETY: all pointers are live for the call; the return slot is initialized before anything else.
    unsafe {
        let ret = r_return as *mut RawVariant;
        ptr::write(ret, RawVariant::nil());

        let argc = usize::try_from(p_argument_count).unwrap_or(0);
        let args: Vec<*const RawVariant> = (0..argc).map(|i| *p_args.add(i) as *const RawVariant).collect();
        let method = text_of(read_handle(p_method as *const c_void)).to_string();

        variant::call(variant_ref(p_self), &method, &args, &mut *ret, &mut *r_error);
    }
}

pub(super) unsafe extern "C" fn variant_evaluate(
    p_op: sys::GDExtensionVariantOperator,
    p_a: sys::GDExtensionConstVariantPtr,
    p_b: sys::GDExtensionConstVariantPtr,
    r_return: sys::GDExtensionUninitializedVariantPtr,
    r_valid: *mut sys::GDExtensionBool,
) {
    // SAFETY: live operands; the result is initialized in all cases.
    unsafe {
        let result = variant::evaluate(VariantOperator::from_sys(p_op), variant_ref(p_a), variant_ref(p_b));
        *r_valid = u8::from(result.is_some());
        ptr::write(r_return as *mut RawVariant, result.unwrap_or_default());
    }
}

pub(super) unsafe extern "C" fn variant_get_type(p_self: sys::GDExtensionConstVariantPtr) -> sys::GDExtensionVariantType {
    // SAFETY: live variant.
    unsafe { variant_ref(p_self) }.variant_type().sys()
}

pub(super) unsafe extern "C" fn variant_hash(p_self: sys::GDExtensionConstVariantPtr) -> sys::GDExtensionInt {
    // SAFETY: live variant.
    variant::hash(unsafe { variant_ref(p_self) })
}

pub(super) unsafe extern "C" fn variant_stringify(p_self: sys::GDExtensionConstVariantPtr, r_ret: sys::GDExtensionStringPtr) {
    // SAFETY: live variant; the string slot is uninitialized.
    unsafe {
        let text = variant::stringify(variant_ref(p_self), false);
        write_handle(r_ret as *mut c_void, slot_size(VariantType::String), new_string(&text));
    }
}

/// Instantiates `$func::<TYPE>` for every type except `Nil`.
macro_rules! for_variant_type {
    ($ty:expr, $func:ident as $Fn:ty) => {{
        use gdinterop::builtin::VariantType as T;

        match $ty {
            T::Nil => None,
            T::Bool => Some($func::<{ T::Bool as i32 }> as $Fn),
            T::Int => Some($func::<{ T::Int as i32 }> as $Fn),
            T::Float => Some($func::<{ T::Float as i32 }> as $Fn),
            T::String => Some($func::<{ T::String as i32 }> as $Fn),
            T::Vector2 => Some($func::<{ T::Vector2 as i32 }> as $Fn),
            T::Vector2i => Some($func::<{ T::Vector2i as i32 }> as $Fn),
            T::Rect2 => Some($func::<{ T::Rect2 as i32 }> as $Fn),
            T::Rect2i => Some($func::<{ T::Rect2i as i32 }> as $Fn),
            T::Vector3 => Some($func::<{ T::Vector3 as i32 }> as $Fn),
            T::Vector3i => Some($func::<{ T::Vector3i as i32 }> as $Fn),
            T::Transform2D => Some($func::<{ T::Transform2D as i32 }> as $Fn),
            T::Vector4 => Some($func::<{ T::Vector4 as i32 }> as $Fn),
            T::Vector4i => Some($func::<{ T::Vector4i as i32 }> as $Fn),
            T::Plane => Some($func::<{ T::Plane as i32 }> as $Fn),
            T::Quaternion => Some($func::<{ T::Quaternion as i32 }> as $Fn),
            T::Aabb => Some($func::<{ T::Aabb as i32 }> as $Fn),
            T::Basis => Some($func::<{ T::Basis as i32 }> as $Fn),
            T::Transform3D => Some($func::<{ T::Transform3D as i32 }> as $Fn),
            T::Projection => Some($func::<{ T::Projection as i32 }> as $Fn),
            T::Color => Some($func::<{ T::Color as i32 }> as $Fn),
            T::StringName => Some($func::<{ T::StringName as i32 }> as $Fn),
            T::NodePath => Some($func::<{ T::NodePath as i32 }> as $Fn),
            T::Rid => Some($func::<{ T::Rid as i32 }> as $Fn),
            T::Object => Some($func::<{ T::Object as i32 }> as $Fn),
            T::Callable => Some($func::<{ T::Callable as i32 }> as $Fn),
            T::Signal => Some($func::<{ T::Signal as i32 }> as $Fn),
            T::Dictionary => Some($func::<{ T::Dictionary as i32 }> as $Fn),
            T::Array => Some($func::<{ T::Array as i32 }> as $Fn),
            T::PackedByteArray => Some($func::<{ T::PackedByteArray as i32 }> as $Fn),
            T::PackedInt32Array => Some($func::<{ T::PackedInt32Array as i32 }> as $Fn),
            T::PackedInt64Array => Some($func::<{ T::PackedInt64Array as i32 }> as $Fn),
            T::PackedFloat32Array => Some($func::<{ T::PackedFloat32Array as i32 }> as $Fn),
            T::PackedFloat64Array => Some($func::<{ T::PackedFloat64Array as i32 }> as $Fn),
            T::PackedStringArray => Some($func::<{ T::PackedStringArray as i32 }> as $Fn),
            T::PackedVector2Array => Some($func::<{ T::PackedVector2Array as i32 }> as $Fn),
            T::PackedVector3Array => Some($func::<{ T::PackedVector3Array as i32 }> as $Fn),
            T::PackedColorArray => Some($func::<{ T::PackedColorArray as i32 }> as $Fn),
            T::PackedVector4Array => Some($func::<{ T::PackedVector4Array as i32 }> as $Fn),
        }
    }};
}

pub(super) unsafe extern "C" fn get_variant_from_type_constructor(
    p_type: sys::GDExtensionVariantType,
) -> sys::GDExtensionVariantFromTypeConstructorFunc {
    let ty = VariantType::from_sys(p_type);
    record_lookup(Lookup::VariantFromType(ty));

    for_variant_type!(
        ty,
        variant_from_type as unsafe extern "C" fn(sys::GDExtensionUninitializedVariantPtr, sys::GDExtensionTypePtr)
    )
}

pub(super) unsafe extern "C" fn get_variant_to_type_constructor(
    p_type: sys::GDExtensionVariantType,
) -> sys::GDExtensionTypeFromVariantConstructorFunc {
    let ty = VariantType::from_sys(p_type);
    record_lookup(Lookup::TypeFromVariant(ty));

    for_variant_type!(
        ty,
        type_from_variant as unsafe extern "C" fn(sys::GDExtensionUninitializedTypePtr, sys::GDExtensionVariantPtr)
    )
}

unsafe extern "C" fn variant_from_type<const TYPE: i32>(
    r_dest: sys::GDExtensionUninitializedVariantPtr,
    p_src: sys::GDExtensionTypePtr,
) {
    // SAFETY: the source is a live value of the converter's type.
    unsafe {
        let variant = RawVariant::from_slot(VariantType::from_sys(TYPE), p_src as *const c_void);
        ptr::write(r_dest as *mut RawVariant, variant);
    }
}

unsafe extern "C" fn type_from_variant<const TYPE: i32>(
    r_dest: sys::GDExtensionUninitializedTypePtr,
    p_src: sys::GDExtensionVariantPtr,
) {
    // SAFETY: the destination is a slot of the converter's type.
    unsafe { variant_ref(p_src).write_slot(VariantType::from_sys(TYPE), r_dest as *mut c_void) };
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Builtin lookups

/// # Safety
/// `name` must point to a live `StringName`.
unsafe fn name_text(name: sys::GDExtensionConstStringNamePtr) -> String {
    // SAFETY: per contract.
    unsafe { text_of(read_handle(name as *const c_void)) }.to_string()
}

pub(super) unsafe extern "C" fn variant_get_ptr_operator_evaluator(
    p_operator: sys::GDExtensionVariantOperator,
    p_type_a: sys::GDExtensionVariantType,
    p_type_b: sys::GDExtensionVariantType,
) -> sys::GDExtensionPtrOperatorEvaluator {
    let (op, a, b) = (
        VariantOperator::from_sys(p_operator),
        VariantType::from_sys(p_type_a),
        VariantType::from_sys(p_type_b),
    );
    record_lookup(Lookup::Operator(op, a, b));

    builtins::operator_evaluator(op, a, b)
}

pub(super) unsafe extern "C" fn variant_get_ptr_builtin_method(
    p_type: sys::GDExtensionVariantType,
    p_method: sys::GDExtensionConstStringNamePtr,
    p_hash: sys::GDExtensionInt,
) -> sys::GDExtensionPtrBuiltInMethod {
    let ty = VariantType::from_sys(p_type);

    // SAFETY: live method name.
    let method = unsafe { name_text(p_method) };
    let found = builtins::builtin_method(ty, &method, p_hash);
    record_lookup(Lookup::BuiltinMethod(ty, method));

    found
}

pub(super) unsafe extern "C" fn variant_get_ptr_constructor(
    p_type: sys::GDExtensionVariantType,
    p_constructor: i32,
) -> sys::GDExtensionPtrConstructor {
    let ty = VariantType::from_sys(p_type);
    record_lookup(Lookup::Constructor(ty, p_constructor));

    builtins::constructor(ty, p_constructor)
}

pub(super) unsafe extern "C" fn variant_get_ptr_destructor(
    p_type: sys::GDExtensionVariantType,
) -> sys::GDExtensionPtrDestructor {
    let ty = VariantType::from_sys(p_type);
    record_lookup(Lookup::Destructor(ty));

    builtins::destructor(ty)
}

pub(super) unsafe extern "C" fn variant_get_ptr_utility_function(
    p_function: sys::GDExtensionConstStringNamePtr,
    p_hash: sys::GDExtensionInt,
) -> sys::GDExtensionPtrUtilityFunction {
    // SAFETY: live function name.
    let name = unsafe { name_text(p_function) };
    let found = builtins::utility_function(&name, p_hash);
    record_lookup(Lookup::Utility(name));

    found
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Strings

/// # Safety
/// `contents` must point to `size` readable bytes.
unsafe fn utf8_text(contents: *const c_char, size: sys::GDExtensionInt) -> String {
    let len = usize::try_from(size).unwrap_or(0);
    if contents.is_null() || len == 0 {
        return String::new();
    }

    // SAFETY: per contract.
    let bytes = unsafe { std::slice::from_raw_parts(contents as *const u8, len) };
    String::from_utf8_lossy(bytes).into_owned()
}

pub(super) unsafe extern "C" fn string_new_with_utf8_chars_and_len(
    r_dest: sys::GDExtensionUninitializedStringPtr,
    p_contents: *const c_char,
    p_size: sys::GDExtensionInt,
) {
    // SAFETY: readable contents, uninitialized destination.
    unsafe {
        let text = utf8_text(p_contents, p_size);
        write_handle(r_dest as *mut c_void, slot_size(VariantType::String), new_string(&text));
    }
}

pub(super) unsafe extern "C" fn string_name_new_with_utf8_chars_and_len(
    r_dest: sys::GDExtensionUninitializedStringNamePtr,
    p_contents: *const c_char,
    p_size: sys::GDExtensionInt,
) {
    // SAFETY: readable contents, uninitialized destination.
    unsafe {
        let text = utf8_text(p_contents, p_size);
        write_handle(r_dest as *mut c_void, slot_size(VariantType::StringName), new_string(&text));
    }
}

pub(super) unsafe extern "C" fn string_to_utf8_chars(
    p_self: sys::GDExtensionConstStringPtr,
    r_text: *mut c_char,
    p_max_write_length: sys::GDExtensionInt,
) -> sys::GDExtensionInt {
    // SAFETY: live string; `r_text` is null or holds `p_max_write_length` writable bytes.
    unsafe {
        let text = text_of(read_handle(p_self as *const c_void));

        if !r_text.is_null() {
            let max = usize::try_from(p_max_write_length).unwrap_or(0);
            let count = text.len().min(max);
            ptr::copy_nonoverlapping(text.as_ptr(), r_text as *mut u8, count);
        }

        text.len() as sys::GDExtensionInt
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Containers

fn index(p_index: sys::GDExtensionInt) -> Option<usize> {
    usize::try_from(p_index).ok()
}

pub(super) unsafe extern "C" fn array_operator_index(
    p_self: sys::GDExtensionTypePtr,
    p_index: sys::GDExtensionInt,
) -> sys::GDExtensionVariantPtr {
    // SAFETY: live array.
    let elements = unsafe { &mut array_data(p_self as *const c_void).elements };

    index(p_index)
        .and_then(|i| elements.get_mut(i))
        .map_or(ptr::null_mut(), |e| e as *mut RawVariant as sys::GDExtensionVariantPtr)
}

pub(super) unsafe extern "C" fn array_operator_index_const(
    p_self: sys::GDExtensionConstTypePtr,
    p_index: sys::GDExtensionInt,
) -> sys::GDExtensionVariantPtr {
    // SAFETY: live array.
    let elements = unsafe { &array_data(p_self as *const c_void).elements };

    index(p_index)
        .and_then(|i| elements.get(i))
        .map_or(ptr::null_mut(), |e| e as *const RawVariant as sys::GDExtensionVariantPtr)
}

pub(super) unsafe extern "C" fn array_set_typed(
    p_self: sys::GDExtensionTypePtr,
    p_type: sys::GDExtensionVariantType,
    _p_class_name: sys::GDExtensionConstStringNamePtr,
    _p_script: sys::GDExtensionConstVariantPtr,
) {
    // SAFETY: live array.
    unsafe { array_data(p_self as *const c_void).element_type = VariantType::from_sys(p_type) };
}

pub(super) unsafe extern "C" fn dictionary_operator_index(
    p_self: sys::GDExtensionTypePtr,
    p_key: sys::GDExtensionConstVariantPtr,
) -> sys::GDExtensionVariantPtr {
    // SAFETY: live dictionary and key.
    let (dictionary, key) = unsafe { (dictionary_data(p_self as *const c_void), variant_ref(p_key)) };

    let position = match dictionary.find(key) {
        Some(position) => position,
        None => {
            dictionary.entries.push((key.clone(), Box::new(RawVariant::nil())));
            dictionary.entries.len() - 1
        }
    };

    &mut *dictionary.entries[position].1 as *mut RawVariant as sys::GDExtensionVariantPtr
}

pub(super) unsafe extern "C" fn dictionary_operator_index_const(
    p_self: sys::GDExtensionConstTypePtr,
    p_key: sys::GDExtensionConstVariantPtr,
) -> sys::GDExtensionVariantPtr {
    // SAFETY: live dictionary and key.
    let (dictionary, key) = unsafe { (dictionary_data(p_self as *const c_void), variant_ref(p_key)) };

    // Like the engine, a missing key fails a crash condition instead of returning null.
    let Some(position) = dictionary.find(key) else {
        eprintln!("CRASH_COND: const Dictionary[] with a missing key");
        std::process::abort();
    };

    &*dictionary.entries[position].1 as *const RawVariant as sys::GDExtensionVariantPtr
}

const PACKED_SLOT_SIZE: usize = size_of::<sys::types::OpaquePackedByteArray>();

pub(super) unsafe extern "C" fn packed_operator_index<E: EngineElement>(
    p_self: sys::GDExtensionTypePtr,
    p_index: sys::GDExtensionInt,
) -> *mut E {
    // SAFETY: live packed array of `E`; writable access detaches the buffer.
    let buffer = unsafe { make_unique::<E>(p_self as *mut c_void, PACKED_SLOT_SIZE) };

    index(p_index)
        .and_then(|i| buffer.get_mut(i))
        .map_or(ptr::null_mut(), |e| e as *mut E)
}

pub(super) unsafe extern "C" fn packed_operator_index_const<E: EngineElement>(
    p_self: sys::GDExtensionConstTypePtr,
    p_index: sys::GDExtensionInt,
) -> *const E {
    // SAFETY: live packed array of `E`.
    let handle = unsafe { read_handle(p_self as *const c_void) };
    if handle.is_null() {
        return ptr::null();
    }

    // SAFETY: non-null handle of a packed array of `E`.
    let buffer = unsafe { Shared::<Vec<E>>::data(handle) };
    index(p_index)
        .and_then(|i| buffer.get(i))
        .map_or(ptr::null(), |e| e as *const E)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Objects

pub(super) unsafe extern "C" fn object_destroy(p_o: sys::GDExtensionObjectPtr) {
    // SAFETY: the extension gives up the object.
    unsafe { objects::destroy(p_o as *mut objects::EngineObject) };
}

pub(super) unsafe extern "C" fn object_get_instance_id(p_object: sys::GDExtensionConstObjectPtr) -> sys::GDObjectInstanceID {
    objects::instance_id(p_object as *const c_void)
}

pub(super) unsafe extern "C" fn object_get_instance_from_id(p_instance_id: sys::GDObjectInstanceID) -> sys::GDExtensionObjectPtr {
    objects::from_id(p_instance_id) as sys::GDExtensionObjectPtr
}

pub(super) unsafe extern "C" fn object_cast_to(
    p_object: sys::GDExtensionConstObjectPtr,
    p_class_tag: *mut c_void,
) -> sys::GDExtensionObjectPtr {
    objects::cast_to(p_object as *const c_void, p_class_tag) as sys::GDExtensionObjectPtr
}

pub(super) unsafe extern "C" fn object_method_bind_ptrcall(
    p_method_bind: sys::GDExtensionMethodBindPtr,
    p_instance: sys::GDExtensionObjectPtr,
    _p_args: *const sys::GDExtensionConstTypePtr,
    r_ret: sys::GDExtensionTypePtr,
) {
    // SAFETY: bind from `classdb_get_method_bind()`, return slot of its type.
    unsafe { objects::ptrcall(p_method_bind, p_instance as *mut c_void, r_ret) };
}

pub(super) unsafe extern "C" fn object_method_bind_call(
    p_method_bind: sys::GDExtensionMethodBindPtr,
    p_instance: sys::GDExtensionObjectPtr,
    _p_args: *const sys::GDExtensionConstVariantPtr,
    p_arg_count: sys::GDExtensionInt,
    r_ret: sys::GDExtensionUninitializedVariantPtr,
    r_error: *mut sys::GDExtensionCallError,
) {
    // SAFETY: bind from `classdb_get_method_bind()`; the return slot is initialized before the call.
    unsafe {
        let ret = r_ret as *mut RawVariant;
        ptr::write(ret, RawVariant::nil());
        *r_error = sys::default_call_error();

        objects::varcall(
            p_method_bind as *const objects::MethodBind,
            p_instance as *mut c_void,
            usize::try_from(p_arg_count).unwrap_or(0),
            &mut *ret,
            &mut *r_error,
        );
    }
}

pub(super) unsafe extern "C" fn classdb_construct_object(
    p_classname: sys::GDExtensionConstStringNamePtr,
) -> sys::GDExtensionObjectPtr {
    // SAFETY: live class name.
    let name = unsafe { name_text(p_classname) };

    objects::class_by_name(&name).map_or(ptr::null_mut(), |class| objects::construct(class) as sys::GDExtensionObjectPtr)
}

pub(super) unsafe extern "C" fn classdb_get_method_bind(
    p_classname: sys::GDExtensionConstStringNamePtr,
    p_methodname: sys::GDExtensionConstStringNamePtr,
    p_hash: sys::GDExtensionInt,
) -> sys::GDExtensionMethodBindPtr {
    // SAFETY: live names.
    let (class_name, method_name) = unsafe { (name_text(p_classname), name_text(p_methodname)) };
    let bind = objects::method_bind(&class_name, &method_name, p_hash);
    record_lookup(Lookup::MethodBind(class_name, method_name));

    bind
}

pub(super) unsafe extern "C" fn classdb_get_class_tag(p_classname: sys::GDExtensionConstStringNamePtr) -> *mut c_void {
    // SAFETY: live class name.
    let name = unsafe { name_text(p_classname) };
    let tag = objects::class_tag(&name);
    record_lookup(Lookup::ClassTag(name));

    tag
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Callables

pub(super) unsafe extern "C" fn callable_custom_create2(
    r_callable: sys::GDExtensionUninitializedTypePtr,
    p_callable_custom_info: *mut sys::GDExtensionCallableCustomInfo2,
) {
    // SAFETY: readable info, uninitialized destination.
    unsafe {
        let custom = CustomCallable {
            info: *p_callable_custom_info,
        };
        write_handle(r_callable as *mut c_void, slot_size(VariantType::Callable), Shared::into_raw(custom));
    }
}

pub(super) unsafe extern "C" fn callable_custom_get_userdata(
    p_callable: sys::GDExtensionConstTypePtr,
    p_token: *mut c_void,
) -> *mut c_void {
    // SAFETY: live callable.
    let handle = unsafe { read_handle(p_callable as *const c_void) };
    if handle.is_null() {
        return ptr::null_mut();
    }

    // SAFETY: non-null callable handle.
    let info = unsafe { &Shared::<CustomCallable>::data(handle).info };
    if info.token == p_token {
        info.callable_userdata
    } else {
        ptr::null_mut()
    }
}
