/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Engine-side data of the handle types, and the pointer-call functions handed out by builtin lookups.
//!
//! Every handle type except `Array` and `Dictionary` uses null as its empty value. Arrays and dictionaries always own a block, since
//! copies of them share state on the engine side.

use std::ffi::{c_int, c_void};
use std::mem::size_of;
use std::ptr;

use gdinterop::builtin::{Color, Vector2, Vector3, Vector4, VariantOperator, VariantType};
use gdinterop::sys;

use super::objects;
use super::shared::{Shared, acquire, read_handle, ref_count, write_handle};
use super::variant::{Layout, RawVariant, layout_of, slot_size, stringify, variants_equal};

pub(crate) type PtrConstructor =
    unsafe extern "C" fn(sys::GDExtensionUninitializedTypePtr, *const sys::GDExtensionConstTypePtr);
pub(crate) type PtrDestructor = unsafe extern "C" fn(sys::GDExtensionTypePtr);
pub(crate) type PtrBuiltinMethod = unsafe extern "C" fn(
    sys::GDExtensionTypePtr,
    *const sys::GDExtensionConstTypePtr,
    sys::GDExtensionTypePtr,
    c_int,
);
pub(crate) type PtrOperatorEvaluator =
    unsafe extern "C" fn(sys::GDExtensionConstTypePtr, sys::GDExtensionConstTypePtr, sys::GDExtensionTypePtr);
pub(crate) type PtrUtilityFunction =
    unsafe extern "C" fn(sys::GDExtensionTypePtr, *const sys::GDExtensionConstTypePtr, c_int);

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Data

#[derive(Default)]
pub(crate) struct ArrayData {
    pub elements: Vec<RawVariant>,
    pub element_type: VariantType,
}

impl ArrayData {
    pub fn duplicate(&self, deep: bool) -> Self {
        Self {
            elements: self.elements.iter().map(|e| e.duplicate(deep)).collect(),
            element_type: self.element_type,
        }
    }
}

/// Insertion-ordered map. Values are boxed, so that pointers returned by indexing survive later insertions.
#[derive(Default)]
pub(crate) struct DictionaryData {
    pub entries: Vec<(RawVariant, Box<RawVariant>)>,
}

impl DictionaryData {
    pub fn find(&self, key: &RawVariant) -> Option<usize> {
        self.entries.iter().position(|(k, _)| variants_equal(k, key))
    }

    pub fn duplicate(&self, deep: bool) -> Self {
        let entries = self
            .entries
            .iter()
            .map(|(k, v)| (k.duplicate(deep), Box::new(v.duplicate(deep))))
            .collect();

        Self { entries }
    }
}

pub(crate) struct CustomCallable {
    pub info: sys::GDExtensionCallableCustomInfo2,
}

impl Drop for CustomCallable {
    fn drop(&mut self) {
        if let Some(free) = self.info.free_func {
            // SAFETY: the extension handed over the userdata together with its free function.
            unsafe { free(self.info.callable_userdata) };
        }
    }
}

pub(crate) struct SignalData {
    pub object_id: u64,
    pub name: *mut c_void,
}

impl Drop for SignalData {
    fn drop(&mut self) {
        // SAFETY: the signal owns one reference of its name.
        unsafe { Shared::<String>::release(self.name) };
    }
}

/// `String` element of a `PackedStringArray`; same layout as a string slot.
#[repr(transparent)]
pub(crate) struct StringHandle(*mut c_void);

impl Clone for StringHandle {
    fn clone(&self) -> Self {
        // SAFETY: null or a live string block.
        unsafe { acquire(self.0) };
        Self(self.0)
    }
}

impl Drop for StringHandle {
    fn drop(&mut self) {
        // SAFETY: the element owns one reference.
        unsafe { Shared::<String>::release(self.0) };
    }
}

impl PartialEq for StringHandle {
    fn eq(&self, other: &Self) -> bool {
        // SAFETY: null or live string blocks.
        unsafe { text_of(self.0) == text_of(other.0) }
    }
}

/// Element of a packed array buffer.
pub(crate) trait EngineElement: Clone + PartialEq + 'static {
    fn zero() -> Self;

    fn describe(&self) -> String;
}

macro_rules! impl_engine_element {
    ($($T:ty),* $(,)?) => {
        $(
            impl EngineElement for $T {
                fn zero() -> Self {
                    <$T>::default()
                }

                fn describe(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_engine_element!(u8, i32, i64, f32, f64, Vector2, Vector3, Vector4);

impl EngineElement for Color {
    fn zero() -> Self {
        Color::BLACK
    }

    fn describe(&self) -> String {
        self.to_string()
    }
}

impl EngineElement for StringHandle {
    fn zero() -> Self {
        Self(ptr::null_mut())
    }

    fn describe(&self) -> String {
        // SAFETY: null or a live string block.
        format!("\"{}\"", unsafe { text_of(self.0) })
    }
}

/// Runs `$body` with `$E` bound to the element type of packed array type `$ty`, or evaluates `$fallback` for other types.
macro_rules! dispatch_packed {
    ($ty:expr, |$E:ident| $body:expr, else $fallback:expr) => {{
        use gdinterop::builtin::VariantType as T;

        match $ty {
            T::PackedByteArray => { type $E = u8; $body }
            T::PackedInt32Array => { type $E = i32; $body }
            T::PackedInt64Array => { type $E = i64; $body }
            T::PackedFloat32Array => { type $E = f32; $body }
            T::PackedFloat64Array => { type $E = f64; $body }
            T::PackedStringArray => { type $E = $crate::framework::engine::builtins::StringHandle; $body }
            T::PackedVector2Array => { type $E = gdinterop::builtin::Vector2; $body }
            T::PackedVector3Array => { type $E = gdinterop::builtin::Vector3; $body }
            T::PackedVector4Array => { type $E = gdinterop::builtin::Vector4; $body }
            T::PackedColorArray => { type $E = gdinterop::builtin::Color; $body }
            _ => $fallback,
        }
    }};
}

/// Instantiates `$func::<TYPE>` for the handle type `$ty`, or `None` if `$ty` is not a handle type.
macro_rules! for_handle_type {
    ($ty:expr, $func:ident as $Fn:ty) => {{
        use gdinterop::builtin::VariantType as T;

        match $ty {
            T::String => Some($func::<{ T::String as i32 }> as $Fn),
            T::StringName => Some($func::<{ T::StringName as i32 }> as $Fn),
            T::NodePath => Some($func::<{ T::NodePath as i32 }> as $Fn),
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
            T::PackedVector4Array => Some($func::<{ T::PackedVector4Array as i32 }> as $Fn),
            T::PackedColorArray => Some($func::<{ T::PackedColorArray as i32 }> as $Fn),
            _ => None,
        }
    }};
}

pub(crate) use {dispatch_packed, for_handle_type};

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Handle helpers

/// New string block holding `text`; null for the empty string.
pub(crate) fn new_string(text: &str) -> *mut c_void {
    if text.is_empty() {
        ptr::null_mut()
    } else {
        Shared::into_raw(text.to_string())
    }
}

/// # Safety
/// `handle` must be null or a live string block, which outlives the returned reference.
pub(crate) unsafe fn text_of<'a>(handle: *mut c_void) -> &'a str {
    if handle.is_null() {
        ""
    } else {
        // SAFETY: per contract.
        unsafe { Shared::<String>::data(handle).as_str() }
    }
}

/// # Safety
/// `slot` must point to a live array value.
pub(crate) unsafe fn array_data<'a>(slot: *const c_void) -> &'a mut ArrayData {
    // SAFETY: array slots always hold a block.
    unsafe { Shared::<ArrayData>::data(read_handle(slot)) }
}

/// # Safety
/// `slot` must point to a live dictionary value.
pub(crate) unsafe fn dictionary_data<'a>(slot: *const c_void) -> &'a mut DictionaryData {
    // SAFETY: dictionary slots always hold a block.
    unsafe { Shared::<DictionaryData>::data(read_handle(slot)) }
}

/// # Safety
/// `handle` must be null or a live packed block of `E`.
unsafe fn packed_slice<'a, E: EngineElement>(handle: *mut c_void) -> &'a [E] {
    if handle.is_null() {
        &[]
    } else {
        // SAFETY: per contract.
        unsafe { Shared::<Vec<E>>::data(handle).as_slice() }
    }
}

/// Buffer of the packed array at `slot`, detached from other owners first (copy-on-write).
///
/// # Safety
/// `slot` must point to a live packed array of `E`.
pub(crate) unsafe fn make_unique<'a, E: EngineElement>(slot: *mut c_void, slot_size: usize) -> &'a mut Vec<E> {
    // SAFETY: per contract.
    unsafe {
        let mut handle = read_handle(slot);

        if handle.is_null() {
            handle = Shared::into_raw(Vec::<E>::new());
            write_handle(slot, slot_size, handle);
        } else if ref_count(handle) > 1 {
            let copy = Shared::<Vec<E>>::data(handle).clone();
            Shared::<Vec<E>>::release(handle);

            handle = Shared::into_raw(copy);
            write_handle(slot, slot_size, handle);
        }

        Shared::<Vec<E>>::data(handle)
    }
}

fn default_handle(ty: VariantType) -> *mut c_void {
    match ty {
        VariantType::Array => Shared::into_raw(ArrayData::default()),
        VariantType::Dictionary => Shared::into_raw(DictionaryData::default()),
        _ => ptr::null_mut(),
    }
}

/// Writes the default value of `ty` into an uninitialized slot.
///
/// # Safety
/// `dst` must point to `slot_size(ty)` writable bytes.
pub(crate) unsafe fn write_default(ty: VariantType, dst: *mut c_void) {
    // SAFETY: per contract.
    unsafe {
        match layout_of(ty) {
            Layout::Empty => {}
            Layout::Inline(size) | Layout::Boxed(size) => ptr::write_bytes(dst as *mut u8, 0, size),
            Layout::Handle => write_handle(dst, slot_size(ty), default_handle(ty)),
            Layout::Object => ptr::write_unaligned(dst as *mut *mut c_void, ptr::null_mut()),
        }
    }
}

/// Releases one reference of a handle of type `ty`.
///
/// # Safety
/// `handle` must be null or a live block of the type's data.
pub(crate) unsafe fn release_handle(ty: VariantType, handle: *mut c_void) {
    use VariantType as T;

    // SAFETY: the block type follows from `ty`.
    unsafe {
        match ty {
            T::String | T::StringName | T::NodePath => Shared::<String>::release(handle),
            T::Array => Shared::<ArrayData>::release(handle),
            T::Dictionary => Shared::<DictionaryData>::release(handle),
            T::Callable => Shared::<CustomCallable>::release(handle),
            T::Signal => Shared::<SignalData>::release(handle),
            _ => dispatch_packed!(ty, |E| Shared::<Vec<E>>::release(handle), else ()),
        }
    }
}

/// # Safety
/// `a` and `b` must be null or live blocks of the type's data.
pub(crate) unsafe fn handles_equal(ty: VariantType, a: *mut c_void, b: *mut c_void) -> bool {
    use VariantType as T;

    if a == b {
        return true;
    }

    // SAFETY: the block type follows from `ty`.
    unsafe {
        match ty {
            T::String | T::StringName | T::NodePath => text_of(a) == text_of(b),
            T::Array => {
                let (a, b) = (&Shared::<ArrayData>::data(a).elements, &Shared::<ArrayData>::data(b).elements);
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| variants_equal(x, y))
            }
            T::Dictionary => {
                let (a, b) = (Shared::<DictionaryData>::data(a), Shared::<DictionaryData>::data(b));
                a.entries.len() == b.entries.len()
                    && a.entries.iter().all(|(key, value)| {
                        b.find(key)
                            .is_some_and(|i| variants_equal(value, &b.entries[i].1))
                    })
            }
            T::Callable => callables_equal(a, b),
            T::Signal => {
                if a.is_null() || b.is_null() {
                    return false;
                }
                let (a, b) = (Shared::<SignalData>::data(a), Shared::<SignalData>::data(b));
                a.object_id == b.object_id && text_of(a.name) == text_of(b.name)
            }
            _ => dispatch_packed!(ty, |E| packed_slice::<E>(a) == packed_slice::<E>(b), else false),
        }
    }
}

/// Custom callables are equal if they share their call function and its equality function says so.
unsafe fn callables_equal(a: *mut c_void, b: *mut c_void) -> bool {
    if a.is_null() || b.is_null() {
        return a == b;
    }

    // SAFETY: live callable blocks.
    let (a, b) = unsafe { (&Shared::<CustomCallable>::data(a).info, &Shared::<CustomCallable>::data(b).info) };
    let same_kind = a.call_func.map(|f| f as usize) == b.call_func.map(|f| f as usize);

    match a.equal_func {
        // SAFETY: both userdata pointers belong to the same kind of callable.
        Some(equal) if same_kind => unsafe { equal(a.callable_userdata, b.callable_userdata) != 0 },
        _ => false,
    }
}

/// # Safety
/// `handle` must be null or a live block of the type's data.
pub(crate) unsafe fn describe_handle(ty: VariantType, handle: *mut c_void, nested: bool) -> String {
    use VariantType as T;

    // SAFETY: the block type follows from `ty`.
    unsafe {
        match ty {
            T::String | T::StringName | T::NodePath if nested => format!("\"{}\"", text_of(handle)),
            T::String | T::StringName | T::NodePath => text_of(handle).to_string(),
            T::Array => {
                let elements = &Shared::<ArrayData>::data(handle).elements;
                let parts: Vec<String> = elements.iter().map(|e| stringify(e, true)).collect();
                format!("[{}]", parts.join(", "))
            }
            T::Dictionary => {
                let entries = &Shared::<DictionaryData>::data(handle).entries;
                if entries.is_empty() {
                    return "{}".to_string();
                }

                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", stringify(k, true), stringify(v, true)))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            T::Callable => describe_callable(handle),
            T::Signal if handle.is_null() => "null::null".to_string(),
            T::Signal => {
                let signal = Shared::<SignalData>::data(handle);
                format!("{}::{}", objects::describe_id(signal.object_id), text_of(signal.name))
            }
            _ => dispatch_packed!(
                ty,
                |E| {
                    let parts: Vec<String> = packed_slice::<E>(handle).iter().map(E::describe).collect();
                    format!("[{}]", parts.join(", "))
                },
                else String::new()
            ),
        }
    }
}

unsafe fn describe_callable(handle: *mut c_void) -> String {
    if handle.is_null() {
        return "null::null".to_string();
    }

    // SAFETY: live callable block.
    let info = unsafe { Shared::<CustomCallable>::data(handle).info };
    let Some(to_string) = info.to_string_func else {
        return "<CustomCallable>".to_string();
    };

    // The extension writes into an empty string slot.
    let mut out: *mut c_void = ptr::null_mut();
    let mut valid = sys::SYS_FALSE;

    // SAFETY: `out` is an empty string slot owned here.
    unsafe {
        to_string(
            info.callable_userdata,
            &mut valid,
            &mut out as *mut *mut c_void as sys::GDExtensionStringPtr,
        );

        let text = text_of(out).to_string();
        Shared::<String>::release(out);

        if valid != 0 { text } else { "<CustomCallable>".to_string() }
    }
}

/// # Safety
/// `handle` must be null or a live callable block.
pub(crate) unsafe fn callable_hash(handle: *mut c_void) -> Option<u32> {
    if handle.is_null() {
        return None;
    }

    // SAFETY: per contract.
    let info = unsafe { Shared::<CustomCallable>::data(handle).info };

    // SAFETY: the hash function belongs to the userdata.
    info.hash_func.map(|hash| unsafe { hash(info.callable_userdata) })
}

/// Invokes a callable with variant arguments. The caller initializes `ret` to nil.
///
/// # Safety
/// `handle` must be null or a live callable block; `args` must point to live variants.
pub(crate) unsafe fn call_callable(
    handle: *mut c_void,
    args: &[*const RawVariant],
    ret: &mut RawVariant,
    err: &mut sys::GDExtensionCallError,
) {
    if handle.is_null() {
        err.error = sys::GDEXTENSION_CALL_ERROR_INSTANCE_IS_NULL;
        return;
    }

    // SAFETY: per contract. The info is copied, so that the block is not borrowed while the extension runs.
    let info = unsafe { Shared::<CustomCallable>::data(handle).info };
    let Some(call) = info.call_func else {
        err.error = sys::GDEXTENSION_CALL_ERROR_INVALID_METHOD;
        return;
    };

    // SAFETY: argument and return pointers are live for the call.
    unsafe {
        call(
            info.callable_userdata,
            args.as_ptr() as *const sys::GDExtensionConstVariantPtr,
            args.len() as sys::GDExtensionInt,
            ret as *mut RawVariant as sys::GDExtensionVariantPtr,
            err,
        )
    };
}

/// Argument-less methods reachable through dynamic calls on builtin receivers.
///
/// # Safety
/// `handle` must be the handle of a live value of type `ty`.
pub(crate) unsafe fn call_dynamic(ty: VariantType, handle: *mut c_void, method: &str) -> Option<RawVariant> {
    use VariantType as T;

    let int = |value: usize| RawVariant::from_inline(T::Int, value as i64);

    // SAFETY: the block type follows from `ty`.
    unsafe {
        match (ty, method) {
            (T::String, "length") => Some(int(text_of(handle).chars().count())),
            (T::Array, "size") => Some(int(Shared::<ArrayData>::data(handle).elements.len())),
            (T::Dictionary, "size") => Some(int(Shared::<DictionaryData>::data(handle).entries.len())),
            (T::Callable, "is_valid") => Some(RawVariant::from_inline(T::Bool, u8::from(callable_valid(handle)))),
            _ => None,
        }
    }
}

unsafe fn callable_valid(handle: *mut c_void) -> bool {
    if handle.is_null() {
        return false;
    }

    // SAFETY: live callable block.
    let info = unsafe { Shared::<CustomCallable>::data(handle).info };
    match info.is_valid_func {
        // SAFETY: the validity check belongs to the userdata.
        Some(is_valid) => unsafe { is_valid(info.callable_userdata) != 0 },
        None => true,
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Constructors and destructors

pub(crate) fn constructor(ty: VariantType, index: i32) -> Option<PtrConstructor> {
    use VariantType as T;

    match (ty, index) {
        (_, 0) => for_handle_type!(ty, construct_default as PtrConstructor),
        (_, 1) => for_handle_type!(ty, construct_copy as PtrConstructor),

        // String(StringName), String(NodePath), StringName(String), NodePath(String).
        (T::String, 2 | 3) | (T::StringName | T::NodePath, 2) => {
            for_handle_type!(ty, construct_from_text as PtrConstructor)
        }
        (T::Signal, 2) => Some(construct_signal as PtrConstructor),
        _ => None,
    }
}

pub(crate) fn destructor(ty: VariantType) -> Option<PtrDestructor> {
    for_handle_type!(ty, destroy as PtrDestructor)
}

unsafe extern "C" fn construct_default<const TYPE: i32>(
    dst: sys::GDExtensionUninitializedTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
) {
    // SAFETY: the extension passes a slot of the type.
    unsafe { write_default(VariantType::from_sys(TYPE), dst as *mut c_void) };
}

unsafe extern "C" fn construct_copy<const TYPE: i32>(
    dst: sys::GDExtensionUninitializedTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
) {
    let ty = VariantType::from_sys(TYPE);

    // SAFETY: one argument of the same type; the copy shares its block.
    unsafe {
        let handle = read_handle(*args as *const c_void);
        acquire(handle);
        write_handle(dst as *mut c_void, slot_size(ty), handle);
    }
}

unsafe extern "C" fn construct_from_text<const TYPE: i32>(
    dst: sys::GDExtensionUninitializedTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
) {
    let ty = VariantType::from_sys(TYPE);

    // SAFETY: one argument of a string-like type, whose block holds the text.
    unsafe {
        let text = text_of(read_handle(*args as *const c_void));
        write_handle(dst as *mut c_void, slot_size(ty), new_string(text));
    }
}

unsafe extern "C" fn construct_signal(
    dst: sys::GDExtensionUninitializedTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
) {
    // SAFETY: arguments are (Object, StringName).
    unsafe {
        let object = read_handle(*args as *const c_void);
        let name = read_handle(*args.add(1) as *const c_void);
        acquire(name);

        let signal = SignalData {
            object_id: objects::instance_id(object),
            name,
        };
        write_handle(dst as *mut c_void, slot_size(VariantType::Signal), Shared::into_raw(signal));
    }
}

unsafe extern "C" fn destroy<const TYPE: i32>(slot: sys::GDExtensionTypePtr) {
    let ty = VariantType::from_sys(TYPE);

    // SAFETY: the slot owns one reference, released here; the slot is left empty.
    unsafe {
        release_handle(ty, read_handle(slot as *const c_void));
        write_handle(slot as *mut c_void, slot_size(ty), ptr::null_mut());
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Builtin methods

// Hashes of method signatures in the engine's API manifest.
const HASH_INT_NOARGS_CONST: i64 = 3173160232;
const HASH_BOOL_NOARGS_CONST: i64 = 3918633141;
const HASH_RESIZE: i64 = 848867239;
const HASH_CLEAR: i64 = 3218959716;
const HASH_ARRAY_DUPLICATE: i64 = 636440122;
const HASH_DICTIONARY_DUPLICATE: i64 = 830099069;
const HASH_DICTIONARY_KEYS: i64 = 4144163970;
const HASH_DICTIONARY_ERASE: i64 = 1776646889;
const HASH_DICTIONARY_HAS: i64 = 3680194679;
const HASH_DICTIONARY_GET: i64 = 2205440559;
const HASH_SIGNAL_GET_NAME: i64 = 2002593661;
const HASH_SIGNAL_GET_OBJECT_ID: i64 = 2944547224;

/// Method `name` of `ty`, if it exists with signature hash `hash`.
pub(crate) fn builtin_method(ty: VariantType, name: &str, hash: i64) -> Option<PtrBuiltinMethod> {
    use VariantType as T;

    let (expected_hash, method): (i64, PtrBuiltinMethod) = match (ty, name) {
        (T::String, "length") => (HASH_INT_NOARGS_CONST, string_length),

        (T::Array, "size") => (HASH_INT_NOARGS_CONST, array_size),
        (T::Array, "resize") => (HASH_RESIZE, array_resize),
        (T::Array, "clear") => (HASH_CLEAR, array_clear),
        (T::Array, "duplicate") => (HASH_ARRAY_DUPLICATE, array_duplicate),
        (T::Array, "get_typed_builtin") => (HASH_INT_NOARGS_CONST, array_get_typed_builtin),

        (T::Dictionary, "size") => (HASH_INT_NOARGS_CONST, dictionary_size),
        (T::Dictionary, "clear") => (HASH_CLEAR, dictionary_clear),
        (T::Dictionary, "duplicate") => (HASH_DICTIONARY_DUPLICATE, dictionary_duplicate),
        (T::Dictionary, "keys") => (HASH_DICTIONARY_KEYS, dictionary_keys),
        (T::Dictionary, "erase") => (HASH_DICTIONARY_ERASE, dictionary_erase),
        (T::Dictionary, "has") => (HASH_DICTIONARY_HAS, dictionary_has),
        (T::Dictionary, "get") => (HASH_DICTIONARY_GET, dictionary_get),

        (T::Callable, "is_valid") => (HASH_BOOL_NOARGS_CONST, callable_is_valid),
        (T::Callable, "get_argument_count") => (HASH_INT_NOARGS_CONST, callable_get_argument_count),
        (T::Callable, "hash") => (HASH_INT_NOARGS_CONST, callable_hash_method),

        (T::Signal, "get_name") => (HASH_SIGNAL_GET_NAME, signal_get_name),
        (T::Signal, "get_object_id") => (HASH_SIGNAL_GET_OBJECT_ID, signal_get_object_id),

        (_, "size") => dispatch_packed!(ty, |E| (HASH_INT_NOARGS_CONST, packed_size::<E> as PtrBuiltinMethod), else return None),
        (_, "resize") => dispatch_packed!(ty, |E| (HASH_RESIZE, packed_resize::<E> as PtrBuiltinMethod), else return None),
        _ => return None,
    };

    (expected_hash == hash).then_some(method)
}

/// # Safety
/// `ret` must be null or point to a writable `T` slot.
unsafe fn write_ret<T>(ret: sys::GDExtensionTypePtr, value: T) {
    if !ret.is_null() {
        // SAFETY: per contract.
        unsafe { ptr::write_unaligned(ret as *mut T, value) };
    }
}

/// # Safety
/// `args` must hold at least `index + 1` pointers, the one at `index` to a `T`.
unsafe fn arg<T: Copy>(args: *const sys::GDExtensionConstTypePtr, index: usize) -> T {
    // SAFETY: per contract.
    unsafe { ptr::read_unaligned(*args.add(index) as *const T) }
}

unsafe extern "C" fn string_length(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `length() -> int` on a live string.
    unsafe {
        let len = text_of(read_handle(base as *const c_void)).chars().count();
        write_ret(ret, len as i64);
    }
}

unsafe extern "C" fn array_size(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `size() -> int` on a live array.
    unsafe { write_ret(ret, array_data(base as *const c_void).elements.len() as i64) };
}

unsafe extern "C" fn array_resize(
    base: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `resize(int) -> Error` on a live array.
    unsafe {
        let new_len = usize::try_from(arg::<i64>(args, 0)).unwrap_or(0);
        array_data(base as *const c_void).elements.resize_with(new_len, RawVariant::nil);
        write_ret(ret, 0i64);
    }
}

unsafe extern "C" fn array_clear(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    _ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: live array.
    unsafe { array_data(base as *const c_void).elements.clear() };
}

unsafe extern "C" fn array_duplicate(
    base: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `duplicate(bool) -> Array`; the return slot is uninitialized.
    unsafe {
        let deep = arg::<u8>(args, 0) != 0;
        let copy = array_data(base as *const c_void).duplicate(deep);
        write_handle(ret as *mut c_void, slot_size(VariantType::Array), Shared::into_raw(copy));
    }
}

unsafe extern "C" fn array_get_typed_builtin(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `get_typed_builtin() -> int` on a live array.
    unsafe {
        let element_type = array_data(base as *const c_void).element_type;
        write_ret(ret, i64::from(element_type.sys()));
    }
}

unsafe extern "C" fn dictionary_size(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `size() -> int` on a live dictionary.
    unsafe { write_ret(ret, dictionary_data(base as *const c_void).entries.len() as i64) };
}

unsafe extern "C" fn dictionary_clear(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    _ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: live dictionary.
    unsafe { dictionary_data(base as *const c_void).entries.clear() };
}

unsafe extern "C" fn dictionary_duplicate(
    base: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `duplicate(bool) -> Dictionary`; the return slot is uninitialized.
    unsafe {
        let deep = arg::<u8>(args, 0) != 0;
        let copy = dictionary_data(base as *const c_void).duplicate(deep);
        write_handle(ret as *mut c_void, slot_size(VariantType::Dictionary), Shared::into_raw(copy));
    }
}

unsafe extern "C" fn dictionary_keys(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `keys() -> Array`; the return slot is uninitialized.
    unsafe {
        let keys = ArrayData {
            elements: dictionary_data(base as *const c_void).entries.iter().map(|(k, _)| k.clone()).collect(),
            element_type: VariantType::Nil,
        };
        write_handle(ret as *mut c_void, slot_size(VariantType::Array), Shared::into_raw(keys));
    }
}

unsafe extern "C" fn dictionary_erase(
    base: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `erase(Variant) -> bool`; the argument is a live variant.
    unsafe {
        let key = &*(*args as *const RawVariant);
        let dictionary = dictionary_data(base as *const c_void);

        let erased = match dictionary.find(key) {
            Some(index) => {
                dictionary.entries.remove(index);
                true
            }
            None => false,
        };
        write_ret(ret, u8::from(erased));
    }
}

unsafe extern "C" fn dictionary_has(
    base: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `has(Variant) -> bool`; the argument is a live variant.
    unsafe {
        let key = &*(*args as *const RawVariant);
        let found = dictionary_data(base as *const c_void).find(key).is_some();
        write_ret(ret, u8::from(found));
    }
}

unsafe extern "C" fn dictionary_get(
    base: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `get(Variant, Variant) -> Variant`; both arguments are live variants, the return slot holds a variant.
    unsafe {
        let key = &*(*args as *const RawVariant);
        let default = &*(*args.add(1) as *const RawVariant);
        let dictionary = dictionary_data(base as *const c_void);

        let value = match dictionary.find(key) {
            Some(index) => (*dictionary.entries[index].1).clone(),
            None => default.clone(),
        };
        *(ret as *mut RawVariant) = value;
    }
}

unsafe extern "C" fn packed_size<E: EngineElement>(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `size() -> int` on a live packed array of `E`.
    unsafe {
        let len = packed_slice::<E>(read_handle(base as *const c_void)).len();
        write_ret(ret, len as i64);
    }
}

unsafe extern "C" fn packed_resize<E: EngineElement>(
    base: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `resize(int) -> int` on a live packed array of `E`.
    unsafe {
        let new_len = usize::try_from(arg::<i64>(args, 0)).unwrap_or(0);
        make_unique::<E>(base as *mut c_void, size_of::<sys::types::OpaquePackedByteArray>()).resize(new_len, E::zero());
        write_ret(ret, 0i64);
    }
}

unsafe extern "C" fn callable_is_valid(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `is_valid() -> bool` on a live callable.
    unsafe { write_ret(ret, u8::from(callable_valid(read_handle(base as *const c_void)))) };
}

unsafe extern "C" fn callable_get_argument_count(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `get_argument_count() -> int` on a live callable.
    unsafe {
        let handle = read_handle(base as *const c_void);
        let mut count = 0;

        if !handle.is_null() {
            let info = Shared::<CustomCallable>::data(handle).info;
            if let Some(get_count) = info.get_argument_count_func {
                let mut valid = sys::SYS_FALSE;
                let reported = get_count(info.callable_userdata, &mut valid);
                if valid != 0 {
                    count = reported;
                }
            }
        }
        write_ret(ret, count);
    }
}

unsafe extern "C" fn callable_hash_method(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `hash() -> int` on a live callable.
    unsafe {
        let hash = callable_hash(read_handle(base as *const c_void)).unwrap_or(0);
        write_ret(ret, i64::from(hash));
    }
}

unsafe extern "C" fn signal_get_name(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `get_name() -> StringName`; the return slot is uninitialized.
    unsafe {
        let handle = read_handle(base as *const c_void);
        let name = if handle.is_null() {
            ptr::null_mut()
        } else {
            Shared::<SignalData>::data(handle).name
        };

        acquire(name);
        write_handle(ret as *mut c_void, slot_size(VariantType::StringName), name);
    }
}

unsafe extern "C" fn signal_get_object_id(
    base: sys::GDExtensionTypePtr,
    _args: *const sys::GDExtensionConstTypePtr,
    ret: sys::GDExtensionTypePtr,
    _argc: c_int,
) {
    // SAFETY: `get_object_id() -> int` on a live signal.
    unsafe {
        let handle = read_handle(base as *const c_void);
        let id = if handle.is_null() {
            0
        } else {
            Shared::<SignalData>::data(handle).object_id
        };
        write_ret(ret, id as i64);
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Operators and utility functions

/// Equality operators between two values of the same handle type.
pub(crate) fn operator_evaluator(
    op: VariantOperator,
    left: VariantType,
    right: VariantType,
) -> Option<PtrOperatorEvaluator> {
    if left != right {
        return None;
    }

    match op {
        VariantOperator::Equal => for_handle_type!(left, evaluate_equal as PtrOperatorEvaluator),
        VariantOperator::NotEqual => for_handle_type!(left, evaluate_not_equal as PtrOperatorEvaluator),
        _ => None,
    }
}

unsafe extern "C" fn evaluate_equal<const TYPE: i32>(
    left: sys::GDExtensionConstTypePtr,
    right: sys::GDExtensionConstTypePtr,
    result: sys::GDExtensionTypePtr,
) {
    // SAFETY: operands are live values of the type; the result is a bool slot.
    unsafe {
        let equal = handles_equal(
            VariantType::from_sys(TYPE),
            read_handle(left as *const c_void),
            read_handle(right as *const c_void),
        );
        write_ret(result, u8::from(equal));
    }
}

unsafe extern "C" fn evaluate_not_equal<const TYPE: i32>(
    left: sys::GDExtensionConstTypePtr,
    right: sys::GDExtensionConstTypePtr,
    result: sys::GDExtensionTypePtr,
) {
    // SAFETY: see `evaluate_equal()`.
    unsafe {
        evaluate_equal::<TYPE>(left, right, result);
        let equal = ptr::read_unaligned(result as *const u8);
        write_ret(result, u8::from(equal == 0));
    }
}

const HASH_PRINT: i64 = 2648703342;

pub(crate) fn utility_function(name: &str, hash: i64) -> Option<PtrUtilityFunction> {
    match name {
        "print" if hash == HASH_PRINT => Some(utility_print as PtrUtilityFunction),
        _ => None,
    }
}

unsafe extern "C" fn utility_print(
    _ret: sys::GDExtensionTypePtr,
    args: *const sys::GDExtensionConstTypePtr,
    argc: c_int,
) {
    let argc = usize::try_from(argc).unwrap_or(0);

    // SAFETY: vararg utility; arguments are live variants.
    let text: String = (0..argc)
        .map(|i| unsafe { stringify(&*(*args.add(i) as *const RawVariant), false) })
        .collect();

    super::record_message(super::Message::Print(text));
}
