/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Variant storage of the engine double: a 4-byte tag at offset 0, the payload at `VARIANT_PAYLOAD_OFFSET`.
//!
//! Inline types keep their bytes in the payload. Boxed types keep a shared byte block, handle types a [`Shared`] block of their
//! engine-side data, objects a plain object pointer.

use std::ffi::c_void;
use std::fmt::Debug;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::mem::size_of;
use std::ptr;

use gdinterop::builtin::*;
use gdinterop::sys;
use gdinterop::sys::types::*;

use super::builtins::{self, ArrayData, DictionaryData};
use super::objects;
use super::shared::{Shared, acquire, read_handle, write_handle};

/// Storage class of a variant type.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub(crate) enum Layout {
    Empty,
    Inline(usize),
    Boxed(usize),
    Handle,
    Object,
}

pub(crate) fn layout_of(ty: VariantType) -> Layout {
    use VariantType as T;

    match ty {
        T::Nil => Layout::Empty,
        T::Bool => Layout::Inline(1),
        T::Int => Layout::Inline(size_of::<i64>()),
        T::Float => Layout::Inline(size_of::<f64>()),
        T::Vector2 => Layout::Inline(size_of::<Vector2>()),
        T::Vector2i => Layout::Inline(size_of::<Vector2i>()),
        T::Rect2 => Layout::Inline(size_of::<Rect2>()),
        T::Rect2i => Layout::Inline(size_of::<Rect2i>()),
        T::Vector3 => Layout::Inline(size_of::<Vector3>()),
        T::Vector3i => Layout::Inline(size_of::<Vector3i>()),
        T::Vector4 => Layout::Inline(size_of::<Vector4>()),
        T::Vector4i => Layout::Inline(size_of::<Vector4i>()),
        T::Plane => Layout::Inline(size_of::<Plane>()),
        T::Quaternion => Layout::Inline(size_of::<Quaternion>()),
        T::Color => Layout::Inline(size_of::<Color>()),
        T::Rid => Layout::Inline(size_of::<Rid>()),
        T::Transform2D => Layout::Boxed(size_of::<Transform2D>()),
        T::Aabb => Layout::Boxed(size_of::<Aabb>()),
        T::Basis => Layout::Boxed(size_of::<Basis>()),
        T::Transform3D => Layout::Boxed(size_of::<Transform3D>()),
        T::Projection => Layout::Boxed(size_of::<Projection>()),
        T::Object => Layout::Object,
        _ => Layout::Handle,
    }
}

/// Size of a typed value slot, as laid out by the extension.
pub(crate) fn slot_size(ty: VariantType) -> usize {
    use VariantType as T;

    match ty {
        T::String => size_of::<OpaqueString>(),
        T::StringName => size_of::<OpaqueStringName>(),
        T::NodePath => size_of::<OpaqueNodePath>(),
        T::Callable => size_of::<OpaqueCallable>(),
        T::Signal => size_of::<OpaqueSignal>(),
        T::Dictionary => size_of::<OpaqueDictionary>(),
        T::Array => size_of::<OpaqueArray>(),
        T::Object => size_of::<OpaqueObject>(),
        T::PackedByteArray
        | T::PackedInt32Array
        | T::PackedInt64Array
        | T::PackedFloat32Array
        | T::PackedFloat64Array
        | T::PackedStringArray
        | T::PackedVector2Array
        | T::PackedVector3Array
        | T::PackedVector4Array
        | T::PackedColorArray => size_of::<OpaquePackedByteArray>(),
        _ => match layout_of(ty) {
            Layout::Inline(size) | Layout::Boxed(size) => size,
            Layout::Empty | Layout::Handle | Layout::Object => 0,
        },
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

#[repr(C)]
pub(crate) struct RawVariant {
    storage: OpaqueVariant,
}

sys::static_assert_eq_size_align!(RawVariant, OpaqueVariant);

impl RawVariant {
    pub const fn nil() -> Self {
        Self {
            storage: OpaqueVariant::zeroed(),
        }
    }

    fn tagged(ty: VariantType) -> Self {
        let mut variant = Self::nil();

        // SAFETY: the tag is the first 4 bytes of the storage.
        unsafe { ptr::write_unaligned(variant.base_mut() as *mut i32, ty.sys()) };
        variant
    }

    pub fn variant_type(&self) -> VariantType {
        // SAFETY: the tag is the first 4 bytes of the storage.
        let tag = unsafe { ptr::read_unaligned(self.base() as *const i32) };
        VariantType::try_from_ord(tag).unwrap_or(VariantType::Nil)
    }

    pub fn from_inline<T: Copy>(ty: VariantType, payload: T) -> Self {
        let mut variant = Self::tagged(ty);

        // SAFETY: every inline payload fits behind the tag.
        unsafe { ptr::write_unaligned(variant.payload_mut() as *mut T, payload) };
        variant
    }

    /// Variant that takes over one reference of `handle`.
    pub fn from_handle(ty: VariantType, handle: *mut c_void) -> Self {
        Self::from_inline(ty, handle)
    }

    /// # Safety
    /// The variant's type must have an inline payload of type `T`.
    pub unsafe fn read<T: Copy>(&self) -> T {
        // SAFETY: per contract.
        unsafe { ptr::read_unaligned(self.payload() as *const T) }
    }

    /// Handle or object pointer of non-inline types.
    pub fn handle(&self) -> *mut c_void {
        match layout_of(self.variant_type()) {
            // SAFETY: those layouts store a pointer at the payload offset.
            Layout::Boxed(_) | Layout::Handle | Layout::Object => unsafe { self.read() },
            Layout::Empty | Layout::Inline(_) => ptr::null_mut(),
        }
    }

    /// New variant holding its own copy of the value at `src`.
    ///
    /// # Safety
    /// `src` must point to a live value of type `ty`.
    pub unsafe fn from_slot(ty: VariantType, src: *const c_void) -> Self {
        let mut variant = Self::tagged(ty);

        // SAFETY: per contract; sizes come from the layout of `ty`.
        unsafe {
            match layout_of(ty) {
                Layout::Empty => {}
                Layout::Inline(size) => {
                    ptr::copy_nonoverlapping(src as *const u8, variant.payload_mut(), size);
                }
                Layout::Boxed(size) => {
                    let bytes = std::slice::from_raw_parts(src as *const u8, size).to_vec();
                    variant.write_payload_handle(Shared::into_raw(bytes));
                }
                Layout::Handle => {
                    let handle = read_handle(src);
                    acquire(handle);
                    variant.write_payload_handle(handle);
                }
                Layout::Object => {
                    let object = read_handle(src);
                    objects::retain(object);
                    variant.write_payload_handle(object);
                }
            }
        }
        variant
    }

    /// Writes an independent value of the variant's type into the uninitialized slot `dst`.
    ///
    /// If the variant does not hold a `ty`, the slot receives the default value of `ty`.
    ///
    /// # Safety
    /// `dst` must point to writable storage of `slot_size(ty)` bytes.
    pub unsafe fn write_slot(&self, ty: VariantType, dst: *mut c_void) {
        if self.variant_type() != ty {
            // SAFETY: per contract.
            unsafe { builtins::write_default(ty, dst) };
            return;
        }

        // SAFETY: per contract; sizes come from the layout of `ty`.
        unsafe {
            match layout_of(ty) {
                Layout::Empty => {}
                Layout::Inline(size) => {
                    ptr::copy_nonoverlapping(self.payload(), dst as *mut u8, size);
                }
                Layout::Boxed(size) => {
                    let bytes = Shared::<Vec<u8>>::data(self.handle());
                    ptr::copy_nonoverlapping(bytes.as_ptr(), dst as *mut u8, size);
                }
                Layout::Handle => {
                    let handle = self.handle();
                    acquire(handle);
                    write_handle(dst, slot_size(ty), handle);
                }
                Layout::Object => {
                    ptr::write_unaligned(dst as *mut *mut c_void, self.handle());
                }
            }
        }
    }

    /// Copy whose containers no longer share storage with `self`. Elements are shared unless `deep`.
    pub fn duplicate(&self, deep: bool) -> Self {
        let ty = self.variant_type();
        let handle = self.handle();

        // SAFETY: handles of those types are array and dictionary blocks.
        match ty {
            VariantType::Array => {
                let copy = unsafe { Shared::<ArrayData>::data(handle) }.duplicate(deep);
                Self::from_handle(ty, Shared::into_raw(copy))
            }
            VariantType::Dictionary => {
                let copy = unsafe { Shared::<DictionaryData>::data(handle) }.duplicate(deep);
                Self::from_handle(ty, Shared::into_raw(copy))
            }
            _ => self.clone(),
        }
    }

    unsafe fn write_payload_handle(&mut self, handle: *mut c_void) {
        // SAFETY: a pointer fits behind the tag.
        unsafe { ptr::write_unaligned(self.payload_mut() as *mut *mut c_void, handle) };
    }

    fn base(&self) -> *const u8 {
        self as *const Self as *const u8
    }

    fn base_mut(&mut self) -> *mut u8 {
        self as *mut Self as *mut u8
    }

    fn payload(&self) -> *const u8 {
        // SAFETY: the offset is inside the storage.
        unsafe { self.base().add(sys::VARIANT_PAYLOAD_OFFSET) }
    }

    fn payload_mut(&mut self) -> *mut u8 {
        // SAFETY: the offset is inside the storage.
        unsafe { self.base_mut().add(sys::VARIANT_PAYLOAD_OFFSET) }
    }
}

impl Default for RawVariant {
    fn default() -> Self {
        Self::nil()
    }
}

impl Clone for RawVariant {
    fn clone(&self) -> Self {
        let copy = Self {
            storage: self.storage,
        };

        // SAFETY: the bitwise copy now owns one more reference of the handle.
        unsafe {
            match layout_of(copy.variant_type()) {
                Layout::Boxed(_) | Layout::Handle => acquire(copy.handle()),
                Layout::Object => objects::retain(copy.handle()),
                Layout::Empty | Layout::Inline(_) => {}
            }
        }
        copy
    }
}

impl Drop for RawVariant {
    fn drop(&mut self) {
        let ty = self.variant_type();
        let handle = self.handle();

        // SAFETY: the variant owns one reference of its handle.
        unsafe {
            match layout_of(ty) {
                Layout::Boxed(_) => Shared::<Vec<u8>>::release(handle),
                Layout::Handle => builtins::release_handle(ty, handle),
                Layout::Object => objects::release(handle),
                Layout::Empty | Layout::Inline(_) => {}
            }
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Operations

pub(crate) fn variants_equal(a: &RawVariant, b: &RawVariant) -> bool {
    let (ta, tb) = (a.variant_type(), b.variant_type());

    // SAFETY: payload reads match the checked tags.
    unsafe {
        match (ta, tb) {
            (VariantType::Int, VariantType::Float) => a.read::<i64>() as f64 == b.read::<f64>(),
            (VariantType::Float, VariantType::Int) => a.read::<f64>() == b.read::<i64>() as f64,
            _ if ta != tb => false,
            (VariantType::Bool, _) => (a.read::<u8>() != 0) == (b.read::<u8>() != 0),
            (VariantType::Float, _) => a.read::<f64>() == b.read::<f64>(),
            _ => match layout_of(ta) {
                Layout::Empty => true,
                Layout::Inline(size) => payload_bytes(a, size) == payload_bytes(b, size),
                Layout::Boxed(size) => {
                    Shared::<Vec<u8>>::data(a.handle())[..size] == Shared::<Vec<u8>>::data(b.handle())[..size]
                }
                Layout::Object => a.handle() == b.handle(),
                Layout::Handle => builtins::handles_equal(ta, a.handle(), b.handle()),
            },
        }
    }
}

unsafe fn payload_bytes(v: &RawVariant, size: usize) -> &[u8] {
    // SAFETY: inline payloads are `size` bytes.
    unsafe { std::slice::from_raw_parts(v.payload(), size) }
}

/// Text of `str(v)`. Strings nested in containers are quoted.
pub(crate) fn stringify(v: &RawVariant, nested: bool) -> String {
    use VariantType as T;

    fn typed<V: Copy + Debug>(v: &RawVariant) -> String {
        // SAFETY: called with the payload type matching the tag.
        format!("{:?}", unsafe { v.read::<V>() })
    }

    fn boxed<V: Copy + Debug>(v: &RawVariant) -> String {
        // SAFETY: boxed blocks hold the bytes of a `V`.
        let bytes = unsafe { Shared::<Vec<u8>>::data(v.handle()) };
        format!("{:?}", unsafe { ptr::read_unaligned(bytes.as_ptr() as *const V) })
    }

    let ty = v.variant_type();

    // SAFETY: payload reads match the tag.
    unsafe {
        match ty {
            T::Nil => "<null>".to_string(),
            T::Bool => (v.read::<u8>() != 0).to_string(),
            T::Int => v.read::<i64>().to_string(),
            T::Float => v.read::<f64>().to_string(),
            T::Vector2 => v.read::<Vector2>().to_string(),
            T::Vector2i => v.read::<Vector2i>().to_string(),
            T::Vector3 => v.read::<Vector3>().to_string(),
            T::Vector3i => v.read::<Vector3i>().to_string(),
            T::Vector4 => v.read::<Vector4>().to_string(),
            T::Vector4i => v.read::<Vector4i>().to_string(),
            T::Color => v.read::<Color>().to_string(),
            T::Rect2 => typed::<Rect2>(v),
            T::Rect2i => typed::<Rect2i>(v),
            T::Plane => typed::<Plane>(v),
            T::Quaternion => typed::<Quaternion>(v),
            T::Rid => format!("RID({})", v.read::<Rid>().to_u64()),
            T::Transform2D => boxed::<Transform2D>(v),
            T::Aabb => boxed::<Aabb>(v),
            T::Basis => boxed::<Basis>(v),
            T::Transform3D => boxed::<Transform3D>(v),
            T::Projection => boxed::<Projection>(v),
            T::Object => objects::describe(v.handle()),
            _ => builtins::describe_handle(ty, v.handle(), nested),
        }
    }
}

pub(crate) fn hash(v: &RawVariant) -> i64 {
    let ty = v.variant_type();
    if ty == VariantType::Callable {
        // SAFETY: callable variants hold a callable block or null.
        if let Some(hash) = unsafe { builtins::callable_hash(v.handle()) } {
            return i64::from(hash);
        }
    }

    let mut hasher = DefaultHasher::new();
    ty.hash(&mut hasher);
    stringify(v, true).hash(&mut hasher);
    hasher.finish() as i64
}

/// Result of `a <op> b`, or `None` if the operator is not supported for these operands.
pub(crate) fn evaluate(op: VariantOperator, a: &RawVariant, b: &RawVariant) -> Option<RawVariant> {
    let result = match op {
        VariantOperator::Equal => variants_equal(a, b),
        VariantOperator::NotEqual => !variants_equal(a, b),
        _ => return None,
    };

    Some(RawVariant::from_inline(VariantType::Bool, u8::from(result)))
}

/// Dynamic call of `method` on `receiver`. The return slot is always initialized.
pub(crate) fn call(
    receiver: &RawVariant,
    method: &str,
    args: &[*const RawVariant],
    ret: &mut RawVariant,
    err: &mut sys::GDExtensionCallError,
) {
    *err = sys::default_call_error();

    match receiver.variant_type() {
        // SAFETY: the receiver holds a callable block; arguments are live for the call.
        VariantType::Callable if method == "call" => unsafe { builtins::call_callable(receiver.handle(), args, ret, err) },
        VariantType::Object => objects::call(receiver.handle(), method, args, ret, err),
        // SAFETY: the handle matches the receiver's type.
        ty => match unsafe { builtins::call_dynamic(ty, receiver.handle(), method) } {
            Some(result) if args.is_empty() => *ret = result,
            Some(_) => err.error = sys::GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS,
            None => err.error = sys::GDEXTENSION_CALL_ERROR_INVALID_METHOD,
        },
    }
}
