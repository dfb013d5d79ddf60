/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::builtin::GString;
use crate::meta::error::{CallContext, CallError, ConvertError, FromVariantError};
use crate::meta::{Marshal, VariantOperator, VariantType};
use crate::sys;
use crate::sys::{NativeValue, NativeVariant, interface_fn, is_inline_type};

/// Engine `Variant`: a value of any builtin type, an object, or `null`.
///
/// Owns its contents. Cloning copies them (refcounted types share their engine-side data, like in GDScript), dropping releases them.
/// Values of inline types (numbers, vectors, colors, ...) are created, copied and dropped without calling into the engine.
///
/// Conversions to and from Rust types go through [`Marshal`]: [`Variant::from_value()`], [`to()`](Self::to), [`try_to()`](Self::try_to).
#[repr(transparent)]
pub struct Variant {
    native: NativeVariant,
}

impl Variant {
    /// Create an empty variant (`null` value in GDScript).
    pub const fn nil() -> Self {
        Self {
            native: NativeVariant::nil(),
        }
    }

    /// Create a variant holding a copy of `value`.
    pub fn from_value<T: Marshal>(value: &T) -> Self {
        value.to_variant()
    }

    /// ⚠️ Convert to type `T`, panicking on failure.
    ///
    /// # Panics
    /// When this variant holds a different type.
    pub fn to<T: Marshal>(&self) -> T {
        T::from_variant(self)
    }

    /// Convert to type `T`, returning `Err` on failure.
    pub fn try_to<T: Marshal>(&self) -> Result<T, ConvertError> {
        T::try_from_variant(self)
    }

    /// Checks whether the variant is empty (`null` value in GDScript).
    pub fn is_nil(&self) -> bool {
        self.native.is_nil()
    }

    /// Returns the type that is currently held by this variant.
    pub fn get_type(&self) -> VariantType {
        self.native.get_type()
    }

    /// Converts to `String` the way GDScript's `str()` does.
    pub fn stringify(&self) -> GString {
        GString::from(self.native.stringify())
    }

    /// Engine hash of the contained value.
    pub fn hash(&self) -> i64 {
        self.native.hash()
    }

    /// Evaluates `self <op> rhs`. Returns `None` if the operator is not defined for the two types.
    pub fn evaluate(&self, rhs: &Variant, op: VariantOperator) -> Option<Variant> {
        self.native.evaluate(op, &rhs.native).map(Self::from_native)
    }

    /// ⚠️ Calls the method `method` of the contained value.
    ///
    /// # Panics
    /// If the call fails, e.g. because the method does not exist or arguments do not match.
    pub fn call(&self, method: &str, args: &[Variant]) -> Variant {
        self.try_call(method, args)
            .unwrap_or_else(|err| panic!("Variant::call() failed -- {err}"))
    }

    /// Calls the method `method` of the contained value. Call errors are also reported to the engine.
    pub fn try_call(&self, method: &str, args: &[Variant]) -> Result<Variant, CallError> {
        let method_name = sys::ScratchStringName::new(method);
        let arg_refs: Vec<&Variant> = args.iter().collect();
        let native_args: Vec<&NativeVariant> = args.iter().map(|a| &a.native).collect();

        // The engine may write through the receiver; call on a copy, sharing refcounted data with `self`.
        let mut receiver = self.native.clone_native();
        let result = receiver.call(method_name.native(), &native_args);

        // SAFETY: `receiver` is a local copy, not used afterwards.
        unsafe { receiver.destroy() };

        let call_ctx = CallContext::method(format!("{:?}", self.get_type()), method.to_string());
        match result {
            Ok(ret) => Ok(Self::from_native(ret)),
            Err(err) => CallError::check_out_varcall(&call_ctx, err, &arg_refs).map(|()| Variant::nil()),
        }
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Internal construction and extraction

    pub(crate) fn from_native(native: NativeVariant) -> Self {
        Self { native }
    }

    pub(crate) fn native(&self) -> &NativeVariant {
        &self.native
    }

    /// Moves out the native variant, without destroying it.
    pub(crate) fn into_native(self) -> NativeVariant {
        let this = std::mem::ManuallyDrop::new(self);

        // SAFETY: `this` is never dropped, so the native value has exactly one owner afterwards.
        unsafe { std::ptr::read(&this.native) }
    }

    /// Inline variant of `variant_type` with `payload`.
    ///
    /// # Safety
    /// `variant_type` must be an inline type whose payload layout is exactly `T`.
    pub(crate) unsafe fn from_inline<T: Copy>(variant_type: VariantType, payload: T) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_native(unsafe { NativeVariant::from_inline(variant_type, payload) })
    }

    /// Reads the inline payload if the variant holds `expected`.
    ///
    /// # Safety
    /// `expected` must be an inline type whose payload layout is exactly `T`.
    pub(crate) unsafe fn try_read_inline<T: Copy>(
        &self,
        expected: VariantType,
    ) -> Result<T, ConvertError> {
        self.check_type(expected)?;

        // SAFETY: type checked above; layout guaranteed by caller.
        Ok(unsafe { self.native.read_inline::<T>() })
    }

    /// Variant from a value of `variant_type` in native layout, via the engine's converter.
    ///
    /// # Safety
    /// `src` must point to a live value of `variant_type`.
    pub(crate) unsafe fn from_value_ptr(
        variant_type: VariantType,
        src: sys::GDExtensionConstTypePtr,
    ) -> Self {
        let convert = sys::bind_cache::variant_from_type_fn(variant_type);

        // SAFETY: forwarded to caller; the converter fully initializes the destination.
        unsafe {
            Self::new_with_var_uninit(|dst| convert(dst, sys::force_mut_ptr(src)))
        }
    }

    /// Writes the contained value of `expected` type into `dst` via the engine's converter.
    ///
    /// # Safety
    /// `dst` must point to writable, uninitialized storage of `expected`'s native type.
    pub(crate) unsafe fn try_write_value_ptr(
        &self,
        expected: VariantType,
        dst: sys::GDExtensionUninitializedTypePtr,
    ) -> Result<(), ConvertError> {
        self.check_type(expected)?;
        let convert = sys::bind_cache::type_from_variant_fn(expected);

        // SAFETY: type checked above; `dst` valid per caller.
        unsafe { convert(dst, self.var_sys()) };
        Ok(())
    }

    /// Variant from a builtin native value, which stays owned by the caller.
    pub(crate) fn from_builtin<N: NativeValue>(value: &N) -> Self {
        Self::from_native(NativeVariant::from_type(value))
    }

    /// Extracts an independently owned native value of type `N`.
    pub(crate) fn try_to_builtin<N: NativeValue>(&self) -> Result<N, ConvertError> {
        self.check_type(N::VARIANT_TYPE)?;

        self.native
            .to_type::<N>()
            .ok_or_else(|| self.bad_type(N::VARIANT_TYPE))
    }

    pub(crate) fn check_type(&self, expected: VariantType) -> Result<(), ConvertError> {
        if self.get_type() == expected {
            Ok(())
        } else {
            Err(self.bad_type(expected))
        }
    }

    pub(crate) fn bad_type(&self, expected: VariantType) -> ConvertError {
        FromVariantError::BadType {
            expected,
            actual: self.get_type(),
        }
        .into_error(self)
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Raw pointer access

    pub fn var_sys(&self) -> sys::GDExtensionVariantPtr {
        self.native.variant_sys()
    }

    pub fn var_sys_const(&self) -> sys::GDExtensionConstVariantPtr {
        self.native.variant_sys_const()
    }

    pub fn var_sys_mut(&mut self) -> sys::GDExtensionVariantPtr {
        self.native.variant_sys_mut()
    }

    /// Creates a variant, letting `init` construct it in place.
    ///
    /// # Safety
    /// `init` must fully initialize the variant.
    pub unsafe fn new_with_var_uninit(
        init: impl FnOnce(sys::GDExtensionUninitializedVariantPtr),
    ) -> Self {
        // SAFETY: forwarded to caller.
        let native = unsafe {
            NativeVariant::new_with_init(|dst| init(dst as sys::GDExtensionUninitializedVariantPtr))
        };
        Self::from_native(native)
    }

    /// Moves `self` into an uninitialized variant slot, which becomes the owner.
    ///
    /// # Safety
    /// `dst` must point to writable, uninitialized variant storage.
    pub unsafe fn move_into_var_sys(self, dst: sys::GDExtensionUninitializedVariantPtr) {
        let native = self.into_native();

        // SAFETY: forwarded to caller.
        unsafe { native.move_into_sys(dst as sys::GDExtensionUninitializedTypePtr) };
    }

    /// Takes over the variant at `src`. The slot must not be destroyed by anyone else afterwards.
    ///
    /// # Safety
    /// `src` must point to a live variant, owned by the caller.
    pub unsafe fn from_var_sys_taking(src: sys::GDExtensionVariantPtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_native(unsafe { NativeVariant::take_from_sys(src as sys::GDExtensionTypePtr) })
    }

    /// Copies the variant at `src`.
    ///
    /// # Safety
    /// `src` must point to a live variant.
    pub unsafe fn from_var_sys_copying(src: sys::GDExtensionConstVariantPtr) -> Self {
        // SAFETY: forwarded to caller.
        unsafe { Self::borrow_var_sys(src) }.clone()
    }

    /// Reinterprets a variant pointer as a reference.
    ///
    /// # Safety
    /// `ptr` must point to a live variant that outlives `'a` and is not mutated during `'a`.
    pub unsafe fn borrow_var_sys<'a>(ptr: sys::GDExtensionConstVariantPtr) -> &'a Variant {
        // SAFETY: `Variant` is `#[repr(transparent)]` over the native variant.
        unsafe { &*(ptr as *const Variant) }
    }

    /// Reinterprets an engine argument array as a slice of references.
    ///
    /// # Safety
    /// `args` must point to `len` pointers to live variants, outliving `'a`. May be null if `len == 0`.
    pub unsafe fn borrow_ref_slice<'a>(
        args: *const sys::GDExtensionConstVariantPtr,
        len: usize,
    ) -> &'a [&'a Variant] {
        if args.is_null() || len == 0 {
            return &[];
        }

        // SAFETY: `&Variant` and `GDExtensionConstVariantPtr` have the same layout; validity per caller.
        unsafe { std::slice::from_raw_parts(args as *const &Variant, len) }
    }

    /// Whether the contained value lives inside the variant, with no engine-side allocation.
    pub fn is_inline(&self) -> bool {
        is_inline_type(self.get_type())
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Trait impls

impl Marshal for Variant {
    const VIA_REGISTRY: bool = false;

    fn to_variant(&self) -> Variant {
        self.clone()
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        Ok(variant.clone())
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { self.clone().move_into_var_sys(dst as sys::GDExtensionUninitializedVariantPtr) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        Ok(unsafe { Self::from_var_sys_copying(src as sys::GDExtensionConstVariantPtr) })
    }
}

impl Clone for Variant {
    fn clone(&self) -> Self {
        Self::from_native(self.native.clone_native())
    }
}

impl Drop for Variant {
    fn drop(&mut self) {
        // SAFETY: `self` owns the native variant, which is not used afterwards. Inline types skip the engine.
        unsafe { self.native.destroy() };
    }
}

impl Default for Variant {
    fn default() -> Self {
        Self::nil()
    }
}

// Variants are not Eq because they can contain NaN.
impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        if self.is_nil() || other.is_nil() {
            return self.is_nil() && other.is_nil();
        }

        self.evaluate(other, VariantOperator::Equal)
            .and_then(|result| result.try_to::<bool>().ok())
            .unwrap_or(false)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.native.stringify())
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !sys::is_initialized() {
            return write!(f, "Variant({:?})", self.get_type());
        }

        write!(f, "{:?}({})", self.get_type(), self.native.stringify())
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    // Only inline types: these tests run without an engine.

    #[test]
    fn nil_needs_no_engine() {
        let nil = Variant::nil();
        assert!(nil.is_nil());
        assert!(nil.is_inline());
        assert_eq!(nil.get_type(), VariantType::Nil);
        assert_eq!(Variant::default(), nil);
    }

    #[test]
    fn inline_clone_is_bitwise() {
        let v = 42i64.to_variant();
        let copy = v.clone();

        assert_eq!(copy.get_type(), VariantType::Int);
        assert_eq!(copy.to::<i64>(), 42);
        assert_eq!(v.to::<i64>(), 42);
    }

    #[test]
    fn strict_type_check() {
        let v = 1.5f64.to_variant();

        let err = v.try_to::<i64>().expect_err("float is not int");
        assert!(!err.is_unsupported());
        assert!(err.value().is_some());
        assert!(v.try_to::<bool>().is_err());
        assert_eq!(v.try_to::<f32>().ok(), Some(1.5));
    }

    #[test]
    fn debug_without_engine_shows_type() {
        assert_eq!(format!("{:?}", true.to_variant()), "Variant(Bool)");
    }

    #[test]
    fn move_into_and_take_back() {
        let mut slot = std::mem::MaybeUninit::<Variant>::uninit();

        unsafe {
            7u8.to_variant()
                .move_into_var_sys(slot.as_mut_ptr() as sys::GDExtensionUninitializedVariantPtr);

            let taken = Variant::from_var_sys_taking(slot.as_mut_ptr() as sys::GDExtensionVariantPtr);
            assert_eq!(taken.to::<u8>(), 7);
        }
    }

    #[test]
    fn borrow_ref_slice_of_null_is_empty() {
        let slice = unsafe { Variant::borrow_ref_slice(std::ptr::null(), 3) };
        assert!(slice.is_empty());
    }
}
