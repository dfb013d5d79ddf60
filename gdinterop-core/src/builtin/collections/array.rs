/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use crate::builtin::Variant;
use crate::builtin::collections::replace_variant_slot;
use crate::lifetime::Tracked;
use crate::meta::error::{ConvertError, FromVariantError};
use crate::meta::{ConversionSlots, Marshal, conversion_registry};
use crate::sys;
use crate::sys::{NativeArray, NativeValue, VariantType};

/// Engine `Array`, optionally typed.
///
/// `Array<T>` for an element type with a fixed variant type (e.g. `Array<i64>`) is a typed array on the engine side, which
/// rejects elements of other types. [`VarArray`] (`Array<Variant>`) is untyped.
///
/// # Marshalling
/// `VarArray` converts directly. Typed arrays convert through the [conversion registry](conversion_registry): builtin element
/// types are registered at startup, other element types need [`ConversionRegistrar::array()`](crate::meta::ConversionRegistrar::array).
pub struct Array<T: Marshal> {
    inner: Tracked<NativeArray>,
    _phantom: PhantomData<fn() -> T>,
}

/// Untyped array, holding elements of any type.
pub type VarArray = Array<Variant>;

impl<T: Marshal> Array<T> {
    /// Empty array; typed if `T` has a fixed variant type.
    pub fn new() -> Self {
        let mut native = NativeArray::new_default();

        let element_type = Self::element_variant_type();
        if element_type != VariantType::Nil {
            native.set_typed(element_type);
        }

        Self::from_native(native)
    }

    pub fn len(&self) -> usize {
        self.inner.with(|a| a.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// ⚠️ Returns the element at `index`.
    ///
    /// # Panics
    /// If `index` is out of bounds, or the element cannot be converted to `T`.
    pub fn at(&self, index: usize) -> T {
        let len = self.len();
        self.get(index)
            .unwrap_or_else(|| panic!("Array index {index} out of bounds (len {len})"))
    }

    /// Returns the element at `index`, or `None` if out of bounds.
    ///
    /// # Panics
    /// If the element cannot be converted to `T`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.with(|a| {
            let ptr = a.element_ptr(index);
            if ptr.is_null() {
                return None;
            }

            // SAFETY: non-null element pointers are live while the array is borrowed.
            let element = unsafe { Variant::borrow_var_sys(ptr as sys::GDExtensionConstVariantPtr) };
            Some(T::from_variant(element))
        })
    }

    /// Appends `value` to the end.
    pub fn push(&mut self, value: &T) {
        let variant = value.to_variant();

        self.inner.with_mut(|a| {
            let len = a.len();
            a.resize(len + 1);

            // SAFETY: `len` is in bounds after resizing; the new slot holds `Nil`.
            unsafe { replace_variant_slot(a.element_ptr_mut(len), variant) };
        });
    }

    /// ⚠️ Overwrites the element at `index`.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn set(&mut self, index: usize, value: &T) {
        let variant = value.to_variant();

        self.inner.with_mut(|a| {
            let ptr = a.element_ptr_mut(index);
            assert!(!ptr.is_null(), "Array index {index} out of bounds (len {})", a.len());

            // SAFETY: checked above.
            unsafe { replace_variant_slot(ptr, variant) };
        });
    }

    pub fn clear(&mut self) {
        self.inner.with_mut(|a| a.clear());
    }

    /// Copies all elements into a `Vec`.
    ///
    /// # Panics
    /// If an element cannot be converted to `T`.
    pub fn to_vec(&self) -> Vec<T> {
        (0..self.len()).map(|i| self.at(i)).collect()
    }

    /// New array with the same elements. Refcounted elements are shared.
    pub fn duplicate_shallow(&self) -> Self {
        Self::from_native(self.inner.with(|a| a.duplicate(false)))
    }

    /// Whether the engine restricts the element type.
    pub fn is_typed(&self) -> bool {
        self.element_type() != VariantType::Nil
    }

    /// Element type enforced by the engine, `Nil` if untyped.
    pub fn element_type(&self) -> VariantType {
        self.inner.with(|a| a.element_type())
    }

    /// Releases the native array now. Later calls and the eventual drop are no-ops; any other use panics.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Takes over the array at `src`. The slot must not be destroyed by anyone else afterwards.
    ///
    /// # Safety
    /// `src` must point to a live array, owned by the caller, whose element type matches `T`.
    pub unsafe fn from_sys_taking_ownership(src: sys::GDExtensionTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_tracked(unsafe { Tracked::from_sys_taking_ownership(src) })
    }

    /// Copy-constructs from the array at `src`, sharing its elements.
    ///
    /// # Safety
    /// `src` must point to a live array whose element type matches `T`.
    pub unsafe fn from_sys_copying(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_tracked(unsafe { Tracked::from_sys_copying(src) })
    }

    /// Slot set used by the conversion registry for `Array<T>`.
    pub fn conversion_slots() -> ConversionSlots<Self> {
        ConversionSlots {
            write_ptr: Self::write_ptr_direct,
            read_ptr: Self::read_ptr_direct,
            to_variant: Self::to_variant_direct,
            from_variant: Self::from_variant_direct,
        }
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Internals

    fn from_tracked(inner: Tracked<NativeArray>) -> Self {
        Self {
            inner,
            _phantom: PhantomData,
        }
    }

    fn from_native(native: NativeArray) -> Self {
        Self::from_tracked(Tracked::new(native))
    }

    fn is_untyped_rust_side() -> bool {
        TypeId::of::<T>() == TypeId::of::<Variant>()
    }

    fn element_variant_type() -> VariantType {
        if Self::is_untyped_rust_side() {
            VariantType::Nil
        } else {
            T::variant_type()
        }
    }

    fn check_element_type(&self, source: &Variant) -> Result<(), ConvertError> {
        let expected = Self::element_variant_type();
        let actual = self.element_type();

        // Untyped `VarArray` accepts any array.
        if Self::is_untyped_rust_side() || expected == actual {
            Ok(())
        } else {
            Err(FromVariantError::BadElementType { expected, actual }.into_error(source))
        }
    }

    fn to_variant_direct(&self) -> Variant {
        let mut copy = self.inner.with(|a| a.duplicate(false));
        let variant = Variant::from_builtin(&copy);

        // SAFETY: the local duplicate is owned here; the variant holds its own reference.
        unsafe { copy.destroy() };
        variant
    }

    fn from_variant_direct(variant: &Variant) -> Result<Self, ConvertError> {
        let mut extracted = variant.try_to_builtin::<NativeArray>()?;
        let copy = extracted.duplicate(false);

        // SAFETY: `extracted` shares data with the variant and is not used afterwards.
        unsafe { extracted.destroy() };

        let array = Self::from_native(copy);
        array.check_element_type(variant)?;
        Ok(array)
    }

    unsafe fn write_ptr_direct(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        let copy = self.inner.clone_native();

        // SAFETY: forwarded to caller.
        unsafe { copy.move_into_sys(dst) }
    }

    unsafe fn read_ptr_direct(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        let array = unsafe { Self::from_sys_copying(src) };

        let expected = Self::element_variant_type();
        let actual = array.element_type();
        if Self::is_untyped_rust_side() || expected == actual {
            Ok(array)
        } else {
            Err(ConvertError::new(format!(
                "pointer holds Array[{actual:?}], expected Array[{expected:?}]"
            )))
        }
    }
}

// Untyped arrays convert directly; typed arrays go through the registry, so that unregistered element types are reported as such.
impl<T: Marshal> Marshal for Array<T> {
    fn variant_type() -> VariantType {
        VariantType::Array
    }

    fn try_to_variant(&self) -> Result<Variant, ConvertError> {
        if Self::is_untyped_rust_side() {
            Ok(self.to_variant_direct())
        } else {
            conversion_registry::get::<Self>().map(|slots| (slots.to_variant)(self))
        }
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        if Self::is_untyped_rust_side() {
            Self::from_variant_direct(variant)
        } else {
            (conversion_registry::get::<Self>()?.from_variant)(variant)
        }
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        let write = if Self::is_untyped_rust_side() {
            Self::write_ptr_direct
        } else {
            conversion_registry::get::<Self>()
                .unwrap_or_else(|err| panic!("Marshal::write_to_ptr() failed -- {err}"))
                .write_ptr
        };

        // SAFETY: forwarded to caller.
        unsafe { write(self, dst) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        let read = if Self::is_untyped_rust_side() {
            Self::read_ptr_direct
        } else {
            conversion_registry::get::<Self>()?.read_ptr
        };

        // SAFETY: forwarded to caller.
        unsafe { read(src) }
    }
}

impl<T: Marshal> Default for Array<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Shares the elements with the original, like a reference copy in GDScript.
impl<T: Marshal> Clone for Array<T> {
    fn clone(&self) -> Self {
        Self::from_native(self.inner.clone_native())
    }
}

impl<T: Marshal> PartialEq for Array<T> {
    fn eq(&self, other: &Self) -> bool {
        let lhs = self.inner.with(|a| Variant::from_builtin(a));
        let rhs = other.inner.with(|a| Variant::from_builtin(a));
        lhs == rhs
    }
}

impl<T: Marshal> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = self.inner.with(|a| Variant::from_builtin(a));
        write!(f, "{variant}")
    }
}

impl<T: Marshal> From<&[T]> for Array<T> {
    fn from(values: &[T]) -> Self {
        let mut array = Self::new();
        for value in values {
            array.push(value);
        }
        array
    }
}

impl<T: Marshal> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        for value in iter {
            array.push(&value);
        }
        array
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Vec

/// Converted through an untyped array; elements are converted one by one.
impl<T: Marshal> Marshal for Vec<T> {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::Array
    }

    fn to_variant(&self) -> Variant {
        self.iter().map(Marshal::to_variant).collect::<VarArray>().to_variant()
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        let array = VarArray::try_from_variant(variant)?;

        (0..array.len())
            .map(|i| T::try_from_variant(&array.at(i)))
            .collect()
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        let array: VarArray = self.iter().map(Marshal::to_variant).collect();

        // SAFETY: forwarded to caller.
        unsafe { array.write_to_ptr(dst) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        let array = unsafe { VarArray::try_read_from_ptr(src)? };

        (0..array.len())
            .map(|i| T::try_from_variant(&array.at(i)))
            .collect()
    }
}
