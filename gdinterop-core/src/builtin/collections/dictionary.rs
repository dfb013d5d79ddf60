/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::marker::PhantomData;

use crate::builtin::collections::replace_variant_slot;
use crate::builtin::{VarArray, Variant};
use crate::lifetime::Tracked;
use crate::meta::error::ConvertError;
use crate::meta::{ConversionSlots, Marshal};
use crate::sys;
use crate::sys::{NativeDictionary, NativeValue, VariantType};

/// Engine `Dictionary`: insertion-ordered map from variants to variants.
pub struct Dictionary {
    inner: Tracked<NativeDictionary>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::from_native(NativeDictionary::new_default())
    }

    pub fn len(&self) -> usize {
        self.inner.with(|d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value under `key`, or `None` if absent. A present `Nil` value is `Some`.
    pub fn get<K: Marshal>(&self, key: &K) -> Option<Variant> {
        let key = key.to_variant();
        self.inner.with(|d| d.get(key.native())).map(Variant::from_native)
    }

    pub fn contains_key<K: Marshal>(&self, key: &K) -> bool {
        let key = key.to_variant();
        self.inner.with(|d| d.has(key.native()))
    }

    /// Inserts or overwrites the value under `key`.
    pub fn set<K: Marshal, V: Marshal>(&mut self, key: &K, value: &V) {
        let key = key.to_variant();
        let value = value.to_variant();

        self.inner.with_mut(|d| {
            let slot = d.get_or_insert_ptr(key.native());
            assert!(!slot.is_null(), "Dictionary rejected key {key:?}");

            // SAFETY: the engine returned a live value slot (inserted as `Nil` if new).
            unsafe { replace_variant_slot(slot, value) };
        });
    }

    /// Removes `key`. Returns whether it was present.
    pub fn remove<K: Marshal>(&mut self, key: &K) -> bool {
        let key = key.to_variant();
        self.inner.with_mut(|d| d.erase(key.native()))
    }

    /// All keys, in insertion order.
    pub fn keys(&self) -> VarArray {
        let mut keys = self.inner.with(|d| d.keys());

        // SAFETY: `keys()` returns a fresh array; ownership moves into the wrapper.
        unsafe { VarArray::from_sys_taking_ownership(keys.sys_mut()) }
    }

    pub fn clear(&mut self) {
        self.inner.with_mut(|d| d.clear());
    }

    /// New dictionary with the same entries. Refcounted values are shared.
    pub fn duplicate_shallow(&self) -> Self {
        Self::from_native(self.inner.with(|d| d.duplicate(false)))
    }

    /// Releases the native dictionary now. Later calls and the eventual drop are no-ops; any other use panics.
    pub fn dispose(&self) {
        self.inner.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Takes over the dictionary at `src`. The slot must not be destroyed by anyone else afterwards.
    ///
    /// # Safety
    /// `src` must point to a live dictionary, owned by the caller.
    pub unsafe fn from_sys_taking_ownership(src: sys::GDExtensionTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_tracked(unsafe { Tracked::from_sys_taking_ownership(src) })
    }

    /// Copy-constructs from the dictionary at `src`, sharing its entries.
    ///
    /// # Safety
    /// `src` must point to a live dictionary.
    pub unsafe fn from_sys_copying(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        Self::from_tracked(unsafe { Tracked::from_sys_copying(src) })
    }

    fn from_tracked(inner: Tracked<NativeDictionary>) -> Self {
        Self { inner }
    }

    fn from_native(native: NativeDictionary) -> Self {
        Self::from_tracked(Tracked::new(native))
    }

    fn as_variant_shared(&self) -> Variant {
        self.inner.with(|d| Variant::from_builtin(d))
    }
}

impl Marshal for Dictionary {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::Dictionary
    }

    /// Stores a shallow duplicate.
    fn to_variant(&self) -> Variant {
        self.duplicate_shallow().as_variant_shared()
    }

    /// Extracts a shallow duplicate.
    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        let mut extracted = variant.try_to_builtin::<NativeDictionary>()?;
        let copy = extracted.duplicate(false);

        // SAFETY: `extracted` shares data with the variant and is not used afterwards.
        unsafe { extracted.destroy() };
        Ok(Self::from_native(copy))
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        let copy = self.inner.clone_native();

        // SAFETY: forwarded to caller.
        unsafe { copy.move_into_sys(dst) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        Ok(unsafe { Self::from_sys_copying(src) })
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

/// Shares the entries with the original, like a reference copy in GDScript.
impl Clone for Dictionary {
    fn clone(&self) -> Self {
        Self::from_native(self.inner.clone_native())
    }
}

impl PartialEq for Dictionary {
    fn eq(&self, other: &Self) -> bool {
        self.as_variant_shared() == other.as_variant_shared()
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_variant_shared())
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// TypedDictionary

/// Dictionary whose keys and values are statically `K` and `V`.
///
/// The engine side is an ordinary dictionary; the types are checked when converting from a variant or pointer. Conversions go
/// through the [conversion registry](crate::meta::conversion_registry), see
/// [`ConversionRegistrar::dictionary()`](crate::meta::ConversionRegistrar::dictionary).
pub struct TypedDictionary<K: Marshal, V: Marshal> {
    dict: Dictionary,
    _phantom: PhantomData<fn() -> (K, V)>,
}

impl<K: Marshal, V: Marshal> TypedDictionary<K, V> {
    pub fn new() -> Self {
        Self::from_untyped(Dictionary::new())
    }

    pub fn len(&self) -> usize {
        self.dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// ⚠️ Value under `key`, or `None` if absent.
    ///
    /// # Panics
    /// If the stored value cannot be converted to `V`.
    pub fn get(&self, key: &K) -> Option<V> {
        self.dict.get(key).map(|v| V::from_variant(&v))
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.dict.contains_key(key)
    }

    pub fn insert(&mut self, key: &K, value: &V) {
        self.dict.set(key, value);
    }

    pub fn remove(&mut self, key: &K) -> bool {
        self.dict.remove(key)
    }

    /// ⚠️ All keys, in insertion order.
    ///
    /// # Panics
    /// If a key cannot be converted to `K`.
    pub fn keys(&self) -> Vec<K> {
        self.dict.keys().to_vec().iter().map(K::from_variant).collect()
    }

    pub fn as_untyped(&self) -> &Dictionary {
        &self.dict
    }

    pub fn dispose(&self) {
        self.dict.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.dict.is_disposed()
    }

    /// Slot set used by the conversion registry for `TypedDictionary<K, V>`.
    pub fn conversion_slots() -> ConversionSlots<Self> {
        ConversionSlots {
            write_ptr: Self::write_ptr_direct,
            read_ptr: Self::read_ptr_direct,
            to_variant: Self::to_variant_direct,
            from_variant: Self::from_variant_direct,
        }
    }

    fn from_untyped(dict: Dictionary) -> Self {
        Self {
            dict,
            _phantom: PhantomData,
        }
    }

    /// Verifies that every entry converts to `(K, V)`.
    fn checked(dict: Dictionary) -> Result<Self, ConvertError> {
        for key in dict.keys().to_vec() {
            K::try_from_variant(&key)?;

            if let Some(value) = dict.get(&key) {
                V::try_from_variant(&value)?;
            }
        }

        Ok(Self::from_untyped(dict))
    }

    fn to_variant_direct(&self) -> Variant {
        self.dict.to_variant()
    }

    fn from_variant_direct(variant: &Variant) -> Result<Self, ConvertError> {
        Dictionary::try_from_variant(variant).and_then(Self::checked)
    }

    unsafe fn write_ptr_direct(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { self.dict.write_to_ptr(dst) }
    }

    unsafe fn read_ptr_direct(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        let dict = unsafe { Dictionary::try_read_from_ptr(src)? };
        Self::checked(dict)
    }
}

impl<K: Marshal, V: Marshal> Marshal for TypedDictionary<K, V> {
    fn variant_type() -> VariantType {
        VariantType::Dictionary
    }
}

impl<K: Marshal, V: Marshal> Default for TypedDictionary<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Marshal, V: Marshal> Clone for TypedDictionary<K, V> {
    fn clone(&self) -> Self {
        Self::from_untyped(self.dict.clone())
    }
}

impl<K: Marshal, V: Marshal> fmt::Debug for TypedDictionary<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.dict, f)
    }
}
