/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Conversion slots for types without a direct [`Marshal`] implementation.
//!
//! Each closed type (e.g. `Array<i64>`, `TypedDictionary<GString, Vector2>` or a user type) gets one set of four function
//! pointers, registered during the startup registration pass. The first registration of a type wins; later ones are ignored, so
//! concurrent or repeated registration cannot corrupt a slot set.
//!
//! Types that are not registered fail every registry-based conversion with an "unsupported type" [`ConvertError`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::builtin::{
    Aabb, Array, Basis, Callable, Color, Dictionary, GString, NodePath, PackedByteArray,
    PackedColorArray, PackedFloat32Array, PackedFloat64Array, PackedInt32Array, PackedInt64Array,
    PackedStringArray, PackedVector2Array, PackedVector3Array, PackedVector4Array, Plane,
    Projection, Quaternion, Rect2, Rect2i, Rid, Signal, StringName, Transform2D, Transform3D,
    TypedDictionary, Variant, Vector2, Vector2i, Vector3, Vector3i, Vector4, Vector4i,
};
use crate::meta::Marshal;
use crate::meta::error::ConvertError;
use crate::sys;
use crate::sys::Global;

/// The four conversion functions of one type.
pub struct ConversionSlots<T> {
    /// Writes the native representation into an uninitialized slot.
    pub write_ptr: unsafe fn(&T, sys::GDExtensionUninitializedTypePtr),

    /// Reads a value from a live slot, which stays owned by its owner.
    pub read_ptr: unsafe fn(sys::GDExtensionConstTypePtr) -> Result<T, ConvertError>,

    pub to_variant: fn(&T) -> Variant,
    pub from_variant: fn(&Variant) -> Result<T, ConvertError>,
}

// Manual impls: derives would require `T: Clone`.
impl<T> Clone for ConversionSlots<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ConversionSlots<T> {}

impl<T> std::fmt::Debug for ConversionSlots<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversionSlots")
            .field("type", &std::any::type_name::<T>())
            .finish_non_exhaustive()
    }
}

struct RegisteredSlots {
    type_name: &'static str,
    slots: Box<dyn Any + Send + Sync>,
}

static REGISTRY: Global<HashMap<TypeId, RegisteredSlots>> = Global::default();

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Public API

/// Registers the conversion functions of `T`.
///
/// Returns `false` and keeps the existing slots if `T` was registered before.
pub fn register<T: 'static>(
    write_ptr: unsafe fn(&T, sys::GDExtensionUninitializedTypePtr),
    read_ptr: unsafe fn(sys::GDExtensionConstTypePtr) -> Result<T, ConvertError>,
    to_variant: fn(&T) -> Variant,
    from_variant: fn(&Variant) -> Result<T, ConvertError>,
) -> bool {
    register_slots(ConversionSlots {
        write_ptr,
        read_ptr,
        to_variant,
        from_variant,
    })
}

/// Registers a complete slot set of `T`. See [`register()`].
pub fn register_slots<T: 'static>(slots: ConversionSlots<T>) -> bool {
    let type_name = std::any::type_name::<T>();

    match REGISTRY.write().entry(TypeId::of::<T>()) {
        Entry::Occupied(_) => {
            sys::out!("conversion registry: {type_name} already registered, keeping first slots");
            false
        }
        Entry::Vacant(vacant) => {
            vacant.insert(RegisteredSlots {
                type_name,
                slots: Box::new(slots),
            });
            sys::out!("conversion registry: registered {type_name}");
            true
        }
    }
}

/// Returns the slots of `T`, or an "unsupported type" error naming `T`.
pub fn get<T: 'static>() -> Result<ConversionSlots<T>, ConvertError> {
    let registry = REGISTRY.read();

    registry
        .get(&TypeId::of::<T>())
        .and_then(|registered| registered.slots.downcast_ref::<ConversionSlots<T>>())
        .copied()
        .ok_or_else(ConvertError::unsupported::<T>)
}

pub fn is_registered<T: 'static>() -> bool {
    REGISTRY.read().contains_key(&TypeId::of::<T>())
}

/// Names of all registered types, sorted.
pub fn registered_type_names() -> Vec<&'static str> {
    let mut names: Vec<_> = REGISTRY.read().values().map(|r| r.type_name).collect();
    names.sort_unstable();
    names
}

/// Registers the slots of `Array<T>`.
pub fn register_array<T: Marshal>() -> bool {
    register_slots(Array::<T>::conversion_slots())
}

/// Registers the slots of `TypedDictionary<K, V>`.
pub fn register_dictionary<K: Marshal, V: Marshal>() -> bool {
    register_slots(TypedDictionary::<K, V>::conversion_slots())
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Registrar

/// Handle passed to [`ExtensionLibrary::register_conversions()`](crate::init::ExtensionLibrary::register_conversions).
///
/// Collects the registration pass of one extension, so that it can be logged and inspected.
#[derive(Default, Debug)]
pub struct ConversionRegistrar {
    added: Vec<&'static str>,
    skipped: Vec<&'static str>,
}

impl ConversionRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: 'static>(&mut self, slots: ConversionSlots<T>) -> &mut Self {
        let added = register_slots(slots);
        self.track::<T>(added)
    }

    pub fn array<T: Marshal>(&mut self) -> &mut Self {
        let added = register_array::<T>();
        self.track::<Array<T>>(added)
    }

    pub fn dictionary<K: Marshal, V: Marshal>(&mut self) -> &mut Self {
        let added = register_dictionary::<K, V>();
        self.track::<TypedDictionary<K, V>>(added)
    }

    /// Types newly registered through this registrar.
    pub fn added(&self) -> &[&'static str] {
        &self.added
    }

    /// Types that were already registered before.
    pub fn skipped(&self) -> &[&'static str] {
        &self.skipped
    }

    fn track<T: 'static>(&mut self, added: bool) -> &mut Self {
        let name = std::any::type_name::<T>();
        if added {
            self.added.push(name);
        } else {
            self.skipped.push(name);
        }
        self
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Startup pass

/// Registers typed arrays of every builtin element kind. Runs once during [`initialize()`](crate::init::initialize).
pub(crate) fn register_builtin_conversions(registrar: &mut ConversionRegistrar) {
    macro_rules! arrays {
        ($($T:ty),* $(,)?) => {
            $( registrar.array::<$T>(); )*
        };
    }

    arrays!(
        bool, i64, i32, i16, i8, u32, u16, u8, f64, f32, GString, StringName, NodePath, Vector2,
        Vector2i, Vector3, Vector3i, Vector4, Vector4i, Rect2, Rect2i, Plane, Quaternion, Color,
        Rid, Aabb, Basis, Transform2D, Transform3D, Projection, Callable, Signal, Dictionary,
        PackedByteArray, PackedInt32Array, PackedInt64Array, PackedFloat32Array,
        PackedFloat64Array, PackedStringArray, PackedVector2Array, PackedVector3Array,
        PackedVector4Array, PackedColorArray,
    );

    registrar.dictionary::<GString, Variant>();
    registrar.dictionary::<StringName, Variant>();
    registrar.dictionary::<i64, Variant>();
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{read_slot, write_slot};

    // Lives entirely in inline variants, so no engine is needed.
    #[derive(Copy, Clone, PartialEq, Debug)]
    struct Meters(f64);

    impl Marshal for Meters {}

    unsafe fn meters_write(value: &Meters, dst: sys::GDExtensionUninitializedTypePtr) {
        unsafe { write_slot(dst, value.0) }
    }

    unsafe fn meters_read(src: sys::GDExtensionConstTypePtr) -> Result<Meters, ConvertError> {
        Ok(Meters(unsafe { read_slot::<f64>(src) }))
    }

    fn meters_to_variant(value: &Meters) -> Variant {
        value.0.to_variant()
    }

    fn meters_from_variant(variant: &Variant) -> Result<Meters, ConvertError> {
        f64::try_from_variant(variant).map(Meters)
    }

    fn meters_from_variant_doubled(variant: &Variant) -> Result<Meters, ConvertError> {
        f64::try_from_variant(variant).map(|m| Meters(m * 2.0))
    }

    #[derive(Debug)]
    struct NeverRegistered;

    impl Marshal for NeverRegistered {}

    #[test]
    fn unregistered_type_is_unsupported() {
        let err = get::<NeverRegistered>().expect_err("not registered");
        assert!(err.is_unsupported());
        assert!(err.to_string().contains("NeverRegistered"), "{err}");

        let err = NeverRegistered.try_to_variant().expect_err("not registered");
        assert!(err.is_unsupported());

        let err = NeverRegistered::try_from_variant(&Variant::nil()).expect_err("not registered");
        assert!(err.to_string().starts_with("unsupported type for Variant conversion"));
    }

    #[test]
    #[should_panic(expected = "unsupported type for Variant conversion")]
    fn unregistered_type_panics_in_infallible_api() {
        let _ = NeverRegistered.to_variant();
    }

    #[test]
    fn first_registration_wins() {
        assert!(register(
            meters_write,
            meters_read,
            meters_to_variant,
            meters_from_variant
        ));
        assert!(!register(
            meters_write,
            meters_read,
            meters_to_variant,
            meters_from_variant_doubled
        ));
        assert!(is_registered::<Meters>());
        assert!(registered_type_names().iter().any(|name| name.ends_with("Meters")));

        let variant = Meters(3.5).to_variant();
        assert_eq!(variant.get_type(), sys::VariantType::Float);
        assert_eq!(Meters::from_variant(&variant), Meters(3.5));

        let mut slot = std::mem::MaybeUninit::<f64>::uninit();
        let back = unsafe {
            Meters(-1.0).write_to_ptr(slot.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);
            Meters::read_from_ptr(slot.as_ptr() as sys::GDExtensionConstTypePtr)
        };
        assert_eq!(back, Meters(-1.0));
    }

    #[test]
    fn registration_races_keep_one_slot_set() {
        #[derive(Debug)]
        struct Raced;

        impl Marshal for Raced {}

        fn to_nil(_: &Raced) -> Variant {
            Variant::nil()
        }

        fn from_any(_: &Variant) -> Result<Raced, ConvertError> {
            Ok(Raced)
        }

        unsafe fn write_nothing(_: &Raced, _: sys::GDExtensionUninitializedTypePtr) {}

        unsafe fn read_nothing(_: sys::GDExtensionConstTypePtr) -> Result<Raced, ConvertError> {
            Ok(Raced)
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                std::thread::spawn(|| register(write_nothing, read_nothing, to_nil, from_any))
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().expect("registration thread"))
            .filter(|added| *added)
            .count();

        assert_eq!(wins, 1);
        assert!(get::<Raced>().is_ok());
    }

    #[test]
    fn registrar_tracks_outcome() {
        #[derive(Debug)]
        struct Tracked;

        impl Marshal for Tracked {}

        fn to_nil(_: &Tracked) -> Variant {
            Variant::nil()
        }

        fn from_any(_: &Variant) -> Result<Tracked, ConvertError> {
            Ok(Tracked)
        }

        unsafe fn write_nothing(_: &Tracked, _: sys::GDExtensionUninitializedTypePtr) {}

        unsafe fn read_nothing(_: sys::GDExtensionConstTypePtr) -> Result<Tracked, ConvertError> {
            Ok(Tracked)
        }

        let slots = ConversionSlots {
            write_ptr: write_nothing,
            read_ptr: read_nothing,
            to_variant: to_nil,
            from_variant: from_any,
        };

        let mut registrar = ConversionRegistrar::new();
        registrar.register(slots).register(slots);

        assert_eq!(registrar.added().len(), 1);
        assert_eq!(registrar.skipped().len(), 1);
    }
}
