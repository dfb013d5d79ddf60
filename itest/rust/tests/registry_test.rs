/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::sync::atomic::{AtomicUsize, Ordering};

use gdinterop::builtin::*;
use gdinterop::init::ExtensionLibrary;
use gdinterop::meta::error::ConvertError;
use gdinterop::meta::{self, ConversionRegistrar, ConversionSlots, Marshal, conversion_registry};
use gdinterop::sys;
use itest::framework::{expect_panic, initialize};

#[derive(Copy, Clone, PartialEq, Debug)]
struct Meters(f64);

impl Marshal for Meters {}

impl Meters {
    fn slots() -> ConversionSlots<Self> {
        ConversionSlots {
            write_ptr: |value, dst| unsafe { meta::to_unmanaged_ptr(dst, &value.0) },
            read_ptr: |src| unsafe { meta::try_from_unmanaged_ptr::<f64>(src) }.map(Meters),
            to_variant: |value| value.0.to_variant(),
            from_variant: |variant| f64::try_from_variant(variant).map(Meters),
        }
    }
}

#[derive(Debug)]
struct Feet(f64);

impl Marshal for Feet {}

static ADDED_AT_STARTUP: AtomicUsize = AtomicUsize::new(0);
static SKIPPED_AT_STARTUP: AtomicUsize = AtomicUsize::new(0);

struct RegistryTests;

impl ExtensionLibrary for RegistryTests {
    fn register_conversions(registrar: &mut ConversionRegistrar) {
        let before_added = registrar.added().len();
        let before_skipped = registrar.skipped().len();

        registrar
            .register(Meters::slots())
            .array::<Meters>()
            .dictionary::<GString, Meters>()
            // Already registered by the builtin pass.
            .array::<i64>();

        ADDED_AT_STARTUP.store(registrar.added().len() - before_added, Ordering::SeqCst);
        SKIPPED_AT_STARTUP.store(registrar.skipped().len() - before_skipped, Ordering::SeqCst);
    }
}

fn init() {
    initialize::<RegistryTests>();
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Registered user types

#[test]
fn startup_pass_registers_user_types() {
    init();

    assert_eq!(ADDED_AT_STARTUP.load(Ordering::SeqCst), 3);
    assert_eq!(SKIPPED_AT_STARTUP.load(Ordering::SeqCst), 1);

    assert!(conversion_registry::is_registered::<Meters>());
    assert!(conversion_registry::is_registered::<Array<Meters>>());
    assert!(conversion_registry::is_registered::<TypedDictionary<GString, Meters>>());
    assert!(!conversion_registry::is_registered::<Feet>());

    let names = conversion_registry::registered_type_names();
    assert!(names.iter().any(|name| name.ends_with("Meters")), "{names:?}");
}

#[test]
fn builtin_pass_registers_containers() {
    init();

    assert!(conversion_registry::is_registered::<Array<Vector3>>());
    assert!(conversion_registry::is_registered::<Array<PackedStringArray>>());
    assert!(conversion_registry::is_registered::<Array<Callable>>());
    assert!(conversion_registry::is_registered::<TypedDictionary<StringName, Variant>>());
    assert!(conversion_registry::is_registered::<TypedDictionary<i64, Variant>>());
    assert!(!conversion_registry::is_registered::<TypedDictionary<i64, i64>>());
}

#[test]
fn user_type_roundtrip() {
    init();

    let variant = Meters(12.5).to_variant();
    assert_eq!(variant.get_type(), VariantType::Float);
    assert_eq!(variant.to::<f64>(), 12.5);
    assert_eq!(variant.to::<Meters>(), Meters(12.5));

    let err = Meters::try_from_variant(&true.to_variant()).expect_err("bool is not a length");
    assert!(!err.is_unsupported());
}

#[test]
fn user_type_through_slot() {
    init();

    let mut slot = 0.0f64;
    let ptr = &mut slot as *mut f64;

    // SAFETY: Meters slots hold an f64.
    let back = unsafe {
        meta::to_unmanaged_ptr(ptr as sys::GDExtensionUninitializedTypePtr, &Meters(-3.0));
        meta::from_unmanaged_ptr::<Meters>(ptr as sys::GDExtensionConstTypePtr)
    };

    assert_eq!(slot, -3.0);
    assert_eq!(back, Meters(-3.0));
}

#[test]
fn array_of_user_type() {
    init();

    let mut array = Array::<Meters>::new();
    array.push(&Meters(1.0));
    array.push(&Meters(2.0));

    let variant = array.to_variant();
    assert_eq!(variant.to_string(), "[1, 2]");

    let back = variant.to::<Array<Meters>>();
    assert_eq!(back.to_vec(), vec![Meters(1.0), Meters(2.0)]);

    // `Vec` converts element by element, each through the registry.
    assert_eq!(variant.to::<Vec<Meters>>(), vec![Meters(1.0), Meters(2.0)]);
}

#[test]
fn dictionary_of_user_type() {
    init();

    let mut dict = TypedDictionary::<GString, Meters>::new();
    dict.insert(&GString::from("height"), &Meters(1.8));

    let back = dict.to_variant().to::<TypedDictionary<GString, Meters>>();
    assert_eq!(back.get(&GString::from("height")), Some(Meters(1.8)));
    assert_eq!(back.get(&GString::from("width")), None);

    let mut untyped = Dictionary::new();
    untyped.set(&GString::from("height"), &GString::from("tall"));
    assert!(TypedDictionary::<GString, Meters>::try_from_variant(&untyped.to_variant()).is_err());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Unregistered types

#[test]
fn unregistered_type_is_unsupported() {
    init();

    let err = Feet(1.0).try_to_variant().expect_err("Feet is not registered");
    assert!(err.is_unsupported());
    assert!(err.to_string().contains("Feet"), "{err}");

    let err = meta::try_from_variant::<Feet>(&1.0f64.to_variant()).expect_err("Feet is not registered");
    assert!(err.to_string().starts_with("unsupported type for Variant conversion"), "{err}");

    expect_panic("from_variant of unregistered type", || {
        let _ = Feet::from_variant(&1.0f64.to_variant());
    });

    expect_panic("to_variant of unregistered type", || {
        let _ = Feet(1.0).to_variant();
    });
}

#[test]
fn unregistered_container_is_unsupported() {
    init();

    let array = Array::<Feet>::new();
    let err = array.try_to_variant().expect_err("Array<Feet> is not registered");
    assert!(err.is_unsupported());

    let err = TypedDictionary::<Meters, Meters>::try_from_variant(&Dictionary::new().to_variant())
        .expect_err("TypedDictionary<Meters, Meters> is not registered");
    assert!(err.is_unsupported());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Re-registration

fn doubled_from_variant(variant: &Variant) -> Result<Meters, ConvertError> {
    f64::try_from_variant(variant).map(|m| Meters(m * 2.0))
}

#[test]
fn first_registration_wins() {
    init();

    let mut slots = Meters::slots();
    slots.from_variant = doubled_from_variant;
    assert!(!conversion_registry::register_slots(slots));

    // Original slots still in place.
    assert_eq!(4.0f64.to_variant().to::<Meters>(), Meters(4.0));

    let mut registrar = ConversionRegistrar::new();
    registrar.array::<Meters>().dictionary::<GString, Meters>();
    assert!(registrar.added().is_empty());
    assert_eq!(registrar.skipped().len(), 2);
}

#[test]
fn concurrent_registration_registers_once() {
    init();

    #[derive(Debug)]
    struct Raced;

    impl Marshal for Raced {}

    let threads: Vec<_> = (0..8)
        .map(|_| {
            std::thread::spawn(|| {
                conversion_registry::register::<Raced>(
                    |_, _| {},
                    |_| Ok(Raced),
                    |_| Variant::nil(),
                    |_| Ok(Raced),
                )
            })
        })
        .collect();

    let added = threads
        .into_iter()
        .map(|t| t.join().expect("registration thread panicked"))
        .filter(|&added| added)
        .count();

    assert_eq!(added, 1);
    assert!(Raced.try_to_variant().is_ok_and(|v| v.is_nil()));
}
