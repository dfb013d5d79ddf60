/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::panic;

use gdinterop::builtin::*;
use gdinterop::godot_print;
use gdinterop::meta::Marshal;
use gdinterop::obj::Gd;
use gdinterop::obj::classes::{Object, RefCounted};
use gdinterop::sys::bind_cache::{self, BindCell, MethodBind, PtrBuiltinMethod, PtrConstructor, PtrUtilityFunction};
use itest::framework::engine::{self, Lookup};
use itest::framework::{IntegrationTests, initialize};

fn panic_message(code: impl FnOnce()) -> String {
    let payload = panic::catch_unwind(panic::AssertUnwindSafe(code)).expect_err("code should have panicked");

    payload
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| payload.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_default()
}

// All lookups through the library's own cells happen here, so that no other test races the first resolution.
// Other tests in this file only look up symbols that the library never uses.
#[test]
fn each_symbol_is_resolved_once() {
    initialize::<IntegrationTests>();

    for i in 0..10i64 {
        let array = Array::<i64>::from(&[i, i + 1][..]);
        assert_eq!(array.len(), 2);

        let mut dict = Dictionary::new();
        dict.set(&i, &array);
        assert_eq!(dict.len(), 1);

        let variant = array.to_variant();
        assert_eq!(variant.to::<Array<i64>>(), array);

        let obj = Gd::<RefCounted>::instantiate().upcast::<Object>().cast::<RefCounted>();
        assert_eq!(obj.reference_count(), Some(1));

        godot_print!("bind cache round {i}");
    }

    let expected_once = [
        Lookup::BuiltinMethod(VariantType::Array, "size".to_string()),
        Lookup::BuiltinMethod(VariantType::Dictionary, "size".to_string()),
        Lookup::Utility("print".to_string()),
        Lookup::Constructor(VariantType::Array, 0),
        Lookup::Destructor(VariantType::Array),
        Lookup::Constructor(VariantType::Dictionary, 0),
        Lookup::VariantFromType(VariantType::Array),
        Lookup::TypeFromVariant(VariantType::Array),
        Lookup::MethodBind("RefCounted".to_string(), "init_ref".to_string()),
        Lookup::MethodBind("RefCounted".to_string(), "get_reference_count".to_string()),
        Lookup::ClassTag("RefCounted".to_string()),
    ];

    for lookup in &expected_once {
        assert_eq!(engine::lookup_count(lookup), 1, "{lookup:?}");
    }
}

#[test]
fn cell_caches_resolved_symbol() {
    initialize::<IntegrationTests>();

    static LENGTH: BindCell<PtrBuiltinMethod> = BindCell::new();
    assert!(LENGTH.get().is_none());

    let first = bind_cache::resolve_builtin_method(&LENGTH, VariantType::String, "length", 3173160232);
    let second = bind_cache::resolve_builtin_method(&LENGTH, VariantType::String, "length", 3173160232);

    assert_eq!(first as usize, second as usize);
    assert_eq!(LENGTH.get().map(|f| f as usize), Some(first as usize));
}

#[test]
fn cell_runs_lookup_only_until_resolved() {
    initialize::<IntegrationTests>();

    let cell = BindCell::<PtrConstructor>::new();
    let mut lookups = 0;

    for _ in 0..3 {
        cell.get_or_resolve(
            || {
                lookups += 1;
                Some(bind_cache::resolve_builtin_constructor(
                    &BindCell::new(),
                    VariantType::PackedColorArray,
                    0,
                ))
            },
            || "packed color array constructor".to_string(),
        );
    }

    assert_eq!(lookups, 1);
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Missing symbols

#[test]
fn missing_builtin_method_panics() {
    initialize::<IntegrationTests>();

    let cell = BindCell::<PtrBuiltinMethod>::new();
    let message = panic_message(|| {
        bind_cache::resolve_builtin_method(&cell, VariantType::String, "reticulate_splines", 12345);
    });

    assert!(
        message.starts_with("missing native symbol String::reticulate_splines (hash 12345)."),
        "{message}"
    );
    assert!(cell.get().is_none());
}

#[test]
fn wrong_hash_is_a_missing_symbol() {
    initialize::<IntegrationTests>();

    let cell = BindCell::<PtrBuiltinMethod>::new();
    let message = panic_message(|| {
        bind_cache::resolve_builtin_method(&cell, VariantType::String, "length", 1);
    });
    assert!(message.contains("String::length (hash 1)"), "{message}");

    let cell = BindCell::<MethodBind>::new();
    let message = panic_message(|| {
        bind_cache::resolve_method_bind(&cell, "Object", "get_instance_id", 7);
    });
    assert!(message.contains("Object::get_instance_id (hash 7)"), "{message}");

    let cell = BindCell::<PtrUtilityFunction>::new();
    let message = panic_message(|| {
        bind_cache::resolve_utility_function(&cell, "printerr", 0);
    });
    assert!(message.contains("utility function printerr (hash 0)"), "{message}");
}

#[test]
fn missing_constructor_panics() {
    initialize::<IntegrationTests>();

    let cell = BindCell::<PtrConstructor>::new();
    let message = panic_message(|| {
        bind_cache::resolve_builtin_constructor(&cell, VariantType::Nil, 99);
    });

    assert!(message.contains("constructor #99 of Nil"), "{message}");
}

#[test]
fn inherited_method_bind_resolves() {
    initialize::<IntegrationTests>();

    let cell = BindCell::<MethodBind>::new();
    let bind = bind_cache::resolve_method_bind(&cell, "Object", "get_class", 201670096);
    assert!(!bind.0.is_null());

    // A subclass finds the method of its base.
    let cell = BindCell::<MethodBind>::new();
    let node_bind = bind_cache::resolve_method_bind(&cell, "Node", "get_class", 201670096);
    assert_eq!(node_bind.0, bind.0);
}
