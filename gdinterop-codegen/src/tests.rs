/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::conv::{shout_to_pascal, to_pascal_case};
use crate::generator::central_files::{make_opaque_types, make_variant_enums};
use crate::models::domain::{BuildConfiguration, ExtensionApi};
use crate::models::json::load_extension_api;

const BUNDLED: &str = include_str!("../../gdinterop-bindings/res/extension_api.json");

fn bundled_api() -> ExtensionApi {
    ExtensionApi::from_json(&load_extension_api(BUNDLED))
}

#[test]
fn pascal_conversions() {
    assert_eq!(shout_to_pascal("STRING_NAME"), "StringName");
    assert_eq!(shout_to_pascal("PACKED_INT32_ARRAY"), "PackedInt32Array");
    assert_eq!(shout_to_pascal("TRANSFORM2D"), "Transform2D");
    assert_eq!(shout_to_pascal("VECTOR3I"), "Vector3i");
    assert_eq!(shout_to_pascal("AABB"), "Aabb");

    assert_eq!(to_pascal_case("int"), "Int");
    assert_eq!(to_pascal_case("PackedVector4Array"), "PackedVector4Array");
    assert_eq!(to_pascal_case("RID"), "Rid");
}

#[test]
fn variant_tags_are_dense() {
    let api = bundled_api();

    assert_eq!(api.variant_types.first().map(|e| e.name.as_str()), Some("NIL"));
    for (i, e) in api.variant_types.iter().enumerate() {
        assert_eq!(e.value, i as i64, "gap at {}", e.name);
    }

    let enums = make_variant_enums(&api);
    assert_eq!(
        enums.variant_op_enumerators_pascal.len(),
        api.variant_operators.len()
    );
    assert!(
        enums
            .variant_op_enumerators_pascal
            .iter()
            .any(|id| id == "Modulo")
    );
}

#[test]
fn only_applicable_configs_are_used() {
    let api = bundled_api();

    assert!(api.builtin_sizes.iter().all(|b| b.config.is_applicable()));

    let variant_size = api
        .builtin_sizes
        .iter()
        .find(|b| b.builtin_original_name == "Variant" && b.config.is_64bit())
        .map(|b| b.size);

    let expected = if cfg!(feature = "double-precision") { 40 } else { 24 };
    assert_eq!(variant_size, Some(expected));
}

#[test]
fn opaque_types_split_by_pointer_width() {
    let api = bundled_api();
    let [types32, types64] = make_opaque_types(&api);

    assert_eq!(types32.len(), types64.len());

    let string64 = types64
        .iter()
        .map(|ts| ts.to_string())
        .find(|s| s.contains("OpaqueString "))
        .expect("OpaqueString missing");
    assert!(string64.contains("Opaque < 8usize >"), "{string64}");
}

#[test]
fn build_configuration_names() {
    assert_eq!(
        BuildConfiguration::from_json("double_64"),
        BuildConfiguration::Double64
    );
    assert!(BuildConfiguration::Float64.is_64bit());
    assert!(!BuildConfiguration::Double32.is_64bit());
}
