/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

#![cfg(feature = "serde")]

use std::fmt::Debug;

use gdinterop::builtin::*;
use gdinterop::meta::Marshal;
use itest::framework::{IntegrationTests, initialize};
use serde::Serialize;
use serde::de::DeserializeOwned;

fn serde_roundtrip<T>(value: &T, expected_json: &str)
where
    T: Serialize + DeserializeOwned + PartialEq + Debug,
{
    let json = serde_json::to_string(value).expect("serialize");
    assert_eq!(json, expected_json);

    let back: T = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(&back, value);
}

#[test]
fn serde_vectors() {
    serde_roundtrip(&Vector2::new(1.5, -2.0), r#"{"x":1.5,"y":-2.0}"#);
    serde_roundtrip(&Vector3i::new(1, 2, 3), r#"{"x":1,"y":2,"z":3}"#);
    serde_roundtrip(&Vector4::ZERO, r#"{"x":0.0,"y":0.0,"z":0.0,"w":0.0}"#);
}

#[test]
fn serde_geometry() {
    serde_roundtrip(
        &Rect2::new(Vector2::new(0.0, 1.0), Vector2::new(2.0, 3.0)),
        r#"{"position":{"x":0.0,"y":1.0},"size":{"x":2.0,"y":3.0}}"#,
    );
    serde_roundtrip(
        &Color::from_rgba(1.0, 0.5, 0.25, 1.0),
        r#"{"r":1.0,"g":0.5,"b":0.25,"a":1.0}"#,
    );
}

#[test]
fn serde_boxed_values() {
    let transform = Transform3D::new(Basis::IDENTITY, Vector3::new(1.0, 2.0, 3.0));
    let json = serde_json::to_string(&transform).expect("serialize");
    let back: Transform3D = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, transform);

    let projection: Projection = serde_json::from_str(&serde_json::to_string(&Projection::IDENTITY).expect("serialize"))
        .expect("deserialize");
    assert_eq!(projection, Projection::IDENTITY);
}

#[test]
fn serde_half() {
    let half = Half::from_f32(0.5);
    let back: Half = serde_json::from_str(&serde_json::to_string(&half).expect("serialize")).expect("deserialize");
    assert_eq!(back, half);
    assert_eq!(back.to_f32(), 0.5);
}

#[test]
fn deserialized_value_marshals() {
    initialize::<IntegrationTests>();

    let aabb: Aabb = serde_json::from_str(
        r#"{"position":{"x":1.0,"y":2.0,"z":3.0},"size":{"x":4.0,"y":5.0,"z":6.0}}"#,
    )
    .expect("deserialize");

    let variant = aabb.to_variant();
    assert_eq!(variant.get_type(), VariantType::Aabb);
    assert_eq!(variant.to::<Aabb>(), aabb);
}
