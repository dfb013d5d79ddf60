/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use gdinterop::builtin::*;
use gdinterop::meta::{self, Marshal};
use gdinterop::register::EngineEnum;
use itest::framework::{IntegrationTests, expect_panic, initialize};

fn roundtrip<T: Marshal + PartialEq + std::fmt::Debug>(value: T) {
    let variant = value.to_variant();
    assert_eq!(variant.get_type(), T::variant_type(), "{value:?}");

    let back = T::from_variant(&variant);
    assert_eq!(back, value);
}

fn through_slot<T: Marshal, U: Marshal>(value: &T) -> U {
    let mut slot = std::mem::MaybeUninit::<[u64; 16]>::zeroed();
    let ptr = slot.as_mut_ptr() as *mut std::ffi::c_void;

    // SAFETY: 128 aligned bytes hold any value layout used here.
    unsafe {
        meta::to_unmanaged_ptr(ptr as gdinterop::sys::GDExtensionUninitializedTypePtr, value);
        let result = meta::from_unmanaged_ptr::<U>(ptr as gdinterop::sys::GDExtensionConstTypePtr);

        // Container slots keep their copy; it is leaked along with the slot.
        result
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Primitives

#[test]
fn primitives_roundtrip() {
    initialize::<IntegrationTests>();

    roundtrip(true);
    roundtrip(false);
    roundtrip(-7i8);
    roundtrip(-300i16);
    roundtrip(i32::MIN);
    roundtrip(i64::MAX);
    roundtrip(255u8);
    roundtrip(65535u16);
    roundtrip(u32::MAX);
    roundtrip(u64::MAX);
    roundtrip(1.5f32);
    roundtrip(-0.25f64);
    roundtrip('ß');
    roundtrip(Half::from_f32(0.5));
}

#[test]
fn integers_truncate_like_as() {
    initialize::<IntegrationTests>();

    let variant = 300i64.to_variant();
    assert_eq!(variant.to::<u8>(), 44);
    assert_eq!(variant.to::<i8>(), 44);

    let variant = (-1i64).to_variant();
    assert_eq!(variant.to::<u32>(), u32::MAX);
    assert_eq!(variant.to::<u64>(), u64::MAX);

    let variant = (1i64 << 40).to_variant();
    assert_eq!(variant.to::<i32>(), 0);
}

#[test]
fn floats_narrow_like_as() {
    initialize::<IntegrationTests>();

    let variant = 0.1f64.to_variant();
    assert_eq!(variant.get_type(), VariantType::Float);
    assert_eq!(variant.to::<f32>(), 0.1f64 as f32);
    assert_eq!(variant.to::<Half>().to_f32(), Half::from_f64(0.1).to_f32());
}

#[test]
fn float_specials_roundtrip() {
    initialize::<IntegrationTests>();

    for value in [f64::INFINITY, f64::NEG_INFINITY, -0.0] {
        roundtrip(value);
        roundtrip(value as f32);
        roundtrip(Half::from_f64(value));
        assert_eq!(through_slot::<f64, f64>(&value), value);
    }

    assert!(f64::NAN.to_variant().to::<f64>().is_nan());
    assert!(f32::NAN.to_variant().to::<f32>().is_nan());
    assert!(Half::NAN.to_variant().to::<Half>().is_nan());
    assert!(f64::NAN.to_variant().to::<Half>().is_nan());
    assert!(through_slot::<f32, f32>(&f32::NAN).is_nan());
    assert!(through_slot::<Half, f64>(&Half::NAN).is_nan());

    let big = f64::MAX.to_variant();
    assert_eq!(big.to::<f32>(), f32::INFINITY);
    assert_eq!(big.to::<Half>(), Half::INFINITY);
}

#[test]
fn char_rejects_non_scalar_values() {
    initialize::<IntegrationTests>();

    let surrogate = 0xD800i64.to_variant();
    let err = char::try_from_variant(&surrogate).expect_err("surrogate is not a char");
    assert!(!err.is_unsupported());

    expect_panic("char from surrogate", || {
        surrogate.to::<char>();
    });
}

#[test]
fn wrong_variant_type_fails() {
    initialize::<IntegrationTests>();

    let variant = GString::from("text").to_variant();
    let err = i64::try_from_variant(&variant).expect_err("string is not an int");
    assert_eq!(err.value(), Some(&variant));
    assert!(err.to_string().contains("expected type Int, got String"), "{err}");

    assert!(bool::try_from_variant(&Variant::nil()).is_err());
    assert!(f64::try_from_variant(&3i64.to_variant()).is_err());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Strings

#[test]
fn strings_roundtrip() {
    initialize::<IntegrationTests>();

    roundtrip(String::from("grüße, 世界"));
    roundtrip(String::new());
    roundtrip(GString::from("gstring"));
    roundtrip(StringName::from("string_name"));
    roundtrip(NodePath::from("Parent/Child:prop"));

    let variant = GString::from("abc").to_variant();
    assert_eq!(variant.to::<String>(), "abc");
    assert_eq!(variant.stringify(), GString::from("abc"));
}

#[test]
fn string_conversions_copy() {
    initialize::<IntegrationTests>();

    let original = GString::from("original");
    let variant = original.to_variant();
    drop(original);

    // The variant keeps its own copy.
    assert_eq!(variant.to::<String>(), "original");
    assert_eq!(variant.call("length", &[]).to::<i64>(), 8);
}

#[test]
fn string_kinds_are_distinct_variant_types() {
    initialize::<IntegrationTests>();

    assert_eq!(StringName::from("a").to_variant().get_type(), VariantType::StringName);
    assert_eq!(NodePath::from("a").to_variant().get_type(), VariantType::NodePath);
    assert!(GString::try_from_variant(&StringName::from("a").to_variant()).is_err());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Value builtins

#[test]
fn vectors_roundtrip() {
    initialize::<IntegrationTests>();

    roundtrip(Vector2::new(1.5, -2.0));
    roundtrip(Vector2i::new(3, -4));
    roundtrip(Vector3::new(1.0, 2.0, 3.0));
    roundtrip(Vector3i::new(-1, 0, 1));
    roundtrip(Vector4::new(0.5, 1.5, 2.5, 3.5));
    roundtrip(Vector4i::new(i32::MIN, 0, 0, i32::MAX));
    roundtrip(Color::from_rgba(0.1, 0.2, 0.3, 0.4));
    roundtrip(Rid::new(42));

    assert_eq!(Vector2i::new(3, -4).to_variant().to_string(), "(3, -4)");
    assert_eq!(Rid::new(42).to_variant().to_string(), "RID(42)");
}

#[test]
fn geometry_roundtrip() {
    initialize::<IntegrationTests>();

    roundtrip(Rect2::new(Vector2::new(1.0, 2.0), Vector2::new(3.0, 4.0)));
    roundtrip(Rect2i::new(Vector2i::new(1, 2), Vector2i::new(3, 4)));
    roundtrip(Plane::new(Vector3::new(0.0, 1.0, 0.0), 5.0));
    roundtrip(Quaternion::new(0.0, 0.0, 0.0, 1.0));
}

#[test]
fn boxed_values_roundtrip() {
    initialize::<IntegrationTests>();

    let basis = Basis::from_rows(
        Vector3::new(1.0, 2.0, 3.0),
        Vector3::new(4.0, 5.0, 6.0),
        Vector3::new(7.0, 8.0, 9.0),
    );

    roundtrip(basis);
    roundtrip(Aabb::new(Vector3::new(-1.0, -1.0, -1.0), Vector3::new(2.0, 2.0, 2.0)));
    roundtrip(Transform2D::from_cols(
        Vector2::new(1.0, 0.0),
        Vector2::new(0.0, 1.0),
        Vector2::new(10.0, 20.0),
    ));
    roundtrip(Transform3D::new(basis, Vector3::new(1.0, 1.0, 1.0)));
    roundtrip(Projection::IDENTITY);
}

#[test]
fn boxed_variant_copies_are_independent() {
    initialize::<IntegrationTests>();

    let transform = Transform3D::new(Basis::IDENTITY, Vector3::new(1.0, 2.0, 3.0));
    let variant = transform.to_variant();
    let copy = variant.clone();
    drop(variant);

    assert_eq!(copy.to::<Transform3D>(), transform);
    assert!(!copy.is_inline());
}

#[test]
fn value_builtins_through_slots() {
    initialize::<IntegrationTests>();

    assert_eq!(through_slot::<i32, i64>(&-5), -5);
    assert_eq!(through_slot::<u64, u8>(&0x1_02), 2);
    assert!(through_slot::<bool, bool>(&true));
    assert_eq!(through_slot::<f32, f64>(&0.5), 0.5);
    assert_eq!(through_slot::<Vector3, Vector3>(&Vector3::ONE), Vector3::ONE);
    assert_eq!(through_slot::<Rid, Rid>(&Rid::new(7)), Rid::new(7));
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Containers

#[test]
fn typed_array_roundtrip() {
    initialize::<IntegrationTests>();

    let array = Array::<i64>::from(&[1, -2, 2147483647][..]);
    assert_eq!(array.element_type(), VariantType::Int);

    let variant = array.to_variant();
    assert_eq!(variant.get_type(), VariantType::Array);
    assert_eq!(variant.to_string(), "[1, -2, 2147483647]");

    let back = variant.to::<Array<i64>>();
    assert_eq!(back.to_vec(), vec![1, -2, 2147483647]);
    assert_eq!(back, array);
}

#[test]
fn typed_array_rejects_other_element_type() {
    initialize::<IntegrationTests>();

    let strings = Array::<GString>::from(&[GString::from("a")][..]);
    let variant = strings.to_variant();

    let err = Array::<i64>::try_from_variant(&variant).expect_err("element types differ");
    assert!(err.to_string().contains("expected elements of type Int, got String"), "{err}");

    // Untyped arrays accept everything.
    let untyped = variant.to::<VarArray>();
    assert_eq!(untyped.len(), 1);
}

#[test]
fn vec_goes_through_untyped_array() {
    initialize::<IntegrationTests>();

    let values = vec![3u16, 1, 4, 1, 5];
    let variant = values.to_variant();

    let array = variant.to::<VarArray>();
    assert!(!array.is_typed());
    assert_eq!(array.len(), 5);

    assert_eq!(variant.to::<Vec<u16>>(), values);
    assert_eq!(through_slot::<Vec<u16>, Vec<i64>>(&values), vec![3, 1, 4, 1, 5]);
    assert!(Vec::<GString>::try_from_variant(&variant).is_err());
}

#[test]
fn array_variant_does_not_alias() {
    initialize::<IntegrationTests>();

    let mut array = Array::<i64>::from(&[1, 2][..]);
    let variant = array.to_variant();

    array.push(&3);
    assert_eq!(variant.to::<Array<i64>>().len(), 2);

    let mut extracted = variant.to::<Array<i64>>();
    extracted.set(0, &100);
    assert_eq!(variant.to::<Array<i64>>().at(0), 1);
    assert_eq!(array.at(0), 1);
}

#[test]
fn dictionary_variant_does_not_alias() {
    initialize::<IntegrationTests>();

    let mut dict = Dictionary::new();
    dict.set(&GString::from("key"), &1i64);

    let variant = dict.to_variant();
    dict.set(&GString::from("other"), &2i64);

    let mut extracted = variant.to::<Dictionary>();
    assert_eq!(extracted.len(), 1);

    extracted.set(&GString::from("key"), &99i64);
    assert_eq!(variant.to::<Dictionary>().get(&GString::from("key")), Some(1i64.to_variant()));
    assert_eq!(dict.get(&GString::from("key")), Some(1i64.to_variant()));
}

#[test]
fn dictionary_operations() {
    initialize::<IntegrationTests>();

    let mut dict = Dictionary::new();
    assert!(dict.is_empty());

    dict.set(&GString::from("a"), &Vector2::new(1.0, 2.0));
    dict.set(&7i64, &true);
    assert_eq!(dict.len(), 2);
    assert!(dict.contains_key(&7i64));
    assert!(!dict.contains_key(&8i64));
    assert_eq!(dict.get(&8i64), None);

    let keys = dict.keys();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys.at(0).to::<GString>(), GString::from("a"));

    assert!(dict.remove(&7i64));
    assert!(!dict.remove(&7i64));
    assert_eq!(dict.len(), 1);

    dict.clear();
    assert!(dict.is_empty());
}

#[test]
fn dictionary_lookups_of_missing_keys() {
    initialize::<IntegrationTests>();

    let mut dict = Dictionary::new();
    assert!(!dict.contains_key(&GString::from("absent")));
    assert_eq!(dict.get(&GString::from("absent")), None);

    // A present `Nil` value is distinct from an absent key.
    dict.set(&1i64, &Variant::nil());
    assert!(dict.contains_key(&1i64));
    assert_eq!(dict.get(&1i64), Some(Variant::nil()));
    assert_eq!(dict.get(&2i64), None);
    assert_eq!(dict.len(), 1, "lookups must not insert");
}

#[test]
fn typed_dictionary_roundtrip() {
    initialize::<IntegrationTests>();

    let mut dict = TypedDictionary::<GString, Variant>::new();
    dict.insert(&GString::from("speed"), &3.5f64.to_variant());

    let variant = dict.to_variant();
    let back = variant.to::<TypedDictionary<GString, Variant>>();
    assert_eq!(back.get(&GString::from("speed")), Some(3.5f64.to_variant()));

    // Keys are checked on the way back.
    let mut mixed = Dictionary::new();
    mixed.set(&1i64, &2i64);
    assert!(TypedDictionary::<GString, Variant>::try_from_variant(&mixed.to_variant()).is_err());
}

#[test]
fn packed_arrays_roundtrip() {
    initialize::<IntegrationTests>();

    roundtrip(PackedByteArray::from(&[0u8, 1, 255][..]));
    roundtrip(PackedInt32Array::from(&[i32::MIN, 0, i32::MAX][..]));
    roundtrip(PackedInt64Array::from(&[i64::MIN, i64::MAX][..]));
    roundtrip(PackedFloat32Array::from(&[0.5f32, -1.5][..]));
    roundtrip(PackedFloat64Array::from(&[0.1f64][..]));
    roundtrip(PackedStringArray::from(&[GString::from("x"), GString::from("yz")][..]));
    roundtrip(PackedVector2Array::from(&[Vector2::ONE][..]));
    roundtrip(PackedVector3Array::from(&[Vector3::ZERO, Vector3::ONE][..]));
    roundtrip(PackedVector4Array::from(&[Vector4::new(1.0, 2.0, 3.0, 4.0)][..]));
    roundtrip(PackedColorArray::from(&[Color::WHITE, Color::BLACK][..]));
    roundtrip(PackedInt32Array::new());
}

#[test]
fn empty_containers_roundtrip() {
    initialize::<IntegrationTests>();

    let empty = Array::<i64>::new();
    roundtrip(empty.clone());
    let back = through_slot::<Array<i64>, Array<i64>>(&empty);
    assert!(back.is_empty());
    assert_eq!(back.element_type(), VariantType::Int);

    roundtrip(VarArray::new());
    assert!(through_slot::<VarArray, VarArray>(&VarArray::new()).is_empty());

    roundtrip(Dictionary::new());
    let back = through_slot::<Dictionary, Dictionary>(&Dictionary::new());
    assert!(back.is_empty());
    assert_eq!(back, Dictionary::new());

    assert_eq!(Vec::<i64>::new().to_variant().to::<Vec<i64>>(), Vec::<i64>::new());
    assert_eq!(Array::<i64>::new().to_variant().to_string(), "[]");
    assert_eq!(Dictionary::new().to_variant().to_string(), "{}");
}

#[test]
fn packed_array_copies_on_write() {
    initialize::<IntegrationTests>();

    let mut original = PackedInt32Array::from(&[1, 2, 3][..]);
    let copy = original.clone();
    let variant = original.to_variant();

    original.set(0, &10);
    original.push(&4);

    assert_eq!(original.to_vec(), vec![10, 2, 3, 4]);
    assert_eq!(copy.to_vec(), vec![1, 2, 3]);
    assert_eq!(variant.to::<PackedInt32Array>().to_vec(), vec![1, 2, 3]);
}

#[test]
fn packed_string_array_elements() {
    initialize::<IntegrationTests>();

    let mut strings = PackedStringArray::new();
    strings.push(&GString::from("first"));
    strings.push(&GString::from("second"));
    strings.set(0, &GString::from("replaced"));

    assert_eq!(strings.len(), 2);
    assert_eq!(strings.at(0), GString::from("replaced"));
    assert_eq!(strings.get(1), Some(GString::from("second")));
    assert_eq!(strings.get(2), None);

    expect_panic("packed index out of bounds", || {
        strings.at(5);
    });
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Variant

#[test]
fn variant_nil_and_equality() {
    initialize::<IntegrationTests>();

    let nil = Variant::nil();
    assert!(nil.is_nil());
    assert_eq!(nil.get_type(), VariantType::Nil);
    assert_eq!(nil, Variant::default());
    assert_eq!(nil.to_string(), "<null>");

    assert_eq!(5i64.to_variant(), 5i32.to_variant());
    assert_ne!(5i64.to_variant(), 6i64.to_variant());
    assert_ne!(5i64.to_variant(), Variant::nil());
    assert_eq!(Variant::from_value(&GString::from("s")), String::from("s").to_variant());
}

#[test]
fn variant_evaluate_and_hash() {
    initialize::<IntegrationTests>();

    let a = GString::from("same").to_variant();
    let b = GString::from("same").to_variant();

    let equal = a.evaluate(&b, VariantOperator::Equal).expect("== is defined");
    assert!(equal.to::<bool>());

    let not_equal = a.evaluate(&b, VariantOperator::NotEqual).expect("!= is defined");
    assert!(!not_equal.to::<bool>());

    assert_eq!(a.hash(), b.hash());
    assert_eq!(a.evaluate(&b, VariantOperator::Multiply), None);
}

#[test]
fn variant_inside_variant() {
    initialize::<IntegrationTests>();

    let inner = Vector2::new(1.0, 2.0).to_variant();
    let outer = inner.to_variant();
    assert_eq!(outer, inner);
    assert_eq!(outer.to::<Variant>().to::<Vector2>(), Vector2::new(1.0, 2.0));
}

#[test]
fn variant_call_unknown_method() {
    initialize::<IntegrationTests>();

    let variant = GString::from("abc").to_variant();
    let err = variant.try_call("no_such_method", &[]).expect_err("method does not exist");
    assert_eq!(err.method_name(), "no_such_method");
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Enums

#[derive(EngineEnum, Copy, Clone, Eq, PartialEq, Debug)]
#[repr(u8)]
enum Layer {
    Ground = 1,
    Sky = 200,
}

#[derive(EngineEnum, Copy, Clone, Eq, PartialEq, Debug)]
enum Direction {
    Left = (-1),
    Right = 1,
}

#[test]
fn engine_enum_roundtrip() {
    initialize::<IntegrationTests>();

    roundtrip(Layer::Ground);
    roundtrip(Layer::Sky);
    roundtrip(Direction::Left);
    roundtrip(Direction::Right);

    // `u8` storage sign-extends, like the engine stores enum values.
    assert_eq!(Layer::Sky.to_variant().to::<i64>(), -56);
    assert_eq!(Direction::Left.to_variant().to::<i64>(), -1);
}

#[test]
fn engine_enum_rejects_unknown_values() {
    initialize::<IntegrationTests>();

    let err = Direction::try_from_variant(&0i64.to_variant()).expect_err("0 is no enumerator");
    assert!(err.to_string().contains("invalid engine enum value"), "{err}");

    assert_eq!(through_slot::<Layer, Layer>(&Layer::Sky), Layer::Sky);
    assert!(Layer::try_from_variant(&GString::from("Sky").to_variant()).is_err());
}
