/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use gdinterop::builtin::*;
use gdinterop::meta::{self, Marshal};
use gdinterop::obj::classes::{Node, Object, RefCounted};
use gdinterop::obj::{ClassTag, Gd, GodotClass, Inherits, InstanceId};
use gdinterop::sys;
use gdinterop::sys::BindCell;
use itest::framework::engine::{self, Lookup};
use itest::framework::{IntegrationTests, expect_panic, initialize};

/// Class known to the engine but not predeclared by the library.
enum Resource {}

impl GodotClass for Resource {
    type Base = RefCounted;

    const CLASS_NAME: &'static str = "Resource";
    const IS_REFCOUNTED: bool = true;

    fn class_tag() -> ClassTag {
        static TAG: BindCell<ClassTag> = BindCell::new();
        ClassTag::resolve(&TAG, Self::CLASS_NAME)
    }
}

// SAFETY: Resource derives from RefCounted, which derives from Object.
unsafe impl Inherits<RefCounted> for Resource {}
// SAFETY: See above.
unsafe impl Inherits<Object> for Resource {}

fn engine_refcount<T: GodotClass>(obj: &Gd<T>) -> Option<i64> {
    engine::reference_count(obj.instance_id().to_i64() as u64)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Reference counting

#[test]
fn refcounted_handles_share_references() {
    initialize::<IntegrationTests>();

    let obj = Gd::<RefCounted>::instantiate();
    let id = obj.instance_id();
    assert!(id.is_ref_counted());
    assert_eq!(obj.reference_count(), Some(1));

    let copy = obj.clone();
    assert_eq!(obj.reference_count(), Some(2));
    assert_eq!(copy, obj);

    let variant = obj.to_variant();
    assert_eq!(engine_refcount(&obj), Some(3));

    drop(copy);
    drop(variant);
    assert_eq!(obj.reference_count(), Some(1));

    drop(obj);
    assert_eq!(engine::reference_count(id.to_i64() as u64), None);
    assert!(Gd::<RefCounted>::try_from_instance_id(id).is_none());
}

#[test]
fn refcounted_object_cannot_be_freed() {
    initialize::<IntegrationTests>();

    let obj = Gd::<RefCounted>::instantiate();
    let id = obj.instance_id();

    expect_panic("free() on RefCounted", move || obj.free());

    // The panicking handle still released its reference while unwinding.
    assert!(Gd::<RefCounted>::try_from_instance_id(id).is_none());
}

#[test]
fn manual_object_lives_until_freed() {
    initialize::<IntegrationTests>();

    let node = Gd::<Node>::instantiate();
    let id = node.instance_id();
    assert!(!id.is_ref_counted());
    assert_eq!(node.reference_count(), None);

    let copy = node.clone();
    drop(copy);

    let found = Gd::<Node>::try_from_instance_id(id).expect("node still alive");
    assert_eq!(found, node);
    drop(found);

    node.free();
    assert!(Gd::<Node>::try_from_instance_id(id).is_none());
}

#[test]
fn disposed_handle_releases_reference() {
    initialize::<IntegrationTests>();

    let obj = Gd::<RefCounted>::instantiate();
    let id = obj.instance_id();

    obj.dispose();
    assert!(obj.is_disposed());
    assert!(Gd::<RefCounted>::try_from_instance_id(id).is_none());

    // Idempotent; later uses fail loudly.
    obj.dispose();
    expect_panic("obj_sys() after dispose", || {
        let _ = obj.obj_sys();
    });
    expect_panic("to_variant() after dispose", || {
        let _ = obj.to_variant();
    });
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Casts

#[test]
fn upcast_and_downcast() {
    initialize::<IntegrationTests>();

    let resource = Gd::<Resource>::instantiate();
    let id = resource.instance_id();

    let base: Gd<Object> = resource.upcast::<RefCounted>().upcast();
    assert_eq!(base.instance_id(), id);

    let base = base.try_cast::<Node>().expect_err("a Resource is no Node");
    let resource = base.cast::<Resource>();
    assert_eq!(resource.reference_count(), Some(1));

    // Each class tag is looked up once.
    let _ = resource.clone().try_cast::<Resource>();
    let _ = resource.clone().try_cast::<Resource>();
    assert_eq!(engine::lookup_count(&Lookup::ClassTag("Resource".to_string())), 1);

    let node = Gd::<Node>::instantiate().upcast::<Object>();
    expect_panic("cast Node to Resource", || {
        let _ = node.clone().cast::<Resource>();
    });
    node.cast::<Node>().free();
}

#[test]
fn inheritance_follows_base_chain() {
    initialize::<IntegrationTests>();

    assert!(Resource::inherits::<Object>());
    assert!(Resource::inherits::<RefCounted>());
    assert!(!Resource::inherits::<Node>());
    assert!(!Object::inherits::<Node>());
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Marshalling

#[test]
fn object_variant_roundtrip() {
    initialize::<IntegrationTests>();

    let node = Gd::<Node>::instantiate();
    let variant = node.to_variant();
    assert_eq!(variant.get_type(), VariantType::Object);
    assert_eq!(variant.to_string(), format!("<Node#{}>", node.instance_id()));

    assert_eq!(variant.to::<Gd<Node>>(), node);
    assert_eq!(variant.to::<Gd<Object>>().instance_id(), node.instance_id());

    let err = Gd::<RefCounted>::try_from_variant(&variant).expect_err("a Node is no RefCounted");
    assert!(err.to_string().contains("expected class RefCounted"), "{err}");

    assert!(Gd::<Node>::try_from_variant(&Variant::nil()).is_err());
    assert!(Gd::<Node>::try_from_variant(&5i64.to_variant()).is_err());

    drop(variant);
    node.free();
}

#[test]
fn optional_object_maps_none_to_nil() {
    initialize::<IntegrationTests>();

    let none: Option<Gd<RefCounted>> = None;
    assert!(none.to_variant().is_nil());
    assert_eq!(Variant::nil().to::<Option<Gd<RefCounted>>>(), None);

    let obj = Gd::<RefCounted>::instantiate();
    let some = Some(obj.clone()).to_variant();
    assert_eq!(some.to::<Option<Gd<RefCounted>>>(), Some(obj));

    assert!(Option::<Gd<RefCounted>>::try_from_variant(&1.5f64.to_variant()).is_err());
}

#[test]
fn object_through_slots() {
    initialize::<IntegrationTests>();

    let obj = Gd::<RefCounted>::instantiate();
    let mut slot: sys::GDExtensionObjectPtr = std::ptr::null_mut();
    let dst = &mut slot as *mut sys::GDExtensionObjectPtr;

    // SAFETY: object slots hold a single object pointer.
    unsafe {
        meta::to_unmanaged_ptr(dst as sys::GDExtensionUninitializedTypePtr, &obj);
        assert_eq!(slot, obj.obj_sys());

        let back = meta::from_unmanaged_ptr::<Gd<RefCounted>>(dst as sys::GDExtensionConstTypePtr);
        assert_eq!(back, obj);
        assert_eq!(obj.reference_count(), Some(2));

        let wrong = meta::try_from_unmanaged_ptr::<Gd<Node>>(dst as sys::GDExtensionConstTypePtr);
        assert!(wrong.is_err());

        meta::to_unmanaged_ptr(dst as sys::GDExtensionUninitializedTypePtr, &None::<Gd<RefCounted>>);
        assert!(slot.is_null());

        let none = meta::from_unmanaged_ptr::<Option<Gd<RefCounted>>>(dst as sys::GDExtensionConstTypePtr);
        assert_eq!(none, None);

        let null = meta::try_from_unmanaged_ptr::<Gd<RefCounted>>(dst as sys::GDExtensionConstTypePtr);
        assert!(null.is_err());
    }
}

#[test]
fn instance_id_conversions() {
    initialize::<IntegrationTests>();

    assert_eq!(InstanceId::try_from_i64(0), None);

    let node = Gd::<Node>::instantiate();
    let id = node.instance_id();
    assert_eq!(InstanceId::try_from_i64(id.to_i64()), Some(id));

    let variant = id.to_variant();
    assert_eq!(variant.to::<i64>(), id.to_i64());
    assert_eq!(variant.to::<InstanceId>(), id);
    assert!(InstanceId::try_from_variant(&0i64.to_variant()).is_err());

    node.free();
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Dynamic calls and signals

#[test]
fn dynamic_object_calls() {
    initialize::<IntegrationTests>();

    let obj = Gd::<RefCounted>::instantiate();

    let class = obj.call("get_class", &[]).expect("get_class exists");
    assert_eq!(class.to::<String>(), "RefCounted");

    let id = obj.call("get_instance_id", &[]).expect("get_instance_id exists");
    assert_eq!(id.to::<InstanceId>(), obj.instance_id());

    let err = obj.call("fly", &[]).expect_err("no such method");
    assert_eq!(err.method_name(), "fly");
    assert_eq!(err.reason(), "method not found");

    let node = Gd::<Node>::instantiate();
    assert_eq!(node.call("get_class", &[]).expect("inherited from Object").to::<String>(), "Node");
    assert!(node.call("get_reference_count", &[]).is_err());
    node.free();
}

#[test]
fn signal_of_object() {
    initialize::<IntegrationTests>();

    let node = Gd::<Node>::instantiate();
    let signal = Signal::from_object_signal(&node, &StringName::from("ready"));

    assert_eq!(signal.name(), StringName::from("ready"));
    assert_eq!(signal.object_id(), Some(node.instance_id()));

    let back = signal.to_variant().to::<Signal>();
    assert_eq!(back, signal);

    let invalid = Signal::invalid();
    assert_eq!(invalid.object_id(), None);
    assert_ne!(invalid, signal);

    node.free();
}
