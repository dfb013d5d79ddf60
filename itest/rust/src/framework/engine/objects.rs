/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Object database of the engine double: a small class hierarchy, instance IDs and reference counting.

use std::collections::HashMap;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use gdinterop::builtin::VariantType;
use gdinterop::sys;
use gdinterop::sys::Global;

use super::builtins::new_string;
use super::shared::write_handle;
use super::variant::{RawVariant, slot_size};

/// Bit 63 of an instance ID marks reference-counted objects.
const REFCOUNTED_BIT: u64 = 1 << 63;

pub(crate) struct ClassInfo {
    pub name: &'static str,
    pub base: Option<&'static ClassInfo>,
    pub refcounted: bool,
}

impl ClassInfo {
    fn inherits(&self, ancestor: &ClassInfo) -> bool {
        let mut class = Some(self);
        while let Some(c) = class {
            if ptr::eq(c, ancestor) {
                return true;
            }
            class = c.base;
        }
        false
    }
}

static OBJECT: ClassInfo = ClassInfo {
    name: "Object",
    base: None,
    refcounted: false,
};

static REF_COUNTED: ClassInfo = ClassInfo {
    name: "RefCounted",
    base: Some(&OBJECT),
    refcounted: true,
};

static NODE: ClassInfo = ClassInfo {
    name: "Node",
    base: Some(&OBJECT),
    refcounted: false,
};

static RESOURCE: ClassInfo = ClassInfo {
    name: "Resource",
    base: Some(&REF_COUNTED),
    refcounted: true,
};

static CLASSES: [&ClassInfo; 4] = [&OBJECT, &REF_COUNTED, &NODE, &RESOURCE];

pub(crate) fn class_by_name(name: &str) -> Option<&'static ClassInfo> {
    CLASSES.iter().copied().find(|class| class.name == name)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Instances

pub(crate) struct EngineObject {
    class: &'static ClassInfo,
    id: u64,
    refcount: AtomicI64,
    awaiting_init_ref: AtomicBool,
}

impl EngineObject {
    fn init_ref(&self) -> bool {
        if self.awaiting_init_ref.swap(false, Ordering::AcqRel) {
            true
        } else {
            self.reference()
        }
    }

    fn reference(&self) -> bool {
        self.refcount.fetch_add(1, Ordering::AcqRel);
        true
    }

    /// Returns `true` if the last reference is gone.
    fn unreference(&self) -> bool {
        self.refcount.fetch_sub(1, Ordering::AcqRel) == 1
    }
}

#[derive(Default)]
struct ObjectDb {
    /// Address by instance ID.
    by_id: HashMap<u64, usize>,
    /// Instance ID by address.
    by_address: HashMap<usize, u64>,
    destroyed: usize,
}

static OBJECTS: Global<ObjectDb> = Global::default();
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn construct(class: &'static ClassInfo) -> *mut EngineObject {
    let mut id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    if class.refcounted {
        id |= REFCOUNTED_BIT;
    }

    // Reference-counted objects start with one reference, claimed by the first `init_ref()`.
    let object = Box::into_raw(Box::new(EngineObject {
        class,
        id,
        refcount: AtomicI64::new(i64::from(class.refcounted)),
        awaiting_init_ref: AtomicBool::new(class.refcounted),
    }));

    let mut db = OBJECTS.write();
    db.by_id.insert(id, object as usize);
    db.by_address.insert(object as usize, id);
    object
}

/// # Safety
/// `object` must be a live object, not used afterwards.
pub(crate) unsafe fn destroy(object: *mut EngineObject) {
    {
        let mut db = OBJECTS.write();
        let Some(id) = db.by_address.remove(&(object as usize)) else {
            return;
        };
        db.by_id.remove(&id);
        db.destroyed += 1;
    }

    // SAFETY: allocated in `construct()`, removed from the database above.
    drop(unsafe { Box::from_raw(object) });
}

/// Live object by pointer; `None` for null or destroyed objects.
fn live<'a>(object: *const c_void) -> Option<&'a EngineObject> {
    if object.is_null() || !OBJECTS.read().by_address.contains_key(&(object as usize)) {
        return None;
    }

    // SAFETY: registered in the database, so still allocated.
    Some(unsafe { &*(object as *const EngineObject) })
}

pub(crate) fn from_id(id: u64) -> *mut c_void {
    OBJECTS
        .read()
        .by_id
        .get(&id)
        .map_or(ptr::null_mut(), |&address| address as *mut c_void)
}

pub(crate) fn instance_id(object: *const c_void) -> u64 {
    live(object).map_or(0, |o| o.id)
}

/// Adds a reference if `object` is reference-counted.
pub(crate) fn retain(object: *mut c_void) {
    if let Some(o) = live(object).filter(|o| o.class.refcounted) {
        o.reference();
    }
}

/// Releases a reference if `object` is reference-counted, destroying it on the last one.
pub(crate) fn release(object: *mut c_void) {
    if let Some(o) = live(object).filter(|o| o.class.refcounted) {
        if o.unreference() {
            // SAFETY: no references left.
            unsafe { destroy(object as *mut EngineObject) };
        }
    }
}

/// Returns the object if it is an instance of the class behind `tag`, null otherwise.
pub(crate) fn cast_to(object: *const c_void, tag: *mut c_void) -> *mut c_void {
    let target = CLASSES.iter().find(|class| ptr::eq(**class, tag as *const ClassInfo));

    match (live(object), target) {
        (Some(o), Some(target)) if o.class.inherits(target) => object as *mut c_void,
        _ => ptr::null_mut(),
    }
}

pub(crate) fn class_tag(name: &str) -> *mut c_void {
    class_by_name(name).map_or(ptr::null_mut(), |class| class as *const ClassInfo as *mut c_void)
}

pub(crate) fn describe(object: *const c_void) -> String {
    match live(object) {
        Some(o) => format!("<{}#{}>", o.class.name, o.id as i64),
        None if object.is_null() => "<null>".to_string(),
        None => "<Freed Object>".to_string(),
    }
}

pub(crate) fn describe_id(id: u64) -> String {
    describe(from_id(id))
}

pub(crate) fn live_count() -> usize {
    OBJECTS.read().by_id.len()
}

pub(crate) fn destroyed_count() -> usize {
    OBJECTS.read().destroyed
}

pub(crate) fn reference_count(id: u64) -> Option<i64> {
    live(from_id(id))
        .filter(|o| o.class.refcounted)
        .map(|o| o.refcount.load(Ordering::Acquire))
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Method binds

enum Returned {
    Bool(bool),
    Int(i64),
    Text(String),
}

pub(crate) struct MethodBind {
    class: &'static ClassInfo,
    name: &'static str,
    hash: i64,
    call: fn(&EngineObject) -> Returned,
}

// Hashes of `bool ()`, `int () const` and `String () const` in the engine's method database.
const HASH_BOOL_NOARGS: i64 = 2240911060;
const HASH_INT_NOARGS_CONST: i64 = 3905245786;
const HASH_STRING_NOARGS_CONST: i64 = 201670096;

static METHOD_BINDS: [MethodBind; 6] = [
    MethodBind {
        class: &REF_COUNTED,
        name: "init_ref",
        hash: HASH_BOOL_NOARGS,
        call: |o| Returned::Bool(o.init_ref()),
    },
    MethodBind {
        class: &REF_COUNTED,
        name: "reference",
        hash: HASH_BOOL_NOARGS,
        call: |o| Returned::Bool(o.reference()),
    },
    MethodBind {
        class: &REF_COUNTED,
        name: "unreference",
        hash: HASH_BOOL_NOARGS,
        call: |o| Returned::Bool(o.unreference()),
    },
    MethodBind {
        class: &REF_COUNTED,
        name: "get_reference_count",
        hash: HASH_INT_NOARGS_CONST,
        call: |o| Returned::Int(o.refcount.load(Ordering::Acquire)),
    },
    MethodBind {
        class: &OBJECT,
        name: "get_instance_id",
        hash: HASH_INT_NOARGS_CONST,
        call: |o| Returned::Int(o.id as i64),
    },
    MethodBind {
        class: &OBJECT,
        name: "get_class",
        hash: HASH_STRING_NOARGS_CONST,
        call: |o| Returned::Text(o.class.name.to_string()),
    },
];

fn find_method(class: &ClassInfo, name: &str) -> Option<&'static MethodBind> {
    METHOD_BINDS
        .iter()
        .find(|bind| bind.name == name && class.inherits(bind.class))
}

pub(crate) fn method_bind(class_name: &str, method_name: &str, hash: i64) -> sys::GDExtensionMethodBindPtr {
    class_by_name(class_name)
        .and_then(|class| find_method(class, method_name))
        .filter(|bind| bind.hash == hash)
        .map_or(ptr::null(), |bind| bind as *const MethodBind as sys::GDExtensionMethodBindPtr)
}

/// Describes a method bind, for lookup bookkeeping.
///
/// # Safety
/// `bind` must come from [`method_bind()`].
pub(crate) unsafe fn method_bind_name(bind: sys::GDExtensionMethodBindPtr) -> String {
    // SAFETY: per contract.
    let bind = unsafe { &*(bind as *const MethodBind) };
    format!("{}::{}", bind.class.name, bind.name)
}

/// # Safety
/// `bind` must come from [`method_bind()`]; `ret` must be a slot of the method's return type.
pub(crate) unsafe fn ptrcall(bind: sys::GDExtensionMethodBindPtr, object: *mut c_void, ret: sys::GDExtensionTypePtr) {
    // SAFETY: per contract.
    let bind = unsafe { &*(bind as *const MethodBind) };
    let Some(o) = live(object) else {
        return;
    };

    // SAFETY: the return slot matches the method's signature.
    unsafe {
        match (bind.call)(o) {
            Returned::Bool(value) => ptr::write_unaligned(ret as *mut u8, u8::from(value)),
            Returned::Int(value) => ptr::write_unaligned(ret as *mut i64, value),
            Returned::Text(text) => write_handle(ret as *mut c_void, slot_size(VariantType::String), new_string(&text)),
        }
    }
}

/// Dynamic call through a method bind. Arguments are not supported by any bound method.
///
/// # Safety
/// `bind` must be null or come from [`method_bind()`].
pub(crate) unsafe fn varcall(
    bind: *const MethodBind,
    object: *mut c_void,
    arg_count: usize,
    ret: &mut RawVariant,
    err: &mut sys::GDExtensionCallError,
) {
    let Some(o) = live(object) else {
        err.error = sys::GDEXTENSION_CALL_ERROR_INSTANCE_IS_NULL;
        return;
    };

    if bind.is_null() {
        err.error = sys::GDEXTENSION_CALL_ERROR_INVALID_METHOD;
        return;
    }

    if arg_count > 0 {
        err.error = sys::GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS;
        err.expected = 0;
        return;
    }

    // SAFETY: per contract.
    let bind = unsafe { &*bind };
    *ret = match (bind.call)(o) {
        Returned::Bool(value) => RawVariant::from_inline(VariantType::Bool, u8::from(value)),
        Returned::Int(value) => RawVariant::from_inline(VariantType::Int, value),
        Returned::Text(text) => RawVariant::from_handle(VariantType::String, new_string(&text)),
    };
}

/// `object.call(method)` from a variant.
pub(crate) fn call(
    object: *mut c_void,
    method: &str,
    args: &[*const RawVariant],
    ret: &mut RawVariant,
    err: &mut sys::GDExtensionCallError,
) {
    let bind = live(object)
        .and_then(|o| find_method(o.class, method))
        .map_or(ptr::null(), |bind| bind as *const MethodBind);

    // SAFETY: null or a bind from the table.
    unsafe { varcall(bind, object, args.len(), ret, err) };
}
