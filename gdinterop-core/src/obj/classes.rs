/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Engine classes known to the marshalling layer.
//!
//! Only the root classes are declared here. Generated per-class APIs live outside of this crate; they use [`Gd`](crate::obj::Gd)
//! with their own [`GodotClass`] impls.

use crate::obj::{ClassTag, GodotClass, Inherits, NoBase};
use crate::sys;
use crate::sys::bind_cache::{BindCell, MethodBind, resolve_method_bind};

macro_rules! define_class {
    (
        $(#[$attr:meta])*
        $Class:ident: $Base:ty, refcounted = $refcounted:literal $(, inherits = [$($Ancestor:ty),*])?
    ) => {
        $(#[$attr])*
        pub enum $Class {}

        impl GodotClass for $Class {
            type Base = $Base;

            const CLASS_NAME: &'static str = stringify!($Class);
            const IS_REFCOUNTED: bool = $refcounted;

            fn class_tag() -> ClassTag {
                static TAG: BindCell<ClassTag> = BindCell::new();
                ClassTag::resolve(&TAG, Self::CLASS_NAME)
            }
        }

        $($(
            // SAFETY: matches the engine's class hierarchy.
            unsafe impl Inherits<$Ancestor> for $Class {}
        )*)?
    };
}

define_class!(
    /// Root of the engine's class hierarchy. Instances are manually managed.
    Object: NoBase, refcounted = false
);

define_class!(
    /// Base of all reference-counted classes. Instances are freed when the last reference is released.
    RefCounted: Object, refcounted = true, inherits = [Object]
);

define_class!(
    /// Scene tree node. Instances are manually managed.
    Node: Object, refcounted = false, inherits = [Object]
);

// ----------------------------------------------------------------------------------------------------------------------------------------------
// RefCounted methods

// Hashes of `bool ()` and `int () const` in the engine's method database.
const HASH_BOOL_NOARGS: i64 = 2240911060;
const HASH_INT_NOARGS_CONST: i64 = 3905245786;

/// Reference count operations on a live `RefCounted` instance.
pub(crate) mod ref_counted {
    use super::*;

    /// First reference of a newly constructed instance.
    ///
    /// # Safety
    /// `object` must point to a live instance of `RefCounted` or a subclass.
    pub unsafe fn init_ref(object: sys::GDExtensionObjectPtr) -> bool {
        static BIND: BindCell<MethodBind> = BindCell::new();
        let bind = resolve_method_bind(&BIND, RefCounted::CLASS_NAME, "init_ref", HASH_BOOL_NOARGS);

        // SAFETY: forwarded to caller.
        unsafe { call_bool(bind, object) }
    }

    /// # Safety
    /// See [`init_ref()`].
    pub unsafe fn reference(object: sys::GDExtensionObjectPtr) -> bool {
        static BIND: BindCell<MethodBind> = BindCell::new();
        let bind = resolve_method_bind(&BIND, RefCounted::CLASS_NAME, "reference", HASH_BOOL_NOARGS);

        // SAFETY: forwarded to caller.
        unsafe { call_bool(bind, object) }
    }

    /// Releases one reference. Returns `true` if this was the last one, in which case the caller must destroy the object.
    ///
    /// # Safety
    /// See [`init_ref()`].
    pub unsafe fn unreference(object: sys::GDExtensionObjectPtr) -> bool {
        static BIND: BindCell<MethodBind> = BindCell::new();
        let bind = resolve_method_bind(&BIND, RefCounted::CLASS_NAME, "unreference", HASH_BOOL_NOARGS);

        // SAFETY: forwarded to caller.
        unsafe { call_bool(bind, object) }
    }

    /// # Safety
    /// See [`init_ref()`].
    pub unsafe fn get_reference_count(object: sys::GDExtensionObjectPtr) -> i32 {
        static BIND: BindCell<MethodBind> = BindCell::new();
        let bind = resolve_method_bind(
            &BIND,
            RefCounted::CLASS_NAME,
            "get_reference_count",
            HASH_INT_NOARGS_CONST,
        );

        let mut count: i64 = 0;

        // SAFETY: forwarded to caller; `int` return slot is an i64.
        unsafe {
            sys::interface_fn!(object_method_bind_ptrcall)(
                bind.0,
                object,
                std::ptr::null(),
                &mut count as *mut i64 as sys::GDExtensionTypePtr,
            )
        };
        count as i32
    }

    unsafe fn call_bool(bind: MethodBind, object: sys::GDExtensionObjectPtr) -> bool {
        let mut ret = sys::SYS_FALSE;

        // SAFETY: method takes no arguments and returns `bool`.
        unsafe {
            sys::interface_fn!(object_method_bind_ptrcall)(
                bind.0,
                object,
                std::ptr::null(),
                &mut ret as *mut sys::GDExtensionBool as sys::GDExtensionTypePtr,
            )
        };
        sys::conv::bool_from_sys(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy() {
        assert!(RefCounted::inherits::<Object>());
        assert!(Node::inherits::<Object>());
        assert!(Object::inherits::<Object>());
        assert!(!Object::inherits::<RefCounted>());
        assert!(!Node::inherits::<RefCounted>());
    }
}
