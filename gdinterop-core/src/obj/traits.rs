/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::ffi::c_void;

use crate::sys;
use crate::sys::bind_cache::{BindCell, BindSymbol};

/// Engine class that objects can be accessed as, through [`Gd`](crate::obj::Gd).
#[diagnostic::on_unimplemented(
    message = "only engine classes can be used in this context",
    note = "see `gdinterop::classes` for the available classes"
)]
pub trait GodotClass: 'static + Sized {
    /// Direct base class, or [`NoBase`] for `Object`.
    type Base: GodotClass;

    /// Name of the class in the engine's class database.
    const CLASS_NAME: &'static str;

    /// Whether instances are managed by reference counting.
    const IS_REFCOUNTED: bool;

    /// Engine tag of this class, used for `object_cast_to`. Resolved once per class.
    fn class_tag() -> ClassTag;

    /// Whether `Self` is `Base` or derives from it.
    fn inherits<Base: GodotClass>() -> bool {
        if Self::CLASS_NAME == Base::CLASS_NAME {
            true
        } else if Self::Base::CLASS_NAME == NoBase::CLASS_NAME {
            false
        } else {
            Self::Base::inherits::<Base>()
        }
    }
}

/// Statically known "is-a" relation, for infallible upcasts.
///
/// # Safety
/// `Self` must inherit from `Base` in the engine's class hierarchy.
pub unsafe trait Inherits<Base: GodotClass>: GodotClass {}

// SAFETY: every class is trivially itself.
unsafe impl<T: GodotClass> Inherits<T> for T {}

/// Marker for the (non-existent) base of `Object`.
pub enum NoBase {}

impl GodotClass for NoBase {
    type Base = NoBase;

    const CLASS_NAME: &'static str = "";
    const IS_REFCOUNTED: bool = false;

    fn class_tag() -> ClassTag {
        unreachable!("NoBase has no class tag")
    }
}

/// Opaque engine class identifier, as returned by `classdb_get_class_tag`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct ClassTag(*mut c_void);

// SAFETY: the tag is an immutable engine identifier, only compared and passed back.
unsafe impl Send for ClassTag {}
// SAFETY: See `Send` impl safety doc.
unsafe impl Sync for ClassTag {}

// SAFETY: round-trips the pointer unchanged.
unsafe impl BindSymbol for ClassTag {
    fn into_raw(self) -> *mut c_void {
        self.0
    }

    unsafe fn from_raw(raw: *mut c_void) -> Self {
        ClassTag(raw)
    }
}

impl ClassTag {
    /// Looks up the tag of `class_name` unless `cell` already holds it.
    ///
    /// # Panics
    /// If the engine does not know the class.
    pub fn resolve(cell: &BindCell<ClassTag>, class_name: &str) -> Self {
        cell.get_or_resolve(
            || {
                let name = sys::ScratchStringName::new(class_name);
                let get_tag = sys::interface_fn!(classdb_get_class_tag);

                // SAFETY: the name lives until the end of the call.
                let tag = unsafe { get_tag(name.as_const_ptr()) };
                (!tag.is_null()).then_some(ClassTag(tag))
            },
            || format!("class tag of {class_name}"),
        )
    }

    pub(crate) fn as_ptr(self) -> *mut c_void {
        self.0
    }
}
