/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::builtin::Variant;
use crate::lifetime::{Disposable, DisposalToken, engine_available, registry};
use crate::meta::error::{CallError, ConvertError, FromFfiError, FromVariantError};
use crate::meta::{Marshal, NullableMarshal, read_slot, write_slot};
use crate::obj::classes::ref_counted;
use crate::obj::{GodotClass, Inherits, InstanceId};
use crate::sys;
use crate::sys::VariantType;

/// Handle to an engine object of class `T`.
///
/// Marshalled as the raw object pointer: conversions never copy the object itself.
///
/// # Ownership
/// - For reference-counted objects, every `Gd` holds one strong reference. Cloning adds a reference, dropping or
///   [disposing](Self::dispose) releases it, and the last release destroys the object.
/// - For manually managed objects, a `Gd` is a plain pointer. The object lives until [`free()`](Self::free) is called.
///
/// Every handle is tracked in the engine-object bucket of the [disposal registry](crate::lifetime), so references still held at
/// shutdown are released before the engine goes away.
pub struct Gd<T: GodotClass> {
    cell: Arc<ObjectCell>,

    // Not Send/Sync: the engine's objects are not thread-safe in general.
    _marker: PhantomData<*const T>,
}

sys::static_assert_eq_size_align!(sys::GDExtensionObjectPtr, sys::types::OpaqueObject);

impl<T: GodotClass> Gd<T> {
    /// Constructs a new instance of `T` through the class database.
    ///
    /// # Panics
    /// If the engine cannot instantiate the class.
    pub fn instantiate() -> Self {
        let class_name = sys::ScratchStringName::new(T::CLASS_NAME);

        // SAFETY: the name lives until the end of the call.
        let object = unsafe { sys::interface_fn!(classdb_construct_object)(class_name.as_const_ptr()) };
        assert!(!object.is_null(), "failed to instantiate class {}", T::CLASS_NAME);

        let refcounted = is_instance_refcounted(object);
        if refcounted {
            // SAFETY: freshly constructed reference-counted instance.
            unsafe { ref_counted::init_ref(object) };
        }

        Self::adopt(object, refcounted)
    }

    /// Handle to the object at `object`, adding a reference if it is reference-counted. `None` for null.
    ///
    /// # Safety
    /// `object` must be null or point to a live instance of `T` or a subclass.
    pub unsafe fn from_obj_sys(object: sys::GDExtensionObjectPtr) -> Option<Self> {
        if object.is_null() {
            return None;
        }

        let refcounted = is_instance_refcounted(object);
        if refcounted {
            // SAFETY: forwarded to caller.
            unsafe { ref_counted::reference(object) };
        }

        Some(Self::adopt(object, refcounted))
    }

    /// Takes over the object pointer stored at `src`, including the reference it holds.
    ///
    /// # Safety
    /// `src` must point to a non-null object pointer of class `T`, whose reference (if any) is owned by the caller.
    pub unsafe fn from_sys_taking_ownership(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        let object = unsafe { read_slot::<sys::GDExtensionObjectPtr>(src) };
        assert!(!object.is_null(), "Gd::from_sys_taking_ownership(): null object");

        Self::adopt(object, is_instance_refcounted(object))
    }

    /// New handle to the object pointer stored at `src`, which keeps its own reference.
    ///
    /// # Safety
    /// `src` must point to a non-null object pointer of class `T`.
    pub unsafe fn from_sys_copying(src: sys::GDExtensionConstTypePtr) -> Self {
        // SAFETY: forwarded to caller.
        unsafe { Self::from_obj_sys(read_slot(src)) }
            .unwrap_or_else(|| panic!("Gd::from_sys_copying(): null object"))
    }

    /// Looks up a live object by ID. `None` if it no longer exists or is not a `T`.
    pub fn try_from_instance_id(id: InstanceId) -> Option<Self> {
        // SAFETY: the engine returns null for unknown IDs.
        let object = unsafe { sys::interface_fn!(object_get_instance_from_id)(id.to_u64()) };
        let object = cast_object_ptr::<T>(object)?;

        // SAFETY: checked to be a live `T`.
        unsafe { Self::from_obj_sys(object) }
    }

    /// Raw object pointer.
    ///
    /// # Panics
    /// If the handle has been disposed.
    pub fn obj_sys(&self) -> sys::GDExtensionObjectPtr {
        self.cell.object()
    }

    pub fn instance_id(&self) -> InstanceId {
        let object = self.obj_sys();

        // SAFETY: `object` is live while the handle exists.
        let id = unsafe { sys::interface_fn!(object_get_instance_id)(object) };
        InstanceId::try_from_u64(id)
            .unwrap_or_else(|| panic!("live {} object has no instance ID", T::CLASS_NAME))
    }

    /// Current reference count, or `None` for manually managed objects.
    pub fn reference_count(&self) -> Option<i32> {
        // SAFETY: the object is live and reference-counted.
        self.cell
            .refcounted
            .then(|| unsafe { ref_counted::get_reference_count(self.obj_sys()) })
    }

    /// Converts to a handle of a base class. Always succeeds.
    pub fn upcast<Base>(self) -> Gd<Base>
    where
        Base: GodotClass,
        T: Inherits<Base>,
    {
        self.retype()
    }

    /// Converts to a handle of `Derived`, or gives back `self` if the object is not a `Derived`.
    pub fn try_cast<Derived: GodotClass>(self) -> Result<Gd<Derived>, Self> {
        match cast_object_ptr::<Derived>(self.obj_sys()) {
            Some(_) => Ok(self.retype()),
            None => Err(self),
        }
    }

    /// ⚠️ Converts to a handle of `Derived`.
    ///
    /// # Panics
    /// If the object is not a `Derived`.
    pub fn cast<Derived: GodotClass>(self) -> Gd<Derived> {
        self.try_cast().unwrap_or_else(|original| {
            panic!(
                "cannot cast {} to {}",
                original.dynamic_class_description(),
                Derived::CLASS_NAME
            )
        })
    }

    /// ⚠️ Destroys a manually managed object. Other handles to it dangle afterwards.
    ///
    /// # Panics
    /// If the object is reference-counted, or the handle has been disposed.
    pub fn free(self) {
        assert!(
            !self.cell.refcounted,
            "called free() on reference-counted {}; drop all handles instead",
            T::CLASS_NAME
        );

        let object = self.cell.take_for_free();

        // SAFETY: manually managed object, owned by the caller of `free()`.
        unsafe { sys::interface_fn!(object_destroy)(object) };
    }

    /// Releases this handle now: reference-counted objects lose one reference. Later calls and the eventual drop are no-ops.
    pub fn dispose(&self) {
        self.cell.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.cell.is_disposed()
    }

    /// Calls `method` dynamically through the engine.
    pub fn call(&self, method: &str, args: &[Variant]) -> Result<Variant, CallError> {
        self.to_variant().try_call(method, args)
    }

    fn adopt(object: sys::GDExtensionObjectPtr, refcounted: bool) -> Self {
        Self {
            cell: ObjectCell::new(object, refcounted),
            _marker: PhantomData,
        }
    }

    fn retype<U: GodotClass>(self) -> Gd<U> {
        Gd {
            cell: self.cell,
            _marker: PhantomData,
        }
    }

    fn dynamic_class_description(&self) -> String {
        match self.cell.try_object() {
            Some(_) => format!("{} (id {})", T::CLASS_NAME, self.instance_id()),
            None => format!("{} (disposed)", T::CLASS_NAME),
        }
    }
}

impl<T: GodotClass> Clone for Gd<T> {
    fn clone(&self) -> Self {
        // SAFETY: `self` keeps the object alive.
        unsafe { Self::from_obj_sys(self.obj_sys()) }
            .unwrap_or_else(|| unreachable!("live handle has null object"))
    }
}

impl<T: GodotClass> PartialEq for Gd<T> {
    fn eq(&self, other: &Self) -> bool {
        self.cell.try_object() == other.cell.try_object()
    }
}

impl<T: GodotClass> fmt::Debug for Gd<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Gd({})", self.dynamic_class_description())
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Marshalling

impl<T: GodotClass> Marshal for Gd<T> {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::Object
    }

    fn to_variant(&self) -> Variant {
        let object = self.obj_sys();

        // SAFETY: the slot holds a live object pointer; the variant takes its own reference.
        unsafe {
            Variant::from_value_ptr(
                VariantType::Object,
                &object as *const sys::GDExtensionObjectPtr as sys::GDExtensionConstTypePtr,
            )
        }
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        let object = object_ptr_of_variant(variant)?;
        if object.is_null() {
            return Err(FromVariantError::BadValue.into_error(variant));
        }

        let object = cast_object_ptr::<T>(object).ok_or_else(|| {
            FromVariantError::WrongClass {
                expected: T::CLASS_NAME,
            }
            .into_error(variant)
        })?;

        // SAFETY: the variant keeps the object alive during the call; checked to be a `T`.
        unsafe { Self::from_obj_sys(object) }.ok_or_else(|| FromVariantError::BadValue.into_error(variant))
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { write_slot(dst, self.obj_sys()) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        let object = unsafe { read_slot::<sys::GDExtensionObjectPtr>(src) };
        if object.is_null() {
            return Err(FromFfiError::NullRawGd.into_error());
        }

        let object = cast_object_ptr::<T>(object).ok_or_else(|| FromFfiError::WrongObjectType.into_error())?;

        // SAFETY: non-null, checked to be a `T`.
        unsafe { Self::from_obj_sys(object) }.ok_or_else(|| FromFfiError::NullRawGd.into_error())
    }
}

/// `None` is stored as `Nil` in variants and as a null pointer in slots.
impl<T: GodotClass> NullableMarshal for Gd<T> {
    unsafe fn write_null_to_ptr(dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { write_slot::<sys::GDExtensionObjectPtr>(dst, std::ptr::null_mut()) }
    }

    unsafe fn is_null_ptr(src: sys::GDExtensionConstTypePtr) -> bool {
        // SAFETY: forwarded to caller.
        unsafe { read_slot::<sys::GDExtensionObjectPtr>(src) }.is_null()
    }

    fn is_null_variant(variant: &Variant) -> bool {
        variant.is_nil() || object_ptr_of_variant(variant).is_ok_and(|object| object.is_null())
    }
}

fn object_ptr_of_variant(variant: &Variant) -> Result<sys::GDExtensionObjectPtr, ConvertError> {
    let mut object: sys::GDExtensionObjectPtr = std::ptr::null_mut();

    // SAFETY: the slot is an object pointer, matching the native layout of `Object`.
    unsafe {
        variant.try_write_value_ptr(
            VariantType::Object,
            &mut object as *mut sys::GDExtensionObjectPtr as sys::GDExtensionUninitializedTypePtr,
        )?
    };
    Ok(object)
}

/// `object` if it is non-null and an instance of `U`.
fn cast_object_ptr<U: GodotClass>(object: sys::GDExtensionObjectPtr) -> Option<sys::GDExtensionObjectPtr> {
    if object.is_null() {
        return None;
    }

    // SAFETY: `object` is a live object; the engine returns null if the class does not match.
    let cast = unsafe { sys::interface_fn!(object_cast_to)(object, U::class_tag().as_ptr()) };
    (!cast.is_null()).then_some(cast)
}

fn is_instance_refcounted(object: sys::GDExtensionObjectPtr) -> bool {
    // SAFETY: callers pass live objects.
    let id = unsafe { sys::interface_fn!(object_get_instance_id)(object) };
    InstanceId::try_from_u64(id).is_some_and(InstanceId::is_ref_counted)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tracking

#[derive(Copy, Clone, Eq, PartialEq)]
struct ObjectPtr(sys::GDExtensionObjectPtr);

// SAFETY: the pointer is only dereferenced by the engine; access through the cell is serialized by its mutex.
unsafe impl Send for ObjectPtr {}
// SAFETY: See `Send` impl safety doc.
unsafe impl Sync for ObjectPtr {}

/// Registry entry of one [`Gd`] handle.
struct ObjectCell {
    object: Mutex<Option<ObjectPtr>>,
    refcounted: bool,
    token: DisposalToken,
}

impl ObjectCell {
    fn new(object: sys::GDExtensionObjectPtr, refcounted: bool) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<ObjectCell>| {
            let weak: Weak<dyn Disposable> = weak.clone();
            ObjectCell {
                object: Mutex::new(Some(ObjectPtr(object))),
                refcounted,
                token: registry().register_engine_object(weak),
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Option<ObjectPtr>> {
        self.object.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_object(&self) -> Option<sys::GDExtensionObjectPtr> {
        self.lock().map(|ptr| ptr.0)
    }

    fn object(&self) -> sys::GDExtensionObjectPtr {
        self.try_object()
            .unwrap_or_else(|| panic!("object handle used after it was disposed"))
    }

    /// Detaches the pointer without releasing a reference.
    fn take_for_free(&self) -> sys::GDExtensionObjectPtr {
        let ptr = self
            .lock()
            .take()
            .unwrap_or_else(|| panic!("object handle used after it was disposed"));

        let unregistered = registry().unregister(self.token);
        debug_assert!(unregistered.is_ok(), "freed twice: {unregistered:?}");
        ptr.0
    }
}

impl Disposable for ObjectCell {
    fn dispose(&self) {
        let Some(ObjectPtr(object)) = self.lock().take() else {
            return;
        };

        if self.refcounted && engine_available() {
            // SAFETY: this handle held one reference, released exactly once here.
            unsafe {
                if ref_counted::unreference(object) {
                    sys::interface_fn!(object_destroy)(object);
                }
            }
        }

        let unregistered = registry().unregister(self.token);
        debug_assert!(unregistered.is_ok(), "disposed twice: {unregistered:?}");
    }

    fn is_disposed(&self) -> bool {
        self.lock().is_none()
    }
}

impl Drop for ObjectCell {
    fn drop(&mut self) {
        self.dispose();
    }
}
