/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Lazily resolved, process-lifetime cache of native function pointers.
//!
//! Each call site owns one `static` [`BindCell`]. The first call resolves the symbol through the engine's lookup functions and
//! stores it; every later call is a single atomic load. A failed lookup (null) is fatal, since it means that the engine and the
//! manifest this crate was compiled against disagree.
//!
//! Concurrent first calls may both perform the lookup. The engine returns the same pointer for the same key, so the race is benign.

use std::ffi::{c_int, c_void};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate as sys;
use crate::{VariantOperator, VariantType, interface_fn};

/// Pointer-call signature of a builtin method.
pub type PtrBuiltinMethod = unsafe extern "C" fn(
    p_base: sys::GDExtensionTypePtr,
    p_args: *const sys::GDExtensionConstTypePtr,
    r_return: sys::GDExtensionTypePtr,
    p_argument_count: c_int,
);

/// Pointer-call signature of a builtin constructor.
pub type PtrConstructor = unsafe extern "C" fn(
    p_base: sys::GDExtensionUninitializedTypePtr,
    p_args: *const sys::GDExtensionConstTypePtr,
);

/// Pointer-call signature of a builtin destructor.
pub type PtrDestructor = unsafe extern "C" fn(p_base: sys::GDExtensionTypePtr);

/// Pointer-call signature of an operator evaluator.
pub type PtrOperatorEvaluator = unsafe extern "C" fn(
    p_left: sys::GDExtensionConstTypePtr,
    p_right: sys::GDExtensionConstTypePtr,
    r_result: sys::GDExtensionTypePtr,
);

/// Pointer-call signature of a utility function.
pub type PtrUtilityFunction = unsafe extern "C" fn(
    r_return: sys::GDExtensionTypePtr,
    p_args: *const sys::GDExtensionConstTypePtr,
    p_argument_count: c_int,
);

/// Converts a typed value into a fresh variant.
pub type VariantFromTypeFn =
    unsafe extern "C" fn(r_dest: sys::GDExtensionUninitializedVariantPtr, p_src: sys::GDExtensionTypePtr);

/// Extracts a typed value from a variant.
pub type TypeFromVariantFn =
    unsafe extern "C" fn(r_dest: sys::GDExtensionUninitializedTypePtr, p_src: sys::GDExtensionVariantPtr);

/// Engine-side method of a class, as returned by `classdb_get_method_bind`.
#[derive(Copy, Clone, Debug)]
pub struct MethodBind(pub sys::GDExtensionMethodBindPtr);

// SAFETY: a method bind is an immutable engine object, identified by pointer.
unsafe impl Send for MethodBind {}
// SAFETY: See `Send` impl safety doc.
unsafe impl Sync for MethodBind {}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Cell

/// Symbols that can be stored in a [`BindCell`].
///
/// # Safety
/// `from_raw(into_raw(x))` must return `x`, and `into_raw` must never return null for a valid symbol.
pub unsafe trait BindSymbol: Copy {
    fn into_raw(self) -> *mut c_void;

    /// # Safety
    /// `raw` must have been produced by [`into_raw`](Self::into_raw) of the same type.
    unsafe fn from_raw(raw: *mut c_void) -> Self;
}

macro_rules! impl_bind_symbol_for_fn {
    ($($Fn:ty),* $(,)?) => {
        $(
            // SAFETY: function pointers and data pointers have the same size on all supported targets.
            unsafe impl BindSymbol for $Fn {
                fn into_raw(self) -> *mut c_void {
                    self as *mut c_void
                }

                unsafe fn from_raw(raw: *mut c_void) -> Self {
                    unsafe { std::mem::transmute::<*mut c_void, $Fn>(raw) }
                }
            }
        )*
    };
}

impl_bind_symbol_for_fn!(
    PtrBuiltinMethod,
    PtrConstructor,
    PtrDestructor,
    PtrOperatorEvaluator,
    PtrUtilityFunction,
    VariantFromTypeFn,
    TypeFromVariantFn,
);

// SAFETY: round-trips the pointer unchanged.
unsafe impl BindSymbol for MethodBind {
    fn into_raw(self) -> *mut c_void {
        sys::force_mut_ptr(self.0)
    }

    unsafe fn from_raw(raw: *mut c_void) -> Self {
        MethodBind(raw as sys::GDExtensionMethodBindPtr)
    }
}

/// One cached native symbol. Null until first use.
pub struct BindCell<F: BindSymbol> {
    raw: AtomicPtr<c_void>,
    _marker: PhantomData<F>,
}

// SAFETY: the cell only stores a pointer that is valid process-wide; `F` is never accessed through a reference.
unsafe impl<F: BindSymbol> Sync for BindCell<F> {}

impl<F: BindSymbol> BindCell<F> {
    pub const fn new() -> Self {
        Self {
            raw: AtomicPtr::new(std::ptr::null_mut()),
            _marker: PhantomData,
        }
    }

    /// Returns the cached symbol, if already resolved.
    pub fn get(&self) -> Option<F> {
        let raw = self.raw.load(Ordering::Acquire);

        // SAFETY: non-null values are only ever stored through `into_raw` of `F`.
        (!raw.is_null()).then(|| unsafe { F::from_raw(raw) })
    }

    /// Returns the cached symbol, or runs `lookup` once and caches its result.
    ///
    /// # Panics
    /// If `lookup` yields `None`; the message names the symbol through `describe`.
    #[inline]
    pub fn get_or_resolve(
        &self,
        lookup: impl FnOnce() -> Option<F>,
        describe: impl FnOnce() -> String,
    ) -> F {
        if let Some(symbol) = self.get() {
            return symbol;
        }

        self.resolve_slow(lookup, describe)
    }

    #[cold]
    fn resolve_slow(
        &self,
        lookup: impl FnOnce() -> Option<F>,
        describe: impl FnOnce() -> String,
    ) -> F {
        let Some(symbol) = lookup() else {
            missing_symbol(&describe());
        };

        let raw = symbol.into_raw();
        assert!(!raw.is_null(), "resolved symbol must not be null");

        self.raw.store(raw, Ordering::Release);
        sys::out!("bind cache: resolved {}", describe());
        symbol
    }
}

impl<F: BindSymbol> Default for BindCell<F> {
    fn default() -> Self {
        Self::new()
    }
}

#[cold]
#[track_caller]
fn missing_symbol(what: &str) -> ! {
    panic!(
        "missing native symbol {what}.\n\
        The engine does not provide it; this is likely a version mismatch between the engine and the API manifest \
        gdinterop was compiled against."
    )
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Resolvers

/// Resolves a class method by `(class, method, hash)`.
pub fn resolve_method_bind(
    cell: &BindCell<MethodBind>,
    class_name: &str,
    method_name: &str,
    hash: i64,
) -> MethodBind {
    cell.get_or_resolve(
        || {
            let class = sys::ScratchStringName::new(class_name);
            let method = sys::ScratchStringName::new(method_name);

            let get_method_bind = interface_fn!(classdb_get_method_bind);

            // SAFETY: both string names live until the end of the call.
            let ptr = unsafe { get_method_bind(class.as_const_ptr(), method.as_const_ptr(), hash) };
            (!ptr.is_null()).then_some(MethodBind(ptr))
        },
        || format!("{class_name}::{method_name} (hash {hash})"),
    )
}

/// Resolves a global utility function by `(name, hash)`.
pub fn resolve_utility_function(
    cell: &BindCell<PtrUtilityFunction>,
    function_name: &str,
    hash: i64,
) -> PtrUtilityFunction {
    cell.get_or_resolve(
        || {
            let name = sys::ScratchStringName::new(function_name);
            let get_utility = interface_fn!(variant_get_ptr_utility_function);

            // SAFETY: name lives until the end of the call.
            unsafe { get_utility(name.as_const_ptr(), hash) }
        },
        || format!("utility function {function_name} (hash {hash})"),
    )
}

/// Resolves a method of a builtin type by `(type, method, hash)`.
pub fn resolve_builtin_method(
    cell: &BindCell<PtrBuiltinMethod>,
    variant_type: VariantType,
    method_name: &str,
    hash: i64,
) -> PtrBuiltinMethod {
    cell.get_or_resolve(
        || {
            let name = sys::ScratchStringName::new(method_name);
            let get_builtin = interface_fn!(variant_get_ptr_builtin_method);

            // SAFETY: name lives until the end of the call.
            unsafe { get_builtin(variant_type.sys(), name.as_const_ptr(), hash) }
        },
        || format!("{variant_type:?}::{method_name} (hash {hash})"),
    )
}

/// Resolves constructor number `index` of a builtin type.
pub fn resolve_builtin_constructor(
    cell: &BindCell<PtrConstructor>,
    variant_type: VariantType,
    index: i32,
) -> PtrConstructor {
    cell.get_or_resolve(
        || {
            let get_constructor = interface_fn!(variant_get_ptr_constructor);

            // SAFETY: plain lookup by value.
            unsafe { get_constructor(variant_type.sys(), index) }
        },
        || format!("constructor #{index} of {variant_type:?}"),
    )
}

/// Resolves the destructor of a builtin type.
pub fn resolve_builtin_destructor(
    cell: &BindCell<PtrDestructor>,
    variant_type: VariantType,
) -> PtrDestructor {
    cell.get_or_resolve(
        || {
            let get_destructor = interface_fn!(variant_get_ptr_destructor);

            // SAFETY: plain lookup by value.
            unsafe { get_destructor(variant_type.sys()) }
        },
        || format!("destructor of {variant_type:?}"),
    )
}

/// Resolves the evaluator of `left <op> right`. Unary operators use `VariantType::Nil` as `right`.
pub fn resolve_builtin_operator(
    cell: &BindCell<PtrOperatorEvaluator>,
    op: VariantOperator,
    left: VariantType,
    right: VariantType,
) -> PtrOperatorEvaluator {
    cell.get_or_resolve(
        || {
            let get_evaluator = interface_fn!(variant_get_ptr_operator_evaluator);

            // SAFETY: plain lookup by value.
            unsafe { get_evaluator(op.sys(), left.sys(), right.sys()) }
        },
        || format!("operator {op:?} for ({left:?}, {right:?})"),
    )
}

/// Resolves the type-to-variant converter for `variant_type`.
pub fn resolve_variant_from_type(
    cell: &BindCell<VariantFromTypeFn>,
    variant_type: VariantType,
) -> VariantFromTypeFn {
    cell.get_or_resolve(
        || {
            let get_converter = interface_fn!(get_variant_from_type_constructor);

            // SAFETY: plain lookup by value.
            unsafe { get_converter(variant_type.sys()) }
        },
        || format!("variant-from-type converter for {variant_type:?}"),
    )
}

/// Resolves the variant-to-type converter for `variant_type`.
pub fn resolve_type_from_variant(
    cell: &BindCell<TypeFromVariantFn>,
    variant_type: VariantType,
) -> TypeFromVariantFn {
    cell.get_or_resolve(
        || {
            let get_converter = interface_fn!(get_variant_to_type_constructor);

            // SAFETY: plain lookup by value.
            unsafe { get_converter(variant_type.sys()) }
        },
        || format!("type-from-variant converter for {variant_type:?}"),
    )
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Per-type converter tables

const VARIANT_TYPE_COUNT: usize = VariantType::ALL.len();

static FROM_TYPE: [BindCell<VariantFromTypeFn>; VARIANT_TYPE_COUNT] =
    [const { BindCell::new() }; VARIANT_TYPE_COUNT];
static TO_TYPE: [BindCell<TypeFromVariantFn>; VARIANT_TYPE_COUNT] =
    [const { BindCell::new() }; VARIANT_TYPE_COUNT];

/// Cached type-to-variant converter of `variant_type`.
pub fn variant_from_type_fn(variant_type: VariantType) -> VariantFromTypeFn {
    resolve_variant_from_type(&FROM_TYPE[variant_type as usize], variant_type)
}

/// Cached variant-to-type converter of `variant_type`.
pub fn type_from_variant_fn(variant_type: VariantType) -> TypeFromVariantFn {
    resolve_type_from_variant(&TO_TYPE[variant_type as usize], variant_type)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    unsafe extern "C" fn fake_destructor(_p_base: sys::GDExtensionTypePtr) {}

    #[test]
    fn cell_resolves_once() {
        static CELL: BindCell<PtrDestructor> = BindCell::new();
        static LOOKUPS: AtomicUsize = AtomicUsize::new(0);

        assert!(CELL.get().is_none());

        for _ in 0..3 {
            let f = CELL.get_or_resolve(
                || {
                    LOOKUPS.fetch_add(1, Ordering::SeqCst);
                    Some(fake_destructor as PtrDestructor)
                },
                || "fake".to_string(),
            );
            assert_eq!(f as usize, fake_destructor as PtrDestructor as usize);
        }

        assert_eq!(LOOKUPS.load(Ordering::SeqCst), 1);
        assert!(CELL.get().is_some());
    }

    #[test]
    #[should_panic(expected = "missing native symbol Foo::bar")]
    fn cell_miss_is_fatal() {
        let cell = BindCell::<MethodBind>::new();
        cell.get_or_resolve(|| None, || "Foo::bar (hash 1)".to_string());
    }

    #[test]
    fn method_bind_round_trip() {
        let value = 42u8;
        let bind = MethodBind(&value as *const u8 as sys::GDExtensionMethodBindPtr);

        let cell = BindCell::<MethodBind>::new();
        let resolved = cell.get_or_resolve(|| Some(bind), String::new);
        assert_eq!(resolved.0, bind.0);
        assert_eq!(cell.get().map(|b| b.0), Some(bind.0));
    }
}
