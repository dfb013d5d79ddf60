/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::any::Any;
use std::borrow::Cow;
use std::ffi::c_void;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::{fmt, ptr};

use crate::builtin::macros::impl_tracked_builtin;
use crate::builtin::{Variant, VariantType};
use crate::lifetime::Tracked;
use crate::meta::Marshal;
use crate::meta::error::{CallContext, CallError, ConvertError};
use crate::private::{handle_panic, handle_varcall_panic};
use crate::sys;
use crate::sys::{NativeCallable, NativeString, NativeValue};

/// Type-erased entry point of a [`Delegate`].
///
/// Receives the delegate's target (the shared closure), the arguments and a slot for the return value.
///
/// # Safety
/// `target` must be the target the trampoline was created for.
pub type Trampoline =
    unsafe fn(target: *const (), args: &[&Variant], out: &mut Variant) -> Result<(), CallFailure>;

/// Why a trampoline rejected its arguments.
#[derive(Debug)]
pub enum CallFailure {
    TooFewArguments { expected: usize },
    TooManyArguments { expected: usize },

    /// Argument at `index` (0-based) could not be converted to the parameter type.
    InvalidArgument {
        index: usize,
        expected: VariantType,
        param_type: &'static str,
        error: ConvertError,
    },
}

impl CallFailure {
    /// Checks the number of arguments against the declared parameter count.
    pub fn check_arg_count(actual: usize, expected: usize) -> Result<(), Self> {
        match actual.cmp(&expected) {
            std::cmp::Ordering::Less => Err(Self::TooFewArguments { expected }),
            std::cmp::Ordering::Greater => Err(Self::TooManyArguments { expected }),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }

    /// Converts the argument at `index` to the parameter type `P`.
    pub fn convert_arg<P: Marshal>(args: &[&Variant], index: usize) -> Result<P, Self> {
        P::try_from_variant(args[index]).map_err(|error| Self::InvalidArgument {
            index,
            expected: P::variant_type(),
            param_type: std::any::type_name::<P>(),
            error,
        })
    }

    fn into_call_error(self, call_ctx: &CallContext, arg_count: usize) -> CallError {
        match self {
            Self::TooFewArguments { expected } | Self::TooManyArguments { expected } => {
                CallError::failed_param_count(call_ctx, arg_count, expected)
            }
            Self::InvalidArgument {
                index,
                param_type,
                error,
                ..
            } => CallError::failed_param_conversion_named(call_ctx, index, param_type, error),
        }
    }

    fn write_sys(&self, out_err: &mut sys::GDExtensionCallError) {
        let (error, argument, expected) = match *self {
            Self::TooFewArguments { expected } => {
                (sys::GDEXTENSION_CALL_ERROR_TOO_FEW_ARGUMENTS, 0, expected as i32)
            }
            Self::TooManyArguments { expected } => {
                (sys::GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS, 0, expected as i32)
            }
            Self::InvalidArgument {
                index, expected, ..
            } => (
                sys::GDEXTENSION_CALL_ERROR_INVALID_ARGUMENT,
                index as i32,
                expected.sys(),
            ),
        };

        out_err.error = error;
        out_err.argument = argument;
        out_err.expected = expected;
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Delegate

/// Rust function that the engine can invoke through a uniform calling convention.
///
/// Pairs a shared target (usually a closure) with a [`Trampoline`] that knows the target's real parameter types. Cloning shares the
/// target; two delegates are equal if they share the target and the trampoline.
#[derive(Clone)]
pub struct Delegate {
    target: Arc<dyn Any + Send + Sync>,
    trampoline: Trampoline,
    arg_count: usize,
    name: Cow<'static, str>,
}

impl Delegate {
    /// Wraps a closure, see [`IntoDelegate`] for the supported signatures.
    ///
    /// Each call creates a new identity: two delegates made from the same closure compare unequal. Clone the delegate to share it.
    pub fn from_fn<F, P>(name: impl Into<Cow<'static, str>>, function: F) -> Self
    where
        F: IntoDelegate<P>,
    {
        function.into_delegate(name.into())
    }

    /// Assembles a delegate from its parts.
    ///
    /// # Safety
    /// `trampoline` must accept a pointer to the data of `target` (`Arc::as_ptr`, cast to `*const ()`), and must not rely on
    /// `arg_count` being checked by anyone else.
    pub unsafe fn from_raw_parts(
        name: impl Into<Cow<'static, str>>,
        target: Arc<dyn Any + Send + Sync>,
        trampoline: Trampoline,
        arg_count: usize,
    ) -> Self {
        Self {
            target,
            trampoline,
            arg_count,
            name: name.into(),
        }
    }

    /// Calls the function with `args`, converting each argument and the return value.
    ///
    /// Argument mismatches and panics are returned as [`CallError`].
    pub fn invoke(&self, args: &[Variant]) -> Result<Variant, CallError> {
        let arg_refs: Vec<&Variant> = args.iter().collect();
        let call_ctx = self.call_context();

        let outcome = handle_panic(
            || &call_ctx,
            AssertUnwindSafe(|| self.invoke_refs(&arg_refs)),
        );

        match outcome {
            Ok(Ok(ret)) => Ok(ret),
            Ok(Err(failure)) => Err(failure.into_call_error(&call_ctx, args.len())),
            Err(panic_msg) => Err(CallError::failed_by_user_panic(&call_ctx, panic_msg)),
        }
    }

    /// Number of parameters of the wrapped function.
    pub fn arg_count(&self) -> usize {
        self.arg_count
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn invoke_refs(&self, args: &[&Variant]) -> Result<Variant, CallFailure> {
        let mut ret = Variant::nil();

        // SAFETY: `target_ptr()` and `trampoline` were paired at construction.
        unsafe { (self.trampoline)(self.target_ptr(), args, &mut ret)? };
        Ok(ret)
    }

    fn target_ptr(&self) -> *const () {
        Arc::as_ptr(&self.target) as *const ()
    }

    fn identity(&self) -> (usize, usize) {
        (self.target_ptr() as usize, self.trampoline as usize)
    }

    fn call_context(&self) -> CallContext {
        CallContext::function(self.name.clone())
    }
}

impl PartialEq for Delegate {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for Delegate {}

impl std::hash::Hash for Delegate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

impl fmt::Debug for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delegate")
            .field("name", &self.name)
            .field("arg_count", &self.arg_count)
            .finish()
    }
}

impl fmt::Display for Delegate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Functions that can be wrapped in a [`Delegate`].
///
/// Implemented for `Fn(A1, ..., An) -> R` with up to 6 parameters, where all parameters and the return type implement [`Marshal`].
/// `P` only disambiguates the arities.
pub trait IntoDelegate<P>: Sized + Send + Sync + 'static {
    fn into_delegate(self, name: Cow<'static, str>) -> Delegate;
}

macro_rules! impl_into_delegate {
    ($count:literal; $( $A:ident $arg:ident $idx:literal ),*) => {
        impl<F, R, $($A),*> IntoDelegate<fn($($A),*) -> R> for F
        where
            F: Fn($($A),*) -> R + Send + Sync + 'static,
            R: Marshal,
            $( $A: Marshal, )*
        {
            fn into_delegate(self, name: Cow<'static, str>) -> Delegate {
                // SAFETY: `trampoline::<F, ..>` reads the target as `F`, the type stored in the Arc.
                unsafe {
                    Delegate::from_raw_parts(name, Arc::new(self), trampoline::<F, R, $($A),*>, PARAM_COUNT)
                }
            }
        }

        const PARAM_COUNT: usize = $count;

        /// # Safety
        /// `target` must point to a live `F`.
        #[allow(unused_variables)]
        unsafe fn trampoline<F, R, $($A),*>(
            target: *const (),
            args: &[&Variant],
            out: &mut Variant,
        ) -> Result<(), CallFailure>
        where
            F: Fn($($A),*) -> R,
            R: Marshal,
            $( $A: Marshal, )*
        {
            CallFailure::check_arg_count(args.len(), PARAM_COUNT)?;

            $( let $arg = CallFailure::convert_arg::<$A>(args, $idx)?; )*

            // SAFETY: forwarded to caller.
            let function = unsafe { &*(target as *const F) };
            *out = function($($arg),*).to_variant();
            Ok(())
        }
    };
}

mod arity0 {
    use super::*;
    impl_into_delegate!(0;);
}
mod arity1 {
    use super::*;
    impl_into_delegate!(1; A1 a1 0);
}
mod arity2 {
    use super::*;
    impl_into_delegate!(2; A1 a1 0, A2 a2 1);
}
mod arity3 {
    use super::*;
    impl_into_delegate!(3; A1 a1 0, A2 a2 1, A3 a3 2);
}
mod arity4 {
    use super::*;
    impl_into_delegate!(4; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3);
}
mod arity5 {
    use super::*;
    impl_into_delegate!(5; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4);
}
mod arity6 {
    use super::*;
    impl_into_delegate!(6; A1 a1 0, A2 a2 1, A3 a3 2, A4 a4 3, A5 a5 4, A6 a6 5);
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Callable

/// Engine `Callable`: a bound method, or a custom callable such as a Rust [`Delegate`].
pub struct Callable {
    inner: Tracked<NativeCallable>,
}

impl Callable {
    /// Callable wrapping a Rust closure. See [`IntoDelegate`] for supported signatures.
    ///
    /// Equality follows the [`Delegate`] identity, not the closure: calling `from_fn` twice with the same closure yields two
    /// unequal callables. Clone the result to get an equal one.
    pub fn from_fn<F, P>(name: impl Into<Cow<'static, str>>, function: F) -> Self
    where
        F: IntoDelegate<P>,
    {
        Self::from_delegate(Delegate::from_fn(name, function))
    }

    /// Callable that invokes `delegate` when called by the engine.
    pub fn from_delegate(delegate: Delegate) -> Self {
        let mut info = sys::GDExtensionCallableCustomInfo2 {
            callable_userdata: Box::into_raw(Box::new(delegate)) as *mut c_void,
            token: delegate_token(),
            object_id: 0,
            call_func: Some(delegate_call),
            is_valid_func: Some(delegate_is_valid),
            free_func: Some(delegate_free),
            hash_func: Some(delegate_hash),
            equal_func: Some(delegate_equal),
            less_than_func: Some(delegate_less_than),
            to_string_func: Some(delegate_to_string),
            get_argument_count_func: Some(delegate_argument_count),
        };

        // SAFETY: all callbacks expect a `Box<Delegate>` as userdata, which `delegate_free` releases.
        Self::from_native(unsafe { NativeCallable::from_custom(&mut info) })
    }

    /// Null callable; calling it fails.
    pub fn invalid() -> Self {
        Self::from_native(NativeCallable::new_default())
    }

    /// Calls the callable with `args` through the engine.
    pub fn callv(&self, args: &[Variant]) -> Result<Variant, CallError> {
        self.to_variant().try_call("call", args)
    }

    /// Declared argument count, `0` if unknown.
    pub fn arg_count(&self) -> usize {
        usize::try_from(self.inner.with(|c| c.argument_count())).unwrap_or(0)
    }

    pub fn is_valid(&self) -> bool {
        self.inner.with(|c| c.is_valid())
    }

    pub fn hash(&self) -> u32 {
        self.inner.with(|c| c.hash())
    }

    /// The delegate behind this callable, if it was created by [`from_delegate()`](Self::from_delegate) in this library.
    pub fn as_delegate(&self) -> Option<Delegate> {
        let userdata = self.inner.with(|c| c.custom_userdata(delegate_token()));

        // SAFETY: the token identifies callables whose userdata is a `Box<Delegate>`, alive as long as the callable.
        (!userdata.is_null()).then(|| unsafe { (*(userdata as *const Delegate)).clone() })
    }

    fn from_tracked(inner: Tracked<NativeCallable>) -> Self {
        Self { inner }
    }
}

impl_tracked_builtin!(Callable, NativeCallable);

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        // Copies first, so that no two slot locks are ever held together (`c == c` shares one).
        let mut lhs = self.inner.clone_native();
        let mut rhs = other.inner.clone_native();
        let equal = lhs.equals(&rhs);

        // SAFETY: both copies are owned here and not used afterwards.
        unsafe {
            lhs.destroy();
            rhs.destroy();
        }
        equal
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Callable({})", self.to_variant())
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Engine callbacks

static DELEGATE_TOKEN: u8 = 0;

/// Identifies custom callables created by this library.
fn delegate_token() -> *mut c_void {
    ptr::addr_of!(DELEGATE_TOKEN) as *mut c_void
}

/// # Safety
/// `userdata` must be the pointer passed in `GDExtensionCallableCustomInfo2`.
unsafe fn delegate_from_userdata<'a>(userdata: *mut c_void) -> &'a Delegate {
    // SAFETY: forwarded to caller.
    unsafe { &*(userdata as *const Delegate) }
}

unsafe extern "C" fn delegate_call(
    callable_userdata: *mut c_void,
    p_args: *const sys::GDExtensionConstVariantPtr,
    p_argument_count: sys::GDExtensionInt,
    r_return: sys::GDExtensionVariantPtr,
    r_error: *mut sys::GDExtensionCallError,
) {
    // SAFETY: engine passes the userdata and arguments of this call; `r_error` is a valid out-parameter.
    let (delegate, args, out_err) = unsafe {
        (
            delegate_from_userdata(callable_userdata),
            Variant::borrow_ref_slice(p_args, p_argument_count as usize),
            &mut *r_error,
        )
    };

    let call_ctx = delegate.call_context();
    let result = handle_varcall_panic(
        &call_ctx,
        out_err,
        AssertUnwindSafe(|| Ok(delegate.invoke_refs(args))),
    );

    match result {
        Some(Ok(ret)) => {
            // SAFETY: `r_return` is an initialized variant owned by the engine.
            unsafe {
                crate::builtin::collections::replace_variant_slot(r_return as *mut sys::NativeVariant, ret)
            };
        }
        Some(Err(failure)) => failure.write_sys(out_err),

        // Panic; error already encoded.
        None => {}
    }
}

unsafe extern "C" fn delegate_is_valid(_callable_userdata: *mut c_void) -> sys::GDExtensionBool {
    sys::SYS_TRUE
}

unsafe extern "C" fn delegate_free(callable_userdata: *mut c_void) {
    // SAFETY: userdata was created by `Box::into_raw` in `Callable::from_delegate()`; the engine frees exactly once.
    let _drop = unsafe { Box::from_raw(callable_userdata as *mut Delegate) };
}

unsafe extern "C" fn delegate_hash(callable_userdata: *mut c_void) -> u32 {
    // SAFETY: engine passes our userdata.
    let delegate = unsafe { delegate_from_userdata(callable_userdata) };

    // Just cut off top bits, not best-possible hash.
    sys::hash_value(delegate) as u32
}

unsafe extern "C" fn delegate_equal(
    callable_userdata_a: *mut c_void,
    callable_userdata_b: *mut c_void,
) -> sys::GDExtensionBool {
    // SAFETY: engine only compares callables with the same callbacks, so both are ours.
    let (a, b) = unsafe {
        (
            delegate_from_userdata(callable_userdata_a),
            delegate_from_userdata(callable_userdata_b),
        )
    };

    sys::conv::bool_to_sys(a == b)
}

unsafe extern "C" fn delegate_less_than(
    callable_userdata_a: *mut c_void,
    callable_userdata_b: *mut c_void,
) -> sys::GDExtensionBool {
    // SAFETY: see `delegate_equal`.
    let (a, b) = unsafe {
        (
            delegate_from_userdata(callable_userdata_a),
            delegate_from_userdata(callable_userdata_b),
        )
    };

    sys::conv::bool_to_sys(a.identity() < b.identity())
}

unsafe extern "C" fn delegate_to_string(
    callable_userdata: *mut c_void,
    r_is_valid: *mut sys::GDExtensionBool,
    r_out: sys::GDExtensionStringPtr,
) {
    // SAFETY: engine passes our userdata and valid out-parameters. `r_out` holds an empty string, which owns no memory.
    unsafe {
        let delegate = delegate_from_userdata(callable_userdata);
        NativeString::from_str(delegate.name()).move_into_sys(r_out as sys::GDExtensionUninitializedTypePtr);
        *r_is_valid = sys::SYS_TRUE;
    }
}

unsafe extern "C" fn delegate_argument_count(
    callable_userdata: *mut c_void,
    r_is_valid: *mut sys::GDExtensionBool,
) -> sys::GDExtensionInt {
    // SAFETY: engine passes our userdata and a valid out-parameter.
    unsafe {
        *r_is_valid = sys::SYS_TRUE;
        delegate_from_userdata(callable_userdata).arg_count() as sys::GDExtensionInt
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoke_converts_arguments() {
        let sum = Delegate::from_fn("sum", |a: i64, b: i32| a + b as i64);
        assert_eq!(sum.arg_count(), 2);

        let ret = sum.invoke(&[5i64.to_variant(), (-7i64).to_variant()]).expect("call succeeds");
        assert_eq!(ret.to::<i64>(), -2);
    }

    #[test]
    fn invoke_rejects_wrong_arity() {
        let neg = Delegate::from_fn("neg", |a: f64| -a);

        let err = neg.invoke(&[]).expect_err("too few");
        assert_eq!(err.reason(), "function has 1 parameter, but received 0 arguments");

        let err = neg.invoke(&[1.0f64.to_variant(), 2.0f64.to_variant()]).expect_err("too many");
        assert_eq!(err.method_name(), "neg");
    }

    #[test]
    fn invoke_rejects_wrong_type() {
        let not = Delegate::from_fn("not", |b: bool| !b);
        let err = not.invoke(&[3i64.to_variant()]).expect_err("bad type");

        assert!(err.reason().starts_with("parameter #1 (bool)"), "{}", err.reason());
    }

    #[test]
    fn invoke_contains_panic() {
        let boom = Delegate::from_fn("boom", || -> i64 { panic!("kaboom") });
        let err = boom.invoke(&[]).expect_err("panic is an error");

        assert!(err.reason().contains("kaboom"), "{}", err.reason());
    }

    #[test]
    fn equality_by_identity() {
        let a = Delegate::from_fn("f", |x: i64| x);
        let b = Delegate::from_fn("f", |x: i64| x);
        let a2 = a.clone();

        assert_eq!(a, a2);
        assert_eq!(sys::hash_value(&a), sys::hash_value(&a2));
        assert_ne!(a, b);
    }

    #[test]
    fn call_failure_codes() {
        let mut err = sys::default_call_error();
        CallFailure::check_arg_count(1, 3)
            .expect_err("too few")
            .write_sys(&mut err);

        assert_eq!(err.error, sys::GDEXTENSION_CALL_ERROR_TOO_FEW_ARGUMENTS);
        assert_eq!(err.expected, 3);

        let args = [&Variant::nil()];
        let failure = CallFailure::convert_arg::<i64>(&args, 0).expect_err("nil is not int");
        failure.write_sys(&mut err);

        assert_eq!(err.error, sys::GDEXTENSION_CALL_ERROR_INVALID_ARGUMENT);
        assert_eq!(err.argument, 0);
        assert_eq!(err.expected, VariantType::Int.sys());
    }
}
