/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

use crate::builtin::{Variant, VariantType};
use crate::meta::error::{ConvertError, ErasedConvertError};
use crate::sys;

/// Class and function involved in a call, for diagnostics.
#[derive(Clone, Debug)]
pub struct CallContext {
    pub class_name: Cow<'static, str>,
    pub function_name: Cow<'static, str>,
}

impl CallContext {
    /// Context of a builtin or class method.
    pub fn method(class_name: impl Into<Cow<'static, str>>, function_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            class_name: class_name.into(),
            function_name: function_name.into(),
        }
    }

    /// Context of a free function or closure, without a surrounding class.
    pub fn function(function_name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            class_name: Cow::Borrowed(""),
            function_name: function_name.into(),
        }
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class_name.is_empty() {
            write!(f, "{}", self.function_name)
        } else {
            write!(f, "{}::{}", self.class_name, self.function_name)
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------

/// Error capable of representing failed function calls.
///
/// Returned by _varcall_ functions such as [`Callable::callv()`](crate::builtin::Callable::callv) and
/// [`Delegate::invoke()`](crate::builtin::Delegate::invoke). Allows to inspect the involved class and method via `class_name()` and
/// `method_name()`. Implements `std::error::Error`, so it comes with `Display` and `Error::source()` APIs.
///
/// # Possible error causes
/// - **Invalid method**: The method does not exist on the object.
/// - **Failed argument conversion**: The arguments passed cannot be converted to the declared parameter types.
/// - **Too many or too few arguments**: The number of arguments does not match the number of parameters.
/// - **User panic**: A Rust function caused a panic.
pub struct CallError {
    // Boxed since the struct is large, making Result<..., CallError> very large.
    b: Box<InnerCallError>,
}

/// Inner struct. All functionality on outer `impl`.
#[derive(Debug)]
struct InnerCallError {
    class_name: String,
    function_name: String,
    call_expr: String,
    reason: String,
    source: Option<SourceError>,
}

impl CallError {
    // Naming:
    // - check_* means possible failure -- Result<(), Self> is returned.
    // - failed_* means definitive failure -- Self is returned.

    /// Name of the class/builtin whose method failed.
    ///
    /// Returns `None` if this is a free function or closure (without a surrounding class/builtin).
    pub fn class_name(&self) -> Option<&str> {
        if self.b.class_name.is_empty() {
            None
        } else {
            Some(&self.b.class_name)
        }
    }

    /// Name of the function or method that failed.
    pub fn method_name(&self) -> &str {
        &self.b.function_name
    }

    /// Describes the error, without the call expression.
    pub fn reason(&self) -> &str {
        &self.b.reason
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Constructors returning Result<(), Self>; possible failure

    /// Checks whether number of arguments matches the number of parameters.
    pub fn check_arg_count(
        call_ctx: &CallContext,
        arg_count: usize,
        param_count: usize,
    ) -> Result<(), Self> {
        if arg_count == param_count {
            return Ok(());
        }

        Err(Self::failed_param_count(call_ctx, arg_count, param_count))
    }

    /// Checks the engine side of a varcall (low-level `sys::GDExtensionCallError`).
    ///
    /// On failure, the error is also reported to the engine's error channel.
    pub fn check_out_varcall(
        call_ctx: &CallContext,
        err: sys::GDExtensionCallError,
        args: &[&Variant],
    ) -> Result<(), Self> {
        if err.error == sys::GDEXTENSION_CALL_OK {
            return Ok(());
        }

        let arg_types: Vec<VariantType> = args.iter().map(|arg| arg.get_type()).collect();
        let call_expr = format!("{call_ctx}({})", join_args(args));

        // If the call error encodes an error generated by us, decode it.
        let mut source_error = None;
        if err.error == sys::GODOT_RUST_CUSTOM_CALL_ERROR {
            source_error = crate::private::call_error_remove(&err).map(|e| SourceError::Call(Box::new(e)));
        }

        let call_error = Self::failed_varcall_inner(call_ctx, call_expr, err, &arg_types, source_error);
        crate::godot_error!("{call_error}");

        Err(call_error)
    }

    // ------------------------------------------------------------------------------------------------------------------------------------------
    // Constructors returning Self; guaranteed failure

    /// Returns an error for a failed parameter conversion.
    pub fn failed_param_conversion<P>(
        call_ctx: &CallContext,
        param_index: usize,
        convert_error: ConvertError,
    ) -> Self {
        Self::failed_param_conversion_named(
            call_ctx,
            param_index,
            std::any::type_name::<P>(),
            convert_error,
        )
    }

    /// Like [`failed_param_conversion()`](Self::failed_param_conversion), with the parameter type given by name.
    pub(crate) fn failed_param_conversion_named(
        call_ctx: &CallContext,
        param_index: usize,
        param_ty: &str,
        convert_error: ConvertError,
    ) -> Self {
        Self::new(
            call_ctx,
            format!("parameter #{} ({param_ty}) conversion", param_index + 1),
            Some(convert_error),
        )
    }

    fn failed_param_conversion_engine(
        call_ctx: &CallContext,
        param_index: i32,
        actual: VariantType,
        expected: VariantType,
    ) -> Self {
        // Note: reason is same wording as in FromVariantError::description().
        let reason =
            format!("parameter #{param_index} -- cannot convert from {actual:?} to {expected:?}");

        Self::new(call_ctx, reason, None)
    }

    pub(crate) fn failed_param_count(
        call_ctx: &CallContext,
        arg_count: usize,
        param_count: usize,
    ) -> CallError {
        let param_plural = plural(param_count);
        let arg_plural = plural(arg_count);

        Self::new(
            call_ctx,
            format!(
                "function has {param_count} parameter{param_plural}, but received {arg_count} argument{arg_plural}"
            ),
            None,
        )
    }

    fn failed_varcall_inner(
        call_ctx: &CallContext,
        call_expr: String,
        err: sys::GDExtensionCallError,
        arg_types: &[VariantType],
        source: Option<SourceError>,
    ) -> Self {
        debug_assert_ne!(err.error, sys::GDEXTENSION_CALL_OK); // already checked outside

        let sys::GDExtensionCallError {
            error,
            argument,
            expected,
        } = err;

        let mut call_error = match error {
            sys::GDEXTENSION_CALL_ERROR_INVALID_METHOD => {
                Self::new(call_ctx, "method not found", None)
            }
            sys::GDEXTENSION_CALL_ERROR_INVALID_ARGUMENT => {
                let from = usize::try_from(argument)
                    .ok()
                    .and_then(|i| arg_types.get(i).copied())
                    .unwrap_or(VariantType::Nil);
                let to = VariantType::try_from_ord(expected).unwrap_or(VariantType::Nil);
                let i = argument + 1;

                Self::failed_param_conversion_engine(call_ctx, i, from, to)
            }
            sys::GDEXTENSION_CALL_ERROR_TOO_MANY_ARGUMENTS
            | sys::GDEXTENSION_CALL_ERROR_TOO_FEW_ARGUMENTS => {
                let param_count = usize::try_from(expected).unwrap_or(0);
                Self::failed_param_count(call_ctx, arg_types.len(), param_count)
            }
            sys::GDEXTENSION_CALL_ERROR_INSTANCE_IS_NULL => {
                Self::new(call_ctx, "instance is null", None)
            }
            sys::GDEXTENSION_CALL_ERROR_METHOD_NOT_CONST => {
                Self::new(call_ctx, "method is not const", None)
            }
            sys::GODOT_RUST_CUSTOM_CALL_ERROR => {
                // Not emitted by the engine.
                Self::new(call_ctx, String::new(), None)
            }
            _ => Self::new(
                call_ctx,
                format!("unknown reason (error code {error})"),
                None,
            ),
        };

        call_error.b.source = source;
        call_error.b.call_expr = call_expr;
        call_error
    }

    #[doc(hidden)]
    pub fn failed_by_user_panic(call_ctx: &CallContext, reason: String) -> Self {
        Self::new(call_ctx, format!("function panicked: {reason}"), None)
    }

    fn new(
        call_ctx: &CallContext,
        reason: impl Into<String>,
        source: Option<ConvertError>,
    ) -> Self {
        let inner = InnerCallError {
            class_name: call_ctx.class_name.to_string(),
            function_name: call_ctx.function_name.to_string(),
            call_expr: format!("{call_ctx}()"),
            reason: reason.into(),
            source: source.map(|e| SourceError::Convert(Box::new(e.into()))),
        };

        Self { b: Box::new(inner) }
    }

    #[doc(hidden)]
    pub fn message(&self, with_source: bool) -> String {
        let InnerCallError {
            call_expr, reason, ..
        } = &*self.b;

        let reason_str = if reason.is_empty() {
            String::new()
        } else {
            format!("\n    Reason: {reason}")
        };

        // `source` may not always be set (e.g. when converting from an engine-side call error).
        let source_str = match &self.b.source {
            Some(SourceError::Convert(e)) if with_source => format!("\n    Source: {e}"),
            Some(SourceError::Call(e)) if with_source => format!("\n    Source: {}", e.message(true)),
            _ => String::new(),
        };

        format!("failed call to {call_expr}{reason_str}{source_str}")
    }
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message(true))
    }
}

impl fmt::Debug for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CallError({})", self.message(false))
    }
}

impl Error for CallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.b.source.as_ref() {
            Some(SourceError::Convert(e)) => deref_to::<ErasedConvertError>(e),
            Some(SourceError::Call(e)) => deref_to::<CallError>(e),
            None => None,
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Source error

#[derive(Debug)]
enum SourceError {
    Convert(Box<ErasedConvertError>),

    // If the top-level Rust function encountered an error, this is the inner one.
    Call(Box<CallError>),
}

/// Explicit dereferencing to a certain type. Avoids accidentally returning `&Box<T>` or so.
fn deref_to<T>(t: &Box<T>) -> Option<&(dyn Error + 'static)>
where
    T: Error + 'static,
{
    Some(&**t)
}

impl SourceError {
    pub(crate) fn call(inner: CallError) -> Self {
        Self::Call(Box::new(inner))
    }
}

impl CallError {
    /// Wraps `inner` as source of a new error in `call_ctx`.
    pub(crate) fn with_source(call_ctx: &CallContext, inner: CallError) -> Self {
        let mut outer = Self::new(call_ctx, String::new(), None);
        outer.b.source = Some(SourceError::call(inner));
        outer
    }
}

fn join_args(args: &[&Variant]) -> String {
    args.iter()
        .map(|v| format!("{v:?}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arg_count_message() {
        let ctx = CallContext::function("sum");

        assert!(CallError::check_arg_count(&ctx, 2, 2).is_ok());

        let err = CallError::check_arg_count(&ctx, 1, 2).expect_err("count mismatch");
        assert_eq!(err.class_name(), None);
        assert_eq!(err.method_name(), "sum");
        assert_eq!(
            err.reason(),
            "function has 2 parameters, but received 1 argument"
        );
    }

    #[test]
    fn param_conversion_is_one_based() {
        let ctx = CallContext::method("Callable", "call");
        let err = CallError::failed_param_conversion::<i64>(&ctx, 0, ConvertError::new("bad"));

        assert_eq!(err.class_name(), Some("Callable"));
        assert!(err.reason().starts_with("parameter #1 (i64)"), "{}", err.reason());
        assert!(err.source().is_some());
    }

    #[test]
    fn nested_source_message() {
        let ctx_inner = CallContext::function("inner");
        let ctx_outer = CallContext::method("Callable", "callv");

        let inner = CallError::failed_by_user_panic(&ctx_inner, "boom".to_string());
        let outer = CallError::with_source(&ctx_outer, inner);

        let msg = outer.to_string();
        assert!(msg.starts_with("failed call to Callable::callv()"), "{msg}");
        assert!(msg.contains("function panicked: boom"), "{msg}");
    }
}
