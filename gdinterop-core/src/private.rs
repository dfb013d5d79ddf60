/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Internals used by engine callbacks: panic containment and custom call error bookkeeping.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::meta::error::{CallContext, CallError};
use crate::sys::Global;
use crate::{godot_error, sys};

pub use sys::out;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Call error handling

static CALL_ERRORS: Global<CallErrors> = Global::default();

// Note: if this leads to many allocated IDs that are not removed, we could limit to 1 per thread-ID.
#[derive(Default)]
struct CallErrors {
    map: HashMap<i32, CallError>,
    next_id: i32,
}

impl CallErrors {
    fn insert(&mut self, err: CallError) -> i32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        self.map.insert(id, err);
        id
    }

    fn remove(&mut self, id: i32) -> Option<CallError> {
        self.map.remove(&id)
    }
}

fn call_error_insert(err: CallError, out_error: &mut sys::GDExtensionCallError) {
    // Wraps around if entire i32 is depleted; oldest errors are overwritten then.
    let id = CALL_ERRORS.write().insert(err);

    // Abuse field to store our ID.
    out_error.error = sys::GODOT_RUST_CUSTOM_CALL_ERROR;
    out_error.argument = id;
}

pub(crate) fn call_error_remove(in_error: &sys::GDExtensionCallError) -> Option<CallError> {
    // Error checks are just quality-of-life diagnostic; do not throw panics if they fail.

    if in_error.error != sys::GODOT_RUST_CUSTOM_CALL_ERROR {
        godot_error!("Tried to remove non-gdinterop call error {in_error:?}");
        return None;
    }

    let call_error = CALL_ERRORS.write().remove(in_error.argument);
    if call_error.is_none() {
        godot_error!("Failed to remove call error {in_error:?}");
    }

    call_error
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Panic handling

struct PanicLocation {
    line: u32,
    file: String,
}

pub(crate) fn extract_panic_message(err: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<&'static str>() {
        s.to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        format!("(panic of type ID {:?})", err.type_id())
    }
}

fn format_panic_message(msg: String) -> String {
    // If the message contains newlines, print all of the lines after a line break, and indent them.
    let lbegin = "\n  ";
    let indented = msg.replace('\n', lbegin);

    if indented.len() != msg.len() {
        format!("[panic]{lbegin}{indented}")
    } else {
        format!("[panic]  {msg}")
    }
}

/// Executes `code`. If a panic is thrown, it is caught and an error message is printed to the engine.
///
/// Returns `Err(message)` if a panic occurred, and `Ok(result)` with the result of `code` otherwise.
pub fn handle_panic<E, F, R, S>(error_context: E, code: F) -> Result<R, String>
where
    E: FnOnce() -> S,
    F: FnOnce() -> R + std::panic::UnwindSafe,
    S: std::fmt::Display,
{
    handle_panic_with_print(error_context, code, true)
}

/// Runs a varcall body on behalf of the engine, translating failures into `out_err`.
///
/// Call errors and panics are stored and encoded as [`GODOT_RUST_CUSTOM_CALL_ERROR`](sys::GODOT_RUST_CUSTOM_CALL_ERROR), unless the
/// body already reported an engine-level error code.
pub fn handle_varcall_panic<F, R>(
    call_ctx: &CallContext,
    out_err: &mut sys::GDExtensionCallError,
    code: F,
) -> Option<R>
where
    F: FnOnce() -> Result<R, CallError> + std::panic::UnwindSafe,
{
    let outcome: Result<Result<R, CallError>, String> =
        handle_panic_with_print(|| call_ctx, code, false);

    let call_error = match outcome {
        // All good.
        Ok(Ok(result)) => return Some(result),

        // Call error signalled by argument validation.
        Ok(Err(err)) => err,

        // Panic occurred (typically through user): forward message.
        Err(panic_msg) => CallError::failed_by_user_panic(call_ctx, panic_msg),
    };

    // Engine-level codes (e.g. arity) were already written by the body; keep them.
    if out_err.error == sys::GDEXTENSION_CALL_OK {
        call_error_insert(call_error, out_err);
    }

    None
}

fn handle_panic_with_print<E, F, R, S>(error_context: E, code: F, print: bool) -> Result<R, String>
where
    E: FnOnce() -> S,
    F: FnOnce() -> R + std::panic::UnwindSafe,
    S: std::fmt::Display,
{
    let info: Arc<Mutex<Option<PanicLocation>>> = Arc::new(Mutex::new(None));

    // Back up previous hook, set new one.
    let prev_hook = std::panic::take_hook();
    {
        let info = info.clone();
        std::panic::set_hook(Box::new(move |panic_info| {
            if let Some(location) = panic_info.location() {
                if let Ok(mut guard) = info.lock() {
                    *guard = Some(PanicLocation {
                        file: location.file().to_string(),
                        line: location.line(),
                    });
                }
            } else {
                eprintln!("panic occurred, but can't get location information");
            }
        }));
    }

    // Run code that should panic, restore hook.
    let panic = std::panic::catch_unwind(code);
    std::panic::set_hook(prev_hook);

    match panic {
        Ok(result) => Ok(result),
        Err(err) => {
            if print {
                let location = info
                    .lock()
                    .ok()
                    .and_then(|mut guard| guard.take())
                    .map(|l| format!("{}:{}", l.file, l.line))
                    .unwrap_or_else(|| "<unknown location>".to_string());

                godot_error!(
                    "Rust function panicked at {location}.\n  Context: {}",
                    error_context()
                );
            }

            let msg = extract_panic_message(&*err);
            let msg = format_panic_message(msg);

            if print {
                godot_error!("{msg}");
            }

            Err(msg)
        }
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_is_contained() {
        let result: Result<i32, String> = handle_panic_with_print(|| "test", || panic!("oh no"), false);

        let msg = result.expect_err("panic must be caught");
        assert_eq!(msg, "[panic]  oh no");
    }

    #[test]
    fn multiline_panic_is_indented() {
        assert_eq!(
            format_panic_message("first\nsecond".to_string()),
            "[panic]\n  first\n  second"
        );
    }

    #[test]
    fn varcall_error_round_trip() {
        let ctx = CallContext::function("closure");
        let mut err = sys::default_call_error();

        let result: Option<()> = handle_varcall_panic(&ctx, &mut err, || {
            Err(CallError::failed_param_count(&ctx, 0, 1))
        });

        assert!(result.is_none());
        assert_eq!(err.error, sys::GODOT_RUST_CUSTOM_CALL_ERROR);

        let stored = call_error_remove(&err).expect("stored error");
        assert_eq!(stored.method_name(), "closure");
        assert!(call_error_remove(&err).is_none());
    }
}
