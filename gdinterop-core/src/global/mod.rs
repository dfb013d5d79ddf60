/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Global functions and logging macros.

mod print;

pub use print::*;

use std::ffi::c_int;

use crate::builtin::Variant;
use crate::sys;

/// Prints `args` to the engine console, concatenated without separator.
///
/// _Godot equivalent: `@GlobalScope.print()`_
pub fn print(args: &[Variant]) {
    static PRINT: sys::BindCell<sys::PtrUtilityFunction> = sys::BindCell::new();
    let print_fn = sys::resolve_utility_function(&PRINT, "print", 2648703342);

    let arg_ptrs: Vec<sys::GDExtensionConstTypePtr> = args
        .iter()
        .map(|arg| arg.var_sys_const() as sys::GDExtensionConstTypePtr)
        .collect();

    // Vararg utility: arguments are variant pointers, the return slot is a nil variant.
    let mut ret = Variant::nil();

    // SAFETY: all arguments live for the call; `print` returns nothing but expects a variant slot.
    unsafe {
        print_fn(
            ret.var_sys_mut() as sys::GDExtensionTypePtr,
            arg_ptrs.as_ptr(),
            arg_ptrs.len() as c_int,
        )
    };
}
