/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Conversions between Rust primitives and their sys counterparts.

use std::mem::size_of;

use crate as sys;
use crate::static_assert;

/// Infallibly convert `u32` into a `usize`.
///
/// Only targets where `u32` can be infallibly converted into a `usize` are supported.
pub fn u32_to_usize(i: u32) -> usize {
    static_assert!(
        size_of::<u32>() <= size_of::<usize>(),
        "gdinterop only supports targets where u32 <= usize"
    );

    i as usize
}

/// Converts a rust-bool into a sys-bool.
pub const fn bool_to_sys(value: bool) -> sys::GDExtensionBool {
    value as sys::GDExtensionBool
}

/// Converts a sys-bool to Rust bool. Any non-zero value is `true`.
pub const fn bool_from_sys(value: sys::GDExtensionBool) -> bool {
    value != SYS_FALSE
}

pub const SYS_TRUE: sys::GDExtensionBool = bool_to_sys(true);
pub const SYS_FALSE: sys::GDExtensionBool = bool_to_sys(false);

/// Converts a length to the engine's integer type.
///
/// # Panics
/// If the length exceeds `i64::MAX`, which cannot happen for in-memory collections.
pub fn usize_to_int(len: usize) -> sys::GDExtensionInt {
    sys::GDExtensionInt::try_from(len)
        .unwrap_or_else(|_| panic!("length {len} does not fit into GDExtensionInt"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sys_bool() {
        assert_eq!(bool_to_sys(true), SYS_TRUE);
        assert_eq!(bool_to_sys(false), SYS_FALSE);
        assert!(bool_from_sys(7));
        assert!(!bool_from_sys(SYS_FALSE));
    }

    #[test]
    fn u32_into_usize_test() {
        const CHECKS: &[u32] = &[0, 123, 4444, u32::MAX, u16::MAX as u32, i32::MAX as u32];

        for value in CHECKS {
            assert_eq!(u32_to_usize(*value), *value as usize);
        }
    }
}
