/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Functions and macros that are not very specific to gdinterop, but come in handy.

use crate as sys;

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Macros

/// Trace output.
#[cfg(feature = "trace")]
#[macro_export]
macro_rules! out {
    ()                          => (eprintln!());
    ($fmt:literal)              => (eprintln!($fmt));
    ($fmt:literal, $($arg:tt)*) => (eprintln!($fmt, $($arg)*));
}

/// Trace output.
#[cfg(not(feature = "trace"))]
#[macro_export]
macro_rules! out {
    ()                          => ({});
    ($fmt:literal)              => ({ use std::io::{sink, Write}; let _ = write!(sink(), $fmt); });
    ($fmt:literal, $($arg:tt)*) => ({ use std::io::{sink, Write}; let _ = write!(sink(), $fmt, $($arg)*); };)
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Utility functions

/// Explicitly cast away `const` from a pointer, similar to C++ `const_cast`.
///
/// The `as` conversion simultaneously doing 10 other things, potentially causing unintended transmutations.
pub fn force_mut_ptr<T>(ptr: *const T) -> *mut T {
    ptr as *mut T
}

/// Add `const` to a mut ptr.
pub fn to_const_ptr<T>(ptr: *mut T) -> *const T {
    ptr as *const T
}

/// If `ptr` is not null, returns `Some(mapper(ptr))`; otherwise `None`.
#[inline]
pub fn ptr_then<T, R, F>(ptr: *mut T, mapper: F) -> Option<R>
where
    F: FnOnce(*mut T) -> R,
{
    // Could also use NonNull in signature, but for this project we always deal with FFI raw pointers
    if ptr.is_null() {
        None
    } else {
        Some(mapper(ptr))
    }
}

/// Returns a C `const char*` for a null-terminated byte string.
#[inline]
pub fn c_str(s: &[u8]) -> *const std::ffi::c_char {
    // Ensure null-terminated
    debug_assert!(!s.is_empty() && s[s.len() - 1] == 0);

    s.as_ptr() as *const std::ffi::c_char
}

/// Returns an ad-hoc hash of any object.
pub fn hash_value<T: std::hash::Hash>(t: &T) -> u64 {
    use std::hash::Hasher;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    t.hash(&mut hasher);
    hasher.finish()
}

/// Last path segment of a type name, e.g. `Array<i64>` for `gdinterop_core::builtin::Array<i64>`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();

    // Strip module paths of every segment, including generic arguments.
    let mut out = String::with_capacity(full.len());
    let mut segment = String::new();
    for ch in full.chars() {
        match ch {
            ':' => segment.clear(),
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | ';' | '&' => {
                out.push_str(&segment);
                segment.clear();
                out.push(ch);
            }
            _ => segment.push(ch),
        }
    }
    out.push_str(&segment);
    out
}

/// # Safety
/// `version.string` must be null or point to a valid C string.
pub(crate) unsafe fn read_version_string(version: &sys::GDExtensionGodotVersion) -> String {
    if version.string.is_null() {
        return format!("{}.{}.{}", version.major, version.minor, version.patch);
    }

    // SAFETY: see function contract.
    let char_ptr = unsafe { std::ffi::CStr::from_ptr(version.string) };

    let full = String::from_utf8_lossy(char_ptr.to_bytes()).into_owned();
    match full.strip_prefix("Godot Engine ") {
        Some(stripped) => stripped.to_string(),
        None => full,
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_type_names() {
        assert_eq!(short_type_name::<i64>(), "i64");
        assert_eq!(short_type_name::<std::vec::Vec<u8>>(), "Vec<u8>");
        assert_eq!(
            short_type_name::<std::collections::HashMap<String, Vec<i32>>>(),
            "HashMap<String, Vec<i32>>"
        );
    }

    #[test]
    fn ptr_then_null() {
        let null: *mut i32 = std::ptr::null_mut();
        assert_eq!(ptr_then(null, |_| 1), None);

        let mut value = 5;
        assert_eq!(ptr_then(&mut value as *mut i32, |p| unsafe { *p }), Some(5));
    }

    #[test]
    fn version_string_fallback() {
        let version = sys::GDExtensionGodotVersion {
            major: 4,
            minor: 3,
            patch: 1,
            string: std::ptr::null(),
        };

        assert_eq!(unsafe { read_version_string(&version) }, "4.3.1");

        let version = sys::GDExtensionGodotVersion {
            string: c"Godot Engine v4.3.stable.official".as_ptr(),
            ..version
        };
        assert_eq!(
            unsafe { read_version_string(&version) },
            "v4.3.stable.official"
        );
    }
}
