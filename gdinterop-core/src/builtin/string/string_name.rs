/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::builtin::GString;
use crate::builtin::macros::impl_tracked_builtin;
use crate::lifetime::Tracked;
use crate::sys::NativeStringName;

/// Engine `StringName`: interned string, used for identifiers such as method and signal names.
///
/// Tracked for disposal; see [`lifetime`](crate::lifetime).
pub struct StringName {
    inner: Tracked<NativeStringName>,
}

impl StringName {
    fn from_tracked(inner: Tracked<NativeStringName>) -> Self {
        Self { inner }
    }

    pub(crate) fn with_native<R>(&self, f: impl FnOnce(&NativeStringName) -> R) -> R {
        self.inner.with(f)
    }
}

impl_tracked_builtin!(StringName, NativeStringName);

impl From<&str> for StringName {
    fn from(s: &str) -> Self {
        Self::from_native(NativeStringName::from_str(s))
    }
}

impl From<&GString> for StringName {
    fn from(s: &GString) -> Self {
        Self::from_native(NativeStringName::from_string(s.native()))
    }
}

impl PartialEq for StringName {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for StringName {}

impl fmt::Display for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.inner.with(|native| native.to_rust_string());
        f.write_str(&s)
    }
}

impl fmt::Debug for StringName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "&\"{self}\"")
    }
}
