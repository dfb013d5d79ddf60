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
use crate::sys::NativeNodePath;

/// Engine `NodePath`: pre-parsed path to a node or property, like `"../Player:position"`.
pub struct NodePath {
    inner: Tracked<NativeNodePath>,
}

impl NodePath {
    fn from_tracked(inner: Tracked<NativeNodePath>) -> Self {
        Self { inner }
    }

    pub(crate) fn with_native<R>(&self, f: impl FnOnce(&NativeNodePath) -> R) -> R {
        self.inner.with(f)
    }
}

impl_tracked_builtin!(NodePath, NativeNodePath);

impl From<&str> for NodePath {
    fn from(path: &str) -> Self {
        Self::from_native(NativeNodePath::from_str(path))
    }
}

impl From<&GString> for NodePath {
    fn from(path: &GString) -> Self {
        Self::from_native(NativeNodePath::from_string(path.native()))
    }
}

impl PartialEq for NodePath {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = self.inner.with(|native| native.to_rust_string());
        f.write_str(&s)
    }
}

impl fmt::Debug for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "^\"{self}\"")
    }
}
