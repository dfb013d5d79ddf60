/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

use crate::builtin::macros::impl_tracked_builtin;
use crate::builtin::StringName;
use crate::lifetime::Tracked;
use crate::meta::Marshal;
use crate::obj::{Gd, GodotClass, InstanceId};
use crate::sys::{NativeSignal, NativeValue};

/// Engine `Signal`: a pointer to an object plus the name of one of its signals.
///
/// Connecting and emitting happen on the engine side; this type only carries signals across the boundary.
pub struct Signal {
    inner: Tracked<NativeSignal>,
}

impl Signal {
    /// Signal `signal_name` on `object`.
    pub fn from_object_signal<T: GodotClass>(object: &Gd<T>, signal_name: &StringName) -> Self {
        let native = signal_name.with_native(|name| {
            // SAFETY: `object` keeps its engine object alive for the duration of the call.
            unsafe { NativeSignal::from_object_signal(object.obj_sys(), name) }
        });

        Self::from_native(native)
    }

    /// Signal without object or name.
    pub fn invalid() -> Self {
        Self::from_native(NativeSignal::new_default())
    }

    pub fn name(&self) -> StringName {
        StringName::from_native(self.inner.with(|s| s.name()))
    }

    /// Owning object, or `None` for an invalid signal.
    pub fn object_id(&self) -> Option<InstanceId> {
        InstanceId::try_from_u64(self.inner.with(|s| s.object_id()))
    }

    fn from_tracked(inner: Tracked<NativeSignal>) -> Self {
        Self { inner }
    }
}

impl_tracked_builtin!(Signal, NativeSignal);

impl PartialEq for Signal {
    fn eq(&self, other: &Self) -> bool {
        self.to_variant() == other.to_variant()
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("object", &self.object_id())
            .field("name", &self.name())
            .finish()
    }
}
