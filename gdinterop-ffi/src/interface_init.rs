/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! The extension entry point is passed a `get_proc_address` function pointer, which is used to load all other
//! GDExtension functions dynamically.

use crate as sys;
use crate::binding::RuntimeVersion;
use crate::toolbox::read_version_string;

/// Reads the engine version and panics if it is older than the manifest this crate was compiled against.
pub(crate) fn ensure_runtime_compatibility(interface: &sys::GDExtensionInterface) -> RuntimeVersion {
    let static_version = sys::InteropBuild::godot_static_version_triple();
    let static_version_str = sys::InteropBuild::godot_static_version_string();

    let Some(get_godot_version) = interface.get_godot_version else {
        panic!(
            "engine does not provide `get_godot_version`; gdinterop requires Godot {static_version_str} or newer"
        );
    };

    let mut raw = sys::GDExtensionGodotVersion {
        major: 0,
        minor: 0,
        patch: 0,
        string: std::ptr::null(),
    };

    // SAFETY: the engine fills the struct; the string stays owned by the engine.
    unsafe { get_godot_version(&mut raw) };

    let runtime_version = RuntimeVersion {
        major: raw.major as u8,
        minor: raw.minor as u8,
        patch: raw.patch as u8,
        // SAFETY: string is null or a valid C string owned by the engine.
        string: unsafe { read_version_string(&raw) },
    };

    // Lexicographical tuple comparison.
    if runtime_version.triple() < static_version {
        panic!(
            "gdinterop was compiled against newer Godot version: {static_version_str}\n\
            but loaded by older Godot binary, with version: {}\n\
            \n\
            Update your Godot engine version, or compile against an older API manifest.\n",
            runtime_version.string
        );
    }

    sys::out!("Runtime engine version: {}", runtime_version.string);
    runtime_version
}
