/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub use super::builtin::__prelude_reexport::*;
pub use super::global::{godot_error, godot_print, godot_script_error, godot_warn};
pub use super::init::{ExtensionConfig, ExtensionLibrary, InitLevel, gdextension};
pub use super::meta::error::{CallError, ConvertError};
pub use super::meta::{ConversionRegistrar, Marshal, NullableMarshal};
pub use super::obj::classes::{Node, Object, RefCounted};
pub use super::obj::{Gd, GodotClass, Inherits, InstanceId};
// Re-export macros.
pub use super::register::EngineEnum;

// Make trait methods available.
mod trait_reexports {
    pub use crate::meta::EngineEnum as _;
}

pub use trait_reexports::*;
