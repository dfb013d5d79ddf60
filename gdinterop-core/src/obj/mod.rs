/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Handles to engine objects.
//!
//! Objects cross the boundary as raw pointers; [`Gd`] adds reference counting and disposal tracking on the Rust side.

mod gd;
mod instance_id;
mod traits;

pub mod classes;

pub use gd::Gd;
pub use instance_id::InstanceId;
pub use traits::{ClassTag, GodotClass, Inherits, NoBase};
