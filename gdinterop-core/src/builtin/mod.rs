/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Built-in engine types: [`Variant`], value types, strings, containers, callables and signals.
//!
//! Value types (vectors, rectangles, colors, ...) are plain `#[repr(C)]` structs in the engine's layout. All other builtins own
//! exactly one native value, which is tracked by the [disposal registry](crate::lifetime) until it is released.

pub use crate::sys::{VariantOperator, VariantType};

#[doc(hidden)]
pub mod __prelude_reexport {
    use super::*;

    pub use callable::*;
    pub use collections::*;
    pub use geometry::*;
    pub use half::Half;
    pub use real_inner::real;
    pub use signal::*;
    pub use string::{GString, NodePath, StringName};
    pub use variant::*;
    pub use vectors::*;

    pub use super::{VariantOperator, VariantType};
}

pub use __prelude_reexport::*;

mod macros;

mod callable;
mod collections;
mod geometry;
mod half;
mod signal;
mod string;
mod variant;
mod vectors;

#[path = "real.rs"]
pub(crate) mod real_inner;
