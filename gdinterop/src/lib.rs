/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! # Variant marshalling for GDExtension
//!
//! Moves values between Rust and the engine: as [`Variant`](builtin::Variant)s, and through raw pointer slots of engine calls.
//!
//! ## Modules
//!
//! - [`builtin`]: value types (vectors, colors, strings, containers, callables) and [`Variant`](builtin::Variant) itself.
//! - [`meta`]: the [`Marshal`](meta::Marshal) trait, the conversion registry for user types, and conversion errors.
//! - [`obj`]: engine object handles.
//! - [`lifetime`]: tracking and bulk disposal of engine-owned values.
//! - [`init`]: extension entry points.
//!
//! ## Lifetimes
//!
//! Handles to engine memory release it when dropped. Handles still alive when the extension shuts down are disposed by
//! [`init::deinitialize()`]; afterwards dropping them is a no-op.
//!
//! ## Cargo features
//!
//! - **`double-precision`**: `real` is `f64`. Must match the engine build.
//! - **`serde`**: `Serialize`/`Deserialize` for plain value builtins.

#[doc(inline)]
pub use gdinterop_core::{builtin, global, lifetime, meta, obj};

#[doc(hidden)]
pub use gdinterop_core::{private, sys};

// Macros are exported at the crate root of gdinterop-core.
pub use gdinterop_core::{godot_error, godot_print, godot_script_error, godot_warn};

/// Entry points and configuration of the extension.
pub mod init {
    pub use gdinterop_core::init::*;
    pub use gdinterop_macros::gdextension;
}

/// Derive macros.
pub mod register {
    pub use gdinterop_macros::EngineEnum;
}

pub mod prelude;
