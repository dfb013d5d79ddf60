/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! # Internal crate of [**gdinterop**](https://docs.rs/gdinterop)
//!
//! Do not depend on this crate directly, instead use the `gdinterop` crate.
//! No SemVer or other guarantees are provided.

pub mod builtin;
pub mod global;
pub mod init;
pub mod lifetime;
pub mod meta;
pub mod obj;

#[doc(hidden)]
pub mod private;

pub use gdinterop_ffi as sys;
#[doc(hidden)]
pub use gdinterop_ffi::out;
