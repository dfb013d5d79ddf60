/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Conversions between Rust values, variants and raw pointer slots.
//!
//! Every marshallable type implements [`Marshal`]. Builtin types, primitives, strings, containers and object handles implement it
//! directly (one monomorphized code path per type). Other types keep the trait's default methods, which look up the
//! [conversion registry](conversion_registry) and fail with an "unsupported type" [`ConvertError`] if nothing was registered.
//!
//! Raw pointer slots follow the engine's pointer-call conventions:
//! - all integer kinds are stored as `i64`, all float kinds as `f64`, `bool` as a one-byte `GDExtensionBool`;
//! - value builtins are stored in their native layout;
//! - strings and containers are stored as native values, which the slot then owns;
//! - objects are stored as the raw object pointer.

pub mod conversion_registry;
pub mod error;

mod engine_enum;
mod marshal;

pub use conversion_registry::{ConversionRegistrar, ConversionSlots};
pub use engine_enum::*;
pub use marshal::*;

pub use crate::sys::{VariantOperator, VariantType};
