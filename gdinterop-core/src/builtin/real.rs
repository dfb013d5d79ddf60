/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Floating-point type used by vectors and other geometric builtins.
//!
//! `f32` by default, `f64` with the `double-precision` feature. Must match the engine's `precision` build setting, since
//! it determines the layout of every geometric type.

#[cfg(not(feature = "double-precision"))]
mod real_mod {
    /// Floating point type used for many structs and functions in the engine.
    #[allow(non_camel_case_types)]
    pub type real = f32;

    pub(crate) type RVec2 = glam::Vec2;
    pub(crate) type RVec3 = glam::Vec3;
    pub(crate) type RVec4 = glam::Vec4;
    pub(crate) type RQuat = glam::Quat;
    pub(crate) type RMat3 = glam::Mat3;
    pub(crate) type RMat4 = glam::Mat4;
}

#[cfg(feature = "double-precision")]
mod real_mod {
    /// Floating point type used for many structs and functions in the engine.
    #[allow(non_camel_case_types)]
    pub type real = f64;

    pub(crate) type RVec2 = glam::DVec2;
    pub(crate) type RVec3 = glam::DVec3;
    pub(crate) type RVec4 = glam::DVec4;
    pub(crate) type RQuat = glam::DQuat;
    pub(crate) type RMat3 = glam::DMat3;
    pub(crate) type RMat4 = glam::DMat4;
}

pub use real_mod::real;
pub(crate) use real_mod::{RMat3, RMat4, RQuat, RVec2, RVec3, RVec4};
