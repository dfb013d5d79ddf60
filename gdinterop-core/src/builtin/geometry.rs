/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Geometric value types, colors and resource IDs.
//!
//! Types up to 16 bytes live inline in variants; `Aabb`, `Basis`, `Transform2D`, `Transform3D` and `Projection` are stored
//! out of line by the engine, and converted through its per-type converters.

use std::fmt;

use crate::builtin::real_inner::{RMat3, RMat4, RQuat};
use crate::builtin::{Vector2, Vector2i, Vector3, Vector4, real};
use crate::meta::{impl_marshal_boxed, impl_marshal_inline};
use crate::sys;

/// 2D axis-aligned bounding box using floating point coordinates.
#[derive(Default, Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Rect2 {
    pub position: Vector2,
    pub size: Vector2,
}

impl Rect2 {
    pub const fn new(position: Vector2, size: Vector2) -> Self {
        Self { position, size }
    }

    pub fn end(&self) -> Vector2 {
        self.position + self.size
    }

    pub fn area(&self) -> real {
        self.size.x * self.size.y
    }
}

/// 2D axis-aligned bounding box using integer coordinates.
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Rect2i {
    pub position: Vector2i,
    pub size: Vector2i,
}

impl Rect2i {
    pub const fn new(position: Vector2i, size: Vector2i) -> Self {
        Self { position, size }
    }

    pub fn end(&self) -> Vector2i {
        self.position + self.size
    }
}

/// Plane in Hessian normal form: all points `p` with `normal.dot(p) == d`.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Plane {
    pub normal: Vector3,
    pub d: real,
}

impl Plane {
    pub const fn new(normal: Vector3, d: real) -> Self {
        Self { normal, d }
    }

    pub fn distance_to(&self, point: Vector3) -> real {
        self.normal.dot(point) - self.d
    }
}

/// Unit quaternion representing a 3D rotation.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Quaternion {
    pub x: real,
    pub y: real,
    pub z: real,
    pub w: real,
}

impl Quaternion {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: real, y: real, z: real, w: real) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_glam(q: RQuat) -> Self {
        Self::new(q.x, q.y, q.z, q.w)
    }

    pub fn to_glam(self) -> RQuat {
        RQuat::from_xyzw(self.x, self.y, self.z, self.w)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Quaternion {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::from_glam(self.to_glam() * rhs.to_glam())
    }
}

/// RGBA color. Components are always `f32`, independent of the `double-precision` feature.
#[derive(Copy, Clone, PartialEq, PartialOrd, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT_BLACK: Self = Self::from_rgba(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::from_rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::from_rgb(1.0, 1.0, 1.0);

    pub const fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Opaque color.
    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::from_rgba(r, g, b, 1.0)
    }

    /// Constructs from 8-bit channels, as in `Color8()`.
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_rgba(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
            f32::from(a) / 255.0,
        )
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Opaque handle to a server-side resource. `0` is the invalid RID.
#[derive(Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[repr(transparent)]
pub struct Rid(u64);

impl Rid {
    pub const INVALID: Self = Self(0);

    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// _Godot equivalent: `Rid.get_id()`_
    #[doc(alias = "get_id")]
    pub const fn to_u64(self) -> u64 {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Out-of-line types

/// 3D axis-aligned bounding box.
#[derive(Default, Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Aabb {
    pub position: Vector3,
    pub size: Vector3,
}

impl Aabb {
    pub const fn new(position: Vector3, size: Vector3) -> Self {
        Self { position, size }
    }

    pub fn end(&self) -> Vector3 {
        self.position + self.size
    }

    pub fn volume(&self) -> real {
        self.size.x * self.size.y * self.size.z
    }
}

/// 3x3 matrix, stored as three rows.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Basis {
    pub rows: [Vector3; 3],
}

impl Basis {
    pub const IDENTITY: Self = Self::from_rows(
        Vector3::new(1.0, 0.0, 0.0),
        Vector3::new(0.0, 1.0, 0.0),
        Vector3::new(0.0, 0.0, 1.0),
    );

    pub const fn from_rows(x: Vector3, y: Vector3, z: Vector3) -> Self {
        Self { rows: [x, y, z] }
    }

    /// Rotation matrix of a unit quaternion.
    pub fn from_quaternion(quat: Quaternion) -> Self {
        Self::from_glam(RMat3::from_quat(quat.to_glam()))
    }

    // glam matrices are column-major; the engine stores rows.
    pub fn from_glam(mat: RMat3) -> Self {
        let t = mat.transpose();
        Self::from_rows(
            Vector3::from_glam(t.x_axis),
            Vector3::from_glam(t.y_axis),
            Vector3::from_glam(t.z_axis),
        )
    }

    pub fn to_glam(self) -> RMat3 {
        RMat3::from_cols(
            self.rows[0].to_glam(),
            self.rows[1].to_glam(),
            self.rows[2].to_glam(),
        )
        .transpose()
    }
}

impl Default for Basis {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl std::ops::Mul for Basis {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self::from_glam(self.to_glam() * rhs.to_glam())
    }
}

/// 2D affine transform: two basis columns `a`, `b` and the `origin`.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Transform2D {
    pub a: Vector2,
    pub b: Vector2,
    pub origin: Vector2,
}

impl Transform2D {
    pub const IDENTITY: Self = Self::from_cols(
        Vector2::new(1.0, 0.0),
        Vector2::new(0.0, 1.0),
        Vector2::new(0.0, 0.0),
    );

    pub const fn from_cols(a: Vector2, b: Vector2, origin: Vector2) -> Self {
        Self { a, b, origin }
    }

    pub fn xform(&self, v: Vector2) -> Vector2 {
        self.a * v.x + self.b * v.y + self.origin
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// 3D affine transform: a [`Basis`] and an `origin`.
#[derive(Copy, Clone, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Transform3D {
    pub basis: Basis,
    pub origin: Vector3,
}

impl Transform3D {
    pub const IDENTITY: Self = Self::new(Basis::IDENTITY, Vector3::ZERO);

    pub const fn new(basis: Basis, origin: Vector3) -> Self {
        Self { basis, origin }
    }

    pub fn xform(&self, v: Vector3) -> Vector3 {
        Vector3::from_glam(self.basis.to_glam() * v.to_glam()) + self.origin
    }
}

/// 4x4 matrix used for 3D projective transformations, stored as four columns.
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Projection {
    pub cols: [Vector4; 4],
}

impl Projection {
    pub const IDENTITY: Self = Self::from_cols(
        Vector4::new(1.0, 0.0, 0.0, 0.0),
        Vector4::new(0.0, 1.0, 0.0, 0.0),
        Vector4::new(0.0, 0.0, 1.0, 0.0),
        Vector4::new(0.0, 0.0, 0.0, 1.0),
    );

    pub const fn from_cols(x: Vector4, y: Vector4, z: Vector4, w: Vector4) -> Self {
        Self { cols: [x, y, z, w] }
    }

    pub fn from_glam(mat: RMat4) -> Self {
        Self::from_cols(
            Vector4::from_glam(mat.x_axis),
            Vector4::from_glam(mat.y_axis),
            Vector4::from_glam(mat.z_axis),
            Vector4::from_glam(mat.w_axis),
        )
    }

    pub fn to_glam(self) -> RMat4 {
        RMat4::from_cols(
            self.cols[0].to_glam(),
            self.cols[1].to_glam(),
            self.cols[2].to_glam(),
            self.cols[3].to_glam(),
        )
    }

    pub fn determinant(&self) -> real {
        self.to_glam().determinant()
    }
}

impl Default for Projection {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Layout and marshalling

sys::static_assert_eq_size!(Rect2, [real; 4]);
sys::static_assert_eq_size!(Rect2i, [i32; 4]);
sys::static_assert_eq_size!(Plane, [real; 4]);
sys::static_assert_eq_size!(Quaternion, [real; 4]);
sys::static_assert_eq_size!(Color, [f32; 4]);
sys::static_assert_eq_size!(Rid, u64);
sys::static_assert_eq_size!(Aabb, [real; 6]);
sys::static_assert_eq_size!(Basis, [real; 9]);
sys::static_assert_eq_size!(Transform2D, [real; 6]);
sys::static_assert_eq_size!(Transform3D, [real; 12]);
sys::static_assert_eq_size!(Projection, [real; 16]);

impl_marshal_inline!(Rect2, Rect2);
impl_marshal_inline!(Rect2i, Rect2i);
impl_marshal_inline!(Plane, Plane);
impl_marshal_inline!(Quaternion, Quaternion);
impl_marshal_inline!(Color, Color);
impl_marshal_inline!(Rid, Rid);

impl_marshal_boxed!(Aabb, Aabb);
impl_marshal_boxed!(Basis, Basis);
impl_marshal_boxed!(Transform2D, Transform2D);
impl_marshal_boxed!(Transform3D, Transform3D);
impl_marshal_boxed!(Projection, Projection);

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Marshal;

    #[test]
    fn basis_glam_is_row_major() {
        let basis = Basis::from_rows(
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(4.0, 5.0, 6.0),
            Vector3::new(7.0, 8.0, 9.0),
        );

        let mat = basis.to_glam();
        assert_eq!(mat.row(0).x, 1.0);
        assert_eq!(mat.row(0).z, 3.0);
        assert_eq!(mat.col(0).y, 4.0);
        assert_eq!(Basis::from_glam(mat), basis);
    }

    #[test]
    fn transform_xform() {
        let t = Transform3D::new(Basis::IDENTITY, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(t.xform(Vector3::ONE), Vector3::new(2.0, 3.0, 4.0));

        let t2 = Transform2D::from_cols(Vector2::new(0.0, 1.0), Vector2::new(-1.0, 0.0), Vector2::ZERO);
        assert_eq!(t2.xform(Vector2::new(1.0, 0.0)), Vector2::new(0.0, 1.0));
        assert_eq!(Projection::IDENTITY.determinant(), 1.0);
    }

    #[test]
    fn inline_geometry_without_engine() {
        let color = Color::from_rgba8(255, 0, 51, 255);
        assert_eq!(Color::from_variant(&color.to_variant()), color);

        let rect = Rect2i::new(Vector2i::new(-1, 2), Vector2i::new(10, 20));
        assert_eq!(rect.to_variant().get_type(), sys::VariantType::Rect2i);
        assert_eq!(Rect2i::from_variant(&rect.to_variant()).end(), Vector2i::new(9, 22));

        let rid = Rid::new(u64::MAX);
        assert_eq!(Rid::from_variant(&rid.to_variant()).to_u64(), u64::MAX);
        assert!(!Rid::INVALID.is_valid());
    }

    #[test]
    fn boxed_slots_are_bitwise() {
        let aabb = Aabb::new(Vector3::new(1.0, 2.0, 3.0), Vector3::splat(4.0));
        let mut slot = std::mem::MaybeUninit::<Aabb>::uninit();

        let back = unsafe {
            aabb.write_to_ptr(slot.as_mut_ptr() as sys::GDExtensionUninitializedTypePtr);
            Aabb::read_from_ptr(slot.as_ptr() as sys::GDExtensionConstTypePtr)
        };
        assert_eq!(back, aabb);
        assert_eq!(back.volume(), 64.0);
    }
}
