/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Vector types. These are plain `#[repr(C)]` structs with the engine's layout, stored inline in variants.
//!
//! Only the algebra needed at the marshalling boundary is provided; conversions to `glam` give access to the rest.

use std::fmt;

use crate::builtin::real_inner::{RVec2, RVec3, RVec4};
use crate::builtin::real;
use crate::meta::impl_marshal_inline;
use crate::sys;

/// Implements a component-wise binary operator between two vectors, and the matching assign operator.
macro_rules! impl_vector_operator {
    ($Vector:ty, ($($components:ident),*), $Operator:ident, $func:ident, $AssignOperator:ident, $assign_func:ident) => {
        impl std::ops::$Operator for $Vector {
            type Output = Self;

            fn $func(mut self, rhs: $Vector) -> Self::Output {
                $(
                    self.$components = self.$components.$func(rhs.$components);
                )*
                self
            }
        }

        impl std::ops::$AssignOperator for $Vector {
            fn $assign_func(&mut self, rhs: $Vector) {
                *self = std::ops::$Operator::$func(*self, rhs);
            }
        }
    };
}

/// Common definitions of every vector type: constructors, operators, `Display` and marshalling.
macro_rules! impl_vector {
    (
        $(#[$attr:meta])*
        $Vector:ident, $Scalar:ty, ($($components:ident),*), $Glam:ty
    ) => {
        $(#[$attr])*
        #[derive(Default, Copy, Clone, PartialEq, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(C)]
        pub struct $Vector {
            $(
                pub $components: $Scalar,
            )*
        }

        impl $Vector {
            /// Vector with all components set to `0`.
            pub const ZERO: Self = Self::splat(0 as $Scalar);

            /// Vector with all components set to `1`.
            pub const ONE: Self = Self::splat(1 as $Scalar);

            pub const fn new($($components: $Scalar),*) -> Self {
                Self { $($components),* }
            }

            /// Vector with all components set to `v`.
            pub const fn splat(v: $Scalar) -> Self {
                Self { $($components: v),* }
            }

            pub fn from_glam(v: $Glam) -> Self {
                Self::new($(v.$components),*)
            }

            pub fn to_glam(self) -> $Glam {
                <$Glam>::new($(self.$components),*)
            }
        }

        impl_vector_operator!($Vector, ($($components),*), Add, add, AddAssign, add_assign);
        impl_vector_operator!($Vector, ($($components),*), Sub, sub, SubAssign, sub_assign);
        impl_vector_operator!($Vector, ($($components),*), Mul, mul, MulAssign, mul_assign);

        impl std::ops::Mul<$Scalar> for $Vector {
            type Output = Self;

            fn mul(self, rhs: $Scalar) -> Self::Output {
                self * Self::splat(rhs)
            }
        }

        impl std::ops::Neg for $Vector {
            type Output = Self;

            fn neg(self) -> Self::Output {
                Self::new($(-self.$components),*)
            }
        }

        /// Formats the vector like the engine: `(x, y, ...)`.
        impl fmt::Display for $Vector {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let components = [$(self.$components.to_string()),*];
                write!(f, "({})", components.join(", "))
            }
        }

        sys::static_assert_eq_size!($Vector, [$Scalar; [$(stringify!($components)),*].len()]);

        impl_marshal_inline!($Vector, $Vector);
    };
}

impl_vector!(
    /// Vector used for 2D math using floating point coordinates.
    Vector2, real, (x, y), RVec2
);

impl_vector!(
    /// Vector used for 3D math using floating point coordinates.
    Vector3, real, (x, y, z), RVec3
);

impl_vector!(
    /// 4D vector using floating point coordinates.
    Vector4, real, (x, y, z, w), RVec4
);

impl_vector!(
    /// Vector used for 2D math using integer coordinates.
    ///
    /// Components are 32-bit regardless of the `double-precision` feature.
    Vector2i, i32, (x, y), glam::IVec2
);

impl_vector!(
    /// Vector used for 3D math using integer coordinates.
    Vector3i, i32, (x, y, z), glam::IVec3
);

impl_vector!(
    /// 4D vector using integer coordinates.
    Vector4i, i32, (x, y, z, w), glam::IVec4
);

// Integer vectors are exact, so they can be hashed and compared totally.
impl Eq for Vector2i {}
impl Eq for Vector3i {}
impl Eq for Vector4i {}

impl std::hash::Hash for Vector2i {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.x, self.y).hash(state)
    }
}

impl std::hash::Hash for Vector3i {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.x, self.y, self.z).hash(state)
    }
}

impl std::hash::Hash for Vector4i {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.x, self.y, self.z, self.w).hash(state)
    }
}

impl Vector2 {
    pub fn dot(self, with: Self) -> real {
        self.to_glam().dot(with.to_glam())
    }

    pub fn length(self) -> real {
        self.to_glam().length()
    }

    /// Returns the vector scaled to unit length, or `ZERO` if the vector is zero.
    pub fn normalized_or_zero(self) -> Self {
        Self::from_glam(self.to_glam().normalize_or_zero())
    }
}

impl Vector3 {
    pub fn dot(self, with: Self) -> real {
        self.to_glam().dot(with.to_glam())
    }

    pub fn cross(self, with: Self) -> Self {
        Self::from_glam(self.to_glam().cross(with.to_glam()))
    }

    pub fn length(self) -> real {
        self.to_glam().length()
    }
}

impl Vector4 {
    pub fn dot(self, with: Self) -> real {
        self.to_glam().dot(with.to_glam())
    }
}

impl Vector2i {
    /// Truncates the coordinates of `v` toward zero.
    pub const fn from_vector2(v: Vector2) -> Self {
        Self::new(v.x as i32, v.y as i32)
    }
}

impl Vector3i {
    /// Truncates the coordinates of `v` toward zero.
    pub const fn from_vector3(v: Vector3) -> Self {
        Self::new(v.x as i32, v.y as i32, v.z as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::Marshal;

    #[test]
    fn display_like_engine() {
        assert_eq!(Vector2i::new(3, -4).to_string(), "(3, -4)");
        assert_eq!(Vector3::new(1.5, 0.0, -2.0).to_string(), "(1.5, 0, -2)");
    }

    #[test]
    fn operators() {
        let mut v = Vector3i::new(1, 2, 3);
        v += Vector3i::ONE;
        assert_eq!(v, Vector3i::new(2, 3, 4));
        assert_eq!(-v * 2, Vector3i::new(-4, -6, -8));
        assert_eq!(Vector2::new(3.0, 4.0).length(), 5.0);
        assert_eq!(
            Vector3::new(1.0, 0.0, 0.0).cross(Vector3::new(0.0, 1.0, 0.0)),
            Vector3::new(0.0, 0.0, 1.0)
        );
    }

    #[test]
    fn vectors_are_inline_variants() {
        let v = Vector4i::new(1, -2, i32::MAX, i32::MIN);
        let variant = v.to_variant();

        assert_eq!(variant.get_type(), sys::VariantType::Vector4i);
        assert_eq!(Vector4i::from_variant(&variant), v);
        assert!(Vector4::try_from_variant(&variant).is_err());
    }
}
