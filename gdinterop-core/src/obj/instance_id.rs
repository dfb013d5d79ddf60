/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;
use std::num::NonZeroU64;

use crate::builtin::Variant;
use crate::meta::Marshal;
use crate::meta::error::{ConvertError, FromVariantError};
use crate::sys;
use crate::sys::VariantType;

/// Unique, non-zero identifier of an engine object.
///
/// The engine keeps IDs unique for the process lifetime, so an ID of a freed object never refers to another object.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct InstanceId {
    // In the public API, signed i64 is the canonical representation, matching GDScript's `int`.
    value: NonZeroU64,
}

impl InstanceId {
    pub fn try_from_i64(id: i64) -> Option<Self> {
        Self::try_from_u64(id as u64)
    }

    /// ⚠️ Creates an ID from a non-zero value.
    ///
    /// # Panics
    /// If `id` is zero.
    pub fn from_nonzero(id: i64) -> Self {
        Self::try_from_i64(id).unwrap_or_else(|| panic!("expected non-zero instance ID"))
    }

    pub fn to_i64(self) -> i64 {
        self.to_u64() as i64
    }

    /// Whether the object is reference-counted. The engine encodes this in the highest bit.
    pub fn is_ref_counted(self) -> bool {
        self.to_u64() & (1u64 << 63) != 0
    }

    pub(crate) fn try_from_u64(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(|value| Self { value })
    }

    pub(crate) fn to_u64(self) -> u64 {
        self.value.get()
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_i64())
    }
}

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.to_i64())
    }
}

/// Stored as `int`. Zero is rejected.
impl Marshal for InstanceId {
    const VIA_REGISTRY: bool = false;

    fn variant_type() -> VariantType {
        VariantType::Int
    }

    fn to_variant(&self) -> Variant {
        self.to_i64().to_variant()
    }

    fn try_from_variant(variant: &Variant) -> Result<Self, ConvertError> {
        let id = i64::try_from_variant(variant)?;
        Self::try_from_i64(id).ok_or_else(|| FromVariantError::BadValue.into_error(variant))
    }

    unsafe fn write_to_ptr(&self, dst: sys::GDExtensionUninitializedTypePtr) {
        // SAFETY: forwarded to caller.
        unsafe { self.to_i64().write_to_ptr(dst) }
    }

    unsafe fn try_read_from_ptr(src: sys::GDExtensionConstTypePtr) -> Result<Self, ConvertError> {
        // SAFETY: forwarded to caller.
        let id = unsafe { i64::try_read_from_ptr(src)? };
        Self::try_from_i64(id).ok_or_else(|| ConvertError::new("instance ID must not be zero"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_not_an_id() {
        assert_eq!(InstanceId::try_from_i64(0), None);
        assert!(Variant::nil().try_to::<InstanceId>().is_err());
        assert!(0i64.to_variant().try_to::<InstanceId>().is_err());
    }

    #[test]
    fn refcounted_bit() {
        let id = InstanceId::try_from_u64(1 << 63 | 42).expect("non-zero");

        assert!(id.is_ref_counted());
        assert!(id.to_i64() < 0);
        assert_eq!(id.to_variant().to::<InstanceId>(), id);
        assert!(!InstanceId::from_nonzero(7).is_ref_counted());
    }
}
