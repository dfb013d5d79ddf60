/*
 * Copyright (c) godot-rust; Bromeon and contributors.
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::fmt;

/// IEEE 754 binary16 ("half precision") floating point number.
///
/// Stored as its raw 16 bits. Arithmetic is not provided; convert to `f32`/`f64` for that. Marshalled like the other float kinds:
/// widened to `f64` for variants and pointer slots, narrowed back with round-to-nearest-even.
#[derive(Copy, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Half {
    bits: u16,
}

impl Half {
    pub const ZERO: Self = Self::from_bits(0x0000);
    pub const ONE: Self = Self::from_bits(0x3c00);
    pub const INFINITY: Self = Self::from_bits(0x7c00);
    pub const NEG_INFINITY: Self = Self::from_bits(0xfc00);
    pub const NAN: Self = Self::from_bits(0x7e00);

    /// Largest finite value, `65504`.
    pub const MAX: Self = Self::from_bits(0x7bff);

    pub const fn from_bits(bits: u16) -> Self {
        Self { bits }
    }

    pub const fn to_bits(self) -> u16 {
        self.bits
    }

    pub fn is_nan(self) -> bool {
        self.bits & 0x7c00 == 0x7c00 && self.bits & 0x03ff != 0
    }

    /// Rounds to the nearest representable value (ties to even). Out-of-range values become infinity.
    pub fn from_f32(value: f32) -> Self {
        let x = value.to_bits();
        let sign = ((x >> 16) & 0x8000) as u16;
        let exp = ((x >> 23) & 0xff) as i32;
        let man = x & 0x007f_ffff;

        // NaN and infinity.
        if exp == 0xff {
            let nan_bit = if man != 0 { 0x0200 } else { 0 };
            return Self::from_bits(sign | 0x7c00 | nan_bit | (man >> 13) as u16);
        }

        let half_exp = exp - 127 + 15;

        // Overflow.
        if half_exp >= 0x1f {
            return Self::from_bits(sign | 0x7c00);
        }

        // Subnormal or zero.
        if half_exp <= 0 {
            if 14 - half_exp > 24 {
                return Self::from_bits(sign);
            }

            let man = man | 0x0080_0000;
            let shift = (14 - half_exp) as u32;
            let mut half_man = man >> shift;

            let round_bit = 1 << (shift - 1);
            if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
                half_man += 1;
            }
            return Self::from_bits(sign | half_man as u16);
        }

        // Normal.
        let half_exp = (half_exp as u32) << 10;
        let half_man = man >> 13;
        let round_bit = 0x0000_1000;

        let bits = sign as u32 | half_exp | half_man;
        if (man & round_bit) != 0 && (man & (3 * round_bit - 1)) != 0 {
            // Carry may propagate into the exponent, which correctly yields infinity at the top.
            Self::from_bits((bits + 1) as u16)
        } else {
            Self::from_bits(bits as u16)
        }
    }

    /// Exact widening.
    pub fn to_f32(self) -> f32 {
        let sign = ((self.bits & 0x8000) as u32) << 16;
        let exp = ((self.bits >> 10) & 0x1f) as u32;
        let man = (self.bits & 0x03ff) as u32;

        let bits = match (exp, man) {
            (0, 0) => sign,
            (0, _) => {
                // Subnormal: normalize.
                let mut e: i32 = -14;
                let mut m = man;
                while m & 0x0400 == 0 {
                    m <<= 1;
                    e -= 1;
                }
                let m = m & 0x03ff;
                sign | (((e + 127) as u32) << 23) | (m << 13)
            }
            (0x1f, 0) => sign | 0x7f80_0000,
            (0x1f, _) => sign | 0x7fc0_0000 | (man << 13),
            _ => sign | ((exp + 127 - 15) << 23) | (man << 13),
        };

        f32::from_bits(bits)
    }

    /// Narrows through `f32`.
    pub fn from_f64(value: f64) -> Self {
        Self::from_f32(value as f32)
    }

    pub fn to_f64(self) -> f64 {
        self.to_f32() as f64
    }
}

impl PartialEq for Half {
    fn eq(&self, other: &Self) -> bool {
        self.to_f32() == other.to_f32()
    }
}

impl PartialOrd for Half {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.to_f32().partial_cmp(&other.to_f32())
    }
}

impl From<Half> for f32 {
    fn from(h: Half) -> Self {
        h.to_f32()
    }
}

impl From<Half> for f64 {
    fn from(h: Half) -> Self {
        h.to_f64()
    }
}

impl fmt::Debug for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Half({})", self.to_f32())
    }
}

impl fmt::Display for Half {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_f32(), f)
    }
}

// ----------------------------------------------------------------------------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_eq!(Half::from_f32(1.0).to_bits(), 0x3c00);
        assert_eq!(Half::from_f32(-2.0).to_bits(), 0xc000);
        assert_eq!(Half::from_f32(65504.0).to_bits(), Half::MAX.to_bits());
        assert_eq!(Half::from_f32(0.5).to_f32(), 0.5);
        assert_eq!(Half::from_f32(1e6).to_bits(), Half::INFINITY.to_bits());
        assert_eq!(Half::from_f32(f32::NEG_INFINITY).to_bits(), Half::NEG_INFINITY.to_bits());
        assert!(Half::from_f32(f32::NAN).is_nan());
        assert!(Half::NAN.to_f32().is_nan());

        // Smallest subnormal.
        assert_eq!(Half::from_bits(0x0001).to_f32(), 2f32.powi(-24));
        assert_eq!(Half::from_f32(2f32.powi(-24)).to_bits(), 0x0001);
    }

    #[test]
    fn ties_round_to_even() {
        // 2049 lies between 2048 and 2050 (spacing 2); the tie goes to the even mantissa, 2048.
        assert_eq!(Half::from_f32(2049.0).to_f32(), 2048.0);
        // 2051 lies between 2050 and 2052; the even mantissa is 2052.
        assert_eq!(Half::from_f32(2051.0).to_f32(), 2052.0);
    }

    proptest! {
        #[test]
        fn every_half_round_trips_through_f32(bits in any::<u16>()) {
            let h = Half::from_bits(bits);
            let back = Half::from_f32(h.to_f32());

            if h.is_nan() {
                prop_assert!(back.is_nan());
            } else {
                prop_assert_eq!(back.to_bits(), bits);
            }
        }

        #[test]
        fn narrowing_is_monotonic(a in -70000.0f32..70000.0, b in -70000.0f32..70000.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(Half::from_f32(lo).to_f32() <= Half::from_f32(hi).to_f32());
        }
    }
}
