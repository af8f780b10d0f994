use std::fmt;

use crate::codec;

/// A binary16 value stored as its raw bit pattern.
///
/// Equality and hashing are bitwise: `NAN == NAN` holds and `0.0 != -0.0`.
/// Use [`F16::to_f32`] for numeric comparison.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct F16(u16);

impl F16 {
    pub const ZERO: F16 = F16(0x0000);
    pub const ONE: F16 = F16(0x3C00);
    /// The canonical NaN produced when encoding any NaN input.
    pub const NAN: F16 = F16(codec::NAN_BITS);
    pub const INFINITY: F16 = F16(codec::INFINITY_BITS);
    pub const NEG_INFINITY: F16 = F16(codec::NEG_INFINITY_BITS);

    pub const fn from_bits(bits: u16) -> Self {
        F16(bits)
    }

    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Narrows an `f32`, truncating the mantissa.
    pub fn from_f32(value: f32) -> Self {
        F16(codec::f32_to_f16_bits(value))
    }

    /// Narrows an `f64`, truncating the mantissa.
    pub fn from_f64(value: f64) -> Self {
        F16(codec::f64_to_f16_bits(value))
    }

    pub fn to_f32(self) -> f32 {
        codec::f16_bits_to_f32(self.0)
    }

    pub fn to_f64(self) -> f64 {
        codec::f16_bits_to_f64(self.0)
    }

    pub fn is_nan(self) -> bool {
        self.0 & 0x7C00 == 0x7C00 && self.0 & 0x03FF != 0
    }

    pub fn is_infinite(self) -> bool {
        self.0 & 0x7FFF == 0x7C00
    }

    pub fn is_sign_negative(self) -> bool {
        self.0 & 0x8000 != 0
    }
}

impl fmt::Display for F16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_f32())
    }
}

impl From<F16> for f32 {
    fn from(value: F16) -> Self {
        value.to_f32()
    }
}

impl From<F16> for f64 {
    fn from(value: F16) -> Self {
        value.to_f64()
    }
}

impl From<half::f16> for F16 {
    fn from(value: half::f16) -> Self {
        F16(value.to_bits())
    }
}

impl From<F16> for half::f16 {
    fn from(value: F16) -> Self {
        half::f16::from_bits(value.0)
    }
}
