use std::fmt;

use ht_float16::F16;

/// Element precision of a tensor's storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Precision {
    /// 16-bit binary16, stored as `ht_float16::F16`.
    F16,
    /// 32-bit floating point.
    F32,
    /// 64-bit floating point.
    F64,
}

impl Precision {
    /// Returns the size in bytes of a single element.
    pub fn size_in_bytes(&self) -> usize {
        match self {
            Precision::F16 => 2,
            Precision::F32 => 4,
            Precision::F64 => 8,
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Precision::F16 => write!(f, "f16"),
            Precision::F32 => write!(f, "f32"),
            Precision::F64 => write!(f, "f64"),
        }
    }
}

/// A single tensor element of any supported precision.
///
/// Generic reads return a `Scalar`; generic writes must supply one whose
/// precision matches the tensor's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    F16(F16),
    F32(f32),
    F64(f64),
}

impl Scalar {
    pub fn precision(&self) -> Precision {
        match self {
            Scalar::F16(_) => Precision::F16,
            Scalar::F32(_) => Precision::F32,
            Scalar::F64(_) => Precision::F64,
        }
    }

    /// Widens the value to `f64`. Lossless for every variant.
    pub fn to_f64(&self) -> f64 {
        match *self {
            Scalar::F16(v) => v.to_f64(),
            Scalar::F32(v) => v as f64,
            Scalar::F64(v) => v,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::F16(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
        }
    }
}

impl From<F16> for Scalar {
    fn from(value: F16) -> Self {
        Scalar::F16(value)
    }
}

impl From<f32> for Scalar {
    fn from(value: f32) -> Self {
        Scalar::F32(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::F64(value)
    }
}
