use ht_float16::F16;
use tracing::debug;

use crate::dtype::{Precision, Scalar};
use crate::error::{Result, TensorError};

/// Homogeneous element storage: exactly one precision is live.
///
/// Equality is bitwise per element, so a buffer holding NaN equals itself and
/// `0.0` differs from `-0.0`.
#[derive(Debug, Clone)]
pub enum Storage {
    /// 16-bit binary16 storage.
    F16(Vec<F16>),
    /// 32-bit floating point storage.
    F32(Vec<f32>),
    /// 64-bit floating point storage.
    F64(Vec<f64>),
}

impl Storage {
    /// Number of elements in this storage.
    pub fn len(&self) -> usize {
        match self {
            Storage::F16(v) => v.len(),
            Storage::F32(v) => v.len(),
            Storage::F64(v) => v.len(),
        }
    }

    /// Returns true if the storage contains no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the precision of this storage.
    pub fn precision(&self) -> Precision {
        match self {
            Storage::F16(_) => Precision::F16,
            Storage::F32(_) => Precision::F32,
            Storage::F64(_) => Precision::F64,
        }
    }

    /// Create zero-filled storage for the given precision and element count.
    pub fn zeros(precision: Precision, n: usize) -> Self {
        match precision {
            Precision::F16 => Storage::F16(vec![F16::ZERO; n]),
            Precision::F32 => Storage::F32(vec![0.0; n]),
            Precision::F64 => Storage::F64(vec![0.0; n]),
        }
    }

    /// Decode a raw little-endian element stream.
    ///
    /// # Errors
    /// Returns `InvalidData` if `bytes` is not a whole number of elements.
    pub fn from_le_bytes(bytes: &[u8], precision: Precision) -> Result<Self> {
        let width = precision.size_in_bytes();
        if bytes.len() % width != 0 {
            return Err(TensorError::InvalidData(format!(
                "{} bytes is not a whole number of {} elements",
                bytes.len(),
                precision
            )));
        }
        let chunks = bytes.chunks_exact(width);
        Ok(match precision {
            Precision::F16 => Storage::F16(
                chunks
                    .map(|c| F16::from_bits(u16::from_le_bytes([c[0], c[1]])))
                    .collect(),
            ),
            Precision::F32 => Storage::F32(
                chunks
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            Precision::F64 => Storage::F64(
                chunks
                    .map(|c| {
                        f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                    })
                    .collect(),
            ),
        })
    }

    /// Convert every element to `target`, narrowing through the binary16
    /// codec where needed. Returns `self` untouched if already `target`.
    pub fn convert(self, target: Precision) -> Self {
        let source = self.precision();
        if source != target {
            debug!(%source, %target, len = self.len(), "converting storage");
        }
        match (self, target) {
            (Storage::F16(v), Precision::F32) => {
                Storage::F32(v.iter().map(|h| h.to_f32()).collect())
            }
            (Storage::F16(v), Precision::F64) => {
                Storage::F64(v.iter().map(|h| h.to_f64()).collect())
            }
            (Storage::F32(v), Precision::F16) => {
                Storage::F16(v.iter().map(|&x| F16::from_f32(x)).collect())
            }
            (Storage::F32(v), Precision::F64) => {
                Storage::F64(v.iter().map(|&x| x as f64).collect())
            }
            (Storage::F64(v), Precision::F16) => {
                Storage::F16(v.iter().map(|&x| F16::from_f64(x)).collect())
            }
            (Storage::F64(v), Precision::F32) => {
                Storage::F32(v.iter().map(|&x| x as f32).collect())
            }
            (storage, _) => storage,
        }
    }

    /// Read the element at `offset`. The caller guarantees `offset < len()`.
    pub(crate) fn get(&self, offset: usize) -> Scalar {
        match self {
            Storage::F16(v) => Scalar::F16(v[offset]),
            Storage::F32(v) => Scalar::F32(v[offset]),
            Storage::F64(v) => Scalar::F64(v[offset]),
        }
    }

    /// Write the element at `offset`. The caller guarantees `offset < len()`.
    ///
    /// # Errors
    /// Returns `TypeMismatch` if `value` is not of this storage's precision.
    pub(crate) fn set(&mut self, offset: usize, value: Scalar) -> Result<()> {
        match (self, value) {
            (Storage::F16(v), Scalar::F16(x)) => v[offset] = x,
            (Storage::F32(v), Scalar::F32(x)) => v[offset] = x,
            (Storage::F64(v), Scalar::F64(x)) => v[offset] = x,
            (storage, value) => {
                return Err(TensorError::TypeMismatch {
                    expected: storage.precision(),
                    got: value.precision(),
                })
            }
        }
        Ok(())
    }
}

impl PartialEq for Storage {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Storage::F16(a), Storage::F16(b)) => a == b,
            (Storage::F32(a), Storage::F32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (Storage::F64(a), Storage::F64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            _ => false,
        }
    }
}

impl Eq for Storage {}

/// A native element type that can back a [`Storage`].
///
/// Lets precision-specific accessors share one implementation.
pub trait Element: Copy + Into<Scalar> {
    const PRECISION: Precision;

    fn slice(storage: &Storage) -> Option<&[Self]>;

    fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]>;

    fn into_storage(data: Vec<Self>) -> Storage;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident) => {
        impl Element for $ty {
            const PRECISION: Precision = Precision::$variant;

            fn slice(storage: &Storage) -> Option<&[Self]> {
                match storage {
                    Storage::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }

            fn slice_mut(storage: &mut Storage) -> Option<&mut [Self]> {
                match storage {
                    Storage::$variant(v) => Some(v.as_mut_slice()),
                    _ => None,
                }
            }

            fn into_storage(data: Vec<Self>) -> Storage {
                Storage::$variant(data)
            }
        }
    };
}

impl_element!(F16, F16);
impl_element!(f32, F32);
impl_element!(f64, F64);
