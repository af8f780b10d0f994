use std::fmt;

use ht_float16::F16;
use tracing::{debug, trace};

use crate::dtype::{Precision, Scalar};
use crate::error::{Result, TensorError};
use crate::shape::{self, Shape};
use crate::storage::{Element, Storage};

/// A rank-N tensor over one homogeneous storage precision.
///
/// The precision is fixed at construction. Elements are laid out with axis 0
/// fastest-varying (see [`Shape::strides`]); `reshape` reinterprets the same
/// storage under a new shape and never moves elements.
#[derive(Debug, Clone)]
pub struct Tensor {
    storage: Storage,
    shape: Shape,
    strides: Vec<usize>,
}

impl Tensor {
    /// Create a tensor of the given precision and shape.
    ///
    /// With `data == None` the storage is zero-filled. Otherwise `data` must
    /// hold exactly `shape.numel()` elements; it is converted to `precision`
    /// if it was supplied in another one.
    ///
    /// # Errors
    /// Returns `InvalidShape` if the shape is empty, has a zero-sized axis,
    /// or does not match the length of `data`.
    pub fn new(
        data: Option<Storage>,
        precision: Precision,
        shape: impl Into<Shape>,
    ) -> Result<Self> {
        let shape = shape.into();
        shape.validate()?;
        let numel = shape.numel();
        let storage = match data {
            None => Storage::zeros(precision, numel),
            Some(storage) => {
                if storage.len() != numel {
                    return Err(TensorError::invalid_shape(
                        shape.dims(),
                        format!("buffer has {} elements, shape needs {}", storage.len(), numel),
                    ));
                }
                storage.convert(precision)
            }
        };
        let strides = shape.strides();
        Ok(Tensor {
            storage,
            shape,
            strides,
        })
    }

    /// Create a zero-filled tensor.
    pub fn zeros(precision: Precision, shape: impl Into<Shape>) -> Result<Self> {
        Self::new(None, precision, shape)
    }

    /// Create a tensor that takes ownership of `data` in its own precision.
    pub fn from_vec<T: Element>(data: Vec<T>, shape: impl Into<Shape>) -> Result<Self> {
        Self::new(Some(T::into_storage(data)), T::PRECISION, shape)
    }

    /// Number of axes.
    pub fn rank(&self) -> usize {
        self.shape.ndim()
    }

    /// Returns a reference to the tensor's shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Returns the tensor's storage precision.
    pub fn precision(&self) -> Precision {
        self.storage.precision()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.storage.len()
    }

    /// Returns the underlying storage reference.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    fn check_offset(&self, offset: usize) -> Result<()> {
        let extent = self.storage.len();
        if offset >= extent {
            return Err(TensorError::IndexOutOfRange {
                index: offset,
                extent,
            });
        }
        Ok(())
    }

    fn offset(&self, index: &[usize]) -> usize {
        shape::offset(&self.strides, index)
    }

    /// Multi-index of a flat offset under the current shape.
    pub fn index_of(&self, offset: usize) -> Result<Vec<usize>> {
        self.check_offset(offset)?;
        Ok(shape::unravel(&self.strides, offset))
    }

    /// Read the element at a multi-index.
    ///
    /// # Errors
    /// `DimMismatch` if `index.len() != rank()`, `IndexOutOfRange` if a
    /// component is outside its axis.
    pub fn get(&self, index: &[usize]) -> Result<Scalar> {
        self.shape.check_index(index)?;
        Ok(self.storage.get(self.offset(index)))
    }

    /// Read the element at a flat offset in `[0, numel())`.
    pub fn get_at(&self, offset: usize) -> Result<Scalar> {
        self.check_offset(offset)?;
        Ok(self.storage.get(offset))
    }

    /// Write the element at a multi-index.
    ///
    /// # Errors
    /// As [`Tensor::get`], plus `TypeMismatch` if `value` is not of this
    /// tensor's precision. Nothing is written on error.
    pub fn set(&mut self, index: &[usize], value: impl Into<Scalar>) -> Result<()> {
        self.shape.check_index(index)?;
        let offset = self.offset(index);
        self.storage.set(offset, value.into())
    }

    /// Write the element at a flat offset in `[0, numel())`.
    pub fn set_at(&mut self, offset: usize, value: impl Into<Scalar>) -> Result<()> {
        self.check_offset(offset)?;
        self.storage.set(offset, value.into())
    }

    /// Typed read; fails with `TypeMismatch` before any bounds check if `T`
    /// is not this tensor's element type.
    pub fn get_as<T: Element>(&self, index: &[usize]) -> Result<T> {
        let data = self.as_slice::<T>()?;
        self.shape.check_index(index)?;
        Ok(data[self.offset(index)])
    }

    /// Typed write; fails with `TypeMismatch` before any bounds check if `T`
    /// is not this tensor's element type.
    pub fn set_as<T: Element>(&mut self, index: &[usize], value: T) -> Result<()> {
        let expected = self.precision();
        let data = T::slice_mut(&mut self.storage).ok_or(TensorError::TypeMismatch {
            expected,
            got: T::PRECISION,
        })?;
        self.shape.check_index(index)?;
        data[shape::offset(&self.strides, index)] = value;
        Ok(())
    }

    pub fn get_f16(&self, index: &[usize]) -> Result<F16> {
        self.get_as(index)
    }

    pub fn get_f32(&self, index: &[usize]) -> Result<f32> {
        self.get_as(index)
    }

    pub fn get_f64(&self, index: &[usize]) -> Result<f64> {
        self.get_as(index)
    }

    pub fn set_f16(&mut self, index: &[usize], value: F16) -> Result<()> {
        self.set_as(index, value)
    }

    pub fn set_f32(&mut self, index: &[usize], value: f32) -> Result<()> {
        self.set_as(index, value)
    }

    pub fn set_f64(&mut self, index: &[usize], value: f64) -> Result<()> {
        self.set_as(index, value)
    }

    /// The whole storage as a typed slice in flat order.
    pub fn as_slice<T: Element>(&self) -> Result<&[T]> {
        T::slice(&self.storage).ok_or(TensorError::TypeMismatch {
            expected: self.storage.precision(),
            got: T::PRECISION,
        })
    }

    pub fn f16_slice(&self) -> Result<&[F16]> {
        self.as_slice()
    }

    pub fn f32_slice(&self) -> Result<&[f32]> {
        self.as_slice()
    }

    pub fn f64_slice(&self) -> Result<&[f64]> {
        self.as_slice()
    }

    /// Reinterpret the storage under `new_shape` in place.
    ///
    /// The total number of elements must remain the same; flat order is
    /// preserved, so `get_at(k)` is unchanged for every `k`.
    pub fn reshape(&mut self, new_shape: impl Into<Shape>) -> Result<()> {
        let new_shape = new_shape.into();
        new_shape.validate()?;
        if new_shape.numel() != self.storage.len() {
            return Err(TensorError::invalid_shape(
                new_shape.dims(),
                format!(
                    "shape needs {} elements, tensor has {}",
                    new_shape.numel(),
                    self.storage.len()
                ),
            ));
        }
        trace!(from = %self.shape, to = %new_shape, "reshape");
        self.strides = new_shape.strides();
        self.shape = new_shape;
        Ok(())
    }

    /// Copy out the sub-tensor selected by `key`.
    ///
    /// `key` has one entry per axis: `None` keeps the whole axis, `Some(i)`
    /// pins it to coordinate `i`. The result has the same rank and precision,
    /// with every pinned axis collapsed to size 1, and owns fresh storage.
    ///
    /// ```
    /// use ht_tensor::{Precision, Tensor};
    ///
    /// let t = Tensor::from_vec((0..12).map(f64::from).collect(), [4, 3]).unwrap();
    /// let column = t.get_sub(&[None, Some(1)]).unwrap();
    /// assert_eq!(column.shape().dims(), &[4, 1]);
    /// assert_eq!(column.f64_slice().unwrap(), &[4.0, 5.0, 6.0, 7.0]);
    /// assert_eq!(column.precision(), Precision::F64);
    /// ```
    pub fn get_sub(&self, key: &[Option<usize>]) -> Result<Tensor> {
        if key.len() != self.rank() {
            return Err(TensorError::DimMismatch {
                rank: self.rank(),
                got: key.len(),
            });
        }
        for (&fixed, &extent) in key.iter().zip(self.shape.dims()) {
            if let Some(index) = fixed {
                if index >= extent {
                    return Err(TensorError::IndexOutOfRange { index, extent });
                }
            }
        }

        let shape = Shape::new(
            key.iter()
                .zip(self.shape.dims())
                .map(|(fixed, &d)| if fixed.is_some() { 1 } else { d })
                .collect(),
        );
        let strides = shape.strides();
        debug!(source = %self.shape, sub = %shape, "extracting sub-tensor");

        let storage = match &self.storage {
            Storage::F16(v) => Storage::F16(self.gather(v, key, &strides, shape.numel())),
            Storage::F32(v) => Storage::F32(self.gather(v, key, &strides, shape.numel())),
            Storage::F64(v) => Storage::F64(self.gather(v, key, &strides, shape.numel())),
        };
        Ok(Tensor {
            storage,
            shape,
            strides,
        })
    }

    fn gather<T: Copy>(
        &self,
        data: &[T],
        key: &[Option<usize>],
        strides: &[usize],
        n: usize,
    ) -> Vec<T> {
        (0..n)
            .map(|k| {
                let mut index = shape::unravel(strides, k);
                for (i, fixed) in index.iter_mut().zip(key) {
                    if let Some(c) = fixed {
                        *i = *c;
                    }
                }
                data[self.offset(&index)]
            })
            .collect()
    }

    fn fmt_axis(
        &self,
        f: &mut fmt::Formatter<'_>,
        axis: usize,
        index: &mut [usize],
    ) -> fmt::Result {
        write!(f, "[")?;
        for i in 0..self.shape.dim(axis) {
            if i > 0 {
                write!(f, ", ")?;
            }
            index[axis] = i;
            if axis + 1 == self.rank() {
                write!(f, "{}", self.storage.get(self.offset(index)))?;
            } else {
                self.fmt_axis(f, axis + 1, index)?;
            }
        }
        write!(f, "]")
    }
}

/// Tensors are equal when shapes, precisions and every element bit pattern
/// match.
impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.storage == other.storage
    }
}

impl Eq for Tensor {}

/// Nested-bracket debug rendering, axis 0 as the outermost level.
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut index = vec![0; self.rank()];
        self.fmt_axis(f, 0, &mut index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn iota(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_new_tensor() {
        let t = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0], [2, 3]).unwrap();
        assert_eq!(t.rank(), 2);
        assert_eq!(t.shape().dims(), &[2, 3]);
        assert_eq!(t.strides(), &[1, 2]);
        assert_eq!(t.precision(), Precision::F32);
        assert_eq!(t.f32_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_zeros() {
        for precision in [Precision::F16, Precision::F32, Precision::F64] {
            let t = Tensor::zeros(precision, [2, 3, 4]).unwrap();
            assert_eq!(t.numel(), 24);
            assert_eq!(t.precision(), precision);
            for k in 0..24 {
                assert_eq!(t.get_at(k).unwrap().to_f64(), 0.0);
            }
        }
    }

    #[test]
    fn test_new_invalid_shape() {
        assert!(matches!(
            Tensor::zeros(Precision::F32, [3, 0]),
            Err(TensorError::InvalidShape { .. })
        ));
        assert!(matches!(
            Tensor::zeros(Precision::F32, Vec::<usize>::new()),
            Err(TensorError::InvalidShape { .. })
        ));
        assert!(matches!(
            Tensor::from_vec(vec![1.0f64, 2.0], [3]),
            Err(TensorError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_new_rejects_overflowing_shape() {
        for precision in [Precision::F16, Precision::F32, Precision::F64] {
            assert!(matches!(
                Tensor::zeros(precision, [usize::MAX, 2]),
                Err(TensorError::InvalidShape { .. })
            ));
        }
        let data = Storage::F64(vec![1.0, 2.0]);
        assert!(matches!(
            Tensor::new(Some(data), Precision::F64, [usize::MAX / 2 + 2, 2]),
            Err(TensorError::InvalidShape { .. })
        ));
    }

    #[test]
    fn test_new_converts_precision() {
        let data = Storage::F64(vec![1.0, 0.5, -2.0, 0.1]);
        let t = Tensor::new(Some(data), Precision::F16, [2, 2]).unwrap();
        assert_eq!(t.precision(), Precision::F16);
        assert_eq!(t.get_f16(&[0, 0]).unwrap(), F16::ONE);
        assert_eq!(t.get_f16(&[1, 1]).unwrap(), F16::from_f64(0.1));
        assert_relative_eq!(t.get_f16(&[1, 1]).unwrap().to_f64(), 0.1, max_relative = 1e-3);

        let data = Storage::F16(vec![F16::from_f32(1.5), F16::NEG_INFINITY]);
        let t = Tensor::new(Some(data), Precision::F32, [2]).unwrap();
        assert_eq!(t.f32_slice().unwrap(), &[1.5, f32::NEG_INFINITY]);
    }

    #[test]
    fn test_from_le_bytes_storage() {
        let bytes: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|x| x.to_le_bytes()).collect();
        let data = Storage::from_le_bytes(&bytes, Precision::F32).unwrap();
        let t = Tensor::new(Some(data), Precision::F64, [1, 2]).unwrap();
        assert_eq!(t.f64_slice().unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_get_axis0_fastest() {
        let t = Tensor::from_vec(iota(16), [4, 4]).unwrap();
        assert_eq!(t.get_f64(&[1, 2]).unwrap(), 9.0);
        assert_eq!(t.get(&[3, 0]).unwrap(), Scalar::F64(3.0));
        assert_eq!(t.get(&[0, 3]).unwrap(), Scalar::F64(12.0));
    }

    #[test]
    fn test_get_errors() {
        let t = Tensor::zeros(Precision::F64, [4, 4]).unwrap();
        assert_eq!(
            t.get(&[1]),
            Err(TensorError::DimMismatch { rank: 2, got: 1 })
        );
        assert_eq!(
            t.get(&[1, 4]),
            Err(TensorError::IndexOutOfRange { index: 4, extent: 4 })
        );
        assert_eq!(
            t.get_f32(&[0, 0]),
            Err(TensorError::TypeMismatch {
                expected: Precision::F64,
                got: Precision::F32
            })
        );
        // Precision is checked before bounds.
        assert!(matches!(
            t.get_f16(&[9, 9, 9]),
            Err(TensorError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_flat_offset_bounds() {
        let t = Tensor::from_vec(iota(6), [2, 3]).unwrap();
        assert_eq!(t.get_at(5).unwrap(), Scalar::F64(5.0));
        assert_eq!(
            t.get_at(6),
            Err(TensorError::IndexOutOfRange { index: 6, extent: 6 })
        );
        assert!(t.index_of(6).is_err());
        assert_eq!(t.index_of(5).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_set() {
        let mut t = Tensor::zeros(Precision::F32, [2, 2]).unwrap();
        t.set(&[1, 0], 3.0f32).unwrap();
        t.set_at(3, Scalar::F32(7.0)).unwrap();
        t.set_f32(&[0, 1], 5.0).unwrap();
        assert_eq!(t.f32_slice().unwrap(), &[0.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_set_errors_leave_tensor_untouched() {
        let mut t = Tensor::zeros(Precision::F32, [2, 2]).unwrap();
        let before = t.clone();
        assert_eq!(
            t.set(&[0, 0], 1.0f64),
            Err(TensorError::TypeMismatch {
                expected: Precision::F32,
                got: Precision::F64
            })
        );
        assert!(matches!(
            t.set(&[2, 0], 1.0f32),
            Err(TensorError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            t.set(&[0, 0, 0], 1.0f32),
            Err(TensorError::DimMismatch { .. })
        ));
        assert!(matches!(
            t.set_at(4, 1.0f32),
            Err(TensorError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            t.set_at(0, F16::ONE),
            Err(TensorError::TypeMismatch { .. })
        ));
        assert!(matches!(
            t.set_f64(&[0, 0], 1.0),
            Err(TensorError::TypeMismatch { .. })
        ));
        assert_eq!(t, before);
    }

    #[test]
    fn test_typed_f16_accessors() {
        let mut t = Tensor::zeros(Precision::F16, [3]).unwrap();
        t.set_f16(&[2], F16::from_f32(0.5)).unwrap();
        assert_eq!(t.get_f16(&[2]).unwrap().to_f32(), 0.5);
        assert_eq!(t.f16_slice().unwrap().len(), 3);
        assert!(t.f64_slice().is_err());
    }

    #[test]
    fn test_typed_set_checks_precision_before_bounds() {
        let mut t = Tensor::zeros(Precision::F32, [2]).unwrap();
        assert_eq!(
            t.set_f64(&[7, 7], 1.0),
            Err(TensorError::TypeMismatch {
                expected: Precision::F32,
                got: Precision::F64
            })
        );
        assert_eq!(
            t.set_f32(&[2], 1.0),
            Err(TensorError::IndexOutOfRange { index: 2, extent: 2 })
        );
        assert_eq!(t.f32_slice().unwrap(), &[0.0, 0.0]);
    }

    #[test]
    fn test_reshape() {
        let mut t = Tensor::from_vec(iota(16), [4, 4]).unwrap();
        t.reshape([2, 2, 2, 2]).unwrap();
        assert_eq!(t.rank(), 4);
        assert_eq!(t.strides(), &[1, 2, 4, 8]);
        assert_eq!(t.get_f64(&[1, 0, 0, 1]).unwrap(), 9.0);
        assert_eq!(t.f64_slice().unwrap(), iota(16).as_slice());
    }

    #[test]
    fn test_reshape_mismatch() {
        let mut t = Tensor::from_vec(iota(3), [3]).unwrap();
        assert!(matches!(t.reshape([2, 2]), Err(TensorError::InvalidShape { .. })));
        assert!(matches!(t.reshape([3, 0]), Err(TensorError::InvalidShape { .. })));
        assert_eq!(t.shape().dims(), &[3]);
    }

    #[test]
    fn test_reshape_rejects_wrapping_element_count() {
        // (usize::MAX / 2 + 2) * 2 wraps around to 2.
        let mut t = Tensor::from_vec(vec![1.0f32, 2.0], [2]).unwrap();
        let err = t.reshape([usize::MAX / 2 + 2, 2]).unwrap_err();
        assert_eq!(
            err,
            TensorError::InvalidShape {
                dims: vec![usize::MAX / 2 + 2, 2],
                reason: "element count overflows usize".to_string(),
            }
        );
        assert_eq!(t.shape().dims(), &[2]);
        assert_eq!(t.strides(), &[1]);
    }

    #[test]
    fn test_get_sub() {
        let mut t = Tensor::from_vec(iota(16), [4, 4]).unwrap();
        t.reshape([2, 8]).unwrap();
        let sub = t.get_sub(&[Some(1), None]).unwrap();
        assert_eq!(sub.shape().dims(), &[1, 8]);
        for i in 0..8 {
            assert_eq!(sub.get(&[0, i]).unwrap(), Scalar::F64((2 * i + 1) as f64));
        }
    }

    #[test]
    fn test_get_sub_is_independent() {
        let t = Tensor::from_vec(iota(6), [2, 3]).unwrap();
        let mut sub = t.get_sub(&[None, Some(2)]).unwrap();
        sub.set_f64(&[0, 0], -1.0).unwrap();
        assert_eq!(sub.f64_slice().unwrap(), &[-1.0, 5.0]);
        assert_eq!(t.get_f64(&[0, 2]).unwrap(), 4.0);
    }

    #[test]
    fn test_get_sub_all_wildcards_copies() {
        let t = Tensor::from_vec(iota(6), [2, 3]).unwrap();
        let sub = t.get_sub(&t.shape().key()).unwrap();
        assert_eq!(sub, t);
    }

    #[test]
    fn test_get_sub_errors() {
        let t = Tensor::zeros(Precision::F16, [2, 3]).unwrap();
        assert_eq!(
            t.get_sub(&[None]).unwrap_err(),
            TensorError::DimMismatch { rank: 2, got: 1 }
        );
        assert_eq!(
            t.get_sub(&[None, Some(3)]).unwrap_err(),
            TensorError::IndexOutOfRange { index: 3, extent: 3 }
        );
    }

    #[test]
    fn test_equality() {
        let a = Tensor::from_vec(iota(4), [2, 2]).unwrap();
        assert_eq!(a, a);
        let mut b = a.clone();
        b.set_f64(&[1, 1], 100.0).unwrap();
        assert_ne!(a, b);

        let mut c = a.clone();
        c.reshape([4]).unwrap();
        assert_ne!(a, c);

        let d = Tensor::new(Some(Storage::F64(iota(4))), Precision::F32, [2, 2]).unwrap();
        assert_ne!(a, d);

        let nan = Tensor::from_vec(vec![f32::NAN], [1]).unwrap();
        assert_eq!(nan, nan.clone());
    }

    #[test]
    fn test_display() {
        let t = Tensor::from_vec(iota(16), [4, 4]).unwrap();
        assert_eq!(
            t.to_string(),
            "[[0, 4, 8, 12], [1, 5, 9, 13], [2, 6, 10, 14], [3, 7, 11, 15]]"
        );

        let t = Tensor::from_vec(vec![1.5f32, 2.0], [2]).unwrap();
        assert_eq!(t.to_string(), "[1.5, 2]");

        let t = Tensor::from_vec(iota(3), [1, 3]).unwrap();
        assert_eq!(t.to_string(), "[[0, 1, 2]]");

        let data = Storage::F32(vec![0.5, -1.0]);
        let t = Tensor::new(Some(data), Precision::F16, [2, 1]).unwrap();
        assert_eq!(t.to_string(), "[[0.5], [-1]]");
    }
}
