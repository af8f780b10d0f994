use crate::error::{Result, TensorError};
use std::fmt;

/// A tensor shape, wrapping a vector of dimension sizes.
///
/// Axis 0 is the fastest-varying axis: its stride is 1 and every following
/// axis strides over all the axes before it. For a shape [d0, d1, d2] the
/// strides are [1, d0, d0*d1].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Create a new shape from a vector of dimensions.
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    /// Create a shape from a slice of dimensions.
    pub fn from_slice(dims: &[usize]) -> Self {
        Shape {
            dims: dims.to_vec(),
        }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements (product of all dimension sizes).
    ///
    /// Saturates at `usize::MAX`; exact for any shape that passed
    /// [`Shape::validate`].
    pub fn numel(&self) -> usize {
        self.checked_numel().unwrap_or(usize::MAX)
    }

    /// Total number of elements, or `None` if the product overflows `usize`.
    pub fn checked_numel(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    /// Returns the size of dimension `i`.
    ///
    /// # Panics
    /// Panics if `i >= ndim()`.
    pub fn dim(&self, i: usize) -> usize {
        self.dims[i]
    }

    /// Returns a reference to the underlying dimension sizes.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Computes the strides for this shape, axis 0 innermost.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = Vec::with_capacity(self.dims.len());
        let mut stride: usize = 1;
        for &d in &self.dims {
            strides.push(stride);
            stride = stride.saturating_mul(d);
        }
        strides
    }

    /// Stride of a single axis: the product of the sizes of every axis
    /// before it. Returns `None` if `axis >= ndim()`.
    pub fn stride_of(&self, axis: usize) -> Option<usize> {
        if axis >= self.dims.len() {
            return None;
        }
        Some(
            self.dims[..axis]
                .iter()
                .fold(1usize, |acc, &d| acc.saturating_mul(d)),
        )
    }

    /// An all-wildcard selection key for [`crate::Tensor::get_sub`].
    ///
    /// `None` keeps every coordinate along an axis; replace entries with
    /// `Some(i)` to pin an axis to coordinate `i`.
    pub fn key(&self) -> Vec<Option<usize>> {
        vec![None; self.dims.len()]
    }

    /// Checks that the shape has at least one axis, no zero-sized axis, and
    /// an element count that fits in `usize`.
    pub fn validate(&self) -> Result<()> {
        if self.dims.is_empty() {
            return Err(TensorError::invalid_shape(&self.dims, "shape has no axes"));
        }
        if let Some(axis) = self.dims.iter().position(|&d| d == 0) {
            return Err(TensorError::invalid_shape(
                &self.dims,
                format!("axis {} has size 0", axis),
            ));
        }
        if self.checked_numel().is_none() {
            return Err(TensorError::invalid_shape(
                &self.dims,
                "element count overflows usize",
            ));
        }
        Ok(())
    }

    /// Checks a multi-index against this shape's rank and bounds.
    pub fn check_index(&self, index: &[usize]) -> Result<()> {
        if index.len() != self.dims.len() {
            return Err(TensorError::DimMismatch {
                rank: self.dims.len(),
                got: index.len(),
            });
        }
        for (&i, &d) in index.iter().zip(&self.dims) {
            if i >= d {
                return Err(TensorError::IndexOutOfRange {
                    index: i,
                    extent: d,
                });
            }
        }
        Ok(())
    }

    /// Flat offset of an in-bounds multi-index.
    pub fn offset_of(&self, index: &[usize]) -> usize {
        offset(&self.strides(), index)
    }

    /// Multi-index of an in-range flat offset.
    pub fn index_of(&self, offset: usize) -> Vec<usize> {
        unravel(&self.strides(), offset)
    }
}

/// Σ stride[axis] * index[axis].
pub(crate) fn offset(strides: &[usize], index: &[usize]) -> usize {
    strides.iter().zip(index).map(|(s, i)| s * i).sum()
}

/// Mixed-radix decomposition of `offset`, walking from the largest stride
/// down to the smallest.
pub(crate) fn unravel(strides: &[usize], mut offset: usize) -> Vec<usize> {
    let mut index = vec![0; strides.len()];
    for (axis, &stride) in strides.iter().enumerate().rev() {
        index[axis] = offset / stride;
        offset %= stride;
    }
    index
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::from_slice(dims)
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Shape::new(dims.to_vec())
    }
}
