use thiserror::Error;

use crate::dtype::Precision;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TensorError {
    #[error("invalid shape {dims:?}: {reason}")]
    InvalidShape { dims: Vec<usize>, reason: String },
    #[error("dimension mismatch: tensor has rank {rank}, index has {got} components")]
    DimMismatch { rank: usize, got: usize },
    #[error("index {index} out of range for extent {extent}")]
    IndexOutOfRange { index: usize, extent: usize },
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: Precision, got: Precision },
}

impl TensorError {
    pub(crate) fn invalid_shape(dims: &[usize], reason: impl Into<String>) -> Self {
        TensorError::InvalidShape {
            dims: dims.to_vec(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TensorError>;
