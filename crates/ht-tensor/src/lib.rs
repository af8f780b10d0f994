//! `ht-tensor` - Rank-N tensor over half, single or double precision storage.
//!
//! This crate provides:
//! - A `Tensor` type owning exactly one precision of element storage
//! - Strided indexing with axis 0 as the fastest-varying axis
//! - In-place reshape and copied sub-tensor extraction
//! - Precision conversion at construction via `ht-float16`

pub mod dtype;
pub mod error;
pub mod shape;
pub mod storage;
pub mod tensor;

// Re-export primary types at the crate root for convenience.
pub use dtype::{Precision, Scalar};
pub use error::{Result, TensorError};
pub use ht_float16::F16;
pub use shape::Shape;
pub use storage::{Element, Storage};
pub use tensor::Tensor;
