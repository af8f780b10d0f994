//! `ht-float16` - Half-precision codec for halftensor.
//!
//! This crate provides:
//! - Pure bit-manipulation encoders from `f32`/`f64` to binary16 patterns
//! - Decoders from binary16 back to `f32`/`f64`, including subnormals
//! - The `F16` storage type built on those conversions

pub mod codec;
pub mod value;

pub use codec::{f16_bits_to_f32, f16_bits_to_f64, f32_to_f16_bits, f64_to_f16_bits};
pub use value::F16;
