//! Bit-level conversions between binary16 and the native float widths.
//!
//! The binary16 layout is 1 sign bit, 5 exponent bits (bias 15) and 10
//! mantissa bits. Encoding truncates the source mantissa instead of rounding.
//! Subnormal sources and underflowing normals are shifted into the mantissa
//! field without renormalization (an underflowing normal loses its implicit
//! leading bit), so narrowing below the smallest normal half is approximate.
//! Decoding is exact for every non-NaN pattern.

/// Canonical quiet NaN pattern produced by the encoder.
pub const NAN_BITS: u16 = 0x7FFF;
/// Positive infinity.
pub const INFINITY_BITS: u16 = 0x7C00;
/// Negative infinity.
pub const NEG_INFINITY_BITS: u16 = 0xFC00;

const SIGN_MASK: u16 = 0x8000;
const MANTISSA_MASK: u16 = 0x03FF;
const EXP_ALL_ONES: i32 = 0x1F;
const EXP_BIAS: i32 = 15;

/// Encodes an `f32` into a binary16 bit pattern.
pub fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) as u16) & SIGN_MASK;
    let exp = ((bits >> 23) & 0xFF) as i32;
    let frac = bits & 0x007F_FFFF;

    if exp == 0xFF {
        if frac != 0 {
            return NAN_BITS;
        }
        return sign | INFINITY_BITS;
    }
    if exp == 0 {
        return sign | (frac >> 13) as u16;
    }

    let sexp = exp - 127 + EXP_BIAS;
    if sexp >= EXP_ALL_ONES {
        return sign | INFINITY_BITS;
    }
    if sexp <= 0 {
        // Shift amounts past the word width flush to zero.
        let frac = frac.checked_shr((1 - sexp) as u32).unwrap_or(0);
        return sign | (frac >> 13) as u16;
    }
    sign | ((sexp as u16) << 10) | (frac >> 13) as u16
}

/// Encodes an `f64` into a binary16 bit pattern.
pub fn f64_to_f16_bits(value: f64) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 48) as u16) & SIGN_MASK;
    let exp = ((bits >> 52) & 0x7FF) as i32;
    let frac = bits & 0x000F_FFFF_FFFF_FFFF;

    if exp == 0x7FF {
        if frac != 0 {
            return NAN_BITS;
        }
        return sign | INFINITY_BITS;
    }
    if exp == 0 {
        return sign | (frac >> 42) as u16;
    }

    let sexp = exp - 1023 + EXP_BIAS;
    if sexp >= EXP_ALL_ONES {
        return sign | INFINITY_BITS;
    }
    if sexp <= 0 {
        let frac = frac.checked_shr((1 - sexp) as u32).unwrap_or(0);
        return sign | (frac >> 42) as u16;
    }
    sign | ((sexp as u16) << 10) | (frac >> 42) as u16
}

/// Splits a binary16 pattern into (sign, biased exponent, mantissa).
fn fields(h: u16) -> (u16, i32, u16) {
    (h & SIGN_MASK, ((h >> 10) & 0x1F) as i32, h & MANTISSA_MASK)
}

/// Renormalizes a subnormal mantissa, returning the unbiased-relative
/// exponent and the mantissa with its implicit bit stripped.
fn normalize_subnormal(mut frac: u16) -> (i32, u16) {
    let mut exp = 0;
    while frac & 0x0400 == 0 {
        frac <<= 1;
        exp -= 1;
    }
    (exp + 1, frac & MANTISSA_MASK)
}

/// Decodes a binary16 bit pattern into an `f32`.
pub fn f16_bits_to_f32(h: u16) -> f32 {
    let (sign, exp, frac) = fields(h);
    let sign = (sign as u32) << 16;

    if exp == EXP_ALL_ONES {
        if frac != 0 {
            return f32::from_bits(0xFFu32 << 23 | (frac as u32) << 13 | 0x1);
        }
        return f32::from_bits(sign | 0xFFu32 << 23);
    }
    if exp == 0 && frac == 0 {
        return f32::from_bits(sign);
    }

    let (exp, frac) = if exp == 0 {
        normalize_subnormal(frac)
    } else {
        (exp, frac)
    };
    let exp = (exp + 127 - EXP_BIAS) as u32;
    f32::from_bits(sign | exp << 23 | (frac as u32) << 13)
}

/// Decodes a binary16 bit pattern into an `f64`.
pub fn f16_bits_to_f64(h: u16) -> f64 {
    let (sign, exp, frac) = fields(h);
    let sign = (sign as u64) << 48;

    if exp == EXP_ALL_ONES {
        if frac != 0 {
            return f64::from_bits(0x7FFu64 << 52 | (frac as u64) << 42 | 0x1);
        }
        return f64::from_bits(sign | 0x7FFu64 << 52);
    }
    if exp == 0 && frac == 0 {
        return f64::from_bits(sign);
    }

    let (exp, frac) = if exp == 0 {
        normalize_subnormal(frac)
    } else {
        (exp, frac)
    };
    let exp = (exp + 1023 - EXP_BIAS) as u64;
    f64::from_bits(sign | exp << 52 | (frac as u64) << 42)
}
