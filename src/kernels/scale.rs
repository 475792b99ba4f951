//! This module contains the fixed-point scale kernel (`m`) and its inverse.
//!
//! Encoding multiplies by the factor and rounds half to even, so `0.5` becomes
//! `0` and `1.5` becomes `2`. The transform is lossy to a resolution of
//! `1 / factor`. Decoding multiplies by the reciprocal and always yields a float.
//! Null passes through both directions.

use crate::error::{AfvalError, Result};

/// Scales an integer. Integer factors multiply exactly.
pub fn encode_int(value: i64, factor: f64, int_factor: Option<i64>) -> Result<i64> {
    if let Some(k) = int_factor {
        return value.checked_mul(k).ok_or_else(|| {
            AfvalError::EncodingViolation(format!("{value} * {k} overflows a 64-bit integer"))
        });
    }
    encode_float(value as f64, factor)
}

/// Scales a float and rounds half to even.
pub fn encode_float(value: f64, factor: f64) -> Result<i64> {
    let scaled = (value * factor).round_ties_even();
    if !scaled.is_finite() || scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
        return Err(AfvalError::EncodingViolation(format!(
            "{value} * {factor} cannot be represented as a 64-bit integer"
        )));
    }
    Ok(scaled as i64)
}

/// Inverse scale: `value * (1 / factor)`.
pub fn decode(value: f64, factor: f64) -> f64 {
    value * (1.0 / factor)
}
