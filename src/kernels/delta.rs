//! This module contains the pure, stateless kernels for windowed modular delta
//! encoding and its inverse, cumulative decoding.
//!
//! The encoded form is `[window, low, d0, d1, ...]` where `window = high + 1 - low`
//! over the non-null inputs. Each step is taken modulo the window, and whichever of
//! the two equivalent representatives (`d1` in `[0, window)` or `d1 - window`) is
//! cheaper to print is emitted, with a bias towards the non-negative one. The value
//! `window` itself is never a valid step and is reserved as the null marker.
//!
//! Only an empty input encodes to `[]`. A non-empty input whose values are all
//! null encodes as `[1, 0, 1, 1, ...]`: window 1, low 0, then one null marker per
//! element, so the decoded length matches the input.

use num_traits::{Euclid, NumCast, PrimInt, Signed};

use crate::error::{AfvalError, Result};

//==================================================================================
// 1. Encode
//==================================================================================

/// Encodes a sequence of optional integers.
///
/// An empty input encodes to an empty output. A non-empty input without any
/// non-null value encodes with `window = 1, low = 0` so that it stays invertible.
pub fn encode<T>(values: &[Option<T>]) -> Result<Vec<T>>
where
    T: PrimInt + Signed + Euclid + std::fmt::Debug,
{
    if values.is_empty() {
        return Ok(Vec::new());
    }

    let present = values.iter().flatten().copied();
    let (low, high) = match present.clone().min().zip(present.max()) {
        Some(bounds) => bounds,
        None => (T::zero(), T::zero()),
    };

    let window = high
        .checked_sub(&low)
        .and_then(|span| span.checked_add(&T::one()))
        .ok_or_else(|| {
            AfvalError::EncodingViolation(format!(
                "delta window of [{low:?}, {high:?}] does not fit the integer type"
            ))
        })?;
    let ten = <T as NumCast>::from(10).unwrap_or_else(T::max_value);

    let mut out = Vec::with_capacity(values.len() + 2);
    out.push(window);
    out.push(low);

    let mut a = low;
    for value in values {
        let d = match value {
            None => window,
            Some(b) => {
                // Both ends lie in [low, high], so the difference cannot overflow.
                let d1 = (*b - a).rem_euclid(&window);
                let d2 = d1 - window;
                a = *b;
                // `-10 * d2 < d1`, where `-d2` is positive and at most `window`.
                match (window - d1).checked_mul(&ten) {
                    Some(cost) if cost < d1 => d2,
                    _ => d1,
                }
            }
        };
        out.push(d);
    }
    Ok(out)
}

//==================================================================================
// 2. Decode
//==================================================================================

/// Reconstructs the original sequence. Any step `>= window` decodes to null.
pub fn decode<T>(encoded: &[T]) -> Result<Vec<Option<T>>>
where
    T: PrimInt + Signed + Euclid + std::fmt::Debug,
{
    let (window, low, steps) = match encoded {
        [] => return Ok(Vec::new()),
        [window, low, steps @ ..] => (*window, *low, steps),
        [_] => {
            return Err(AfvalError::EncodingViolation(
                "delta stream is missing its [window, low] header".to_string(),
            ))
        }
    };
    if window <= T::zero() {
        return Err(AfvalError::EncodingViolation(format!(
            "delta window must be positive, got {window:?}"
        )));
    }

    let overflow = || AfvalError::EncodingViolation("delta accumulator overflowed".to_string());

    let mut a = T::zero();
    let mut out = Vec::with_capacity(steps.len());
    for &d in steps {
        if d < window {
            a = a.checked_add(&d).ok_or_else(overflow)?.rem_euclid(&window);
            out.push(Some(a.checked_add(&low).ok_or_else(overflow)?));
        } else {
            out.push(None);
        }
    }
    Ok(out)
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_reference_vector() {
        let values = vec![Some(2i64), Some(3), Some(1), Some(2), Some(0), None, Some(3), Some(3)];
        let encoded = encode(&values).unwrap();
        assert_eq!(encoded, vec![4, 0, 2, 1, 2, 1, 2, 4, 3, 0]);
        assert_eq!(decode(&encoded).unwrap(), values);
    }

    #[test]
    fn test_delta_prefers_short_negative_steps() {
        // Stepping from 0 to 9 in a window of 10: d1 = 9, d2 = -1, and 10 < 9 fails,
        // so the positive representative is kept.
        assert_eq!(encode(&[Some(0i64), Some(9)]).unwrap(), vec![10, 0, 0, 9]);
        // In a window of 100 a step of 99 becomes -1.
        let encoded = encode(&[Some(0i64), Some(99), Some(98)]).unwrap();
        assert_eq!(encoded, vec![100, 0, 0, -1, -1]);
        assert_eq!(
            decode(&encoded).unwrap(),
            vec![Some(0), Some(99), Some(98)]
        );
    }

    #[test]
    fn test_delta_empty_and_all_null() {
        assert_eq!(encode::<i64>(&[]).unwrap(), Vec::<i64>::new());
        assert_eq!(decode::<i64>(&[]).unwrap(), Vec::<Option<i64>>::new());

        let all_null = vec![None::<i64>, None];
        let encoded = encode(&all_null).unwrap();
        assert_eq!(encoded, vec![1, 0, 1, 1]);
        assert_eq!(decode(&encoded).unwrap(), all_null);
    }

    #[test]
    fn test_delta_single_distinct_value() {
        let values = vec![Some(5i64), Some(5), None];
        let encoded = encode(&values).unwrap();
        assert_eq!(encoded, vec![1, 5, 0, 0, 1]);
        assert_eq!(decode(&encoded).unwrap(), values);

        assert_eq!(encode(&[Some(-3i64)]).unwrap(), vec![1, -3, 0]);
        assert_eq!(decode(&[1i64, -3, 0]).unwrap(), vec![Some(-3)]);
    }

    #[test]
    fn test_delta_negative_low_i32() {
        let values = vec![Some(-5i32), Some(-7), None, Some(12)];
        let encoded = encode(&values).unwrap();
        assert_eq!(&encoded[..2], &[20, -7]);
        assert_eq!(decode(&encoded).unwrap(), values);
    }

    #[test]
    fn test_delta_window_overflow_is_rejected() {
        let result = encode(&[Some(i64::MIN), Some(i64::MAX)]);
        assert!(matches!(result, Err(AfvalError::EncodingViolation(_))));
    }

    #[test]
    fn test_decode_rejects_truncated_header() {
        assert!(decode(&[4i64]).is_err());
        assert!(decode(&[0i64, 0, 1]).is_err());
    }
}
