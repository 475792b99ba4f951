//! This module contains the run-length kernel (`r`) and its inverse, repeat.
//!
//! The encoded form is the pair `[values, counts]` with `values[k] != values[k+1]`
//! and every count positive. An empty input encodes to `[[], []]`.

use crate::error::{AfvalError, Result};

/// Longest column a run-length pair may expand to.
pub const MAX_DECODED_LEN: usize = 1 << 26;

//==================================================================================
// 1. Public API
//==================================================================================

pub fn encode<T: PartialEq + Clone>(values: &[T]) -> (Vec<T>, Vec<usize>) {
    let mut runs: Vec<T> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();

    for v in values {
        match (runs.last(), counts.last_mut()) {
            (Some(last), Some(count)) if last == v => *count += 1,
            _ => {
                runs.push(v.clone());
                counts.push(1);
            }
        }
    }
    (runs, counts)
}

pub fn decode<T: Clone>(runs: &[T], counts: &[usize]) -> Result<Vec<T>> {
    if runs.len() != counts.len() {
        return Err(AfvalError::EncodingViolation(format!(
            "run-length pair has {} values but {} counts",
            runs.len(),
            counts.len()
        )));
    }
    let total = counts
        .iter()
        .try_fold(0usize, |acc, &n| acc.checked_add(n))
        .filter(|&total| total <= MAX_DECODED_LEN)
        .ok_or_else(|| {
            AfvalError::EncodingViolation(format!(
                "run-length counts expand beyond {MAX_DECODED_LEN} values"
            ))
        })?;
    let mut out = Vec::with_capacity(total);
    for (v, &count) in runs.iter().zip(counts) {
        out.extend(std::iter::repeat(v).take(count).cloned());
    }
    Ok(out)
}

//==================================================================================
// 2. Unit Tests
//==================================================================================
