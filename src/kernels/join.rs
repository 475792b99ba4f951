//! String join (`j`) and its inverse, split.
//!
//! `[]` joins to `""` and `""` splits to `[]`. The single-element list `[""]`
//! would also join to `""`, so it is rejected instead of being silently lost.
//! An element that contains the separator would split into extra elements and is
//! rejected for the same reason.

use crate::error::{AfvalError, Result};

pub fn encode<S: AsRef<str>>(values: &[S], separator: &str) -> Result<String> {
    if separator.is_empty() {
        return Err(AfvalError::EncodingViolation(
            "join separator must not be empty".to_string(),
        ));
    }
    if let [only] = values {
        if only.as_ref().is_empty() {
            return Err(AfvalError::EncodingViolation(
                "cannot join [\"\"]: it is indistinguishable from []".to_string(),
            ));
        }
    }
    if let Some(bad) = values.iter().find(|v| v.as_ref().contains(separator)) {
        return Err(AfvalError::EncodingViolation(format!(
            "element {:?} contains the separator {separator:?}",
            bad.as_ref()
        )));
    }

    let mut out = String::new();
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(v.as_ref());
    }
    Ok(out)
}

pub fn decode(joined: &str, separator: &str) -> Result<Vec<String>> {
    if separator.is_empty() {
        return Err(AfvalError::EncodingViolation(
            "split separator must not be empty".to_string(),
        ));
    }
    if joined.is_empty() {
        return Ok(Vec::new());
    }
    Ok(joined.split(separator).map(str::to_string).collect())
}
