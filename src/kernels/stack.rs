//! Stack (`s`) flattens a list of lists into `[lengths, concatenation]`; tear is
//! the inverse and re-splits at the cumulative lengths.

use crate::error::{AfvalError, Result};

pub fn encode<T>(lists: Vec<Vec<T>>) -> (Vec<usize>, Vec<T>) {
    let lengths = lists.iter().map(Vec::len).collect();
    let values = lists.into_iter().flatten().collect();
    (lengths, values)
}

pub fn decode<T>(lengths: &[usize], values: Vec<T>) -> Result<Vec<Vec<T>>> {
    let total = lengths
        .iter()
        .try_fold(0usize, |acc, &n| acc.checked_add(n))
        .ok_or_else(|| AfvalError::EncodingViolation("stack lengths overflow".to_string()))?;
    if total != values.len() {
        return Err(AfvalError::EncodingViolation(format!(
            "stack lengths sum to {total} but {} values are present",
            values.len()
        )));
    }

    let mut rest = values.into_iter();
    Ok(lengths
        .iter()
        .map(|&n| rest.by_ref().take(n).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_and_tear() {
        let lists = vec![vec!["a", "b", "c"], vec![], vec!["d", "e"]];
        let (lengths, values) = encode(lists.clone());
        assert_eq!(lengths, vec![3, 0, 2]);
        assert_eq!(values, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(decode(&lengths, values).unwrap(), lists);
    }

    #[test]
    fn test_tear_length_mismatch() {
        let result = decode(&[2, 2], vec![1, 2, 3]);
        assert!(matches!(result, Err(AfvalError::EncodingViolation(_))));
    }

    #[test]
    fn test_tear_overflowing_lengths() {
        // Wrapped, these lengths would sum to 1 and match the single value.
        let result = decode(&[usize::MAX, 2], vec![1]);
        assert!(matches!(result, Err(AfvalError::EncodingViolation(_))));
    }
}
