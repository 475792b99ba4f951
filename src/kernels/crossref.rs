//! Cross-reference kernel: maps values to their position in another field's
//! index table. Decoding is a plain [`super::index::lookup`].

use std::hash::Hash;

use hashbrown::HashMap;

use crate::error::{AfvalError, Result};

/// Encodes every value as its position in `reference`. When `reference` holds
/// duplicates the last position wins.
pub fn encode<T>(values: &[T], reference: &[T]) -> Result<Vec<usize>>
where
    T: Eq + Hash + std::fmt::Display,
{
    let positions: HashMap<&T, usize> =
        reference.iter().enumerate().map(|(i, r)| (r, i)).collect();

    values
        .iter()
        .map(|v| {
            positions.get(v).copied().ok_or_else(|| {
                AfvalError::ReferenceError(format!("value {v} is not in the reference table"))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossref_positions() {
        let reference = vec!["a", "b", "c", "d"];
        let codes = encode(&["a", "c", "c", "d", "b"], &reference).unwrap();
        assert_eq!(codes, vec![0, 2, 2, 3, 1]);
    }

    #[test]
    fn test_crossref_missing_value_is_reference_error() {
        let result = encode(&["a", "zz"], &["a", "b"]);
        match result {
            Err(AfvalError::ReferenceError(msg)) => assert!(msg.contains("zz")),
            other => panic!("expected a reference error, got {other:?}"),
        }
    }
}
