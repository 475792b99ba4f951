//! This module contains the index (dictionary) kernel and its inverse lookup.
//!
//! Encoding replaces every value by the position of that value in a table of
//! distinct values. The table travels in the artifact's `raw` channel under the
//! field's name; the ordering policy of the table is part of the contract and is
//! chosen per field by the Transform Specification.
//!
//! The cross-reference kernel (`x`) reuses [`lookup`] for its decode direction.

use std::hash::Hash;

use hashbrown::HashMap;

use crate::error::{AfvalError, Result};
use crate::pipeline::models::IndexOrder;

//==================================================================================
// 1. Public API
//==================================================================================

/// Encodes `values` into `(codes, table)` such that `table[codes[k]] == values[k]`.
pub fn encode<T>(values: &[T], order: IndexOrder) -> (Vec<usize>, Vec<T>)
where
    T: Eq + Hash + Ord + Clone,
{
    let table = distinct(values, order);
    let codes: Vec<usize> = {
        let positions: HashMap<&T, usize> =
            table.iter().enumerate().map(|(i, v)| (v, i)).collect();

        // Every value is in `table` by construction.
        values
            .iter()
            .map(|v| positions.get(v).copied().unwrap_or_default())
            .collect()
    };
    (codes, table)
}

/// Replaces every code by `table[code]`.
pub fn lookup<T: Clone>(codes: &[usize], table: &[T]) -> Result<Vec<T>> {
    codes
        .iter()
        .map(|&code| {
            table.get(code).cloned().ok_or_else(|| {
                AfvalError::ReferenceError(format!(
                    "code {code} is out of range for a table of {} entries",
                    table.len()
                ))
            })
        })
        .collect()
}

//==================================================================================
// 2. Table Construction
//==================================================================================

/// The distinct values of `values`, ordered by the given policy.
pub fn distinct<T>(values: &[T], order: IndexOrder) -> Vec<T>
where
    T: Eq + Hash + Ord + Clone,
{
    // First-occurrence order with occurrence counts.
    let mut slots: HashMap<&T, usize> = HashMap::with_capacity(values.len().min(1024));
    let mut seen: Vec<(&T, usize)> = Vec::new();
    for v in values {
        match slots.get(v) {
            Some(&slot) => seen[slot].1 += 1,
            None => {
                slots.insert(v, seen.len());
                seen.push((v, 1));
            }
        }
    }

    match order {
        IndexOrder::Unsorted => {}
        IndexOrder::Ascending => seen.sort_by(|a, b| a.0.cmp(b.0)),
        // Stable: equal counts keep first-occurrence order.
        IndexOrder::Frequency => seen.sort_by(|a, b| b.1.cmp(&a.1)),
    }
    seen.into_iter().map(|(v, _)| v.clone()).collect()
}

//==================================================================================
// 3. Unit Tests
//==================================================================================
