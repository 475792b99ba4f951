//! This module defines the canonical, type-safe representation of a single field
//! value as it flows through the codec.
//!
//! A `Value` is either a JSON scalar or a finite list of values. Intermediate
//! results of the primitives reuse the same representation: a run-length or
//! stack result is a two-element list `[values, counts]`, a join result is a
//! string. This keeps every stage of a chain serializable as plain JSON.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{AfvalError, Result};

/// A field value. Missing values are `Null`, never omitted.
///
/// Equality and hashing are structural; `Int(1)` and `Float(1.0)` are distinct
/// values. Floats are compared by bit pattern after folding `-0.0` into `0.0`
/// (JSON input never carries NaN).
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
}

impl Value {
    /// Builds the `[first, second]` pair produced by run-length and stack primitives.
    pub fn pair(first: Vec<Value>, second: Vec<Value>) -> Self {
        Value::List(vec![Value::List(first), Value::List(second)])
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of an `Int` or `Float`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Consumes the value as a list, or fails with an `EncodingViolation`
    /// naming what was expected.
    pub fn into_list(self, expected: &str) -> Result<Vec<Value>> {
        match self {
            Value::List(items) => Ok(items),
            other => Err(AfvalError::EncodingViolation(format!(
                "expected {expected}, got {}",
                other.kind()
            ))),
        }
    }

    /// Consumes a `[first, second]` pair.
    pub fn into_pair(self, expected: &str) -> Result<(Value, Value)> {
        let items = self.into_list(expected)?;
        let len = items.len();
        let mut it = items.into_iter();
        match (it.next(), it.next(), it.next()) {
            (Some(a), Some(b), None) => Ok((a, b)),
            _ => Err(AfvalError::EncodingViolation(format!(
                "expected {expected} as a pair, got a list of {len} items"
            ))),
        }
    }

    /// Short type name for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
        }
    }

    /// Rank of the variant family in the total order: null < bool < number < string < list.
    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int(_) | Value::Float(_) => 2,
            Value::Str(_) => 3,
            Value::List(_) => 4,
        }
    }
}

fn canonical_bits(f: f64) -> u64 {
    if f == 0.0 {
        0.0f64.to_bits()
    } else {
        f.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Int(i) => i.hash(state),
            Value::Float(f) => canonical_bits(*f).hash(state),
            Value::Str(s) => s.hash(state),
            Value::List(items) => items.hash(state),
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            // Mixed numbers compare numerically; an exact tie puts the Int first
            // so that the order stays consistent with `Eq`.
            (Value::Int(a), Value::Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Value::Float(a), Value::Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(s) => f.write_str(&s),
            Err(_) => write!(f, "<{}>", self.kind()),
        }
    }
}

//==================================================================================
// Conversions
//==================================================================================

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_deserialization_keeps_int_and_float_apart() {
        let v: Value = serde_json::from_str(r#"[1, 1.0, null, "a", true, [2]]"#).unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Int(1),
                Value::Float(1.0),
                Value::Null,
                Value::from("a"),
                Value::Bool(true),
                Value::List(vec![Value::Int(2)]),
            ])
        );
        assert_eq!(serde_json::to_string(&v).unwrap(), r#"[1,1.0,null,"a",true,[2]]"#);
    }

    #[test]
    fn test_total_order_ranks_null_first() {
        let mut values = vec![
            Value::from("b"),
            Value::Float(2.5),
            Value::Null,
            Value::Int(3),
            Value::Int(-1),
            Value::from("a"),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Int(-1),
                Value::Float(2.5),
                Value::Int(3),
                Value::from("a"),
                Value::from("b"),
            ]
        );
    }

    #[test]
    fn test_negative_zero_hashes_like_zero() {
        use std::collections::HashSet;
        let set: HashSet<Value> = [Value::Float(0.0), Value::Float(-0.0)].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_into_pair_rejects_wrong_arity() {
        let err = Value::from(vec![1i64, 2, 3]).into_pair("run-length pair").unwrap_err();
        assert!(matches!(err, AfvalError::EncodingViolation(_)));
    }
}
