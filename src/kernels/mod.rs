//! This module serves as the public API and dispatcher for the collection of all
//! pure, stateless primitive kernels.
//!
//! It declares all kernel sub-modules and provides the `dispatch_encode` and
//! `dispatch_decode` functions, which are the sole entry points for the
//! `pipeline::executor`. The dispatcher takes a parsed [`Step`], converts the
//! dynamically typed [`Value`] into the concrete slice type each kernel expects,
//! calls the generic kernel, and converts the result back. The `>` form of a step
//! is handled here once, by mapping the primitive over the items of the outer list.

use crate::error::{AfvalError, Result};
use crate::pipeline::models::{Factor, IndexOrder, Operation, Step};
use crate::types::{Columns, Value};

//==================================================================================
// 1. Module Declarations
//==================================================================================

/// Value reduction
pub mod delta;
pub mod scale;

/// Dictionary coding
pub mod crossref;
pub mod index;

/// Structural
pub mod join;
pub mod rle;
pub mod stack;

//==================================================================================
// 2. Kernel Context
//==================================================================================

/// What a step may see besides its own input while encoding: the field it runs
/// for, the side-table ordering of that field, and the `raw` channel built so far.
pub struct EncodeContext<'a> {
    pub field: &'a str,
    pub index_order: IndexOrder,
    pub tables: &'a mut Columns,
}

/// Decode counterpart of [`EncodeContext`]. The `raw` channel is fully decoded
/// before any `data` field is touched, so it is read-only here.
pub struct DecodeContext<'a> {
    pub field: &'a str,
    pub tables: &'a Columns,
}

//==================================================================================
// 3. Public API (Unified Dispatchers)
//==================================================================================

/// The single, unified dispatcher for all ENCODE operations.
pub fn dispatch_encode(step: &Step, input: Value, ctx: &mut EncodeContext<'_>) -> Result<Value> {
    if step.each {
        let items = input.into_list("a list for a mapped primitive")?;
        return items
            .into_iter()
            .map(|item| encode_one(&step.op, item, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::List);
    }
    encode_one(&step.op, input, ctx)
}

/// The single, unified dispatcher for all DECODE operations.
pub fn dispatch_decode(step: &Step, input: Value, ctx: &DecodeContext<'_>) -> Result<Value> {
    if step.each {
        let items = input.into_list("a list for a mapped primitive")?;
        return items
            .into_iter()
            .map(|item| decode_one(&step.op, item, ctx))
            .collect::<Result<Vec<_>>>()
            .map(Value::List);
    }
    decode_one(&step.op, input, ctx)
}

fn encode_one(op: &Operation, input: Value, ctx: &mut EncodeContext<'_>) -> Result<Value> {
    match op {
        Operation::Index => {
            let values = input.into_list("a list to index")?;
            let (codes, table) = index::encode(&values, ctx.index_order);
            ctx.tables.insert(ctx.field.to_string(), Value::List(table));
            Ok(from_codes(codes))
        }
        Operation::Delta => {
            let values = to_optional_ints(input.into_list("a list of integers to delta-encode")?)?;
            Ok(delta::encode(&values)?.into())
        }
        Operation::Scale { factor } => scale_encode(input, factor),
        Operation::Join { separator } => {
            let values = to_strings(input.into_list("a list of strings to join")?)?;
            Ok(Value::Str(join::encode(&values, separator)?))
        }
        Operation::RunLength => {
            let values = input.into_list("a list to run-length encode")?;
            let (runs, counts) = rle::encode(&values);
            Ok(Value::pair(runs, counts_to_values(counts)))
        }
        Operation::Stack => {
            let lists = input
                .into_list("a list of lists to stack")?
                .into_iter()
                .map(|item| item.into_list("an inner list to stack"))
                .collect::<Result<Vec<_>>>()?;
            let (lengths, values) = stack::encode(lists);
            Ok(Value::pair(counts_to_values(lengths), values))
        }
        Operation::CrossRef { target } => {
            let values = input.into_list("a list to cross-reference")?;
            let reference = reference_table(ctx.tables, target)?;
            Ok(from_codes(crossref::encode(&values, reference)?))
        }
    }
}

fn decode_one(op: &Operation, input: Value, ctx: &DecodeContext<'_>) -> Result<Value> {
    match op {
        Operation::Index => {
            let codes = to_codes(input.into_list("a list of index codes")?)?;
            let table = reference_table(ctx.tables, ctx.field)?;
            Ok(Value::List(index::lookup(&codes, table)?))
        }
        Operation::Delta => {
            let encoded = to_ints(input.into_list("a delta stream")?)?;
            Ok(delta::decode(&encoded)?.into())
        }
        Operation::Scale { factor } => scale_decode(input, factor),
        Operation::Join { separator } => match input {
            Value::Str(joined) => Ok(join::decode(&joined, separator)?.into()),
            other => Err(AfvalError::EncodingViolation(format!(
                "expected a joined string, got {}",
                other.kind()
            ))),
        },
        Operation::RunLength => {
            let (runs, counts) = input.into_pair("a run-length pair")?;
            let runs = runs.into_list("run values")?;
            let counts = to_codes(counts.into_list("run counts")?)?;
            Ok(Value::List(rle::decode(&runs, &counts)?))
        }
        Operation::Stack => {
            let (lengths, values) = input.into_pair("a stacked pair")?;
            let lengths = to_codes(lengths.into_list("stack lengths")?)?;
            let values = values.into_list("stacked values")?;
            Ok(stack::decode(&lengths, values)?.into())
        }
        Operation::CrossRef { target } => {
            let codes = to_codes(input.into_list("a list of cross-reference codes")?)?;
            let reference = reference_table(ctx.tables, target)?;
            Ok(Value::List(index::lookup(&codes, reference)?))
        }
    }
}

//==================================================================================
// 4. Scale (element-wise over a list or a single scalar)
//==================================================================================

fn scale_encode(input: Value, factor: &Factor) -> Result<Value> {
    let f = factor.as_f64();
    match input {
        Value::Null => Ok(Value::Null),
        Value::Int(v) => Ok(Value::Int(scale::encode_int(v, f, factor.as_i64())?)),
        Value::Float(v) => Ok(Value::Int(scale::encode_float(v, f)?)),
        Value::List(items) => items
            .into_iter()
            .map(|item| match item {
                Value::List(_) => Err(AfvalError::EncodingViolation(
                    "cannot scale a nested list without the '>' form".to_string(),
                )),
                scalar => scale_encode(scalar, factor),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => Err(AfvalError::EncodingViolation(format!(
            "cannot scale a {}",
            other.kind()
        ))),
    }
}

fn scale_decode(input: Value, factor: &Factor) -> Result<Value> {
    let f = factor.as_f64();
    match input {
        Value::Null => Ok(Value::Null),
        Value::Int(v) => Ok(Value::Float(scale::decode(v as f64, f))),
        Value::Float(v) => Ok(Value::Float(scale::decode(v, f))),
        Value::List(items) => items
            .into_iter()
            .map(|item| match item {
                Value::List(_) => Err(AfvalError::EncodingViolation(
                    "cannot unscale a nested list without the '>' form".to_string(),
                )),
                scalar => scale_decode(scalar, factor),
            })
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => Err(AfvalError::EncodingViolation(format!(
            "cannot unscale a {}",
            other.kind()
        ))),
    }
}

//==================================================================================
// 5. Value <-> Slice Conversion Helpers
//==================================================================================

fn reference_table<'t>(tables: &'t Columns, name: &str) -> Result<&'t [Value]> {
    tables
        .get(name)
        .and_then(Value::as_list)
        .ok_or_else(|| AfvalError::ReferenceError(format!("no index table for '{name}'")))
}

fn from_codes(codes: Vec<usize>) -> Value {
    Value::List(codes.into_iter().map(|c| Value::Int(c as i64)).collect())
}

fn counts_to_values(counts: Vec<usize>) -> Vec<Value> {
    counts.into_iter().map(|c| Value::Int(c as i64)).collect()
}

fn to_codes(items: Vec<Value>) -> Result<Vec<usize>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Int(i) if i >= 0 => Ok(i as usize),
            other => Err(AfvalError::EncodingViolation(format!(
                "expected a non-negative integer code, got {other}"
            ))),
        })
        .collect()
}

fn to_ints(items: Vec<Value>) -> Result<Vec<i64>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Int(i) => Ok(i),
            other => Err(AfvalError::EncodingViolation(format!(
                "expected an integer, got {other}"
            ))),
        })
        .collect()
}

fn to_optional_ints(items: Vec<Value>) -> Result<Vec<Option<i64>>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Null => Ok(None),
            Value::Int(i) => Ok(Some(i)),
            other => Err(AfvalError::EncodingViolation(format!(
                "delta requires integers or null, got {other}"
            ))),
        })
        .collect()
}

fn to_strings(items: Vec<Value>) -> Result<Vec<String>> {
    items
        .into_iter()
        .map(|item| match item {
            Value::Str(s) => Ok(s),
            other => Err(AfvalError::EncodingViolation(format!(
                "join requires strings, got {other}"
            ))),
        })
        .collect()
}

//==================================================================================
// 6. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_dispatch_index_writes_side_table() {
        let mut tables = Columns::new();
        let mut ctx = EncodeContext {
            field: "fractie",
            index_order: IndexOrder::Unsorted,
            tables: &mut tables,
        };
        let out = dispatch_encode(&Step::index(), v(json!(["Rest", "Glas", "Rest"])), &mut ctx).unwrap();
        assert_eq!(out, v(json!([0, 1, 0])));
        assert_eq!(tables["fractie"], v(json!(["Rest", "Glas"])));

        let dctx = DecodeContext {
            field: "fractie",
            tables: &tables,
        };
        let back = dispatch_decode(&Step::index(), out, &dctx).unwrap();
        assert_eq!(back, v(json!(["Rest", "Glas", "Rest"])));
    }

    #[test]
    fn test_dispatch_mapped_scale_and_delta() {
        let mut tables = Columns::new();
        let mut ctx = EncodeContext {
            field: "lat",
            index_order: IndexOrder::Unsorted,
            tables: &mut tables,
        };
        let scale = Step::scale(Factor::from(10)).each();
        let out = dispatch_encode(&scale, v(json!([[1.25, 2.0], [null]])), &mut ctx).unwrap();
        assert_eq!(out, v(json!([[12, 20], [null]])));

        let delta = Step::delta().each();
        let out = dispatch_encode(&delta, out, &mut ctx).unwrap();
        assert_eq!(out, v(json!([[9, 12, 0, 8], [1, 0, 1]])));
    }

    #[test]
    fn test_dispatch_mapped_join_over_lists() {
        let mut tables = Columns::new();
        let mut ctx = EncodeContext {
            field: "containers",
            index_order: IndexOrder::Unsorted,
            tables: &mut tables,
        };
        let step = Step::join(",").each();
        let out = dispatch_encode(&step, v(json!([["A1", "A2"], []])), &mut ctx).unwrap();
        assert_eq!(out, v(json!(["A1,A2", ""])));

        let dctx = DecodeContext {
            field: "containers",
            tables: &tables,
        };
        let back = dispatch_decode(&step, out, &dctx).unwrap();
        assert_eq!(back, v(json!([["A1", "A2"], []])));
    }

    #[test]
    fn test_dispatch_delta_rejects_floats() {
        let mut tables = Columns::new();
        let mut ctx = EncodeContext {
            field: "a",
            index_order: IndexOrder::Unsorted,
            tables: &mut tables,
        };
        let result = dispatch_encode(&Step::delta(), v(json!([1, 2.5])), &mut ctx);
        assert!(matches!(result, Err(AfvalError::EncodingViolation(_))));
    }

    #[test]
    fn test_dispatch_scale_decode_rejects_strings() {
        let tables = Columns::new();
        let dctx = DecodeContext {
            field: "a",
            tables: &tables,
        };
        let step = Step::scale(Factor::from(1000));
        let result = dispatch_decode(&step, v(json!(["12"])), &dctx);
        assert!(matches!(result, Err(AfvalError::EncodingViolation(_))));
    }

    #[test]
    fn test_dispatch_crossref_missing_table() {
        let mut tables = Columns::new();
        let mut ctx = EncodeContext {
            field: "ligt_in",
            index_order: IndexOrder::Unsorted,
            tables: &mut tables,
        };
        let result = dispatch_encode(&Step::cross_ref("naam"), v(json!(["x"])), &mut ctx);
        assert!(matches!(result, Err(AfvalError::ReferenceError(_))));
    }
}
