// In: src/pipeline/frame.rs

//! This module contains the row/column reshaping steps that surround the
//! per-field chains: flattening named groups into one collection (and back),
//! the stable composite sort, and the transpose between records and columns.
//!
//! Column order follows the first record's field order, which is also the order
//! restored on decode.

use indexmap::IndexMap;

use crate::error::{AfvalError, Result};
use crate::types::{Columns, Dataset, Record, Value, DEFAULT_GROUP};

//==================================================================================
// 1. Groups
//==================================================================================

/// Flattens the dataset into a single record collection.
///
/// With a group field every record is prefixed with `group_field: <group name>`.
/// Without one the dataset must be plain (only the `data` group).
pub fn combine(dataset: &Dataset, group_field: Option<&str>) -> Result<Vec<Record>> {
    match group_field {
        Some(field) => {
            let mut out = Vec::with_capacity(dataset.len());
            for (name, rows) in &dataset.groups {
                for row in rows {
                    let mut record = Record::with_capacity(row.len() + 1);
                    record.insert(field.to_string(), Value::Str(name.clone()));
                    for (k, v) in row {
                        if k != field {
                            record.insert(k.clone(), v.clone());
                        }
                    }
                    out.push(record);
                }
            }
            Ok(out)
        }
        None => {
            if let Some(other) = dataset.groups.keys().find(|k| *k != DEFAULT_GROUP) {
                return Err(AfvalError::SpecMismatch(format!(
                    "dataset has group '{other}' but the transform declares no group field"
                )));
            }
            Ok(dataset.records().to_vec())
        }
    }
}

/// Splits records back into named groups by `group_field`, stripping the field.
/// Without a group field all records land in the `data` group.
pub fn separate(
    records: Vec<Record>,
    group_field: Option<&str>,
) -> Result<IndexMap<String, Vec<Record>>> {
    let mut groups: IndexMap<String, Vec<Record>> = IndexMap::new();
    let Some(field) = group_field else {
        groups.insert(DEFAULT_GROUP.to_string(), records);
        return Ok(groups);
    };

    for mut record in records {
        let name = match record.shift_remove(field) {
            Some(Value::Str(name)) => name,
            Some(other) => {
                return Err(AfvalError::EncodingViolation(format!(
                    "group field '{field}' must hold a string, got {other}"
                )))
            }
            None => {
                return Err(AfvalError::SpecMismatch(format!(
                    "decoded record has no group field '{field}'"
                )))
            }
        };
        groups.entry(name).or_default().push(record);
    }
    Ok(groups)
}

//==================================================================================
// 2. Sort
//==================================================================================

/// Stable sort by the composite key `keys`. A missing field sorts as null.
pub fn sort_records(records: &mut [Record], keys: &[String]) {
    if keys.is_empty() {
        return;
    }
    static NULL: Value = Value::Null;
    records.sort_by(|a, b| {
        keys.iter()
            .map(|k| a.get(k).unwrap_or(&NULL).cmp(b.get(k).unwrap_or(&NULL)))
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

//==================================================================================
// 3. Transpose
//==================================================================================

/// `[{a: x, b: y}, {a: u, b: v}] -> {a: [x, u], b: [y, v]}`.
///
/// Every record must carry exactly the fields of the first one.
pub fn transpose(records: &[Record]) -> Result<Columns> {
    let Some(first) = records.first() else {
        return Ok(Columns::new());
    };

    let mut columns: IndexMap<String, Vec<Value>> = first
        .keys()
        .map(|k| (k.clone(), Vec::with_capacity(records.len())))
        .collect();

    for (row, record) in records.iter().enumerate() {
        if record.len() != columns.len() {
            return Err(AfvalError::SpecMismatch(format!(
                "record {row} has {} fields, expected {}",
                record.len(),
                columns.len()
            )));
        }
        for (field, column) in columns.iter_mut() {
            let value = record.get(field).ok_or_else(|| {
                AfvalError::SpecMismatch(format!("record {row} is missing field '{field}'"))
            })?;
            column.push(value.clone());
        }
    }

    Ok(columns
        .into_iter()
        .map(|(k, column)| (k, Value::List(column)))
        .collect())
}

/// Inverse of [`transpose`]. All columns must be lists of equal length.
pub fn untranspose(columns: Columns) -> Result<Vec<Record>> {
    let mut lists: Vec<(String, Vec<Value>)> = Vec::with_capacity(columns.len());
    for (field, column) in columns {
        let items = column
            .into_list("a decoded column")
            .map_err(|e| e.in_field("data", &field))?;
        lists.push((field, items));
    }

    let rows = lists.first().map_or(0, |(_, items)| items.len());
    if let Some((field, items)) = lists.iter().find(|(_, items)| items.len() != rows) {
        return Err(AfvalError::EncodingViolation(format!(
            "column '{field}' has {} values, expected {rows}",
            items.len()
        )));
    }

    let mut records: Vec<Record> = (0..rows)
        .map(|_| Record::with_capacity(lists.len()))
        .collect();
    for (field, items) in lists {
        for (record, value) in records.iter_mut().zip(items) {
            record.insert(field.clone(), value);
        }
    }
    Ok(records)
}

//==================================================================================
// 4. Unit Tests
//==================================================================================
