// In: src/pipeline/orchestrator.rs

//! This module contains the top-level encode and decode orchestrators.
//!
//! `encode` flattens the dataset (injecting the group field when one is declared),
//! sorts it, lays it out in columns, and then runs every declared chain: first the
//! `data` channel, then the `raw` channel, each in declared field order. `decode`
//! is the exact mirror: `raw` first, then `data`, each in reverse field order with
//! every chain run right to left.
//!
//! Decoding restores the records in their sorted order, not in the order they had
//! before encoding.

use crate::error::{AfvalError, Result};
use crate::kernels::{DecodeContext, EncodeContext};
use crate::pipeline::artifact::EncodedArtifact;
use crate::pipeline::executor::{execute_decode_chain, execute_encode_chain};
use crate::pipeline::frame;
use crate::pipeline::models::{Channel, TransformSpec};
use crate::types::{Columns, Dataset, Value};

//==================================================================================
// 1. Encode
//==================================================================================

/// Encodes `dataset` according to `spec` into a self-describing artifact.
pub fn encode(dataset: &Dataset, spec: &TransformSpec) -> Result<EncodedArtifact> {
    spec.validate()?;

    let mut records = frame::combine(dataset, spec.group.as_deref())?;
    frame::sort_records(&mut records, &spec.sort_order);
    let mut data = frame::transpose(&records)?;

    // Declared fields of an empty dataset still get a (trivially encoded) column.
    if records.is_empty() {
        for field in spec.data.keys() {
            data.insert(field.clone(), Value::List(Vec::new()));
        }
    }

    let mut raw = Columns::new();

    for (field, chain) in &spec.data {
        let column = data.get_mut(field).ok_or_else(|| {
            AfvalError::SpecMismatch(format!("data.{field}: field is not present in the dataset"))
        })?;
        let input = std::mem::take(column);
        let mut ctx = EncodeContext {
            field,
            index_order: spec.index_order_of(field),
            tables: &mut raw,
        };
        *column = execute_encode_chain(chain, input, &mut ctx)
            .map_err(|e| e.in_field(Channel::Data.name(), field))?;
    }

    for (field, chain) in &spec.raw {
        let input = take_entry(&mut raw, Channel::Raw, field)?;
        let mut ctx = EncodeContext {
            field,
            index_order: spec.index_order_of(field),
            tables: &mut raw,
        };
        let output = execute_encode_chain(chain, input, &mut ctx)
            .map_err(|e| e.in_field(Channel::Raw.name(), field))?;
        raw.insert(field.clone(), output);
    }

    log_metric!(
        "event" = "encode",
        "records" = records.len(),
        "data_fields" = data.len(),
        "raw_fields" = raw.len(),
    );

    Ok(EncodedArtifact {
        last_change: dataset.last_change.clone(),
        last_delta: None,
        data,
        raw,
        transform: spec.clone(),
    })
}

//==================================================================================
// 2. Decode
//==================================================================================

/// Reconstructs the dataset from an artifact, using only its embedded specification.
pub fn decode(artifact: &EncodedArtifact) -> Result<Dataset> {
    let spec = &artifact.transform;
    spec.validate()?;

    let mut raw = artifact.raw.clone();
    for (field, chain) in spec.raw.iter().rev() {
        let input = take_entry(&mut raw, Channel::Raw, field)?;
        let ctx = DecodeContext {
            field,
            tables: &raw,
        };
        let output = execute_decode_chain(chain, input, &ctx)
            .map_err(|e| e.in_field(Channel::Raw.name(), field))?;
        raw.insert(field.clone(), output);
    }

    let mut data = artifact.data.clone();
    for (field, chain) in spec.data.iter().rev() {
        let input = take_entry(&mut data, Channel::Data, field)?;
        let ctx = DecodeContext {
            field,
            tables: &raw,
        };
        let output = execute_decode_chain(chain, input, &ctx)
            .map_err(|e| e.in_field(Channel::Data.name(), field))?;
        data.insert(field.clone(), output);
    }

    let records = frame::untranspose(data)?;
    log_metric!("event" = "decode", "records" = records.len());
    let groups = frame::separate(records, spec.group.as_deref())?;

    Ok(Dataset::grouped(artifact.last_change.clone(), groups))
}

/// Takes a channel entry out of its map, leaving a null placeholder so the
/// entry keeps its position when the result is written back.
fn take_entry(columns: &mut Columns, channel: Channel, field: &str) -> Result<Value> {
    columns.get_mut(field).map(std::mem::take).ok_or_else(|| {
        AfvalError::SpecMismatch(format!(
            "{}.{field}: declared in the transform but missing from the artifact",
            channel.name()
        ))
    })
}
