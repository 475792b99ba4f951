// In: src/pipeline/executor.rs

//! This module contains the core execution logic for a single field's chain.
//!
//! It is a non-strategic component that faithfully executes a linear sequence of
//! steps: left to right on encode, right to left on decode. Choosing which field
//! runs when, and against which channel, is the job of the orchestrator.

use crate::error::Result;
use crate::kernels::{self, DecodeContext, EncodeContext};
use crate::pipeline::models::Chain;
use crate::types::Value;

/// Executes a chain forward.
pub(crate) fn execute_encode_chain(
    chain: &Chain,
    input: Value,
    ctx: &mut EncodeContext<'_>,
) -> Result<Value> {
    let mut current = input;
    for (i, step) in chain.steps().iter().enumerate() {
        log::trace!("[EXECUTOR] encode {} step {}: {}", ctx.field, i, step.code());
        current = kernels::dispatch_encode(step, current, ctx)?;
    }
    Ok(current)
}

/// Executes a chain in reverse, undoing each step.
pub(crate) fn execute_decode_chain(
    chain: &Chain,
    input: Value,
    ctx: &DecodeContext<'_>,
) -> Result<Value> {
    let mut current = input;
    for (i, step) in chain.steps().iter().enumerate().rev() {
        log::trace!("[EXECUTOR] decode {} step {}: {}", ctx.field, i, step.code());
        current = kernels::dispatch_decode(step, current, ctx)?;
    }
    Ok(current)
}
