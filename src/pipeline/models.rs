// In: src/pipeline/models.rs

//! The declarative contract of the codec: primitive operations, per-field
//! chains, and the Transform Specification that travels inside every artifact.
//!
//! A chain is written on the wire exactly like the historical artifacts: a flat
//! JSON list of primitive codes interleaved with their static arguments, e.g.
//! `["m>", 1000000, "s", "d>"]`. A trailing `>` maps the primitive over the items
//! of the outer array instead of applying it to the array as a whole. Parsing
//! turns this list into strongly typed [`Step`]s, so an unknown code or a missing
//! argument is rejected once, at load time, instead of deep inside a decode.

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value as JsonValue};

use crate::error::{AfvalError, Result};

//==================================================================================
// 1. Primitive Operations
//==================================================================================

/// A fixed-point scale factor, written as an integer (`1000000`) or a float
/// (`0.001`). The written form is kept so re-serializing a specification gives
/// back the same JSON.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Factor {
    Int(i64),
    Float(f64),
}

impl Factor {
    pub fn as_f64(&self) -> f64 {
        match *self {
            Factor::Int(k) => k as f64,
            Factor::Float(f) => f,
        }
    }

    /// The factor as an integer when it was written as one.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Factor::Int(k) => Some(k),
            Factor::Float(_) => None,
        }
    }

    fn is_usable(&self) -> bool {
        let f = self.as_f64();
        f.is_finite() && f != 0.0
    }

    fn from_number(n: &Number) -> Option<Self> {
        match n.as_i64() {
            Some(k) => Some(Factor::Int(k)),
            None => n.as_f64().map(Factor::Float),
        }
    }

    fn to_json(self) -> JsonValue {
        match self {
            Factor::Int(k) => JsonValue::from(k),
            Factor::Float(f) => Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number),
        }
    }
}

impl From<i64> for Factor {
    fn from(k: i64) -> Self {
        Factor::Int(k)
    }
}

impl From<f64> for Factor {
    fn from(f: f64) -> Self {
        Factor::Float(f)
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factor::Int(k) => write!(f, "{k}"),
            Factor::Float(x) => write!(f, "{x}"),
        }
    }
}

/// The closed set of primitives. Each variant carries its static arguments, so
/// the executor never reads arguments out of the data stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// `i`: values -> small-integer codes plus a side-table in the `raw` channel.
    Index,
    /// `d`: windowed modular delta with a reserved null marker.
    Delta,
    /// `m`: multiply and round to the nearest integer (lossy to `1/factor`).
    Scale { factor: Factor },
    /// `j`: join a list of strings with a separator.
    Join { separator: String },
    /// `r`: collapse runs into `[values, counts]`.
    RunLength,
    /// `s`: flatten inner lists into `[lengths, values]`.
    Stack,
    /// `x`: replace values by their position in another field's index table.
    CrossRef { target: String },
}

impl Operation {
    /// The single-letter wire code of the primitive.
    pub fn code(&self) -> char {
        match self {
            Operation::Index => 'i',
            Operation::Delta => 'd',
            Operation::Scale { .. } => 'm',
            Operation::Join { .. } => 'j',
            Operation::RunLength => 'r',
            Operation::Stack => 's',
            Operation::CrossRef { .. } => 'x',
        }
    }

    fn argument(&self) -> Option<JsonValue> {
        match self {
            Operation::Scale { factor } => Some(factor.to_json()),
            Operation::Join { separator } => Some(JsonValue::String(separator.clone())),
            Operation::CrossRef { target } => Some(JsonValue::String(target.clone())),
            _ => None,
        }
    }
}

/// One entry of a chain: a primitive, optionally mapped over the outer array.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub op: Operation,
    /// `true` for the `>` form: apply to every item instead of the whole array.
    pub each: bool,
}

impl Step {
    pub fn index() -> Self {
        Self::whole(Operation::Index)
    }

    pub fn delta() -> Self {
        Self::whole(Operation::Delta)
    }

    pub fn scale(factor: Factor) -> Self {
        Self::whole(Operation::Scale { factor })
    }

    pub fn join(separator: &str) -> Self {
        Self::whole(Operation::Join {
            separator: separator.to_string(),
        })
    }

    pub fn run_length() -> Self {
        Self::whole(Operation::RunLength)
    }

    pub fn stack() -> Self {
        Self::whole(Operation::Stack)
    }

    pub fn cross_ref(target: &str) -> Self {
        Self::whole(Operation::CrossRef {
            target: target.to_string(),
        })
    }

    /// Switches the step to its item-wise (`>`) form.
    pub fn each(mut self) -> Self {
        self.each = true;
        self
    }

    fn whole(op: Operation) -> Self {
        Step { op, each: false }
    }

    /// The wire code including the `>` suffix, e.g. `"m>"`.
    pub fn code(&self) -> String {
        let mut code = self.op.code().to_string();
        if self.each {
            code.push('>');
        }
        code
    }
}

//==================================================================================
// 2. Chains (wire form: flat list of codes and arguments)
//==================================================================================

/// The ordered primitive chain of one field. Executed left to right on encode,
/// right to left on decode.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(try_from = "Vec<JsonValue>", into = "Vec<JsonValue>")]
pub struct Chain(Vec<Step>);

impl Chain {
    pub fn new(steps: Vec<Step>) -> Self {
        Chain(steps)
    }

    pub fn steps(&self) -> &[Step] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses the flat wire form.
    pub fn parse(items: &[JsonValue]) -> Result<Self> {
        let mut steps = Vec::new();
        let mut it = items.iter();

        while let Some(item) = it.next() {
            let code = item.as_str().ok_or_else(|| {
                AfvalError::SpecMismatch(format!("expected a primitive code, got {item}"))
            })?;
            let (base, each) = match code.strip_suffix('>') {
                Some(base) => (base, true),
                None => (code, false),
            };

            let mut string_arg = |what: &str| -> Result<String> {
                it.next()
                    .and_then(JsonValue::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        AfvalError::SpecMismatch(format!("primitive '{code}' requires a {what}"))
                    })
            };

            let op = match base {
                "i" => Operation::Index,
                "d" => Operation::Delta,
                "r" => Operation::RunLength,
                "s" => Operation::Stack,
                "j" => Operation::Join {
                    separator: string_arg("separator string")?,
                },
                "x" => Operation::CrossRef {
                    target: string_arg("target field name")?,
                },
                "m" => {
                    let factor = match it.next() {
                        Some(JsonValue::Number(n)) => Factor::from_number(n),
                        _ => None,
                    };
                    let factor = factor.ok_or_else(|| {
                        AfvalError::SpecMismatch(format!(
                            "primitive '{code}' requires a numeric factor"
                        ))
                    })?;
                    Operation::Scale { factor }
                }
                _ => {
                    return Err(AfvalError::SpecMismatch(format!(
                        "unknown primitive code '{code}'"
                    )))
                }
            };
            steps.push(Step { op, each });
        }
        Ok(Chain(steps))
    }

    /// Renders the flat wire form.
    pub fn to_wire(&self) -> Vec<JsonValue> {
        let mut out = Vec::with_capacity(self.0.len() * 2);
        for step in &self.0 {
            out.push(JsonValue::String(step.code()));
            if let Some(arg) = step.op.argument() {
                out.push(arg);
            }
        }
        out
    }
}

impl TryFrom<Vec<JsonValue>> for Chain {
    type Error = AfvalError;

    fn try_from(items: Vec<JsonValue>) -> Result<Self> {
        Chain::parse(&items)
    }
}

impl From<Chain> for Vec<JsonValue> {
    fn from(chain: Chain) -> Self {
        chain.to_wire()
    }
}

impl FromIterator<Step> for Chain {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Chain(iter.into_iter().collect())
    }
}

//==================================================================================
// 3. Transform Specification
//==================================================================================

/// Ordering of the distinct values in an index side-table.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexOrder {
    /// First-occurrence order.
    #[default]
    Unsorted,
    /// Sorted distinct values.
    Ascending,
    /// Descending occurrence count; ties keep first-occurrence order.
    Frequency,
}

/// The channels of an artifact, in encode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Data,
    Raw,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Data => "data",
            Channel::Raw => "raw",
        }
    }
}

/// The declarative, per-dataset description of grouping, sort order and
/// per-field primitive chains. It fully determines encode and decode.
///
/// Field order inside `data` and `raw` is significant: fields run in declared
/// order on encode and in reverse on decode.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TransformSpec {
    /// Synthetic field that carries the group name of a partitioned dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default)]
    pub data: IndexMap<String, Chain>,

    #[serde(default)]
    pub raw: IndexMap<String, Chain>,

    /// Composite sort key applied before the columnar layout.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort_order: Vec<String>,

    /// Per-field ordering of index side-tables. Unlisted fields are `Unsorted`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub index_order: IndexMap<String, IndexOrder>,
}

impl TransformSpec {
    pub fn channel(&self, channel: Channel) -> &IndexMap<String, Chain> {
        match channel {
            Channel::Data => &self.data,
            Channel::Raw => &self.raw,
        }
    }

    pub fn index_order_of(&self, field: &str) -> IndexOrder {
        self.index_order.get(field).copied().unwrap_or_default()
    }

    /// Checks the dependency order between fields before any data is touched.
    ///
    /// Rejects an `x` step whose target table does not exist yet at that point
    /// of the encode, an `i` step in the `raw` channel or in `>` form, a `raw`
    /// channel entry without an index table, and a zero or non-finite scale factor.
    pub fn validate(&self) -> Result<()> {
        let mut tables: HashSet<&str> = HashSet::new();

        for (field, chain) in &self.data {
            for step in chain.steps() {
                match &step.op {
                    Operation::Index if step.each => {
                        return Err(AfvalError::SpecMismatch(format!(
                            "data.{field}: the index primitive has no '>' form"
                        )));
                    }
                    Operation::Index => {
                        tables.insert(field.as_str());
                    }
                    Operation::CrossRef { target } if !tables.contains(target.as_str()) => {
                        return Err(AfvalError::SpecMismatch(format!(
                            "data.{field}: cross-reference to '{target}' before its index table is built"
                        )));
                    }
                    Operation::Scale { factor } if !factor.is_usable() => {
                        return Err(AfvalError::SpecMismatch(format!(
                            "data.{field}: unusable scale factor {factor}"
                        )));
                    }
                    _ => {}
                }
            }
        }

        for (field, chain) in &self.raw {
            if !tables.contains(field.as_str()) {
                return Err(AfvalError::SpecMismatch(format!(
                    "raw.{field}: no index table is produced for this field"
                )));
            }
            for step in chain.steps() {
                match &step.op {
                    Operation::Index => {
                        return Err(AfvalError::SpecMismatch(format!(
                            "raw.{field}: index tables cannot be indexed again"
                        )));
                    }
                    Operation::CrossRef { target }
                        if target == field || !tables.contains(target.as_str()) =>
                    {
                        return Err(AfvalError::SpecMismatch(format!(
                            "raw.{field}: invalid cross-reference target '{target}'"
                        )));
                    }
                    Operation::Scale { factor } if !factor.is_usable() => {
                        return Err(AfvalError::SpecMismatch(format!(
                            "raw.{field}: unusable scale factor {factor}"
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}
