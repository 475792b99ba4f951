// In: src/pipeline/artifact.rs

//! Defines the self-describing persisted form of an encoded dataset.
//! This module is the single source of truth for serialization, deserialization,
//! and cheap inspection of the artifact.
//!
//! An artifact is one JSON object with exactly four top-level entries:
//! `last_change`, `data`, `raw` and `transform`. The Transform Specification
//! travels with the data, so a reader never needs schema knowledge of its own.
//! Delta artifacts add a fifth, `last_delta`: the watermark of the full
//! artifact the delta applies on top of.

use serde::{Deserialize, Serialize};

use crate::error::{AfvalError, Result};
use crate::pipeline::models::{Channel, TransformSpec};
use crate::types::{Columns, Value};

//==================================================================================
// Public Structs
//==================================================================================

/// A fully encoded dataset in memory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EncodedArtifact {
    /// Opaque watermark, passed through unchanged.
    pub last_change: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_delta: Option<String>,
    /// One encoded array per field, in column order.
    pub data: Columns,
    /// Index side-tables, possibly further encoded by the `raw` channel chains.
    pub raw: Columns,
    pub transform: TransformSpec,
}

/// Serialized size of one channel entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldStats {
    pub channel: &'static str,
    pub field: String,
    /// The chain in wire form, e.g. `m>,1000000,s,d>`. Empty for undeclared columns.
    pub chain: String,
    pub encoded_bytes: usize,
}

/// Size report for an artifact, returned by [`EncodedArtifact::stats`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStats {
    pub last_change: Option<String>,
    pub total_bytes: usize,
    pub transform_bytes: usize,
    pub fields: Vec<FieldStats>,
}

//==================================================================================
// Core Implementation
//==================================================================================

impl EncodedArtifact {
    /// Marks this artifact as a delta on top of the artifact with watermark `base`.
    pub fn with_last_delta(mut self, base: Option<String>) -> Self {
        self.last_delta = base;
        self
    }

    /// Serializes the artifact into its canonical compact JSON bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes an artifact. The embedded specification is validated here so
    /// that a corrupt chain is reported before any decoding starts.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let artifact: Self = serde_json::from_slice(bytes)?;
        artifact.transform.validate()?;
        Ok(artifact)
    }

    /// Reports the serialized size of every channel entry and of the embedded
    /// specification.
    pub fn stats(&self) -> Result<ArtifactStats> {
        let mut fields = Vec::with_capacity(self.data.len() + self.raw.len());
        for channel in [Channel::Data, Channel::Raw] {
            let (columns, chains) = match channel {
                Channel::Data => (&self.data, &self.transform.data),
                Channel::Raw => (&self.raw, &self.transform.raw),
            };
            for (field, value) in columns {
                let chain = chains
                    .get(field)
                    .map(|c| {
                        c.to_wire()
                            .iter()
                            .map(|item| match item {
                                serde_json::Value::String(s) => s.clone(),
                                other => other.to_string(),
                            })
                            .collect::<Vec<_>>()
                            .join(",")
                    })
                    .unwrap_or_default();
                fields.push(FieldStats {
                    channel: channel.name(),
                    field: field.clone(),
                    chain,
                    encoded_bytes: encoded_len(value)?,
                });
            }
        }

        Ok(ArtifactStats {
            last_change: self.last_change.clone(),
            total_bytes: self.to_bytes()?.len(),
            transform_bytes: serde_json::to_vec(&self.transform)?.len(),
            fields,
        })
    }
}

fn encoded_len(value: &Value) -> Result<usize> {
    serde_json::to_vec(value)
        .map(|bytes| bytes.len())
        .map_err(|e| AfvalError::InternalError(format!("cannot measure a channel entry: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact() -> EncodedArtifact {
        serde_json::from_value(json!({
            "last_change": "2023-03-01T00:00:00",
            "data": {"fractie": [[0, 1], [2, 1]]},
            "raw": {"fractie": "Rest@Glas"},
            "transform": {
                "data": {"fractie": ["i", "r"]},
                "raw": {"fractie": ["j", "@"]},
            },
        }))
        .unwrap()
    }

    #[test]
    fn test_artifact_has_exactly_four_top_level_entries() {
        let bytes = artifact().to_bytes().unwrap();
        let object: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let keys: Vec<&String> = object.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["last_change", "data", "raw", "transform"]);
        assert_eq!(EncodedArtifact::from_bytes(&bytes).unwrap(), artifact());
    }

    #[test]
    fn test_delta_artifact_carries_its_base_watermark() {
        let delta = artifact().with_last_delta(Some("2023-02-28T00:00:00".into()));
        let object: serde_json::Value = serde_json::from_slice(&delta.to_bytes().unwrap()).unwrap();
        assert_eq!(object["last_delta"], json!("2023-02-28T00:00:00"));
        assert_eq!(EncodedArtifact::from_bytes(&delta.to_bytes().unwrap()).unwrap(), delta);
    }

    #[test]
    fn test_from_bytes_rejects_unknown_primitive() {
        let bytes = br#"{"last_change":null,"data":{},"raw":{},"transform":{"data":{"a":["q"]}}}"#;
        assert!(EncodedArtifact::from_bytes(bytes).is_err());
    }

    #[test]
    fn test_stats_reports_each_channel_entry() {
        let stats = artifact().stats().unwrap();
        assert_eq!(stats.fields.len(), 2);
        assert_eq!(stats.fields[0].channel, "data");
        assert_eq!(stats.fields[0].chain, "i,r");
        assert_eq!(stats.fields[0].encoded_bytes, "[[0,1],[2,1]]".len());
        assert_eq!(stats.fields[1].chain, "j,@");
        assert_eq!(stats.fields[1].encoded_bytes, "\"Rest@Glas\"".len());
        assert!(stats.total_bytes > stats.transform_bytes);
    }
}
