//! Row-oriented datasets as they are exchanged with the pull/merge layer.
//!
//! On disk a dataset is one JSON object: the opaque `last_change` watermark plus
//! one or more named groups of records. A plain dataset has the single group
//! `data`; a partitioned one (e.g. the three area kinds) has one key per group.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::Value;

/// An ordered mapping from field name to value. Fields are fixed per dataset kind.
pub type Record = IndexMap<String, Value>;

/// A column-oriented frame: field name to one array value per field, in record order.
/// Also used for the `raw` channel, where each entry is an index side-table.
pub type Columns = IndexMap<String, Value>;

/// The group name used by non-partitioned datasets.
pub const DEFAULT_GROUP: &str = "data";

/// A collection of records sharing a schema, tagged with a watermark that the
/// codec passes through untouched.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Dataset {
    pub last_change: Option<String>,

    /// Local sync timestamp written by the pull layer; carried through when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<String>,

    #[serde(flatten)]
    pub groups: IndexMap<String, Vec<Record>>,
}

impl Dataset {
    /// The documented default for a dataset that does not exist yet:
    /// `{"last_change": null, "data": []}`.
    pub fn empty() -> Self {
        Self::flat(None, Vec::new())
    }

    pub fn flat(last_change: Option<String>, records: Vec<Record>) -> Self {
        let mut groups = IndexMap::new();
        groups.insert(DEFAULT_GROUP.to_string(), records);
        Self {
            last_change,
            last_sync: None,
            groups,
        }
    }

    pub fn grouped(last_change: Option<String>, groups: IndexMap<String, Vec<Record>>) -> Self {
        Self {
            last_change,
            last_sync: None,
            groups,
        }
    }

    /// Records of a non-partitioned dataset. Empty when the `data` group is absent.
    pub fn records(&self) -> &[Record] {
        self.group(DEFAULT_GROUP)
    }

    pub fn group(&self, name: &str) -> &[Record] {
        self.groups.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grouped_dataset_roundtrips_through_json() {
        let raw = json!({
            "last_change": "2023-01-01T00:00:00",
            "stadsdelen": [{"naam": "Centrum", "code": "A"}],
            "wijken": [],
        });
        let ds: Dataset = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(ds.groups.len(), 2);
        assert_eq!(ds.group("stadsdelen")[0]["naam"], Value::from("Centrum"));
        assert_eq!(serde_json::to_value(&ds).unwrap(), raw);
    }

    #[test]
    fn test_empty_default_shape() {
        let ds = Dataset::empty();
        assert_eq!(
            serde_json::to_value(&ds).unwrap(),
            json!({"last_change": null, "data": []})
        );
        assert!(ds.is_empty());
    }

    #[test]
    fn test_last_sync_is_not_a_group() {
        let ds: Dataset = serde_json::from_value(json!({
            "last_change": "x",
            "last_sync": "y",
            "data": [{"a": 1}],
        }))
        .unwrap();
        assert_eq!(ds.last_sync.as_deref(), Some("y"));
        assert_eq!(ds.groups.len(), 1);
        assert_eq!(ds.records().len(), 1);
    }
}
