// In: src/config.rs

//! The single source of truth for afval configuration.
//!
//! `AfvalConfig` is created once at the application boundary (the CLI reads it
//! from a JSON file) and then passed down by reference. Every field has a
//! default, so a config file only needs the settings it changes.

use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::TransformSpec;
use crate::presets;

//==================================================================================
// I. Enrichment
//==================================================================================

/// Settings for the geospatial enrichment of weighing events.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Maximum distance in metres between a weighing and its nearest container
    /// for the container's attributes to be attached.
    pub max_distance: f64,

    /// Earth radius in metres used to turn central angles into distances. The
    /// default is the sea-level radius at Amsterdam's latitude, not the global mean.
    pub earth_radius: f64,

    /// Weight of a pressing container's volume in `afvalvolume`.
    pub press_factor: f64,

    /// Group names of the area dataset, top level first: borough, district,
    /// neighborhood.
    pub area_levels: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_distance: 35.0,
            earth_radius: 6_364_763.0,
            press_factor: 2.5,
            area_levels: vec![
                "stadsdelen".to_string(),
                "wijken".to_string(),
                "buurten".to_string(),
            ],
        }
    }
}

//==================================================================================
// II. Logging
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of `off`, `error`, `warn`, `info`, `debug`, `trace`.
    pub level: String,
    /// Append log output to this file instead of stderr.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

//==================================================================================
// III. The Unified AfvalConfig
//==================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AfvalConfig {
    pub enrichment: EnrichmentConfig,

    pub logging: LoggingConfig,

    /// Transform Specifications by dataset kind. Defaults to the built-in presets;
    /// a config file that sets this key replaces the whole table.
    #[serde(default = "presets::all")]
    pub transforms: IndexMap<String, TransformSpec>,
}

impl Default for AfvalConfig {
    fn default() -> Self {
        Self {
            enrichment: EnrichmentConfig::default(),
            logging: LoggingConfig::default(),
            transforms: presets::all(),
        }
    }
}

impl AfvalConfig {
    /// Reads a JSON config file and validates every transform it carries.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: AfvalConfig = serde_json::from_str(&text)?;
        for spec in config.transforms.values() {
            spec.validate()?;
        }
        Ok(config)
    }

    pub fn transform(&self, kind: &str) -> Option<&TransformSpec> {
        self.transforms.get(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AfvalConfig = serde_json::from_value(json!({})).unwrap();
        assert_eq!(config, AfvalConfig::default());
        assert_eq!(config.enrichment.max_distance, 35.0);
        assert_eq!(config.enrichment.earth_radius, 6_364_763.0);
        assert!(config.transform(presets::WEGINGEN).is_some());
    }

    #[test]
    fn test_partial_enrichment_override() {
        let config: AfvalConfig = serde_json::from_value(json!({
            "enrichment": {"max_distance": 50.0},
            "logging": {"level": "debug"},
        }))
        .unwrap();
        assert_eq!(config.enrichment.max_distance, 50.0);
        assert_eq!(config.enrichment.press_factor, 2.5);
        assert_eq!(config.enrichment.area_levels.len(), 3);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file, None);
    }

    #[test]
    fn test_custom_transform_table_replaces_presets() {
        let config: AfvalConfig = serde_json::from_value(json!({
            "transforms": {"kort": {"data": {"a": ["i", "r"]}, "raw": {"a": ["j", "@"]}}},
        }))
        .unwrap();
        assert_eq!(config.transforms.len(), 1);
        assert!(config.transform("kort").is_some());
        assert!(config.transform(presets::CONTAINERS).is_none());
    }

    #[test]
    fn test_from_json_file_rejects_invalid_transform() {
        let path = std::env::temp_dir().join(format!("afval-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"transforms": {"x": {"data": {"a": ["x", "b"]}}}}"#).unwrap();
        let result = AfvalConfig::from_json_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(crate::error::AfvalError::SpecMismatch(_))));
    }
}
