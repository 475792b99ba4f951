//! This module builds the weighings dataset: new source weighings are derived,
//! enriched against the containers and areas, and appended to the weighings
//! already published.
//!
//! The run is incremental. Source weighings whose `(systeem_id, volgnummer)` is
//! already present in the existing output are skipped, and the new ones are
//! also returned on their own as a delta dataset.

pub mod clusters;
pub mod weighing;

use chrono::{DateTime, Utc};
use hashbrown::HashSet;

use crate::config::EnrichmentConfig;
use crate::error::Result;
use crate::spatial::AreaTree;
use crate::types::{Dataset, Record, Value};

pub use self::clusters::{
    cluster_fractions, enrich_weighings, ClusterFraction, ContainerContext, EnrichmentSummary,
};
pub use self::weighing::{derive_weighing, event_time, VehicleRegister};

/// Source datasets of one weighings run.
#[derive(Debug, Clone, Copy)]
pub struct WeighingSources<'a> {
    /// Rows with `SystemId` and `VehicleReg`.
    pub vehicles: &'a Dataset,
    /// Source weighing rows, see [`weighing`].
    pub weighings: &'a Dataset,
}

/// Decoded reference datasets the weighings are enriched against.
#[derive(Debug, Clone, Copy)]
pub struct Reference<'a> {
    pub containers: &'a Dataset,
    pub areas: &'a Dataset,
}

/// Result of a weighings run.
#[derive(Debug, Clone, PartialEq)]
pub struct WeighingUpdate {
    /// Existing and new weighings together.
    pub full: Dataset,
    /// Only the new weighings.
    pub delta: Dataset,
    /// Watermark of the output the delta applies on top of.
    pub base: Option<String>,
    pub summary: EnrichmentSummary,
}

fn output_key(record: &Record) -> Option<(Value, i64)> {
    let system = record.get("systeem_id")?.clone();
    let seq = record.get("volgnummer")?.as_i64()?;
    Some((system, seq))
}

/// Runs one incremental update. Returns `None` when the source watermark equals
/// the existing output's, meaning there is nothing new.
///
/// With `after`, source weighings older than `after` are not added and the
/// full output only keeps weighings strictly later than it.
pub fn update_weighings(
    existing: Dataset,
    sources: WeighingSources<'_>,
    reference: Reference<'_>,
    config: &EnrichmentConfig,
    after: Option<DateTime<Utc>>,
) -> Result<Option<WeighingUpdate>> {
    if sources.weighings.last_change == existing.last_change {
        log::debug!("[WEIGHINGS] skip: no changes since {:?}", existing.last_change);
        return Ok(None);
    }

    let tree = AreaTree::from_dataset(reference.areas, &config.area_levels)?;
    let vehicles = VehicleRegister::from_dataset(sources.vehicles);
    let known: HashSet<(Value, i64)> = existing.records().iter().filter_map(output_key).collect();

    let mut added = Vec::new();
    for row in sources.weighings.records() {
        if known.contains(&weighing::source_key(row)?) {
            continue;
        }
        let at = event_time(row)?;
        if after.is_some_and(|after| at < after) {
            continue;
        }
        added.push(derive_weighing(row, &at, &vehicles)?);
    }

    let summary = enrich_weighings(
        &mut added,
        reference.containers.records(),
        &tree,
        config,
    );

    let last_change = sources.weighings.last_change.clone();
    let base = existing.last_change.clone();
    let delta = Dataset::flat(last_change.clone(), added.clone());

    let mut records: Vec<Record> = existing.groups.into_values().flatten().collect();
    records.extend(added);
    if let Some(after) = after {
        // Decoded outputs carry `datum_ms` as a float.
        let theta = after.timestamp_millis() as f64;
        records.retain(|w| w.get("datum_ms").and_then(Value::as_f64).is_some_and(|ms| ms > theta));
    }
    let mut full = Dataset::flat(last_change, records);
    full.last_sync = existing.last_sync;

    log::info!(
        "[WEIGHINGS] {} new weighings, {} in total",
        delta.len(),
        full.len()
    );
    log_metric!(
        "event" = "update_weighings",
        "added" = delta.len(),
        "matched" = summary.matched,
        "total" = full.len(),
    );

    Ok(Some(WeighingUpdate {
        full,
        delta,
        base,
        summary,
    }))
}

#[cfg(test)]
mod update_tests;
