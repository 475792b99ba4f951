// In: src/presets.rs

//! Built-in Transform Specifications for the three published dataset kinds.
//!
//! The chains and side-table orderings are pinned: artifacts already in
//! circulation were written with exactly these specifications, and the
//! consuming front-end relies on the resulting layout.

use indexmap::IndexMap;

use crate::pipeline::models::{Chain, Factor, IndexOrder, Step, TransformSpec};

/// Name of the areas preset.
pub const GEBIEDEN: &str = "gebieden";
/// Name of the containers preset.
pub const CONTAINERS: &str = "containers";
/// Name of the weighings preset.
pub const WEGINGEN: &str = "wegingen";

const COORDINATE_FACTOR: i64 = 1_000_000;

fn chain<const N: usize>(steps: [Step; N]) -> Chain {
    Chain::new(steps.into())
}

fn fields<const N: usize>(entries: [(&str, Chain); N]) -> IndexMap<String, Chain> {
    entries
        .into_iter()
        .map(|(field, chain)| (field.to_string(), chain))
        .collect()
}

fn orders<const N: usize>(entries: [(&str, IndexOrder); N]) -> IndexMap<String, IndexOrder> {
    entries
        .into_iter()
        .map(|(field, order)| (field.to_string(), order))
        .collect()
}

fn names(fields: &[&str]) -> Vec<String> {
    fields.iter().map(|f| f.to_string()).collect()
}

fn indexed_runs() -> Chain {
    chain([Step::index(), Step::run_length()])
}

fn indexed_deltas() -> Chain {
    chain([Step::index(), Step::delta()])
}

fn joined() -> Chain {
    chain([Step::join("@")])
}

fn coordinate() -> Chain {
    chain([Step::scale(Factor::Int(COORDINATE_FACTOR)), Step::delta()])
}

/// Areas: one group per level plus the `""` sentinel group.
pub fn gebieden() -> TransformSpec {
    // Polygon rings: scale every vertex, flatten the rings, delta both halves.
    let ring = || {
        chain([
            Step::scale(Factor::Int(COORDINATE_FACTOR)).each(),
            Step::stack(),
            Step::delta().each(),
        ])
    };

    TransformSpec {
        group: Some("gebied".to_string()),
        data: fields([
            ("gebied", indexed_runs()),
            ("naam", chain([Step::index(), Step::delta(), Step::run_length()])),
            ("code", joined()),
            ("ligt_in", chain([Step::cross_ref("naam"), Step::run_length()])),
            ("lat", ring()),
            ("lon", ring()),
        ]),
        raw: fields([("naam", joined())]),
        sort_order: names(&["gebied", "ligt_in"]),
        index_order: orders([
            ("gebied", IndexOrder::Unsorted),
            ("naam", IndexOrder::Unsorted),
        ]),
    }
}

pub fn containers() -> TransformSpec {
    TransformSpec {
        group: None,
        data: fields([
            ("fractie", indexed_runs()),
            ("volume", indexed_runs()),
            ("type", indexed_runs()),
            ("persend", indexed_runs()),
            ("cluster_id", chain([Step::delta()])),
            ("adres", indexed_deltas()),
            ("cluster", indexed_deltas()),
            ("code", joined()),
            ("lat", coordinate()),
            ("lon", coordinate()),
        ]),
        raw: fields([("adres", joined()), ("cluster", joined())]),
        sort_order: names(&[
            "fractie",
            "volume",
            "type",
            "persend",
            "cluster_id",
            "adres",
            "cluster",
        ]),
        index_order: orders([
            ("fractie", IndexOrder::Frequency),
            ("volume", IndexOrder::Frequency),
            ("type", IndexOrder::Frequency),
            ("persend", IndexOrder::Ascending),
            ("adres", IndexOrder::Unsorted),
            ("cluster", IndexOrder::Unsorted),
        ]),
    }
}

pub fn wegingen() -> TransformSpec {
    // Millisecond timestamps are stored with one-second resolution.
    let seconds = || chain([Step::scale(Factor::Float(0.001)), Step::delta()]);

    TransformSpec {
        group: None,
        data: fields([
            ("systeem_id", indexed_runs()),
            ("kenteken", indexed_runs()),
            ("fractie", indexed_runs()),
            ("volgnummer", chain([Step::delta(), Step::run_length()])),
            ("lat", coordinate()),
            ("lon", coordinate()),
            ("datum_ms", seconds()),
            ("tijd_ms", seconds()),
            ("datum_str", indexed_runs()),
            ("tijd_str", indexed_deltas()),
            ("weekdag_ma1", indexed_runs()),
            ("eerste_weging", chain([Step::index()])),
            ("tweede_weging", chain([Step::index()])),
            ("netto_gewicht", chain([Step::index()])),
            ("afstand", chain([Step::scale(Factor::Int(10))])),
            (
                "containers",
                chain([Step::join(",").each(), Step::index(), Step::delta()]),
            ),
            ("containervolume", indexed_runs()),
            ("afvalvolume", indexed_runs()),
            ("cluster", indexed_deltas()),
            ("adres", indexed_deltas()),
            ("buurt", indexed_runs()),
            ("wijk", indexed_runs()),
            ("stadsdeel", indexed_runs()),
        ]),
        raw: fields([
            ("kenteken", joined()),
            ("datum_str", joined()),
            ("tijd_str", joined()),
            ("containers", joined()),
            ("cluster", joined()),
            ("adres", joined()),
            ("buurt", joined()),
            ("wijk", joined()),
            ("stadsdeel", joined()),
        ]),
        sort_order: names(&["systeem_id", "datum_ms"]),
        index_order: orders([
            ("systeem_id", IndexOrder::Unsorted),
            ("kenteken", IndexOrder::Unsorted),
            ("fractie", IndexOrder::Unsorted),
            ("datum_str", IndexOrder::Ascending),
            ("tijd_str", IndexOrder::Ascending),
            ("weekdag_ma1", IndexOrder::Ascending),
            ("eerste_weging", IndexOrder::Frequency),
            ("tweede_weging", IndexOrder::Frequency),
            ("netto_gewicht", IndexOrder::Frequency),
            ("containers", IndexOrder::Unsorted),
            ("containervolume", IndexOrder::Frequency),
            ("afvalvolume", IndexOrder::Frequency),
            ("cluster", IndexOrder::Unsorted),
            ("adres", IndexOrder::Unsorted),
            ("buurt", IndexOrder::Unsorted),
            ("wijk", IndexOrder::Unsorted),
            ("stadsdeel", IndexOrder::Unsorted),
        ]),
    }
}

/// All presets by name, in publication order.
pub fn all() -> IndexMap<String, TransformSpec> {
    let mut presets = IndexMap::new();
    presets.insert(GEBIEDEN.to_string(), gebieden());
    presets.insert(CONTAINERS.to_string(), containers());
    presets.insert(WEGINGEN.to_string(), wegingen());
    presets
}
