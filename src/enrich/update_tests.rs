use chrono::{TimeZone, Utc};
use serde_json::json;

use crate::config::EnrichmentConfig;
use crate::enrich::{update_weighings, Reference, WeighingSources};
use crate::pipeline::{decode, encode};
use crate::presets;
use crate::types::{Dataset, Value};

// Test Helpers
fn dataset(json: serde_json::Value) -> Dataset {
    serde_json::from_value(json).unwrap()
}

fn areas() -> Dataset {
    let ring = |x0: f64, y0: f64, x1: f64, y1: f64| {
        (json!([x0, x1, x1, x0]), json!([y0, y0, y1, y1]))
    };
    let (lon_s, lat_s) = ring(4.85, 52.35, 4.95, 52.40);
    let (lon_w, lat_w) = ring(4.88, 52.36, 4.91, 52.38);
    let (lon_b, lat_b) = ring(4.89, 52.37, 4.90, 52.375);
    dataset(json!({
        "last_change": "2023-01-01T00:00:00",
        "": [{"naam": "", "code": "", "ligt_in": "", "lon": [], "lat": []}],
        "stadsdelen": [{"naam": "Centrum", "code": "A", "ligt_in": "", "lon": lon_s, "lat": lat_s}],
        "wijken": [{"naam": "Burgwallen", "code": "A00", "ligt_in": "Centrum", "lon": lon_w, "lat": lat_w}],
        "buurten": [{"naam": "Dam", "code": "A00a", "ligt_in": "Burgwallen", "lon": lon_b, "lat": lat_b}],
    }))
}

fn containers() -> Dataset {
    dataset(json!({
        "last_change": "2023-02-01T00:00:00",
        "data": [
            {"code": "RES-1", "fractie": "Rest", "type": "Ondergronds", "volume": 5, "persend": true,
             "adres": "Dam 1", "cluster": "Dam", "cluster_id": 12, "lon": 4.89270, "lat": 52.37310},
            {"code": "RES-2", "fractie": "Rest", "type": "Ondergronds", "volume": 3, "persend": false,
             "adres": "Dam 2", "cluster": "Dam", "cluster_id": 12, "lon": 4.89275, "lat": 52.37312},
            {"code": "GLA-1", "fractie": "Glas", "type": "Ondergronds", "volume": 3, "persend": false,
             "adres": "Dam 1", "cluster": "Dam", "cluster_id": 12, "lon": 4.89272, "lat": 52.37311},
        ],
    }))
}

fn vehicles() -> Dataset {
    dataset(json!({
        "last_change": null,
        "data": [{"SystemId": 407, "VehicleReg": "12-ABC-3"}],
    }))
}

fn source_weighings() -> Dataset {
    dataset(json!({
        "last_change": "2023-03-02T13:00:00",
        "data": [
            // Already published.
            {"SystemId": 407, "Seq": "1", "Date": "2023-02-27", "Time": "08:00:00",
             "FractionId": "Rest", "FirstWeight": "1", "SecondWeight": "1", "NetWeight": "0",
             "Latitude": "52.37311", "Longitude": "4.89271"},
            // Next to the Rest containers on the Dam.
            {"SystemId": 407, "Seq": "2", "Date": "2023-03-01", "Time": "07:05:42",
             "FractionId": "Rest", "FirstWeight": "15020", "SecondWeight": "14410", "NetWeight": "610",
             "Latitude": "52.37311", "Longitude": "4.89271"},
            // Seventy metres from the glass container, inside the Dam neighborhood.
            {"SystemId": 408, "Seq": "7", "Date": "2023-03-02", "Time": "12:00:00",
             "FractionId": "Glas", "FirstWeight": "9000", "SecondWeight": "8800", "NetWeight": "200",
             "Latitude": "52.37311", "Longitude": "4.89375"},
            // No position.
            {"SystemId": 407, "Seq": "3", "Date": "2023-02-20", "Time": "06:00:00",
             "FractionId": "Rest", "FirstWeight": "100", "SecondWeight": "90", "NetWeight": "10",
             "Latitude": "", "Longitude": ""},
        ],
    }))
}

fn published() -> Dataset {
    let ms = Utc.with_ymd_and_hms(2023, 2, 27, 8, 0, 0).unwrap().timestamp_millis();
    dataset(json!({
        "last_change": "2023-02-28T00:00:00",
        "data": [{"systeem_id": 407, "volgnummer": 1, "datum_ms": ms}],
    }))
}

fn run(existing: Dataset, after: Option<chrono::DateTime<Utc>>) -> Option<crate::enrich::WeighingUpdate> {
    let (vehicles, weighings) = (vehicles(), source_weighings());
    let (containers, areas) = (containers(), areas());
    update_weighings(
        existing,
        WeighingSources {
            vehicles: &vehicles,
            weighings: &weighings,
        },
        Reference {
            containers: &containers,
            areas: &areas,
        },
        &EnrichmentConfig::default(),
        after,
    )
    .unwrap()
}

//==================================================================================
// Incremental runs
//==================================================================================

#[test]
fn test_unchanged_source_is_skipped() {
    let mut existing = published();
    existing.last_change = Some("2023-03-02T13:00:00".into());
    assert!(run(existing, None).is_none());
}

#[test]
fn test_new_weighings_are_appended_and_returned_as_delta() {
    let update = run(published(), None).unwrap();

    assert_eq!(update.base.as_deref(), Some("2023-02-28T00:00:00"));
    assert_eq!(update.delta.last_change.as_deref(), Some("2023-03-02T13:00:00"));
    assert_eq!(update.full.last_change, update.delta.last_change);

    let added = update.delta.records();
    let keys: Vec<(Value, Value)> = added
        .iter()
        .map(|w| (w["systeem_id"].clone(), w["volgnummer"].clone()))
        .collect();
    assert_eq!(
        keys,
        [
            (Value::Int(407), Value::Int(2)),
            (Value::Int(408), Value::Int(7)),
            (Value::Int(407), Value::Int(3)),
        ]
    );
    assert_eq!(update.full.records().len(), 4);
    assert_eq!(update.full.records()[0]["volgnummer"], Value::Int(1));

    let matched = &added[0];
    assert_eq!(matched["kenteken"], Value::from("12-ABC-3"));
    assert_eq!(matched["containers"], Value::List(vec!["RES-1".into(), "RES-2".into()]));
    assert_eq!(matched["afvalvolume"], Value::Float(15.5));
    assert_eq!(matched["buurt"], Value::from("Dam"));

    let far = &added[1];
    assert_eq!(far["kenteken"], Value::from(""));
    assert_eq!(far["cluster"], Value::from(""));
    assert!(far["afstand"].as_f64().unwrap() > 35.0);
    assert_eq!(far["stadsdeel"], Value::from("Centrum"));

    let unplaced = &added[2];
    assert_eq!(unplaced["afstand"], Value::Null);
    assert_eq!(unplaced["buurt"], Value::from(""));

    assert_eq!(update.summary.matched, 1);
    assert_eq!(update.summary.unmatched, 2);
    assert_eq!(update.summary.labeled_by_position, 1);
}

#[test]
fn test_after_drops_older_weighings_everywhere() {
    let after = Utc.with_ymd_and_hms(2023, 3, 1, 0, 0, 0).unwrap();
    let update = run(published(), Some(after)).unwrap();

    // The 20 February weighing is never added; the published 27 February one is dropped.
    assert_eq!(update.delta.records().len(), 2);
    let seqs: Vec<&Value> = update.full.records().iter().map(|w| &w["volgnummer"]).collect();
    assert_eq!(seqs, [&Value::Int(2), &Value::Int(7)]);
}

//==================================================================================
// Publishing through the weighings preset
//==================================================================================

#[test]
fn test_enriched_weighings_roundtrip_through_preset() {
    let update = run(Dataset::empty(), None).unwrap();
    let spec = presets::wegingen();

    let artifact = encode(&update.full, &spec).unwrap();
    let decoded = decode(&artifact).unwrap();
    let rows = decoded.records();
    assert_eq!(rows.len(), 4);

    // Sorted by (systeem_id, datum_ms): 407/3 on 20 Feb, 407/1 on 27 Feb,
    // 407/2 on 1 Mar, then 408/7.
    let seqs: Vec<i64> = rows.iter().map(|w| w["volgnummer"].as_i64().unwrap()).collect();
    assert_eq!(seqs, [3, 1, 2, 7]);

    let dam = &rows[2];
    assert_eq!(dam["containers"], Value::List(vec!["RES-1".into(), "RES-2".into()]));
    assert_eq!(dam["datum_str"], Value::from("wo 1 mrt. '23"));
    assert_eq!(dam["tijd_str"], Value::from("7:05"));
    let expected_ms = Utc.with_ymd_and_hms(2023, 3, 1, 7, 5, 42).unwrap().timestamp_millis() as f64;
    assert!((dam["datum_ms"].as_f64().unwrap() - expected_ms).abs() < 1.0);
    let afstand = dam["afstand"].as_f64().unwrap();
    let original = update.full.records()[1]["afstand"].as_f64().unwrap();
    assert!((afstand - original).abs() <= 0.05 + 1e-9);
}
