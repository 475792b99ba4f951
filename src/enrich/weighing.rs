// In: src/enrich/weighing.rs

//! Turns a source weighing row into a weighing record.
//!
//! Source rows carry `SystemId, Seq, Date, Time, FractionId, FirstWeight,
//! SecondWeight, NetWeight, Latitude, Longitude`, mostly as strings. The
//! derived record adds the vehicle registration and the date/time fields the
//! front-end filters and groups on. Dates are read as UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc};
use hashbrown::HashMap;

use crate::error::{AfvalError, Result};
use crate::types::{Dataset, Record, Value};

const WEEKDAYS: [&str; 7] = ["ma", "di", "wo", "do", "vr", "za", "zo"];
const MONTHS: [&str; 12] = [
    "jan", "feb", "mrt", "apr", "mei", "jun", "jul", "aug", "sep", "okt", "nov", "dec",
];
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Vehicle registrations by weighing-system id.
#[derive(Debug, Clone, Default)]
pub struct VehicleRegister {
    plates: HashMap<Value, String>,
}

impl VehicleRegister {
    /// Reads `SystemId -> VehicleReg` from a vehicle dataset. Later rows win.
    pub fn from_dataset(vehicles: &Dataset) -> Self {
        let plates = vehicles
            .records()
            .iter()
            .filter_map(|row| {
                let system = row.get("SystemId")?.clone();
                let plate = row.get("VehicleReg").and_then(Value::as_str)?;
                Some((system, plate.to_string()))
            })
            .collect();
        Self { plates }
    }

    /// The registration for a system, or `""` when unknown.
    pub fn plate(&self, system: &Value) -> &str {
        self.plates.get(system).map(String::as_str).unwrap_or("")
    }
}

fn required<'a>(row: &'a Record, field: &str) -> Result<&'a Value> {
    row.get(field)
        .ok_or_else(|| AfvalError::SpecMismatch(format!("source weighing without '{field}'")))
}

fn required_str<'a>(row: &'a Record, field: &str) -> Result<&'a str> {
    required(row, field)?.as_str().ok_or_else(|| {
        AfvalError::SpecMismatch(format!("source weighing '{field}' is not a string"))
    })
}

/// The identity of a source weighing: its system id and sequence number.
pub fn source_key(row: &Record) -> Result<(Value, i64)> {
    let system = required(row, "SystemId")?.clone();
    let seq = match required(row, "Seq")? {
        Value::Int(seq) => *seq,
        Value::Str(s) => s.trim().parse().map_err(|_| {
            AfvalError::SpecMismatch(format!("source weighing has a non-integer Seq '{s}'"))
        })?,
        other => {
            return Err(AfvalError::SpecMismatch(format!(
                "source weighing has a {} Seq",
                other.kind()
            )))
        }
    };
    Ok((system, seq))
}

/// Reads `Date` (`YYYY-MM-DD`) and `Time` (`HH:MM:SS`, optionally with a
/// fraction, or `HH:MM`) as a UTC instant.
pub fn event_time(row: &Record) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(required_str(row, "Date")?, "%Y-%m-%d")?;
    let time = required_str(row, "Time")?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M"))?;
    Ok(date.and_time(time).and_utc())
}

/// Short Dutch date, e.g. `wo 1 mrt. '23`.
pub fn date_label(at: &DateTime<Utc>) -> String {
    format!(
        "{} {} {}. '{}",
        WEEKDAYS[at.weekday().num_days_from_monday() as usize],
        at.day(),
        MONTHS[at.month0() as usize],
        at.year().rem_euclid(100)
    )
}

/// Clock time without a leading zero on the hour, e.g. `7:05`.
pub fn time_label(at: &DateTime<Utc>) -> String {
    format!("{}:{:02}", at.hour(), at.minute())
}

/// Milliseconds since midnight UTC.
pub fn time_of_day_ms(at: &DateTime<Utc>) -> i64 {
    at.timestamp_millis().rem_euclid(DAY_MS)
}

/// Day of the week with Monday as `"1"` and Sunday as `"0"`.
pub fn weekday_label(at: &DateTime<Utc>) -> String {
    at.weekday().num_days_from_sunday().to_string()
}

/// A weight in kilograms. Anything that is not an integer becomes null: some
/// weighing systems occasionally report a coordinate in a weight column.
pub fn weight(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Int(w)) => Value::Int(*w),
        Some(Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// A coordinate in degrees. Blank or missing becomes null.
pub fn coordinate(value: Option<&Value>) -> Value {
    match value {
        Some(Value::Int(c)) => Value::Float(*c as f64),
        Some(Value::Float(c)) => Value::Float(*c),
        Some(Value::Str(s)) if !s.trim().is_empty() => match s.trim().parse::<f64>() {
            Ok(c) if c.is_finite() => Value::Float(c),
            _ => {
                log::warn!("[WEIGHINGS] ignoring unreadable coordinate '{s}'");
                Value::Null
            }
        },
        _ => Value::Null,
    }
}

/// Derives the weighing record for a source row whose instant is already known.
pub fn derive_weighing(
    row: &Record,
    at: &DateTime<Utc>,
    vehicles: &VehicleRegister,
) -> Result<Record> {
    let (system, seq) = source_key(row)?;
    let datum_ms = at.timestamp_millis();

    let mut record = Record::new();
    record.insert("systeem_id".into(), system.clone());
    record.insert("volgnummer".into(), Value::Int(seq));
    record.insert("kenteken".into(), Value::from(vehicles.plate(&system)));
    record.insert("datum_str".into(), Value::Str(date_label(at)));
    record.insert("datum_ms".into(), Value::Int(datum_ms));
    record.insert("tijd_str".into(), Value::Str(time_label(at)));
    record.insert("tijd_ms".into(), Value::Int(time_of_day_ms(at)));
    record.insert("weekdag_ma1".into(), Value::Str(weekday_label(at)));
    record.insert(
        "fractie".into(),
        row.get("FractionId").cloned().unwrap_or_default(),
    );
    record.insert("eerste_weging".into(), weight(row.get("FirstWeight")));
    record.insert("tweede_weging".into(), weight(row.get("SecondWeight")));
    record.insert("netto_gewicht".into(), weight(row.get("NetWeight")));
    record.insert("lon".into(), coordinate(row.get("Longitude")));
    record.insert("lat".into(), coordinate(row.get("Latitude")));
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(json: serde_json::Value) -> Record {
        serde_json::from_value(json).unwrap()
    }

    fn source() -> Record {
        row(json!({
            "SystemId": 407,
            "Seq": "48451",
            "Date": "2023-03-01",
            "Time": "07:05:42",
            "FractionId": "Rest",
            "FirstWeight": "15020",
            "SecondWeight": "14410",
            "NetWeight": "52.3895",
            "Latitude": "52.370216",
            "Longitude": "",
        }))
    }

    #[test]
    fn test_event_time_and_labels() {
        let at = event_time(&source()).unwrap();
        assert_eq!(at.to_rfc3339(), "2023-03-01T07:05:42+00:00");
        assert_eq!(date_label(&at), "wo 1 mrt. '23");
        assert_eq!(time_label(&at), "7:05");
        assert_eq!(time_of_day_ms(&at), (7 * 3600 + 5 * 60 + 42) * 1000);
        assert_eq!(weekday_label(&at), "3");
    }

    #[test]
    fn test_sunday_is_zero_and_short_times_parse() {
        let at = event_time(&row(json!({"Date": "2023-03-05", "Time": "23:59"}))).unwrap();
        assert_eq!(weekday_label(&at), "0");
        assert_eq!(date_label(&at), "zo 5 mrt. '23");
        assert_eq!(time_label(&at), "23:59");
    }

    #[test]
    fn test_bad_date_is_a_parse_error() {
        let err = event_time(&row(json!({"Date": "01-03-2023", "Time": "07:00:00"}))).unwrap_err();
        assert!(matches!(err, AfvalError::DateParse(_)));
    }

    #[test]
    fn test_derive_weighing_fields() {
        let vehicles: Dataset = serde_json::from_value(json!({
            "last_change": null,
            "data": [{"SystemId": 407, "VehicleReg": "12-ABC-3"}],
        }))
        .unwrap();
        let vehicles = VehicleRegister::from_dataset(&vehicles);
        let src = source();
        let at = event_time(&src).unwrap();
        let w = derive_weighing(&src, &at, &vehicles).unwrap();

        assert_eq!(w["systeem_id"], Value::Int(407));
        assert_eq!(w["volgnummer"], Value::Int(48451));
        assert_eq!(w["kenteken"], Value::from("12-ABC-3"));
        assert_eq!(w["datum_ms"], Value::Int(at.timestamp_millis()));
        assert_eq!(w["eerste_weging"], Value::Int(15020));
        // A coordinate in the weight column is dropped.
        assert_eq!(w["netto_gewicht"], Value::Null);
        assert_eq!(w["lon"], Value::Null);
        assert_eq!(w["lat"], Value::Float(52.370216));
        let keys: Vec<&str> = w.keys().map(String::as_str).collect();
        assert_eq!(keys.first(), Some(&"systeem_id"));
        assert_eq!(keys.last(), Some(&"lat"));
    }

    #[test]
    fn test_unknown_vehicle_has_blank_plate() {
        let vehicles = VehicleRegister::default();
        assert_eq!(vehicles.plate(&Value::Int(1)), "");
    }

    #[test]
    fn test_source_key_rejects_non_integer_seq() {
        let bad = row(json!({"SystemId": 1, "Seq": "x"}));
        assert!(matches!(source_key(&bad), Err(AfvalError::SpecMismatch(_))));
    }
}
