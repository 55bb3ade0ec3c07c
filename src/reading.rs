//! Sensor readings and the normalizer that builds them from raw events.
//!
//! A raw event is whatever JSON object arrived on the stream. Normalizing it
//! never fails: missing attributes become empty strings, an unparseable value
//! leaves `float_data` empty and an unusable timestamp falls back to the Unix
//! epoch. The resulting [`SensorReading`] always has the same shape, which is
//! what the sink's fixed insert statement relies on.

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, Timelike, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

pub const SENSOR_KEY: &str = "sensor_key";
pub const SENSOR_NAME: &str = "sensor_name";
pub const BUILDING_NAME: &str = "building_name";
pub const FLOOR_NAME: &str = "floor_name";
pub const ROOM_NAME: &str = "room_name";
pub const SERVICE_TYPE: &str = "service_type";
pub const OBJECT_NAME: &str = "object_name";
pub const MEASUREMENT_TYPE: &str = "measurement_type";
pub const UNIT_OF_MEASURE: &str = "unit_of_measure";
pub const LAST_SHARED_VALUE: &str = "last_shared_value";
pub const LAST_SHARED_DATETIME: &str = "last_shared_datetime";

/// Raw event attributes as decoded from a stream message.
pub type RawEvent = Map<String, Value>;

/// One row of the historian table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub timestamp: String,
    pub key: String,
    pub description: String,
    pub building_name: String,
    pub floor_name: String,
    pub room_name: String,
    pub service_type: String,
    pub object_name: String,
    pub measurement_type: String,
    pub unit_of_measure: String,
    pub data: String,
    pub float_data: Option<f64>,
}

impl SensorReading {
    /// Column names in insert order.
    pub const COLUMNS: [&'static str; 12] = [
        "timestamp",
        "key",
        "description",
        "building_name",
        "floor_name",
        "room_name",
        "service_type",
        "object_name",
        "measurement_type",
        "unit_of_measure",
        "data",
        "float_data",
    ];

    pub fn from_event(event: &RawEvent) -> Self {
        let value = event.get(LAST_SHARED_VALUE);

        Self {
            timestamp: render_timestamp(event.get(LAST_SHARED_DATETIME)),
            key: text(event.get(SENSOR_KEY)),
            description: text(event.get(SENSOR_NAME)),
            building_name: text(event.get(BUILDING_NAME)),
            floor_name: text(event.get(FLOOR_NAME)),
            room_name: text(event.get(ROOM_NAME)),
            service_type: text(event.get(SERVICE_TYPE)),
            object_name: text(event.get(OBJECT_NAME)),
            measurement_type: text(event.get(MEASUREMENT_TYPE)),
            unit_of_measure: text(event.get(UNIT_OF_MEASURE)),
            data: text(value),
            float_data: parse_float(value),
        }
    }
}

fn text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn parse_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn render_timestamp(value: Option<&Value>) -> String {
    parse_timestamp(value)
        .unwrap_or_else(|| DateTime::<Utc>::UNIX_EPOCH.fixed_offset())
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn parse_timestamp(value: Option<&Value>) -> Option<DateTime<FixedOffset>> {
    match value? {
        Value::Number(n) => from_epoch_seconds(n.as_f64()?),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(secs) = s.parse::<f64>() {
                return from_epoch_seconds(secs);
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return dt.with_nanosecond(0);
            }
            // No zone in the source: treat it as UTC.
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc().fixed_offset())
                .and_then(|dt| dt.with_nanosecond(0))
        }
        _ => None,
    }
}

fn from_epoch_seconds(secs: f64) -> Option<DateTime<FixedOffset>> {
    if !secs.is_finite() {
        return None;
    }
    // Saturating cast; out of range seconds are rejected by chrono.
    DateTime::<Utc>::from_timestamp(secs.floor() as i64, 0).map(|dt| dt.fixed_offset())
}
