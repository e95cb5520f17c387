// Raw feed records and their normalization into domain records
use crate::domain::key::parse_instant;
use crate::domain::record::Record;
use crate::error::LoadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A flat record as served by the feed. Loosely typed on purpose: numeric
/// fields may arrive as strings, nulls or garbage and are coerced later.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub participant: Option<String>,
    #[serde(default)]
    pub timestamp: Value,
    #[serde(default, deserialize_with = "present")]
    pub latitude: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub longitude: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub speed: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub heading: Option<Value>,
    #[serde(default)]
    pub pan_count: Value,
    #[serde(default)]
    pub zoom_count: Value,
    #[serde(default)]
    pub altitude: Value,
    #[serde(default)]
    pub accuracy: Value,
    #[serde(default)]
    pub task_no: Value,
    #[serde(default)]
    pub task_category: Value,
    #[serde(default)]
    pub rotation: Value,
}

/// Keeps an explicit `null` distinguishable from an absent field.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Numeric coercion: absent is NaN, null and blank are 0, booleans are 0/1,
/// numeric strings parse, everything else is NaN.
pub fn coerce_number(value: Option<&Value>) -> f64 {
    match value {
        None => f64::NAN,
        Some(Value::Null) => 0.0,
        Some(Value::Bool(b)) => f64::from(u8::from(*b)),
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Some(_) => f64::NAN,
    }
}

/// Interaction counters: anything that is not a non-negative integer counts as 0.
fn coerce_count(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

fn optional_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => None,
        other => Some(coerce_number(Some(other))).filter(|f| !f.is_nan()),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_instant(s),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

/// Normalize one raw record. `Ok(None)` means the sample has no position
/// and is dropped.
pub fn normalize_record(index: usize, raw: RawRecord) -> Result<Option<Record>, LoadError> {
    let participant = raw
        .participant
        .ok_or(LoadError::MissingField { index, field: "participant" })?;

    let timestamp = parse_timestamp(&raw.timestamp).ok_or_else(|| LoadError::Timestamp {
        index,
        value: raw.timestamp.to_string(),
    })?;

    let (latitude, longitude) = match (&raw.latitude, &raw.longitude) {
        (Some(lat), Some(lon)) if !lat.is_null() && !lon.is_null() => {
            (coerce_number(Some(lat)), coerce_number(Some(lon)))
        }
        _ => {
            tracing::warn!(index, participant = %participant, "dropping sample without position");
            return Ok(None);
        }
    };

    let speed = coerce_number(raw.speed.as_ref());
    if speed.is_nan() {
        tracing::warn!(index, participant = %participant, "speed is not numeric");
    }

    let mut record = Record::new(
        participant,
        timestamp,
        latitude,
        longitude,
        speed,
        coerce_number(raw.heading.as_ref()),
    )
    .with_interactions(coerce_count(&raw.pan_count), coerce_count(&raw.zoom_count));

    record.altitude = optional_number(&raw.altitude);
    record.accuracy = optional_number(&raw.accuracy);
    record.task_no = optional_number(&raw.task_no).map(|f| f as i64);
    record.task_category = match raw.task_category {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    record.rotation = optional_number(&raw.rotation);

    Ok(Some(record))
}

pub fn normalize_records(raw: Vec<RawRecord>) -> Result<Vec<Record>, LoadError> {
    let mut records = Vec::with_capacity(raw.len());
    for (index, item) in raw.into_iter().enumerate() {
        if let Some(record) = normalize_record(index, item)? {
            records.push(record);
        }
    }
    Ok(records)
}
