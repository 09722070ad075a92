//! Row to document data conversion.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

use crate::log::{Log, LogBook};
use crate::resources::{Attribute, Collection};
use crate::sql::Row;

/// Shapes a table row into document data for `collection`.
///
/// Every attribute gets a key (missing columns become `null`). Composite
/// values on non-array attributes are stored as JSON text; date-time values
/// are normalized to RFC 3339 UTC.
pub fn convert_row(collection: &Collection, row: &Row, logs: &mut LogBook) -> Map<String, Value> {
    let mut data = Map::with_capacity(collection.attributes.len());
    for attribute in &collection.attributes {
        let raw = row.get(&attribute.key).cloned().unwrap_or(Value::Null);
        let value = if attribute.is_datetime() {
            convert_datetime(attribute, raw, logs)
        } else if !attribute.array && (raw.is_array() || raw.is_object()) {
            Value::String(raw.to_string())
        } else {
            raw
        };
        data.insert(attribute.key.clone(), value);
    }
    data
}

fn convert_datetime(attribute: &Attribute, raw: Value, logs: &mut LogBook) -> Value {
    match raw {
        Value::Array(items) if attribute.array => Value::Array(
            items
                .iter()
                .map(|item| datetime_or_null(attribute, item, logs))
                .collect(),
        ),
        other => datetime_or_null(attribute, &other, logs),
    }
}

fn datetime_or_null(attribute: &Attribute, value: &Value, logs: &mut LogBook) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match value.as_str().and_then(normalize_datetime) {
        Some(text) => Value::String(text),
        None => {
            logs.push(Log::warning(format!(
                "Cannot represent value {} of attribute '{}' as a date-time, storing null",
                value, attribute.key
            )));
            Value::Null
        }
    }
}

/// RFC 3339 UTC rendering of a Postgres `timestamptz`, `timestamp` or `date`
/// JSON value. Naive timestamps are taken as UTC.
#[must_use]
pub fn normalize_datetime(text: &str) -> Option<String> {
    let parsed = DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%#z"))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        })?;
    Some(parsed.to_rfc3339_opts(SecondsFormat::Millis, true))
}
