//! Type coercion table
//!
//! Maps Solr field-type names and loosely-typed document values onto the
//! caller's [`BaseType`]s.

use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use super::types::BaseType;
use crate::table::TypedValue;

/// Map a Solr field-type name (as reported by `/schema/fields`) to a base type
pub fn base_type_for_solr_type(solr_type: &str) -> BaseType {
    match solr_type {
        "boolean" => BaseType::Boolean,
        "pdouble" | "pfloat" | "plong" => BaseType::Number,
        "string" | "text_general" => BaseType::String,
        "pdate" => BaseType::Datetime,
        other => {
            tracing::debug!("Unknown Solr type '{}', mapping to STRING", other);
            BaseType::String
        }
    }
}

/// Coerce a raw document value to `base_type`.
///
/// `Ok(None)` means the value is null and the field stays unset. `Err`
/// carries a human-readable reason when the value has an unexpected shape.
pub fn coerce(value: &Value, base_type: BaseType) -> Result<Option<TypedValue>, String> {
    if value.is_null() {
        return Ok(None);
    }

    let coerced = match base_type {
        BaseType::Boolean => TypedValue::Boolean(to_bool(value)?),
        BaseType::Number => TypedValue::Number(to_f64(value)?),
        BaseType::Integer | BaseType::Long => TypedValue::Integer(to_i64(value)?),
        BaseType::String | BaseType::Text => TypedValue::String(to_text(value)),
        BaseType::Datetime => TypedValue::DateTime(to_datetime(value)?),
        BaseType::Json => TypedValue::Json(value.clone()),
        BaseType::Query | BaseType::Infotable => match value {
            Value::Object(_) => TypedValue::Json(value.clone()),
            other => return Err(format!("expected an object, got {}", kind(other))),
        },
    };

    Ok(Some(coerced))
}

/// Multi-valued Solr fields arrive as arrays even when they hold one value
fn single(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) if items.len() == 1 => items.first(),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.as_f64().is_some_and(|f| f != 0.0)),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => match single(other) {
            Some(inner) => to_bool(inner),
            None => Err(format!("cannot read {} as a boolean", kind(other))),
        },
    }
}

fn to_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("number {} out of range", n)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => Ok(f),
            Ok(_) => Err(format!("'{}' is not a finite number", s)),
            Err(_) => Err(format!("'{}' is not a number", s)),
        },
        other => match single(other) {
            Some(inner) => to_f64(inner),
            None => Err(format!("cannot read {} as a number", kind(other))),
        },
    }
}

fn to_i64(value: &Value) -> Result<i64, String> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(|| format!("number {} out of range", n)),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| format!("'{}' is not an integer", s)),
        other => match single(other) {
            Some(inner) => to_i64(inner),
            None => Err(format!("cannot read {} as an integer", kind(other))),
        },
    }
}

fn to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(to_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn to_datetime(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| format!("'{}' is not an RFC 3339 date: {}", s, e)),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| format!("{} is not a valid epoch millisecond value", n)),
        other => match single(other) {
            Some(inner) => to_datetime(inner),
            None => Err(format!("cannot read {} as a date", kind(other))),
        },
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
