//! Lenient lookups over device JSON. Every accessor has a default so a
//! missing or oddly typed key never aborts reconciliation.

use serde_json::Value;

static NULL: Value = Value::Null;

/// The object stored under `key`, or `Null` (on which every lookup misses).
pub fn object<'a>(value: &'a Value, key: &str) -> &'a Value {
    value
        .get(key)
        .filter(|inner| inner.is_object())
        .unwrap_or(&NULL)
}

/// Non-finite values (`"NaN"`, `"inf"`) count as missing.
pub fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
        _ => None,
    };
    parsed.filter(|number| number.is_finite())
}

pub fn float_or(value: &Value, key: &str, default: f64) -> f64 {
    value.get(key).and_then(number).unwrap_or(default)
}

/// Truncates toward zero, the way the device's own integer readings are derived.
pub fn int_or(value: &Value, key: &str, default: i64) -> i64 {
    value.get(key).and_then(number).map(truncate).unwrap_or(default)
}

pub fn truncate(value: f64) -> i64 {
    if value.is_finite() {
        value.trunc() as i64
    } else {
        0
    }
}

pub fn bool_or(value: &Value, key: &str, default: bool) -> bool {
    value.get(key).map(truthy).unwrap_or(default)
}

pub fn text_or(value: &Value, key: &str, default: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        _ => default.to_string(),
    }
}

pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
