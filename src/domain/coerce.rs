//! Total coercion of loosely-typed provider values into optional numbers.
//!
//! Provider payloads arrive as JSON whose field types drift between tickers and
//! markets: a P/E might be a number, a numeric string, or `"N/A"`. Nothing in
//! here fails; an unusable value is simply `None`.

use serde_json::Value;

const MISSING_MARKERS: [&str; 4] = ["nan", "none", "n/a", "na"];

/// Keep a computed scalar only when it is finite.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Coerce an optional JSON value into a finite float.
pub fn coerce_float(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Null => None,
        Value::Number(n) => n.as_f64().and_then(finite),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => parse_float_text(s),
        other => parse_float_text(&other.to_string()),
    }
}

/// Coerce an optional JSON value into an integer, truncating toward zero.
pub fn coerce_int(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Null => None,
        Value::Number(n) if n.is_i64() => n.as_i64(),
        Value::Number(n) if n.is_u64() => n.as_u64().and_then(|v| i64::try_from(v).ok()),
        other => coerce_float(Some(other)).map(truncate),
    }
}

fn parse_float_text(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() || MISSING_MARKERS.contains(&lowered.as_str()) {
        return None;
    }
    trimmed.parse::<f64>().ok().and_then(finite)
}

/// Loose truthiness of a provider value: null, `false`, zero, and empty
/// strings or containers are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

// `as` saturates at the i64 bounds, finite inputs only reach here.
fn truncate(value: f64) -> i64 {
    value.trunc() as i64
}
