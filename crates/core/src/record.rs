//! The record type shared by the cache, evaluator, and connector.

use serde_json::Value;

/// One row of a table: an ordered mapping from column name to value.
///
/// Tables carry no enforced schema; columns may be absent on any given
/// record, and values may be scalars, nested objects, or arrays. The
/// `preserve_order` feature of serde_json keeps column order stable
/// through cache round-trips.
pub type Record = serde_json::Map<String, Value>;

/// Textual representation of a value, used by substring operators and
/// prompt assembly.
///
/// Strings are used as-is (unquoted), numbers and booleans via their
/// display form, null and absent as the empty string, and nested
/// structures as their compact JSON encoding.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}
