//! Declarative filter evaluation over in-memory table snapshots.
//!
//! A filter maps column names to conditions and is AND-only across
//! columns: a record passes when every condition holds. There is no OR
//! and no nesting. Evaluation is pure and stable — matching records come
//! back in their original order.
//!
//! ### Coercion rules
//!
//! The source system is loosely typed, so comparisons coerce:
//! - Equality is numeric when both sides coerce to a number (numbers,
//!   numeric strings, booleans as 1/0); otherwise structural JSON
//!   equality. An absent field is treated as null.
//! - Ordering is numeric when both sides coerce, lexicographic when both
//!   are non-numeric strings, and false otherwise.
//! - Substring operators compare textual representations.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::{Record, value_text};

/// A filter specification: column name to condition, AND-only.
pub type Filter = BTreeMap<String, Condition>;

/// A per-column condition.
///
/// Deserialization is untagged: an `{"operator": ..., "value": ...}`
/// object becomes an operator condition, any other JSON value is
/// shorthand for loose equality.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Condition {
    /// Operator/value pair, e.g. `{"operator": "gte", "value": 2}`.
    Op {
        /// One of eq, ne, gt, gte, lt, lte, contains, icontains, in.
        operator: String,
        /// The comparison operand.
        value: Value,
    },
    /// Bare value, compared with loose equality.
    Scalar(Value),
}

impl Condition {
    /// Whether the condition holds for a record field.
    pub fn holds(&self, field: &Value) -> bool {
        match self {
            Condition::Scalar(expected) => loose_eq(field, expected),
            Condition::Op { operator, value } => match operator.as_str() {
                "eq" => loose_eq(field, value),
                "ne" => !loose_eq(field, value),
                "gt" => compare(field, value) == Some(Ordering::Greater),
                "gte" => matches!(compare(field, value), Some(Ordering::Greater | Ordering::Equal)),
                "lt" => compare(field, value) == Some(Ordering::Less),
                "lte" => matches!(compare(field, value), Some(Ordering::Less | Ordering::Equal)),
                "contains" => value_text(field).contains(&value_text(value)),
                "icontains" => value_text(field)
                    .to_lowercase()
                    .contains(&value_text(value).to_lowercase()),
                "in" => match value.as_array() {
                    Some(options) => options.iter().any(|option| loose_eq(field, option)),
                    None => loose_eq(field, value),
                },
                // Unrecognized operators degrade to loose equality rather than erroring.
                _ => loose_eq(field, value),
            },
        }
    }
}

/// Filter a snapshot, keeping records for which every condition holds.
///
/// An empty filter is the identity. Matching records are cloned out in
/// their original order.
pub fn evaluate(records: &[Record], filter: &Filter) -> Vec<Record> {
    if filter.is_empty() {
        return records.to_vec();
    }

    records
        .iter()
        .filter(|record| {
            filter.iter().all(|(column, condition)| {
                let field = record.get(column).unwrap_or(&Value::Null);
                condition.holds(field)
            })
        })
        .cloned()
        .collect()
}

/// Numeric coercion: numbers, numeric strings, and booleans as 1/0.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x == y;
    }
    a == b
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (numeric(a), numeric(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.as_str().cmp(y.as_str())),
        _ => None,
    }
}
