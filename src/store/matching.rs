//! Filter match semantics shared by the bundled stores.
//!
//! The parser hands every filter value over as a string while cells may
//! hold any scalar, so scalars compare by their string form (`"25"`
//! matches the number `25`). Array values match when any element does.
//! Nested maps are parser structure, not predicates, and never match a
//! scalar cell.

use serde_json::Value;

use super::Document;
use crate::query::Filter;

/// True when every filter entry matches the corresponding column.
pub fn matches_filter(doc: &Document, filter: &Filter) -> bool {
    filter.iter().all(|(column, expected)| {
        let cell = doc.get(column).unwrap_or(&Value::Null);
        matches_value(cell, expected)
    })
}

fn matches_value(cell: &Value, expected: &Value) -> bool {
    match expected {
        Value::Array(options) => options.iter().any(|option| matches_value(cell, option)),
        Value::Object(_) => false,
        scalar => scalar_eq(cell, scalar),
    }
}

fn scalar_eq(cell: &Value, expected: &Value) -> bool {
    if cell == expected {
        return true;
    }
    match (scalar_text(cell), scalar_text(expected)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
