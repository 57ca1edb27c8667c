//! Composite-key builder: expands an index descriptor plus a record into
//! the set of flat index keys that record contributes under that
//! descriptor.

use crate::document::Document;
use serde_json::Value;

/// Split a descriptor into its component field names, in declared order.
pub fn split_descriptor(descriptor: &str, delimiter: &str) -> Vec<String> {
    descriptor.split(delimiter).map(|s| s.to_string()).collect()
}

/// Stringify a single field value by its natural representation.
///
/// The delimiter must not otherwise appear in a stringified value -- that is
/// a caller contract, not something this function enforces.
pub fn stringify_value(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(_) | Value::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

/// The set of stringified keys a single field contributes to the Cartesian
/// product: an array's elements, a scalar's singleton, or (if the field is
/// absent) the empty-string singleton.
fn field_keys(record: &Document, field: &str) -> Vec<String> {
    match record.get(field) {
        None => vec![String::new()],
        Some(Value::Array(elements)) => elements.iter().map(stringify_value).collect(),
        Some(other) => vec![stringify_value(other)],
    }
}

/// Expand a descriptor's fields against a record into the list of index
/// keys that record contributes under that descriptor.
///
/// An empty array for any field collapses the whole product to empty: the
/// record is invisible to indexed queries over this descriptor.
pub fn expand(fields: &[String], record: &Document, delimiter: &str) -> Vec<String> {
    let mut tuples: Vec<Vec<String>> = vec![Vec::new()];
    for field in fields {
        let values = field_keys(record, field);
        if values.is_empty() {
            return Vec::new();
        }
        let mut next = Vec::with_capacity(tuples.len() * values.len());
        for prefix in &tuples {
            for value in &values {
                let mut tuple = prefix.clone();
                tuple.push(value.clone());
                next.push(tuple);
            }
        }
        tuples = next;
    }
    tuples.into_iter().map(|parts| parts.join(delimiter)).collect()
}
