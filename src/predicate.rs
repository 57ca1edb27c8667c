//! Compiled predicate AST for `where` and `search`: a small tagged-variant
//! tree built once per call and evaluated per candidate record/index-key,
//! rather than building match predicates by string concatenation at call
//! time.

use crate::document::Document;
use regex::Regex;
use serde_json::Value;
use std::sync::Arc;

/// How a single field in a `where` query is matched against a record.
#[derive(Debug, Clone)]
pub enum MatchValue {
    /// Scalar equality, or array-membership if the record's field is an array.
    Equals(Value),
    /// True if the record's field equals any value in the list (or, for an
    /// array field, shares any element with the list).
    InList(Vec<Value>),
    /// The field's stringified value must match the regex.
    Regex(Regex),
}

impl MatchValue {
    fn matches(&self, record: &Document, field: &str) -> bool {
        match self {
            MatchValue::Equals(value) => field_matches_scalar(record, field, value),
            MatchValue::InList(values) => values.iter().any(|v| field_matches_scalar(record, field, v)),
            MatchValue::Regex(re) => match record.get(field) {
                Some(value) => re.is_match(&crate::index_key::stringify_value(value)),
                None => re.is_match(""),
            },
        }
    }
}

fn field_matches_scalar(record: &Document, field: &str, value: &Value) -> bool {
    match record.get(field) {
        Some(Value::Array(elements)) => elements.contains(value),
        Some(other) => other == value,
        None => value.is_null(),
    }
}

/// How multiple fields in a `where` query combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logical {
    And,
    Or,
}

impl Default for Logical {
    fn default() -> Self {
        Logical::And
    }
}

/// Evaluate a compiled match object against a record.
pub fn matches_record(record: &Document, query: &indexmap::IndexMap<String, MatchValue>, logical: Logical) -> bool {
    match logical {
        Logical::And => query.iter().all(|(field, mv)| mv.matches(record, field)),
        Logical::Or => query.iter().any(|(field, mv)| mv.matches(record, field)),
    }
}

/// The needle argument to `search`: a predicate over `(index key,
/// descriptor name)`, a regex tested against the index key, or a scalar
/// tested for exact equality against the index key.
#[derive(Clone)]
pub enum Needle {
    Predicate(Arc<dyn Fn(&str, &str) -> bool + Send + Sync>),
    Regex(Regex),
    Scalar(String),
}

impl Needle {
    pub fn matches(&self, index_key: &str, descriptor: &str) -> bool {
        match self {
            Needle::Predicate(f) => f(index_key, descriptor),
            Needle::Regex(re) => re.is_match(index_key),
            Needle::Scalar(s) => s == index_key,
        }
    }
}

impl std::fmt::Debug for Needle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Needle::Predicate(_) => write!(f, "Needle::Predicate(..)"),
            Needle::Regex(re) => write!(f, "Needle::Regex({re})"),
            Needle::Scalar(s) => write!(f, "Needle::Scalar({s:?})"),
        }
    }
}
