use crate::errors::StoreError;
use serde_json::Value;

/// A record: a mapping from string field names to JSON-compatible values.
pub type Document = serde_json::Map<String, Value>;

/// Validates that a caller-supplied JSON value is an object, as records must be.
pub fn validate_is_object(value: &Value) -> Result<(), StoreError> {
    if !value.is_object() {
        return Err(StoreError::InvalidArgument(
            "record must be a JSON object".into(),
        ));
    }
    Ok(())
}

/// Deep-merge rule used by `set` when `override` is not requested.
///
/// For each field in `new`: if both old and new values are objects, recurse;
/// if both are arrays, concatenate (never deduplicated); otherwise the new
/// value replaces the old.
pub fn deep_merge(old: &Document, new: &Document) -> Document {
    let mut merged = old.clone();
    for (key, new_value) in new {
        match (merged.get(key), new_value) {
            (Some(Value::Object(old_obj)), Value::Object(new_obj)) => {
                let merged_obj = deep_merge(old_obj, new_obj);
                merged.insert(key.clone(), Value::Object(merged_obj));
            }
            (Some(Value::Array(old_arr)), Value::Array(new_arr)) => {
                let mut concatenated = old_arr.clone();
                concatenated.extend(new_arr.iter().cloned());
                merged.insert(key.clone(), Value::Array(concatenated));
            }
            _ => {
                merged.insert(key.clone(), new_value.clone());
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merges_nested_objects() {
        let old: Document = json!({"a": {"x": 1, "y": 2}, "b": 1}).as_object().unwrap().clone();
        let new: Document = json!({"a": {"y": 3, "z": 4}}).as_object().unwrap().clone();
        let merged = deep_merge(&old, &new);
        assert_eq!(merged.get("a").unwrap(), &json!({"x": 1, "y": 3, "z": 4}));
        assert_eq!(merged.get("b").unwrap(), &json!(1));
    }

    #[test]
    fn concatenates_arrays_without_dedup() {
        let old: Document = json!({"tags": ["a", "b"]}).as_object().unwrap().clone();
        let new: Document = json!({"tags": ["b", "c"]}).as_object().unwrap().clone();
        let merged = deep_merge(&old, &new);
        assert_eq!(merged.get("tags").unwrap(), &json!(["a", "b", "b", "c"]));
    }

    #[test]
    fn scalar_replaces_scalar() {
        let old: Document = json!({"status": "x"}).as_object().unwrap().clone();
        let new: Document = json!({"status": "y"}).as_object().unwrap().clone();
        let merged = deep_merge(&old, &new);
        assert_eq!(merged.get("status").unwrap(), &json!("y"));
    }

    #[test]
    fn rejects_non_object() {
        assert!(validate_is_object(&json!([1, 2, 3])).is_err());
        assert!(validate_is_object(&json!("hi")).is_err());
        assert!(validate_is_object(&json!({"a": 1})).is_ok());
    }
}
