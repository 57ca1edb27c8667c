//! Versioning: per-id history of prior record states. Read-only state --
//! there is no API to mutate history directly; it is maintained solely as
//! a side effect of `set`/`del`/`clear`.

use crate::document::Document;
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct VersionStore {
    history: IndexMap<String, Vec<Arc<Document>>>,
}

impl VersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate empty history for a newly created id.
    pub fn allocate(&mut self, id: &str) {
        self.history.entry(id.to_string()).or_default();
    }

    /// Append the pre-update value of `id` to its history.
    pub fn push(&mut self, id: &str, previous: Document) {
        self.history.entry(id.to_string()).or_default().push(Arc::new(previous));
    }

    pub fn get(&self, id: &str) -> Option<&[Arc<Document>]> {
        self.history.get(id).map(|v| v.as_slice())
    }

    pub fn drop(&mut self, id: &str) {
        self.history.shift_remove(id);
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn three_updates_leave_two_prior_snapshots() {
        let mut versions = VersionStore::new();
        versions.allocate("1");
        let doc = |v: i64| json!({"n": v}).as_object().unwrap().clone();
        versions.push("1", doc(1));
        versions.push("1", doc(2));
        let history = versions.get("1").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(*history[0], doc(1));
        assert_eq!(*history[1], doc(2));
    }

    #[test]
    fn drop_discards_history() {
        let mut versions = VersionStore::new();
        versions.allocate("1");
        versions.push("1", json!({}).as_object().unwrap().clone());
        versions.drop("1");
        assert!(versions.get("1").is_none());
    }
}
