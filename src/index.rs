//! Index manager: maintains `{descriptor -> {index key -> set of record
//! ids}}` and applies per-record add/remove deltas. Generalizes a
//! single-field in-memory index to composite descriptors with a
//! user-defined delimiter and string record ids, backed by
//! `IndexMap`/`IndexSet` for the deterministic iteration order the dump
//! format requires.

use crate::document::Document;
use crate::errors::StoreError;
use crate::index_key::{expand, split_descriptor};
use indexmap::{IndexMap, IndexSet};
use tracing::trace;

/// One descriptor's index: index key -> ids that resolve to that key.
pub(crate) type DescriptorIndex = IndexMap<String, IndexSet<String>>;

/// The stable dump representation of one descriptor's index.
pub type IndexDump = Vec<(String, Vec<(String, Vec<String>)>)>;

#[derive(Debug, Clone, Default)]
pub struct IndexManager {
    delimiter: String,
    /// Declared descriptors in declaration order, each split into its fields.
    descriptors: IndexMap<String, Vec<String>>,
    indexes: IndexMap<String, DescriptorIndex>,
}

impl IndexManager {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            descriptors: IndexMap::new(),
            indexes: IndexMap::new(),
        }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// Declare a descriptor, creating its (initially empty) index. Idempotent.
    pub fn create_descriptor(&mut self, descriptor: &str) -> Result<(), StoreError> {
        if descriptor.is_empty() {
            return Err(StoreError::InvalidArgument(
                "index descriptor must be a non-empty string".into(),
            ));
        }
        if self.descriptors.contains_key(descriptor) {
            return Ok(());
        }
        let fields = split_descriptor(descriptor, &self.delimiter);
        self.descriptors.insert(descriptor.to_string(), fields);
        self.indexes.insert(descriptor.to_string(), IndexMap::new());
        Ok(())
    }

    pub fn has_descriptor(&self, descriptor: &str) -> bool {
        self.descriptors.contains_key(descriptor)
    }

    pub fn descriptor_names(&self) -> impl Iterator<Item = &String> {
        self.descriptors.keys()
    }

    /// Add `id` to every descriptor's index according to `record`'s values.
    pub fn add_entries(&mut self, id: &str, record: &Document) {
        let names: Vec<String> = self.descriptors.keys().cloned().collect();
        for descriptor in names {
            self.add_entries_for(&descriptor, id, record);
        }
    }

    /// Add `id` to a single descriptor's index. Used by `add_entries` and by
    /// `sort_by`'s on-demand index creation.
    pub fn add_entries_for(&mut self, descriptor: &str, id: &str, record: &Document) {
        let Some(fields) = self.descriptors.get(descriptor) else {
            return;
        };
        let keys = expand(fields, record, &self.delimiter);
        trace!(descriptor, id, key_count = keys.len(), "index key expansion");
        let index = self.indexes.entry(descriptor.to_string()).or_default();
        for key in keys {
            index.entry(key).or_default().insert(id.to_string());
        }
    }

    /// Remove `id` from every descriptor's index according to `old_record`'s
    /// (pre-mutation) values. Empty sets are pruned.
    pub fn remove_entries(&mut self, id: &str, old_record: &Document) {
        let names: Vec<String> = self.descriptors.keys().cloned().collect();
        for descriptor in names {
            let Some(fields) = self.descriptors.get(&descriptor) else {
                continue;
            };
            let keys = expand(fields, old_record, &self.delimiter);
            let Some(index) = self.indexes.get_mut(&descriptor) else {
                continue;
            };
            for key in keys {
                if let Some(set) = index.get_mut(&key) {
                    set.shift_remove(id);
                    if set.is_empty() {
                        index.shift_remove(&key);
                    }
                }
            }
        }
    }

    /// Drop all index contents, keeping declared descriptors.
    pub fn drop_all(&mut self) {
        for index in self.indexes.values_mut() {
            index.clear();
        }
    }

    /// Clear and re-add every record to every descriptor's index.
    pub fn reindex_all<'a>(&mut self, records: impl Iterator<Item = (&'a str, &'a Document)>) {
        self.drop_all();
        for (id, record) in records {
            self.add_entries(id, record);
        }
    }

    /// Union the id sets for every index key a query expansion produces.
    pub fn lookup(&self, descriptor: &str, keys: &[String]) -> Option<IndexSet<String>> {
        let index = self.indexes.get(descriptor)?;
        let mut result = IndexSet::new();
        for key in keys {
            if let Some(ids) = index.get(key) {
                for id in ids {
                    result.insert(id.clone());
                }
            }
        }
        Some(result)
    }

    /// Iterate a descriptor's index keys (used by `search` and `sortBy`).
    pub(crate) fn descriptor_index(&self, descriptor: &str) -> Option<&DescriptorIndex> {
        self.indexes.get(descriptor)
    }

    pub fn dump(&self) -> IndexDump {
        self.descriptors
            .keys()
            .map(|descriptor| {
                let entries = self
                    .indexes
                    .get(descriptor)
                    .map(|index| {
                        index
                            .iter()
                            .map(|(key, ids)| (key.clone(), ids.iter().cloned().collect()))
                            .collect()
                    })
                    .unwrap_or_default();
                (descriptor.clone(), entries)
            })
            .collect()
    }

    /// Discard existing indexes and rebuild from a dump snapshot. Does not
    /// validate against the primary map.
    pub fn restore(&mut self, snapshot: IndexDump) {
        self.descriptors.clear();
        self.indexes.clear();
        for (descriptor, entries) in snapshot {
            let fields = split_descriptor(&descriptor, &self.delimiter);
            self.descriptors.insert(descriptor.clone(), fields);
            let mut index = DescriptorIndex::new();
            for (key, ids) in entries {
                index.insert(key, ids.into_iter().collect());
            }
            self.indexes.insert(descriptor, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn simple_and_composite_index_scenario() {
        let mut mgr = IndexManager::new("|");
        mgr.create_descriptor("category").unwrap();
        mgr.create_descriptor("category|status").unwrap();

        let r1 = doc(json!({"category": "A", "status": "x"}));
        let r2 = doc(json!({"category": "A", "status": "y"}));
        mgr.add_entries("1", &r1);
        mgr.add_entries("2", &r2);

        let by_category = mgr.lookup("category", &["A".to_string()]).unwrap();
        assert_eq!(by_category.len(), 2);

        let by_both = mgr.lookup("category|status", &["A|x".to_string()]).unwrap();
        assert_eq!(by_both.iter().collect::<Vec<_>>(), vec!["1"]);
    }

    #[test]
    fn remove_prunes_empty_sets() {
        let mut mgr = IndexManager::new("|");
        mgr.create_descriptor("tags").unwrap();
        let r1 = doc(json!({"tags": ["red", "blue"]}));
        mgr.add_entries("1", &r1);
        mgr.remove_entries("1", &r1);
        let index = mgr.descriptor_index("tags").unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn rejects_empty_descriptor() {
        let mut mgr = IndexManager::new("|");
        assert!(mgr.create_descriptor("").is_err());
    }

    #[test]
    fn reindex_is_idempotent() {
        let mut mgr = IndexManager::new("|");
        mgr.create_descriptor("category").unwrap();
        let records = vec![
            ("1".to_string(), doc(json!({"category": "A"}))),
            ("2".to_string(), doc(json!({"category": "B"}))),
        ];
        let iter = || records.iter().map(|(k, v)| (k.as_str(), v));
        mgr.reindex_all(iter());
        let first = mgr.dump();
        mgr.reindex_all(iter());
        let second = mgr.dump();
        assert_eq!(first, second);
    }

    #[test]
    fn dump_restore_round_trip() {
        let mut mgr = IndexManager::new("|");
        mgr.create_descriptor("category").unwrap();
        mgr.add_entries("1", &doc(json!({"category": "A"})));
        let dump = mgr.dump();

        let mut restored = IndexManager::new("|");
        restored.restore(dump.clone());
        assert_eq!(restored.dump(), dump);
        assert!(restored.has_descriptor("category"));
    }
}
