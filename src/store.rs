//! Storage engine: the primary map plus size counter, orchestrating
//! mutations, invoking the codec and index manager, and emitting
//! lifecycle hooks.

use crate::codec;
use crate::config::StoreConfig;
use crate::document::{deep_merge, Document};
use crate::errors::StoreError;
use crate::hooks::Hooks;
use crate::index::{IndexDump, IndexManager};
use crate::index_key::{expand, split_descriptor, stringify_value};
use crate::predicate::{matches_record, Logical, MatchValue, Needle};
use crate::version::VersionStore;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A record handed back to the caller: either a frozen shared view or an
/// owned plain value, selected by the caller's `raw` flag.
#[derive(Debug, Clone)]
pub enum RecordView {
    Frozen(Arc<Document>),
    Raw(Document),
}

impl RecordView {
    pub fn as_document(&self) -> &Document {
        match self {
            RecordView::Frozen(doc) => doc,
            RecordView::Raw(doc) => doc,
        }
    }

    pub fn into_document(self) -> Document {
        match self {
            RecordView::Frozen(doc) => (*doc).clone(),
            RecordView::Raw(doc) => doc,
        }
    }
}

/// Which half of the store a dump/override call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Records,
    Indexes,
}

/// The stable dump payload for one half of the store. Serializable so a
/// host can write it out and later `override_data` a fresh store from it --
/// the only persistence contract this crate makes (see module docs).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DumpData {
    Records(Vec<(String, Document)>),
    Indexes(IndexDump),
}

/// One item of a `batch` call.
#[derive(Debug, Clone)]
pub enum BatchItem {
    Set {
        id: Option<String>,
        record: Document,
        override_existing: bool,
    },
    Del {
        id: String,
    },
}

/// The result of a single batch item.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    Set(RecordView),
    Deleted(RecordView),
}

/// The indexed, in-memory record store.
#[derive(Clone)]
pub struct Store {
    config: StoreConfig,
    records: IndexMap<String, Document>,
    indexes: IndexManager,
    versions: Option<VersionStore>,
    hooks: Hooks,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.config.id)
            .field("size", &self.records.len())
            .field("descriptors", &self.indexes.descriptor_names().collect::<Vec<_>>())
            .finish()
    }
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        let mut indexes = IndexManager::new(config.delimiter.clone());
        for descriptor in &config.index {
            if let Err(err) = indexes.create_descriptor(descriptor) {
                warn!(descriptor, %err, "skipping invalid descriptor from configuration");
            }
        }
        let versions = if config.versioning { Some(VersionStore::new()) } else { None };
        info!(id = %config.id, versioning = config.versioning, immutable = config.immutable, "store constructed");
        Self {
            config,
            records: IndexMap::new(),
            indexes,
            versions,
            hooks: Hooks::new(),
        }
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn materialize(&self, doc: &Document, raw: bool) -> RecordView {
        if raw {
            RecordView::Raw(codec::decode(doc))
        } else {
            RecordView::Frozen(Arc::new(codec::decode(doc)))
        }
    }

    fn resolve_id(&self, explicit: Option<&str>, record: &Document) -> String {
        if let Some(id) = explicit {
            return id.to_string();
        }
        if !self.config.key.is_empty() {
            if let Some(value) = record.get(&self.config.key) {
                return stringify_value(value);
            }
        }
        Uuid::new_v4().to_string()
    }

    fn emit_error(&self, op: &str, err: StoreError) -> StoreError {
        if let Some(cb) = &self.hooks.on_error {
            cb(op, &err);
        }
        err
    }

    // -- mutation protocol -------------------------------------------------

    pub fn set(
        &mut self,
        id: Option<&str>,
        record: Document,
        override_existing: bool,
        raw: bool,
    ) -> Result<RecordView, StoreError> {
        if let Some(cb) = &self.hooks.before_set {
            cb(id.unwrap_or(""), &record);
        }

        let resolved_id = self.resolve_id(id, &record);
        let encoded = codec::encode(&record);
        let existing = self.records.get(&resolved_id).cloned();

        let new_value = match existing {
            None => {
                debug!(id = %resolved_id, "insert");
                if let Some(versions) = &mut self.versions {
                    versions.allocate(&resolved_id);
                }
                encoded
            }
            Some(old) => {
                debug!(id = %resolved_id, "update");
                self.indexes.remove_entries(&resolved_id, &old);
                if let Some(versions) = &mut self.versions {
                    versions.push(&resolved_id, old.clone());
                }
                if override_existing {
                    encoded
                } else {
                    deep_merge(&old, &encoded)
                }
            }
        };

        self.records.insert(resolved_id.clone(), new_value.clone());
        self.indexes.add_entries(&resolved_id, &new_value);

        let view = self.materialize(&new_value, raw);
        if let Some(cb) = &self.hooks.on_set {
            cb(&resolved_id, &new_value);
        }
        Ok(view)
    }

    pub fn del(&mut self, id: &str, raw: bool) -> Result<RecordView, StoreError> {
        if let Some(cb) = &self.hooks.before_delete {
            cb(id);
        }
        let Some(old) = self.records.shift_remove(id) else {
            return Err(self.emit_error("del", StoreError::NotFound(id.to_string())));
        };
        self.indexes.remove_entries(id, &old);
        if let Some(versions) = &mut self.versions {
            versions.drop(id);
        }
        debug!(id, "delete");
        let view = self.materialize(&old, raw);
        if let Some(cb) = &self.hooks.on_delete {
            cb(id);
        }
        Ok(view)
    }

    pub fn batch(&mut self, items: Vec<BatchItem>, raw: bool) -> Result<Vec<BatchOutcome>, StoreError> {
        if let Some(cb) = &self.hooks.before_batch {
            cb(items.len());
        }
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            let outcome = match item {
                BatchItem::Set { id, record, override_existing } => {
                    let view = self.set(id.as_deref(), record, override_existing, raw)?;
                    BatchOutcome::Set(view)
                }
                BatchItem::Del { id } => {
                    let view = self.del(&id, raw)?;
                    BatchOutcome::Deleted(view)
                }
            };
            results.push(outcome);
        }
        if let Some(cb) = &self.hooks.on_batch {
            cb(results.len());
        }
        Ok(results)
    }

    pub fn clear(&mut self) {
        if let Some(cb) = &self.hooks.before_clear {
            cb();
        }
        self.records.clear();
        self.indexes.drop_all();
        if let Some(versions) = &mut self.versions {
            versions.clear();
        }
        info!(id = %self.config.id, "store cleared");
        if let Some(cb) = &self.hooks.on_clear {
            cb();
        }
    }

    // -- accessors ----------------------------------------------------------

    pub fn get(&self, id: &str, raw: bool) -> Option<RecordView> {
        self.records.get(id).map(|doc| self.materialize(doc, raw))
    }

    pub fn has(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn keys(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn values(&self, raw: bool) -> Vec<RecordView> {
        self.records.values().map(|doc| self.materialize(doc, raw)).collect()
    }

    pub fn entries(&self, raw: bool) -> Vec<(String, RecordView)> {
        self.records
            .iter()
            .map(|(id, doc)| (id.clone(), self.materialize(doc, raw)))
            .collect()
    }

    pub fn for_each(&self, mut f: impl FnMut(&Document, &str)) {
        for (id, doc) in &self.records {
            f(doc, id);
        }
    }

    pub fn size(&self) -> usize {
        self.records.len()
    }

    pub fn versions(&self, id: &str) -> Option<&[Arc<Document>]> {
        self.versions.as_ref().and_then(|v| v.get(id))
    }

    // -- query surface --------------------------------------------------

    /// Materialize the ids in `wanted` in registry order, so index-derived
    /// result sets stay deterministic.
    fn materialize_ids(&self, wanted: &IndexSet<String>, raw: bool) -> Vec<RecordView> {
        self.records
            .iter()
            .filter(|(id, _)| wanted.contains(id.as_str()))
            .map(|(_, doc)| self.materialize(doc, raw))
            .collect()
    }

    pub fn find(&self, query: &Document, raw: bool) -> Vec<RecordView> {
        let mut field_names: Vec<String> = query.keys().cloned().collect();
        field_names.sort();
        let descriptor = field_names.join(self.indexes.delimiter());
        if !self.indexes.has_descriptor(&descriptor) {
            return Vec::new();
        }
        let keys = expand(&field_names, query, self.indexes.delimiter());
        let Some(candidates) = self.indexes.lookup(&descriptor, &keys) else {
            return Vec::new();
        };
        self.materialize_ids(&candidates, raw)
    }

    pub fn search(&self, needle: &Needle, descriptors: Option<&[String]>, raw: bool) -> Vec<RecordView> {
        let owned_names: Vec<String>;
        let names: &[String] = match descriptors {
            Some(names) => names,
            None => {
                owned_names = self.indexes.descriptor_names().cloned().collect();
                &owned_names
            }
        };

        let mut matched = IndexSet::new();
        for descriptor in names {
            let Some(index) = self.indexes.descriptor_index(descriptor) else {
                continue;
            };
            for (key, ids) in index {
                if needle.matches(key, descriptor) {
                    for id in ids {
                        matched.insert(id.clone());
                    }
                }
            }
        }
        self.materialize_ids(&matched, raw)
    }

    /// Filter-scan over all records. Fields named in `query` must each be a
    /// declared descriptor; if any is not, this returns empty rather than
    /// silently falling back to an undeclared scan.
    pub fn where_(&self, query: &IndexMap<String, MatchValue>, logical: Logical, raw: bool) -> Vec<RecordView> {
        if !query.keys().all(|field| self.indexes.has_descriptor(field)) {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|(_, doc)| matches_record(doc, query, logical))
            .map(|(_, doc)| self.materialize(doc, raw))
            .collect()
    }

    pub fn filter(&self, predicate: impl Fn(&Document) -> bool, raw: bool) -> Vec<RecordView> {
        self.records
            .values()
            .filter(|doc| predicate(doc))
            .map(|doc| self.materialize(doc, raw))
            .collect()
    }

    pub fn map<T>(&self, f: impl Fn(&Document) -> T) -> Vec<T> {
        self.records.values().map(f).collect()
    }

    pub fn reduce<A>(&self, f: impl Fn(A, &Document) -> A, seed: A) -> A {
        self.records.values().fold(seed, f)
    }

    /// Sort by a field's index keys in natural (lexicographic) string order,
    /// creating the index on demand if it doesn't exist yet.
    pub fn sort_by(&mut self, field: &str, raw: bool) -> Result<Vec<RecordView>, StoreError> {
        if !self.indexes.has_descriptor(field) {
            warn!(field, "sortBy creating index on demand");
            self.indexes.create_descriptor(field)?;
            let snapshot: Vec<(String, Document)> =
                self.records.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect();
            for (id, doc) in &snapshot {
                self.indexes.add_entries_for(field, id, doc);
            }
        }

        let index = self.indexes.descriptor_index(field).ok_or_else(|| {
            StoreError::InvariantViolation(format!("descriptor {field} missing after creation"))
        })?;
        let mut sorted_keys: Vec<&String> = index.keys().collect();
        sorted_keys.sort();

        let mut result = Vec::with_capacity(self.records.len());
        for key in sorted_keys {
            let ids = &index[key];
            for id in ids {
                if let Some(doc) = self.records.get(id) {
                    result.push(self.materialize(doc, raw));
                }
            }
        }
        Ok(result)
    }

    pub fn sort(&self, comparator: impl Fn(&Document, &Document) -> Ordering, raw: bool) -> Vec<RecordView> {
        let mut docs: Vec<Document> = self.records.values().cloned().collect();
        docs.sort_by(|a, b| comparator(a, b));
        docs.into_iter().map(|doc| self.materialize(&doc, raw)).collect()
    }

    pub fn limit(&self, offset: usize, count: usize, raw: bool) -> Vec<RecordView> {
        self.records
            .values()
            .skip(offset)
            .take(count)
            .map(|doc| self.materialize(doc, raw))
            .collect()
    }

    // -- persistence ------------------------------------------------------

    pub fn dump(&self, kind: DumpKind) -> DumpData {
        match kind {
            DumpKind::Records => {
                let records = self
                    .records
                    .iter()
                    .map(|(id, doc)| (id.clone(), codec::decode(doc)))
                    .collect();
                DumpData::Records(records)
            }
            DumpKind::Indexes => DumpData::Indexes(self.indexes.dump()),
        }
    }

    pub fn override_data(&mut self, data: DumpData) -> Result<(), StoreError> {
        match data {
            DumpData::Records(records) => {
                self.records = records.into_iter().collect();
                self.indexes.drop_all();
            }
            DumpData::Indexes(dump) => {
                self.indexes.restore(dump);
            }
        }
        Ok(())
    }

    pub fn reindex(&mut self) {
        let iter = self.records.iter().map(|(id, doc)| (id.as_str(), doc));
        self.indexes.reindex_all(iter);
    }

    /// Validate that every record is reachable from its declared indexes
    /// and vice versa. Should never fail; present for tests and as a
    /// defensive `InvariantViolation` source.
    pub fn check_invariants(&self) -> Result<(), StoreError> {
        if self.records.len() != self.size() {
            return Err(StoreError::InvariantViolation("I1: size mismatch".into()));
        }
        for descriptor_name in self.indexes.descriptor_names().cloned().collect::<Vec<_>>() {
            let fields = split_descriptor(&descriptor_name, self.indexes.delimiter());
            for (id, record) in &self.records {
                let expected = expand(&fields, record, self.indexes.delimiter());
                for key in &expected {
                    let Some(index) = self.indexes.descriptor_index(&descriptor_name) else {
                        return Err(StoreError::InvariantViolation(format!(
                            "I2: descriptor {descriptor_name} missing"
                        )));
                    };
                    let Some(set) = index.get(key) else {
                        return Err(StoreError::InvariantViolation(format!(
                            "I2: key {key} missing from descriptor {descriptor_name}"
                        )));
                    };
                    if !set.contains(id.as_str()) {
                        return Err(StoreError::InvariantViolation(format!(
                            "I2: id {id} missing from {descriptor_name}/{key}"
                        )));
                    }
                }
            }
            if let Some(index) = self.indexes.descriptor_index(&descriptor_name) {
                for (key, set) in index {
                    if set.is_empty() {
                        return Err(StoreError::InvariantViolation(format!(
                            "I4: empty set at {descriptor_name}/{key}"
                        )));
                    }
                    for id in set {
                        if !self.records.contains_key(id) {
                            return Err(StoreError::InvariantViolation(format!(
                                "I3: dangling id {id} in {descriptor_name}/{key}"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
