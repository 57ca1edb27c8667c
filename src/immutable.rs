//! Immutable (copy-on-write) snapshot mode: wraps a `Store` behind a lock
//! so that readers always see a fully consistent snapshot, and writers
//! install a new snapshot atomically rather than mutating shared state.

use crate::document::Document;
use crate::errors::StoreError;
use crate::predicate::{Logical, MatchValue, Needle};
use crate::store::{BatchItem, BatchOutcome, DumpData, DumpKind, RecordView, Store};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::sync::Arc;

/// A `Store` wrapper where every mutation clones the current snapshot,
/// applies the change to the clone, and swaps it in atomically. Readers
/// never block behind a writer and never observe a partially applied
/// mutation, at the cost of an `O(size)` clone per write.
pub struct ImmutableStore {
    current: RwLock<Arc<Store>>,
}

impl ImmutableStore {
    pub fn new(store: Store) -> Self {
        Self { current: RwLock::new(Arc::new(store)) }
    }

    /// A shared snapshot of the store as of this call. Safe to hold across
    /// several reads without re-acquiring the lock; later writes will not
    /// affect it.
    pub fn snapshot(&self) -> Arc<Store> {
        self.current.read().clone()
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Store) -> T) -> T {
        let mut guard = self.current.write();
        let mut next = (**guard).clone();
        let result = f(&mut next);
        *guard = Arc::new(next);
        result
    }

    pub fn set(
        &self,
        id: Option<&str>,
        record: Document,
        override_existing: bool,
        raw: bool,
    ) -> Result<RecordView, StoreError> {
        self.mutate(|store| store.set(id, record, override_existing, raw))
    }

    pub fn del(&self, id: &str, raw: bool) -> Result<RecordView, StoreError> {
        self.mutate(|store| store.del(id, raw))
    }

    pub fn batch(&self, items: Vec<BatchItem>, raw: bool) -> Result<Vec<BatchOutcome>, StoreError> {
        self.mutate(|store| store.batch(items, raw))
    }

    pub fn clear(&self) {
        self.mutate(|store| store.clear())
    }

    pub fn reindex(&self) {
        self.mutate(|store| store.reindex())
    }

    pub fn override_data(&self, data: DumpData) -> Result<(), StoreError> {
        self.mutate(|store| store.override_data(data))
    }

    /// Reads an absent id as `Ok(None)` rather than `NotFound`; an
    /// immutable snapshot has no notion of "not found yet" distinct from
    /// "not present in this snapshot".
    pub fn get(&self, id: &str, raw: bool) -> Option<RecordView> {
        self.snapshot().get(id, raw)
    }

    pub fn has(&self, id: &str) -> bool {
        self.snapshot().has(id)
    }

    pub fn keys(&self) -> Vec<String> {
        self.snapshot().keys()
    }

    pub fn values(&self, raw: bool) -> Vec<RecordView> {
        self.snapshot().values(raw)
    }

    pub fn entries(&self, raw: bool) -> Vec<(String, RecordView)> {
        self.snapshot().entries(raw)
    }

    pub fn size(&self) -> usize {
        self.snapshot().size()
    }

    pub fn find(&self, query: &Document, raw: bool) -> Vec<RecordView> {
        self.snapshot().find(query, raw)
    }

    pub fn search(&self, needle: &Needle, descriptors: Option<&[String]>, raw: bool) -> Vec<RecordView> {
        self.snapshot().search(needle, descriptors, raw)
    }

    pub fn where_(
        &self,
        query: &indexmap::IndexMap<String, MatchValue>,
        logical: Logical,
        raw: bool,
    ) -> Vec<RecordView> {
        self.snapshot().where_(query, logical, raw)
    }

    pub fn filter(&self, predicate: impl Fn(&Document) -> bool, raw: bool) -> Vec<RecordView> {
        self.snapshot().filter(predicate, raw)
    }

    pub fn map<T>(&self, f: impl Fn(&Document) -> T) -> Vec<T> {
        self.snapshot().map(f)
    }

    pub fn reduce<A>(&self, f: impl Fn(A, &Document) -> A, seed: A) -> A {
        self.snapshot().reduce(f, seed)
    }

    pub fn sort_by(&self, field: &str, raw: bool) -> Result<Vec<RecordView>, StoreError> {
        self.mutate(|store| store.sort_by(field, raw))
    }

    pub fn sort(&self, comparator: impl Fn(&Document, &Document) -> Ordering, raw: bool) -> Vec<RecordView> {
        self.snapshot().sort(comparator, raw)
    }

    pub fn limit(&self, offset: usize, count: usize, raw: bool) -> Vec<RecordView> {
        self.snapshot().limit(offset, count, raw)
    }

    pub fn dump(&self, kind: DumpKind) -> DumpData {
        self.snapshot().dump(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use serde_json::json;

    fn doc(v: serde_json::Value) -> Document {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn writers_swap_snapshots_atomically() {
        let store = ImmutableStore::new(Store::new(StoreConfig::new()));
        let before = store.snapshot();
        store.set(Some("1"), doc(json!({"a": 1})), true, true).unwrap();
        let after = store.snapshot();

        assert_eq!(before.size(), 0);
        assert_eq!(after.size(), 1);
        assert!(!Arc::ptr_eq(&before, &after));
    }

    #[test]
    fn get_on_absent_id_is_none_not_error() {
        let store = ImmutableStore::new(Store::new(StoreConfig::new()));
        assert!(store.get("missing", true).is_none());
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_writes() {
        let store = ImmutableStore::new(Store::new(StoreConfig::new()));
        store.set(Some("1"), doc(json!({"a": 1})), true, true).unwrap();
        let snap = store.snapshot();
        store.set(Some("1"), doc(json!({"a": 2})), true, true).unwrap();

        assert_eq!(snap.get("1", true).unwrap().as_document().get("a").unwrap(), &json!(1));
        assert_eq!(store.get("1", true).unwrap().as_document().get("a").unwrap(), &json!(2));
    }
}
