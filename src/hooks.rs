//! Lifecycle hooks: explicit callback slots rather than open methods
//! overridden by dynamic dispatch. Hooks are observers only -- they run
//! with the store state already consistent and must not be relied on for
//! correctness. Callbacks are `Arc`-held (not `Box`-held) so a `Store`
//! carrying hooks remains cheaply `Clone`-able, which the immutable
//! snapshot mode requires.

use crate::document::Document;
use crate::errors::StoreError;
use std::sync::Arc;

type SetHook = Arc<dyn Fn(&str, &Document) + Send + Sync>;
type IdHook = Arc<dyn Fn(&str) + Send + Sync>;
type UnitHook = Arc<dyn Fn() + Send + Sync>;
type CountHook = Arc<dyn Fn(usize) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&str, &StoreError) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    pub before_set: Option<SetHook>,
    pub on_set: Option<SetHook>,
    pub before_delete: Option<IdHook>,
    pub on_delete: Option<IdHook>,
    pub before_clear: Option<UnitHook>,
    pub on_clear: Option<UnitHook>,
    pub before_batch: Option<CountHook>,
    pub on_batch: Option<CountHook>,
    /// Invoked for observation; the error is always re-raised afterwards.
    pub on_error: Option<ErrorHook>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks")
            .field("before_set", &self.before_set.is_some())
            .field("on_set", &self.on_set.is_some())
            .field("before_delete", &self.before_delete.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("before_clear", &self.before_clear.is_some())
            .field("on_clear", &self.on_clear.is_some())
            .field("before_batch", &self.before_batch.is_some())
            .field("on_batch", &self.on_batch.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before_set(mut self, f: impl Fn(&str, &Document) + Send + Sync + 'static) -> Self {
        self.before_set = Some(Arc::new(f));
        self
    }

    pub fn on_set(mut self, f: impl Fn(&str, &Document) + Send + Sync + 'static) -> Self {
        self.on_set = Some(Arc::new(f));
        self
    }

    pub fn before_delete(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.before_delete = Some(Arc::new(f));
        self
    }

    pub fn on_delete(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_delete = Some(Arc::new(f));
        self
    }

    pub fn before_clear(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.before_clear = Some(Arc::new(f));
        self
    }

    pub fn on_clear(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_clear = Some(Arc::new(f));
        self
    }

    pub fn before_batch(mut self, f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.before_batch = Some(Arc::new(f));
        self
    }

    pub fn on_batch(mut self, f: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.on_batch = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&str, &StoreError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn hooks_fire() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = calls.clone();
        let hooks = Hooks::new().on_set(move |_id, _doc| {
            calls2.fetch_add(1, Ordering::SeqCst);
        });
        if let Some(cb) = &hooks.on_set {
            cb("1", &Document::new());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
