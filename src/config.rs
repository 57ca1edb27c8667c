use uuid::Uuid;

/// Configuration for constructing a [`Store`](crate::Store).
///
/// A plain struct with a `::default()` plus chained setters, rather than a
/// constructor with a long positional argument list.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Composite index key separator. Immutable after construction.
    pub delimiter: String,
    /// Instance identifier, informational only.
    pub id: String,
    /// Initial secondary index descriptors, declared up front.
    pub index: Vec<String>,
    /// Record field used to resolve an id when `set` is called without one.
    pub key: String,
    /// Enable per-id version history.
    pub versioning: bool,
    /// Enable immutable (copy-on-write snapshot) mode.
    pub immutable: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            delimiter: "|".to_string(),
            id: Uuid::new_v4().to_string(),
            index: Vec::new(),
            key: String::new(),
            versioning: false,
            immutable: false,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn index<I, S>(mut self, descriptors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index = descriptors.into_iter().map(Into::into).collect();
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn versioning(mut self, enabled: bool) -> Self {
        self.versioning = enabled;
        self
    }

    pub fn immutable(mut self, enabled: bool) -> Self {
        self.immutable = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.delimiter, "|");
        assert!(cfg.index.is_empty());
        assert_eq!(cfg.key, "");
        assert!(!cfg.versioning);
        assert!(!cfg.immutable);
    }

    #[test]
    fn builder_chains() {
        let cfg = StoreConfig::new()
            .delimiter(":")
            .key("sku")
            .index(["category", "category:status"])
            .versioning(true);
        assert_eq!(cfg.delimiter, ":");
        assert_eq!(cfg.key, "sku");
        assert_eq!(cfg.index, vec!["category".to_string(), "category:status".to_string()]);
        assert!(cfg.versioning);
    }
}
