//! An in-memory, indexed record store for structured documents keyed by
//! opaque identifiers: a primary key -> record map augmented by
//! user-declared secondary indexes (including composite indexes), a query
//! surface built on top of those indexes, and an optional immutable
//! snapshot mode with versioning and dump/restore.

mod codec;
mod config;
mod document;
mod errors;
mod hooks;
mod immutable;
mod index;
mod index_key;
mod predicate;
mod store;
mod version;

pub use crate::config::StoreConfig;
pub use crate::document::{validate_is_object, Document};
pub use crate::errors::StoreError;
pub use crate::hooks::Hooks;
pub use crate::immutable::ImmutableStore;
pub use crate::index::{IndexDump, IndexManager};
pub use crate::predicate::{Logical, MatchValue, Needle};
pub use crate::store::{BatchItem, BatchOutcome, DumpData, DumpKind, RecordView, Store};
