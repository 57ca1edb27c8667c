//! Value codec: the sole mechanism by which the engine achieves value
//! isolation. `encode` and `decode` are a lossless, structured-clone round
//! trip over JSON-compatible values -- cloning a `serde_json::Map` is cheap
//! and allocation-only, so there is no need to pay for a JSON-text round
//! trip on every read or write.

use crate::document::Document;

/// Produce a storage-owned copy of `record` with no aliasing to the caller's value.
pub fn encode(record: &Document) -> Document {
    record.clone()
}

/// Produce a caller-owned copy of a stored record with no aliasing to internal state.
pub fn decode(stored: &Document) -> Document {
    stored.clone()
}
