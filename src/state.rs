//! Versioned parameter-state persistence.
//!
//! Serializes the live contents of a [`ParamStore`] to a small JSON document
//! and restores them later — session save/restore, presets, or host state
//! chunks. The document is versioned so older saves remain loadable after the
//! format grows; loading routes every value through the store's constraining
//! `set`, so a hand-edited or hostile document cannot smuggle an out-of-range
//! value past the descriptors.
//!
//! Unknown parameter ids are skipped with a warning rather than rejected:
//! a document saved by a newer minor revision that added a parameter still
//! loads everything this revision understands.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::ParamStore;

/// Current state document version.
pub const STATE_VERSION: u32 = 1;

/// Errors from [`load`]. Control-path only; nothing here ever reaches the
/// audio thread.
#[derive(Debug, Error)]
pub enum StateError {
    /// The byte sequence is not a valid state document.
    #[error("malformed state document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document was written by a newer, incompatible revision.
    #[error("unsupported state version: {0}")]
    UnsupportedVersion(u32),
}

/// On-disk shape of a saved parameter state.
///
/// `BTreeMap` keeps the serialized output deterministic, which keeps saved
/// documents diffable.
#[derive(Debug, Serialize, Deserialize)]
struct StateDocument {
    version: u32,
    #[serde(default)]
    params: BTreeMap<String, f32>,
}

/// Serializes the store's current values to a byte sequence.
pub fn save(store: &ParamStore) -> Result<Vec<u8>, StateError> {
    let mut params = BTreeMap::new();
    for desc in store.schema().descriptors() {
        if let Some(value) = store.get(desc.id) {
            params.insert(desc.id.to_string(), value);
        }
    }
    let doc = StateDocument {
        version: STATE_VERSION,
        params,
    };
    Ok(serde_json::to_vec(&doc)?)
}

/// Restores store values from a byte sequence produced by [`save`].
///
/// Values load through the constraining `set` path; parameters absent from
/// the document keep their current value; ids the schema does not know are
/// skipped with a warning. Documents from a newer major revision are
/// rejected whole — better to keep the current state than to half-apply one
/// written under different rules.
pub fn load(store: &ParamStore, bytes: &[u8]) -> Result<(), StateError> {
    let doc: StateDocument = serde_json::from_slice(bytes)?;
    if doc.version > STATE_VERSION {
        log::warn!(
            "refusing state document version {} (supported: {})",
            doc.version,
            STATE_VERSION
        );
        return Err(StateError::UnsupportedVersion(doc.version));
    }
    for (id, value) in &doc.params {
        if !store.set(id, *value) {
            log::warn!("saved state names unknown parameter {:?}, skipping", id);
        }
    }
    Ok(())
}
