//! Persisted form of the item sequence
//!
//! The list is stored as a JSON array of `{"id": ..., "text": ...}`
//! objects in display order. Decoding is strict: anything that does not
//! match this shape exactly is rejected rather than repaired.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{is_blank, Item, ItemId};

/// Errors found while encoding or decoding a persisted blob
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Malformed item list: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Failed to encode item list: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Item at position {position} has an empty id")]
    EmptyId { position: usize },

    #[error("Item '{id}' has blank text")]
    BlankText { id: String },

    #[error("Duplicate item id '{id}'")]
    DuplicateId { id: String },
}

/// One entry on the wire
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct StoredItem {
    id: String,
    text: String,
}

/// Serialize items in order
pub fn encode(items: &[Item]) -> Result<Vec<u8>, SchemaError> {
    let stored: Vec<StoredItem> = items
        .iter()
        .map(|item| StoredItem {
            id: item.id.as_str().to_string(),
            text: item.text.clone(),
        })
        .collect();

    serde_json::to_vec(&stored).map_err(SchemaError::Encode)
}

/// Parse and validate a persisted blob
pub fn decode(bytes: &[u8]) -> Result<Vec<Item>, SchemaError> {
    let stored: Vec<StoredItem> = serde_json::from_slice(bytes)?;

    let mut seen = HashSet::with_capacity(stored.len());
    let mut items = Vec::with_capacity(stored.len());

    for (position, entry) in stored.into_iter().enumerate() {
        if entry.id.is_empty() {
            return Err(SchemaError::EmptyId { position });
        }
        if is_blank(&entry.text) {
            return Err(SchemaError::BlankText { id: entry.id });
        }
        if !seen.insert(entry.id.clone()) {
            return Err(SchemaError::DuplicateId { id: entry.id });
        }
        items.push(Item::with_id(ItemId::from(entry.id), entry.text));
    }

    Ok(items)
}
