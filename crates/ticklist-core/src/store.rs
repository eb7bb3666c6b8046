//! Write-through list store
//!
//! The `ListStore` owns the ordered item sequence and mirrors it into a
//! key-value backend under a single key.
//!
//! ## Write-through
//!
//! Every mutation builds the next sequence on the side, writes it to the
//! backend, and only replaces the in-memory sequence once the write has
//! succeeded. A failed write leaves the visible list at its last saved
//! value.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = ListStore::open(FileKvStore::new(&config), "todos")?;
//!
//! let item = store.add("Buy milk")?.expect("text is not blank");
//! store.update(&item.id, "Buy oat milk")?;
//! store.delete(&item.id)?;
//! ```

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::{is_blank, Item, ItemId};
use crate::storage::{self, KvStore, SchemaError, StorageError};

/// Why the persisted list could not be loaded
#[derive(Error, Debug)]
pub enum LoadFailure {
    #[error(transparent)]
    Read(#[from] StorageError),

    #[error(transparent)]
    Parse(#[from] SchemaError),
}

/// Why the list could not be persisted
#[derive(Error, Debug)]
pub enum PersistFailure {
    #[error(transparent)]
    Write(#[from] StorageError),

    #[error(transparent)]
    Encode(#[from] SchemaError),
}

/// Errors reported by `ListStore`
#[derive(Error, Debug)]
pub enum StoreError {
    /// Persisted bytes could not be read or parsed
    #[error("Failed to load list '{key}': {source}")]
    Load {
        key: String,
        #[source]
        source: LoadFailure,
    },

    /// The list could not be written; the in-memory list is unchanged
    #[error("Failed to save list '{key}': {source}")]
    Persistence {
        key: String,
        #[source]
        source: PersistFailure,
    },
}

/// Coarse classification of a `StoreError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Load,
    Persistence,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Load { .. } => ErrorKind::Load,
            StoreError::Persistence { .. } => ErrorKind::Persistence,
        }
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::Load {
                source: LoadFailure::Parse(_),
                ..
            } => Some(
                "The saved list is unreadable. Fix or remove the file, or reset the list to start empty.",
            ),
            StoreError::Load {
                source: LoadFailure::Read(e),
                ..
            } if e.is_recoverable() => e.recovery_suggestion(),
            StoreError::Load {
                source: LoadFailure::Read(_),
                ..
            } => Some("Check that the data directory is readable, then retry."),
            StoreError::Persistence {
                source: PersistFailure::Write(e),
                ..
            } if e.is_recoverable() => e.recovery_suggestion(),
            StoreError::Persistence {
                source: PersistFailure::Write(e),
                ..
            } => e
                .recovery_suggestion()
                .or(Some("Nothing was changed. Retry the operation.")),
            StoreError::Persistence {
                source: PersistFailure::Encode(_),
                ..
            } => None,
        }
    }
}

/// Result type for list store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Ordered todo list backed by a key-value store
pub struct ListStore<S: KvStore> {
    /// Backend holding the durable copy
    backend: S,
    /// Key the list is stored under
    key: String,
    /// Last successfully persisted sequence
    items: Vec<Item>,
}

impl<S: KvStore> ListStore<S> {
    /// Create a store with an empty in-memory list, without reading the backend
    pub fn new(backend: S, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            items: Vec::new(),
        }
    }

    /// Create a store and load the persisted list
    ///
    /// Absent data yields an empty list; unreadable data is an error.
    pub fn open(backend: S, key: impl Into<String>) -> StoreResult<Self> {
        let mut store = Self::new(backend, key);
        store.load()?;
        Ok(store)
    }

    /// Replace the in-memory list with the persisted one
    ///
    /// On failure the in-memory list keeps its previous value.
    pub fn load(&mut self) -> StoreResult<()> {
        let bytes = self.backend.get(&self.key).map_err(|e| {
            warn!(key = %self.key, error = %e, "failed to read list");
            self.load_error(e.into())
        })?;

        let items = match bytes {
            Some(bytes) => storage::decode(&bytes).map_err(|e| {
                warn!(key = %self.key, error = %e, "persisted list is invalid");
                self.load_error(e.into())
            })?,
            None => {
                debug!(key = %self.key, "no persisted list, starting empty");
                Vec::new()
            }
        };

        debug!(key = %self.key, count = items.len(), "loaded list");
        self.items = items;
        Ok(())
    }

    /// Append a new item
    ///
    /// Blank text is ignored and returns `Ok(None)`.
    pub fn add(&mut self, text: &str) -> StoreResult<Option<Item>> {
        if is_blank(text) {
            debug!("ignoring add with blank text");
            return Ok(None);
        }

        let item = Item::with_id(self.fresh_id(), text);

        let mut next = self.items.clone();
        next.push(item.clone());
        self.commit(next)?;

        info!(id = %item.id, "added item");
        Ok(Some(item))
    }

    /// Replace the text of the item with `id`, keeping its position
    ///
    /// Blank text or an unknown id leaves the list untouched and returns
    /// `Ok(false)`.
    pub fn update(&mut self, id: &ItemId, text: &str) -> StoreResult<bool> {
        if is_blank(text) {
            debug!(%id, "ignoring update with blank text");
            return Ok(false);
        }

        let Some(pos) = self.position(id) else {
            debug!(%id, "update target not found");
            return Ok(false);
        };

        let mut next = self.items.clone();
        next[pos].text = text.to_string();
        self.commit(next)?;

        info!(%id, "updated item");
        Ok(true)
    }

    /// Remove the item with `id`
    ///
    /// An unknown id leaves the list untouched and returns `Ok(false)`.
    pub fn delete(&mut self, id: &ItemId) -> StoreResult<bool> {
        let Some(pos) = self.position(id) else {
            debug!(%id, "delete target not found");
            return Ok(false);
        };

        let mut next = self.items.clone();
        next.remove(pos);
        self.commit(next)?;

        info!(%id, "deleted item");
        Ok(true)
    }

    /// Discard the persisted list and start empty
    ///
    /// Works even when the persisted bytes are unreadable.
    pub fn reset(&mut self) -> StoreResult<()> {
        self.backend.remove(&self.key).map_err(|e| {
            warn!(key = %self.key, error = %e, "failed to reset list");
            self.persistence_error(e.into())
        })?;

        self.items.clear();
        info!(key = %self.key, "reset list");
        Ok(())
    }

    /// Items in display order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Look up an item by ID
    pub fn get(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Key the list is stored under
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Get access to the backend
    pub fn backend(&self) -> &S {
        &self.backend
    }

    /// Persist `next`, then make it the visible list
    fn commit(&mut self, next: Vec<Item>) -> StoreResult<()> {
        let encoded = storage::encode(&next);
        self.commit_encoded(next, encoded)
    }

    /// Write already-encoded bytes for `next`; nothing is written if encoding failed
    fn commit_encoded(
        &mut self,
        next: Vec<Item>,
        encoded: Result<Vec<u8>, SchemaError>,
    ) -> StoreResult<()> {
        let bytes = match encoded {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to encode list");
                return Err(self.persistence_error(e.into()));
            }
        };

        if let Err(e) = self.backend.set(&self.key, &bytes) {
            warn!(key = %self.key, error = %e, "failed to persist list");
            return Err(self.persistence_error(e.into()));
        }

        debug!(key = %self.key, count = next.len(), bytes = bytes.len(), "persisted list");
        self.items = next;
        Ok(())
    }

    fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    /// Generate an ID not already used in this list
    fn fresh_id(&self) -> ItemId {
        loop {
            let id = ItemId::generate();
            if self.position(&id).is_none() {
                return id;
            }
        }
    }

    fn load_error(&self, source: LoadFailure) -> StoreError {
        StoreError::Load {
            key: self.key.clone(),
            source,
        }
    }

    fn persistence_error(&self, source: PersistFailure) -> StoreError {
        StoreError::Persistence {
            key: self.key.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileKvStore, MemoryKvStore};
    use tempfile::TempDir;

    const KEY: &str = "todos";

    fn memory_store() -> ListStore<MemoryKvStore> {
        ListStore::open(MemoryKvStore::new(), KEY).unwrap()
    }

    /// The backend's copy must equal the in-memory list
    fn assert_mirrored(store: &ListStore<MemoryKvStore>) {
        let persisted = match store.backend().raw(KEY) {
            Some(bytes) => storage::decode(bytes).unwrap(),
            None => Vec::new(),
        };
        assert_eq!(persisted, store.items());
    }

    fn texts<S: KvStore>(store: &ListStore<S>) -> Vec<&str> {
        store.items().iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn test_open_empty_backend() {
        let store = memory_store();
        assert!(store.is_empty());
        assert_eq!(store.key(), KEY);
        // Opening does not write
        assert_eq!(store.backend().write_count(), 0);
    }

    #[test]
    fn test_add_appends_and_persists() {
        let mut store = memory_store();

        let first = store.add("Buy milk").unwrap().unwrap();
        let second = store.add("Walk dog").unwrap().unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.items().last().unwrap(), &second);
        assert_eq!(store.items()[0], first);
        assert_ne!(first.id, second.id);
        assert_mirrored(&store);
    }

    #[test]
    fn test_add_keeps_text_as_entered() {
        let mut store = memory_store();
        let item = store.add("  padded  ").unwrap().unwrap();
        assert_eq!(item.text, "  padded  ");
    }

    #[test]
    fn test_add_blank_is_noop() {
        let mut store = memory_store();
        store.add("keep").unwrap();
        let writes = store.backend().write_count();

        assert!(store.add("").unwrap().is_none());
        assert!(store.add("   ").unwrap().is_none());
        assert!(store.add("\t\n").unwrap().is_none());

        assert_eq!(texts(&store), vec!["keep"]);
        assert_eq!(store.backend().write_count(), writes);
    }

    #[test]
    fn test_add_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut store = ListStore::open(FileKvStore::in_dir(temp_dir.path()), KEY).unwrap();
            store.add("Buy milk").unwrap();
        }

        let store = ListStore::open(FileKvStore::in_dir(temp_dir.path()), KEY).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.items()[0].text, "Buy milk");
    }

    #[test]
    fn test_load_after_add_reflects_backend() {
        let mut store = memory_store();
        let item = store.add("Buy milk").unwrap().unwrap();

        store.load().unwrap();
        assert_eq!(store.items(), &[item]);
    }

    #[test]
    fn test_update_replaces_text_in_place() {
        let mut store = memory_store();
        store.add("A").unwrap();
        let b = store.add("B").unwrap().unwrap();
        store.add("C").unwrap();

        assert!(store.update(&b.id, "B2").unwrap());

        assert_eq!(texts(&store), vec!["A", "B2", "C"]);
        assert_eq!(store.get(&b.id).unwrap().id, b.id);
        assert_mirrored(&store);
    }

    #[test]
    fn test_update_missing_id_is_noop() {
        let mut store = memory_store();
        store.add("A").unwrap();
        let before = store.items().to_vec();
        let writes = store.backend().write_count();

        assert!(!store.update(&ItemId::from("missing"), "new text").unwrap());

        assert_eq!(store.items(), before.as_slice());
        assert_eq!(store.backend().write_count(), writes);
    }

    #[test]
    fn test_update_blank_is_noop() {
        let mut store = memory_store();
        let a = store.add("A").unwrap().unwrap();

        assert!(!store.update(&a.id, "  ").unwrap());
        assert_eq!(texts(&store), vec!["A"]);
    }

    #[test]
    fn test_delete_keeps_relative_order() {
        let mut store = memory_store();
        store.add("A").unwrap();
        let b = store.add("B").unwrap().unwrap();
        store.add("C").unwrap();

        assert!(store.delete(&b.id).unwrap());

        assert_eq!(texts(&store), vec!["A", "C"]);
        assert!(store.get(&b.id).is_none());
        assert_mirrored(&store);
    }

    #[test]
    fn test_delete_missing_id_is_noop() {
        let mut store = memory_store();
        store.add("A").unwrap();
        let writes = store.backend().write_count();

        assert!(!store.delete(&ItemId::from("missing")).unwrap());

        assert_eq!(texts(&store), vec!["A"]);
        assert_eq!(store.backend().write_count(), writes);
    }

    #[test]
    fn test_backend_mirrors_memory_after_each_operation() {
        let mut store = memory_store();

        let a = store.add("one").unwrap().unwrap();
        assert_mirrored(&store);
        let b = store.add("two").unwrap().unwrap();
        assert_mirrored(&store);
        store.update(&a.id, "uno").unwrap();
        assert_mirrored(&store);
        store.add("three").unwrap();
        assert_mirrored(&store);
        store.delete(&b.id).unwrap();
        assert_mirrored(&store);
        store.delete(&a.id).unwrap();
        assert_mirrored(&store);

        assert_eq!(texts(&store), vec!["three"]);
    }

    #[test]
    fn test_failed_add_leaves_list_unchanged() {
        let mut store = memory_store();
        store.add("A").unwrap();
        let before = store.items().to_vec();

        store.backend.set_fail_writes(true);

        let err = store.add("B").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(store.items(), before.as_slice());
        assert_mirrored(&store);
    }

    #[test]
    fn test_failed_update_and_delete_leave_list_unchanged() {
        let mut store = memory_store();
        let a = store.add("A").unwrap().unwrap();
        let before = store.items().to_vec();

        store.backend.set_fail_writes(true);

        let err = store.update(&a.id, "changed").unwrap_err();
        assert!(matches!(err, StoreError::Persistence { .. }));
        assert_eq!(store.items(), before.as_slice());

        let err = store.delete(&a.id).unwrap_err();
        assert!(matches!(err, StoreError::Persistence { .. }));
        assert_eq!(store.items(), before.as_slice());

        // Writes work again once the backend recovers
        store.backend.set_fail_writes(false);
        assert!(store.delete(&a.id).unwrap());
        assert!(store.is_empty());
        assert_mirrored(&store);
    }

    #[test]
    fn test_encode_failure_writes_nothing() {
        let mut store = memory_store();
        store.add("A").unwrap();
        let before = store.items().to_vec();
        let writes = store.backend().write_count();

        let encode_err = SchemaError::Encode(serde_json::from_str::<u8>("x").unwrap_err());
        let mut next = before.clone();
        next.push(Item::with_id("b", "B"));

        let err = store.commit_encoded(next, Err(encode_err)).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Persistence {
                source: PersistFailure::Encode(_),
                ..
            }
        ));
        assert_eq!(store.items(), before.as_slice());
        assert_eq!(store.backend().write_count(), writes);
        assert_mirrored(&store);
    }

    #[test]
    fn test_read_failure_suggests_retry() {
        let mut store = memory_store();
        store.backend.set_fail_reads(true);

        let err = store.load().unwrap_err();
        assert_eq!(
            err.recovery_suggestion(),
            Some("Check that the data directory is readable, then retry.")
        );
    }

    #[test]
    fn test_write_failure_suggests_retry() {
        let mut store = memory_store();
        store.backend.set_fail_writes(true);

        let err = store.add("A").unwrap_err();
        assert_eq!(
            err.recovery_suggestion(),
            Some("Nothing was changed. Retry the operation.")
        );
    }

    #[test]
    fn test_open_corrupt_blob_is_load_error() {
        let backend = MemoryKvStore::new().with_value(KEY, "{not json");

        let err = ListStore::open(backend, KEY).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert!(matches!(
            err,
            StoreError::Load {
                source: LoadFailure::Parse(_),
                ..
            }
        ));
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_failed_load_keeps_last_known_good() {
        let mut store = memory_store();
        store.add("A").unwrap();
        let before = store.items().to_vec();

        store.backend.set_fail_reads(true);
        let err = store.load().unwrap_err();
        assert!(matches!(
            err,
            StoreError::Load {
                source: LoadFailure::Read(_),
                ..
            }
        ));
        assert_eq!(store.items(), before.as_slice());
    }

    #[test]
    fn test_load_rejects_schema_violations() {
        let backend = MemoryKvStore::new()
            .with_value(KEY, r#"[{"id":"a","text":"x"},{"id":"a","text":"y"}]"#);
        let err = ListStore::open(backend, KEY).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Load);
    }

    #[test]
    fn test_reset_clears_unreadable_list() {
        let backend = MemoryKvStore::new().with_value(KEY, "garbage");
        let mut store = ListStore::new(backend, KEY);
        assert!(store.load().is_err());

        store.reset().unwrap();
        assert!(store.is_empty());
        assert!(store.backend().raw(KEY).is_none());

        // The list is usable again
        store.load().unwrap();
        store.add("fresh").unwrap();
        assert_mirrored(&store);
    }

    #[test]
    fn test_failed_reset_keeps_items() {
        let mut store = memory_store();
        store.add("A").unwrap();

        store.backend.set_fail_writes(true);
        let err = store.reset().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert_eq!(texts(&store), vec!["A"]);
    }

    #[test]
    fn test_separate_keys_are_independent() {
        let temp_dir = TempDir::new().unwrap();

        let mut work = ListStore::open(FileKvStore::in_dir(temp_dir.path()), "work").unwrap();
        work.add("Ship release").unwrap();

        let home = ListStore::open(FileKvStore::in_dir(temp_dir.path()), "home").unwrap();
        assert!(home.is_empty());
    }

    #[test]
    fn test_error_display_names_key() {
        let mut backend = MemoryKvStore::new();
        backend.set_fail_writes(true);
        let mut store = ListStore::new(backend, KEY);

        let err = store.add("x").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Failed to save"));
        assert!(msg.contains(KEY));
    }
}
