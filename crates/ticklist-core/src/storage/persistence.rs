//! Key-value byte store backends
//!
//! The list store only needs two primitives from durable storage: read the
//! bytes under a key, and replace them. `KvStore` captures that contract.
//!
//! - `FileKvStore` keeps one file per key under the data directory and
//!   uses atomic writes (write to temp file, then rename) to prevent
//!   corruption.
//! - `MemoryKvStore` keeps everything in a `HashMap` and can be told to
//!   fail reads or writes, which is how failure paths are tested.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::storage::error::{StorageError, StorageResult};

/// Durable key-value byte storage
pub trait KvStore {
    /// Read the bytes stored under `key`, or `None` if nothing is stored
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Replace the bytes stored under `key`
    ///
    /// Returns only once the write is durable.
    fn set(&mut self, key: &str, bytes: &[u8]) -> StorageResult<()>;

    /// Remove whatever is stored under `key` (no-op if absent)
    fn remove(&mut self, key: &str) -> StorageResult<()>;
}

/// Validate a key so it maps onto exactly one file name
pub fn validate_key(key: &str) -> StorageResult<()> {
    let invalid = |reason| {
        Err(StorageError::InvalidKey {
            key: key.to_string(),
            reason,
        })
    };

    if key.is_empty() {
        return invalid("key is empty");
    }
    if key.starts_with('.') {
        return invalid("key starts with '.'");
    }
    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return invalid("only ASCII letters, digits, '-', '_' and '.' are allowed");
    }
    Ok(())
}

/// File-backed key-value store
///
/// Each key is stored as `<data_dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileKvStore {
    dir: PathBuf,
}

impl FileKvStore {
    /// Create a store rooted at the configured data directory
    pub fn new(config: &Config) -> Self {
        Self::in_dir(config.data_dir.clone())
    }

    /// Create a store rooted at an explicit directory
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }

    /// Size in bytes of the value stored under `key`, if any
    pub fn size_of(&self, key: &str) -> StorageResult<Option<u64>> {
        let path = self.path_for(key)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_read(e, path)),
        }
    }
}

impl KvStore for FileKvStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.path_for(key)?;

        match fs::read(&path) {
            Ok(bytes) => {
                debug!(key, bytes = bytes.len(), "read value");
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from_read(e, path)),
        }
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.path_for(key)?;
        atomic_write(&path, bytes)?;
        debug!(key, bytes = bytes.len(), "wrote value");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::from_write(e, path)),
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
///
/// The target file is never left in a partially-written state.
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    // Same directory, so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    file.write_all(data)
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    file.sync_all()
        .map_err(|e| StorageError::from_write(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| {
        let _ = fs::remove_file(&temp_path);
        StorageError::AtomicWriteFailed {
            from: temp_path.clone(),
            to: path.to_path_buf(),
            source,
        }
    })?;

    Ok(())
}

/// In-memory key-value store with failure injection
#[derive(Debug, Default, Clone)]
pub struct MemoryKvStore {
    values: HashMap<String, Vec<u8>>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without counting it as a write
    pub fn with_value(mut self, key: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.values.insert(key.to_string(), bytes.into());
        self
    }

    /// Make subsequent reads fail
    pub fn set_fail_reads(&mut self, fail: bool) {
        self.fail_reads = fail;
    }

    /// Make subsequent writes fail
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Number of successful `set`/`remove` calls
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Peek at a stored value
    pub fn raw(&self, key: &str) -> Option<&[u8]> {
        self.values.get(key).map(Vec::as_slice)
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if self.fail_reads {
            return Err(StorageError::Unavailable(format!("read of '{}' refused", key)));
        }
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> StorageResult<()> {
        if self.fail_writes {
            return Err(StorageError::Unavailable(format!("write of '{}' refused", key)));
        }
        self.values.insert(key.to_string(), bytes.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        if self.fail_writes {
            return Err(StorageError::Unavailable(format!("remove of '{}' refused", key)));
        }
        self.values.remove(key);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_get_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKvStore::in_dir(temp_dir.path());

        assert!(store.get("todos").unwrap().is_none());
        assert!(store.size_of("todos").unwrap().is_none());
    }

    #[test]
    fn test_file_set_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileKvStore::in_dir(temp_dir.path());

        store.set("todos", b"[1,2,3]").unwrap();
        assert_eq!(store.get("todos").unwrap().unwrap(), b"[1,2,3]");
        assert_eq!(store.size_of("todos").unwrap(), Some(7));
        assert!(temp_dir.path().join("todos.json").exists());
        assert!(!temp_dir.path().join("todos.tmp").exists());
    }

    #[test]
    fn test_file_set_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileKvStore::in_dir(temp_dir.path());

        store.set("todos", b"first").unwrap();
        store.set("todos", b"second").unwrap();
        assert_eq!(store.get("todos").unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_file_remove() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileKvStore::in_dir(temp_dir.path());

        store.set("todos", b"[]").unwrap();
        store.remove("todos").unwrap();
        assert!(store.get("todos").unwrap().is_none());

        // Removing again is fine
        store.remove("todos").unwrap();
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested = temp_dir.path().join("a").join("b");
        let mut store = FileKvStore::in_dir(&nested);

        store.set("todos", b"test data").unwrap();

        let content = fs::read_to_string(nested.join("todos.json")).unwrap();
        assert_eq!(content, "test data");
    }

    #[test]
    fn test_keys_are_validated() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileKvStore::in_dir(temp_dir.path());

        for bad in ["", ".hidden", "../escape", "a/b", "spaced key", "@todos"] {
            assert!(
                matches!(store.set(bad, b"x"), Err(StorageError::InvalidKey { .. })),
                "key {:?} should be rejected",
                bad
            );
        }

        assert!(validate_key("todos").is_ok());
        assert!(validate_key("work-list_2.v1").is_ok());
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryKvStore::new();
        assert!(store.get("k").unwrap().is_none());

        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k").unwrap().unwrap(), b"v");
        assert_eq!(store.write_count(), 1);

        store.remove("k").unwrap();
        assert!(store.raw("k").is_none());
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn test_memory_store_failure_injection() {
        let mut store = MemoryKvStore::new().with_value("k", "old");

        store.set_fail_writes(true);
        assert!(matches!(
            store.set("k", b"new"),
            Err(StorageError::Unavailable(_))
        ));
        assert_eq!(store.raw("k").unwrap(), b"old");
        assert_eq!(store.write_count(), 0);

        store.set_fail_reads(true);
        assert!(store.get("k").is_err());
    }
}
