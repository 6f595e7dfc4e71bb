//! Durable key → JSON stores
//!
//! [`FileStore`] keeps one `<key>.json` file per key and writes atomically
//! (temp file in the same directory, then rename). [`MemoryStore`] is the
//! in-process fallback used when no data directory is available and in tests.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::core::error::{Error, Result};
use crate::storage::validate_key;

/// Key-value store holding serialized values
pub trait DurableStore: Send + Sync + std::fmt::Debug {
    /// Returns `Ok(None)` when the key has never been written or was removed.
    fn read(&self, key: &str) -> Result<Option<String>>;

    fn write(&self, key: &str, value: &str) -> Result<()>;

    /// Removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;

    /// Directory backing the store, for stores that live on disk
    fn location(&self) -> Option<&Path> {
        None
    }
}

pub const FILE_EXTENSION: &str = "json";

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    ///
    /// On Unix the directory is created with mode 0o700.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();

        #[cfg(unix)]
        {
            use std::fs::DirBuilder;
            use std::os::unix::fs::DirBuilderExt;

            DirBuilder::new().mode(0o700).recursive(true).create(&dir)?;
        }

        #[cfg(not(unix))]
        {
            std::fs::create_dir_all(&dir)?;
        }

        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{FILE_EXTENSION}")))
    }
}

impl DurableStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        // NamedTempFile is created with 0o600 on Unix before any data is written
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value.as_bytes())?;
        temp.as_file().sync_all()?;

        temp.persist(&path).map_err(|e| {
            if e.error.kind() == std::io::ErrorKind::StorageFull {
                Error::Io(std::io::Error::new(
                    std::io::ErrorKind::StorageFull,
                    format!("Disk full: cannot save '{key}'"),
                ))
            } else {
                Error::Io(e.error)
            }
        })?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

/// Process-local store; contents are lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DurableStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        Ok(self.entries().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.entries().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("prefs")).unwrap();

        assert_eq!(store.read("theme").unwrap(), None);
        store.write("theme", "\"dark\"").unwrap();
        assert_eq!(store.read("theme").unwrap().as_deref(), Some("\"dark\""));

        store.write("theme", "\"light\"").unwrap();
        assert_eq!(store.read("theme").unwrap().as_deref(), Some("\"light\""));

        store.remove("theme").unwrap();
        assert_eq!(store.read("theme").unwrap(), None);
        // Removing twice is fine
        store.remove("theme").unwrap();
    }

    #[test]
    fn test_file_store_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("layout", "{}").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["layout.json"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.write("sidebar", "true").unwrap();

        let mode = std::fs::metadata(store.path_for("sidebar").unwrap())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_file_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.write("../escape", "1"),
            Err(Error::InvalidKey(_))
        ));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        store.write("k", "1").unwrap();
        assert_eq!(store.read("k").unwrap().as_deref(), Some("1"));
        store.remove("k").unwrap();
        assert_eq!(store.read("k").unwrap(), None);
        assert!(store.location().is_none());
    }
}
