//! Durable storage for UI preferences
//!
//! - [`store`]: key → JSON stores (on disk and in memory)
//! - [`bus`]: process-wide change notifications
//! - [`persisted`]: typed values mirrored into a store
//! - [`watcher`]: picks up changes other processes make to the store

pub mod bus;
pub mod persisted;
pub mod store;
pub mod watcher;

use std::path::PathBuf;
use std::sync::Arc;

pub use bus::{ChangeBus, ChangeOrigin, StorageEvent};
pub use persisted::PersistedValue;
pub use store::{DurableStore, FileStore, MemoryStore};
pub use watcher::StorageWatcher;

use crate::core::error::{Error, Result};

/// Validates a storage key for filesystem safety.
///
/// Constraints:
/// - ASCII alphanumerics, underscores, hyphens and dots only: keys become
///   file names.
/// - Max 64 chars.
/// - Rejects "." and "..", and keys starting with a dot (temp files).
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidKey("key cannot be empty".into()));
    }

    if key.len() > 64 {
        return Err(Error::InvalidKey(format!("'{key}' is too long (max 64 chars)")));
    }

    if !key
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(Error::InvalidKey(format!(
            "'{key}' contains invalid characters (use only a-z, 0-9, ., _, -)"
        )));
    }

    if key.starts_with('.') {
        return Err(Error::InvalidKey(format!("'{key}' cannot start with '.'")));
    }

    Ok(())
}

/// Store and change bus shared by every persisted value of a session
#[derive(Debug, Clone)]
pub struct StorageContext {
    pub store: Arc<dyn DurableStore>,
    pub bus: ChangeBus,
}

impl StorageContext {
    pub fn new(store: Arc<dyn DurableStore>, bus: ChangeBus) -> Self {
        Self { store, bus }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), ChangeBus::new())
    }

    /// Opens a file-backed context in `dir`. Without a directory, or when it
    /// cannot be created, the session falls back to memory.
    pub fn open(dir: Option<PathBuf>) -> Self {
        let Some(dir) = dir else {
            let err = Error::StorageUnavailable("no data directory".into());
            tracing::warn!("{}; preferences will not survive this session", err);
            return Self::in_memory();
        };

        match FileStore::open(&dir) {
            Ok(store) => {
                tracing::debug!("Using durable store at {}", dir.display());
                Self::new(Arc::new(store), ChangeBus::new())
            }
            Err(e) => {
                let err = Error::StorageUnavailable(format!("{}: {e}", dir.display()));
                tracing::warn!("{}; preferences will not survive this session", err);
                Self::in_memory()
            }
        }
    }

    pub fn is_durable(&self) -> bool {
        self.store.location().is_some()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("theme").is_ok());
        assert!(validate_key("table.clients.sort").is_ok());
        assert!(validate_key("sidebar_collapsed-v2").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key(".").is_err());
        assert!(validate_key("..").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key("thème").is_err());
        assert!(validate_key(&"k".repeat(65)).is_err());
    }

    #[test]
    fn test_open_without_dir_is_in_memory() {
        let ctx = StorageContext::open(None);
        assert!(!ctx.is_durable());
    }

    #[test]
    fn test_open_with_dir_is_durable() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = StorageContext::open(Some(dir.path().join("store")));
        assert!(ctx.is_durable());
        assert!(dir.path().join("store").is_dir());
    }

    #[test]
    fn test_open_on_a_file_falls_back_to_memory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("occupied");
        std::fs::write(&file, "x").unwrap();
        let ctx = StorageContext::open(Some(file));
        assert!(!ctx.is_durable());
    }
}
