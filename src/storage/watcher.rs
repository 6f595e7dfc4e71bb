//! Observes a [`FileStore`](crate::storage::FileStore) directory for changes
//! made by other processes and republishes them on the [`ChangeBus`].

use std::path::{Path, PathBuf};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::core::error::Result;
use crate::storage::bus::{ChangeBus, ChangeOrigin, StorageEvent};
use crate::storage::store::FILE_EXTENSION;
use crate::storage::validate_key;

/// Stops watching when dropped
pub struct StorageWatcher {
    dir: PathBuf,
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for StorageWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageWatcher")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl StorageWatcher {
    pub fn spawn(dir: &Path, bus: ChangeBus) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for storage_event in storage_events(&event) {
                    bus.publish(storage_event);
                }
            }
            Err(e) => tracing::warn!("Storage watcher error: {}", e),
        })?;
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::debug!("Watching {} for external changes", dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            _watcher: watcher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Maps a file-system event to storage events. Temp files and anything that
/// is not a valid `<key>.json` are ignored.
fn storage_events(event: &Event) -> Vec<StorageEvent> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }

    event
        .paths
        .iter()
        .filter_map(|path| {
            let key = key_for_path(path)?;
            // Read the current state rather than trusting the event kind:
            // a rename shows up as a remove of one path and a create of another.
            let value = std::fs::read_to_string(path).ok();
            Some(StorageEvent {
                key,
                value,
                origin: ChangeOrigin::External,
            })
        })
        .collect()
}

fn key_for_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some(FILE_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    validate_key(stem).ok()?;
    Some(stem.to_string())
}
