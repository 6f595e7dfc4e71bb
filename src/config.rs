use std::path::{Path, PathBuf};

use crate::analytics::kpi::DEFAULT_WON_STATUSES;
use crate::theme::ThemeChoice;
use crate::utils::get_data_dir;
use serde::{Deserialize, Serialize};
use tokio::runtime::RuntimeFlavor;

pub const CONFIG_FILE: &str = "config.json";

/// Application configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory for persisted preferences. Defaults to `<data dir>/storage`.
    #[serde(default)]
    pub storage_dir: Option<PathBuf>,
    /// Pick up preference changes made by other running instances
    #[serde(default = "default_true")]
    pub watch_external_changes: bool,
    #[serde(default = "default_notification_ttl")]
    pub notification_ttl_secs: u64,
    #[serde(default = "default_won_statuses")]
    pub won_statuses: Vec<String>,
    /// Theme applied before the persisted preference is loaded
    #[serde(default)]
    pub theme: ThemeChoice,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: None,
            watch_external_changes: true,
            notification_ttl_secs: default_notification_ttl(),
            won_statuses: default_won_statuses(),
            theme: ThemeChoice::default(),
        }
    }
}

impl AppConfig {
    /// Explicit `storage_dir`, else the default under the XDG data dir
    pub fn resolved_storage_dir(&self) -> Option<PathBuf> {
        self.storage_dir
            .clone()
            .or_else(|| get_data_dir().map(|d| d.join("storage")))
    }
}

fn default_true() -> bool {
    true
}

fn default_notification_ttl() -> u64 {
    8
}

fn default_won_statuses() -> Vec<String> {
    DEFAULT_WON_STATUSES.iter().map(ToString::to_string).collect()
}

pub fn config_path() -> Option<PathBuf> {
    get_data_dir().map(|d| d.join(CONFIG_FILE))
}

/// Saves the config to the XDG data directory. A missing data directory is
/// not an error; there is simply nowhere to save.
pub async fn save_config(config: &AppConfig) -> std::io::Result<()> {
    match config_path() {
        Some(path) => save_config_to(&path, config).await,
        None => Ok(()),
    }
}

/// Saves the config using an atomic write pattern.
/// 1. Writes to a temporary file next to the target.
/// 2. Sets restrictive permissions (0o600) before any data is written.
/// 3. Atomically renames to the target path.
pub async fn save_config_to(path: &Path, config: &AppConfig) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(config)?;
    let temp_path = path.with_extension("json.tmp");

    #[cfg(unix)]
    {
        use tokio::fs::OpenOptions;
        use tokio::io::AsyncWriteExt;

        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .mode(0o600)
            .open(&temp_path)
            .await?;

        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    #[cfg(not(unix))]
    {
        use tokio::io::AsyncWriteExt;

        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(json.as_bytes()).await?;
        file.sync_all().await?;
    }

    tokio::fs::rename(&temp_path, path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::StorageFull {
            std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "Disk full: cannot save configuration. Free up space and try again.",
            )
        } else {
            e
        }
    })?;
    tracing::debug!("Saved configuration to {}", path.display());
    Ok(())
}

/// Loads the config, or returns the default if not found or unreadable.
pub async fn load_config() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from(&path).await,
        None => AppConfig::default(),
    }
}

pub async fn load_config_from(path: &Path) -> AppConfig {
    match tokio::fs::read_to_string(path).await {
        Ok(json) => match serde_json::from_str::<AppConfig>(&json) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", path.display(), e);
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    }
}

/// Synchronous `load_config()` for startup code, callable with or without a
/// Tokio runtime on the current thread.
pub fn load_config_blocking() -> AppConfig {
    match config_path() {
        Some(path) => load_config_from_blocking(&path),
        None => AppConfig::default(),
    }
}

pub fn load_config_from_blocking(path: &Path) -> AppConfig {
    match tokio::runtime::Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(load_config_from(path)))
        }
        // block_in_place is only allowed on the multi-thread runtime, and a
        // second runtime cannot be started on this thread
        Ok(_) => std::thread::scope(|s| s.spawn(|| load_on_fresh_runtime(path)).join())
            .unwrap_or_else(|_| {
                tracing::warn!("Config loader thread panicked, using defaults");
                AppConfig::default()
            }),
        Err(_) => load_on_fresh_runtime(path),
    }
}

fn load_on_fresh_runtime(path: &Path) -> AppConfig {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(load_config_from(path)),
        Err(e) => {
            tracing::warn!("Failed to create runtime for config load: {}", e);
            AppConfig::default()
        }
    }
}
