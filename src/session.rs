//! Application state for one running front-end
//!
//! A [`Session`] owns everything that used to be ambient: the durable store,
//! the change bus, the optional watcher for edits made by other processes,
//! the notification center, the persisted UI preferences and the analytics
//! pipeline. Open one at startup, [`Session::close`] it at shutdown.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::analytics::{AnalyticsPipeline, KpiOptions, Kpis, LinearRecord};
use crate::config::AppConfig;
use crate::core::error::Result;
use crate::core::filtering::FilterSelection;
use crate::notifications::{NotificationCenter, Severity};
use crate::storage::{PersistedValue, StorageContext, StorageWatcher};
use crate::theme::{Layout, ThemeChoice};

pub const THEME_KEY: &str = "theme";
pub const SIDEBAR_KEY: &str = "sidebar_collapsed";
pub const LAYOUT_KEY: &str = "layout";

/// UI preferences that survive restarts
#[derive(Debug)]
pub struct Preferences {
    pub theme: PersistedValue<ThemeChoice>,
    pub sidebar_collapsed: PersistedValue<bool>,
    pub layout: PersistedValue<Layout>,
}

impl Preferences {
    pub fn load(ctx: &StorageContext, default_theme: ThemeChoice) -> Self {
        Self {
            theme: PersistedValue::initialize(ctx, THEME_KEY, default_theme),
            sidebar_collapsed: PersistedValue::initialize(ctx, SIDEBAR_KEY, false),
            layout: PersistedValue::initialize(ctx, LAYOUT_KEY, Layout::default()),
        }
    }

    /// Applies pending external changes; true if any preference changed
    pub fn sync(&mut self) -> bool {
        // No short-circuit: every receiver must be drained
        let theme = self.theme.sync();
        let sidebar = self.sidebar_collapsed.sync();
        let layout = self.layout.sync();
        theme || sidebar || layout
    }

    pub fn is_persisted(&self) -> bool {
        self.theme.is_persisted()
            && self.sidebar_collapsed.is_persisted()
            && self.layout.is_persisted()
    }
}

#[derive(Debug)]
pub struct Session {
    config: AppConfig,
    storage: StorageContext,
    watcher: Option<StorageWatcher>,
    notifications: NotificationCenter,
    preferences: Preferences,
    pipeline: AnalyticsPipeline,
    filters: FilterSelection,
}

impl Session {
    /// Opens a session on the configured storage directory. Falls back to an
    /// in-memory store when that directory is unusable; never fails.
    pub fn open(config: &AppConfig) -> Self {
        let storage = StorageContext::open(config.resolved_storage_dir());
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: &AppConfig, storage: StorageContext) -> Self {
        let mut notifications = NotificationCenter::new();

        let watcher = match storage.store.location() {
            Some(dir) if config.watch_external_changes => {
                match StorageWatcher::spawn(dir, storage.bus.clone()) {
                    Ok(watcher) => Some(watcher),
                    Err(e) => {
                        tracing::warn!("External preference changes will be missed: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        if !storage.is_durable() {
            notifications.push(
                "Preferences will not be saved after this session",
                Severity::Warning,
                config.notification_ttl_secs,
            );
        }

        let preferences = Preferences::load(&storage, config.theme);
        let pipeline = AnalyticsPipeline::new(KpiOptions {
            won_statuses: config.won_statuses.clone(),
        });

        tracing::info!(
            "Session opened ({} store, watcher {})",
            if storage.is_durable() { "durable" } else { "in-memory" },
            if watcher.is_some() { "on" } else { "off" }
        );

        Self {
            config: config.clone(),
            storage,
            watcher,
            notifications,
            preferences,
            pipeline,
            filters: FilterSelection::new(),
        }
    }

    /// Stops the watcher and drops pending notifications.
    pub fn close(mut self) {
        self.notifications.clear();
        if let Some(watcher) = self.watcher.take() {
            tracing::debug!("Stopped watching {}", watcher.dir().display());
        }
        tracing::info!("Session closed");
    }

    /// Feeds a raw document collection to the analytics pipeline. Failures
    /// are shown as an error notification; the previous results stay.
    pub fn load_documents(&mut self, source: Arc<str>) -> Result<bool> {
        self.pipeline.set_source(source).inspect_err(|e| {
            self.notifications
                .push_error(e, self.config.notification_ttl_secs);
        })
    }

    pub fn records(&self) -> Arc<Vec<LinearRecord>> {
        self.pipeline.records()
    }

    pub fn kpis(&self) -> Arc<Kpis> {
        self.pipeline.kpis()
    }

    pub fn pipeline(&self) -> &AnalyticsPipeline {
        &self.pipeline
    }

    pub fn set_theme(&mut self, theme: ThemeChoice) -> Result<()> {
        let result = self.preferences.theme.set(theme);
        self.report_write(result)
    }

    pub fn toggle_sidebar(&mut self) -> Result<()> {
        let result = self.preferences.sidebar_collapsed.update(|collapsed| !collapsed);
        self.report_write(result)
    }

    pub fn set_layout(&mut self, layout: Layout) -> Result<()> {
        let result = self.preferences.layout.set(layout);
        self.report_write(result)
    }

    fn report_write(&mut self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            self.notifications
                .push_error(e, self.config.notification_ttl_secs);
        }
        result
    }

    /// Applies preference changes from other instances and processes
    pub fn sync(&mut self) -> bool {
        self.preferences.sync()
    }

    /// Periodic housekeeping: expires notifications and syncs preferences
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        let pruned = self.notifications.prune_expired(now);
        let synced = self.sync();
        pruned > 0 || synced
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationCenter {
        &mut self.notifications
    }

    pub fn filters(&self) -> &FilterSelection {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterSelection {
        &mut self.filters
    }

    pub fn storage(&self) -> &StorageContext {
        &self.storage
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
