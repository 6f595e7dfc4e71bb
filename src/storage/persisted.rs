//! Typed values mirrored into durable storage
//!
//! A [`PersistedValue`] is read once at initialization and written on every
//! update. Writes are optimistic: the in-memory value changes first, and a
//! failed write is logged and reported but not rolled back, so the UI keeps
//! showing what the user chose. [`PersistedValue::is_persisted`] tells whether
//! the durable copy currently matches.
//!
//! A key the store cannot hold (see [`validate_key`]) gives a memory-only
//! value: it never touches the store but still syncs between instances.
//!
//! Every successful write is announced on the [`ChangeBus`]; other instances
//! holding the same key pick the change up on their next
//! [`PersistedValue::sync`].

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast::{self, error::TryRecvError};
use uuid::Uuid;

use crate::core::error::{Error, Result};
use crate::storage::bus::{ChangeBus, ChangeOrigin, StorageEvent};
use crate::storage::store::DurableStore;
use crate::storage::{StorageContext, validate_key};

pub struct PersistedValue<T> {
    key: String,
    default: T,
    value: T,
    /// Serialized form last read from or written to the store
    last_raw: Option<String>,
    persisted: bool,
    memory_only: bool,
    id: Uuid,
    store: Arc<dyn DurableStore>,
    bus: ChangeBus,
    events: broadcast::Receiver<StorageEvent>,
}

impl<T> std::fmt::Debug for PersistedValue<T>
where
    T: std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedValue")
            .field("key", &self.key)
            .field("value", &self.value)
            .field("persisted", &self.persisted)
            .finish_non_exhaustive()
    }
}

enum Loaded<T> {
    Value(T, String),
    Missing,
    Failed,
}

impl<T> PersistedValue<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    /// Reads `key` from the store, falling back to `default` when the key is
    /// absent, unparseable, or the store cannot be read. Never fails.
    pub fn initialize(ctx: &StorageContext, key: impl Into<String>, default: T) -> Self {
        let key = key.into();
        let memory_only = match validate_key(&key) {
            Ok(()) => false,
            Err(e) => {
                tracing::warn!("{}; value is kept in memory only and never written", e);
                true
            }
        };

        // Subscribe before reading so no change slips in between
        let events = ctx.bus.subscribe();

        let mut this = Self {
            value: default.clone(),
            default,
            key,
            last_raw: None,
            persisted: false,
            memory_only,
            id: Uuid::new_v4(),
            store: Arc::clone(&ctx.store),
            bus: ctx.bus.clone(),
            events,
        };
        this.reload();
        this
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// False after a failed write, until the next successful one. Always
    /// false for a memory-only value.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_memory_only(&self) -> bool {
        self.memory_only
    }

    /// Replaces the value and writes it through.
    ///
    /// On error the in-memory value keeps `value`; the durable copy keeps
    /// its previous content.
    pub fn set(&mut self, value: T) -> Result<()> {
        self.value = value;
        self.write_through()
    }

    /// Computes the next value from the current one and writes it through.
    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.value);
        self.set(next)
    }

    /// Deletes the durable entry and goes back to the default value.
    pub fn remove(&mut self) -> Result<()> {
        self.value = self.default.clone();
        if !self.memory_only {
            if let Err(e) = self.store.remove(&self.key) {
                tracing::warn!("Failed to remove persisted value '{}': {}", self.key, e);
                self.persisted = false;
                return Err(e);
            }
            self.persisted = true;
        }

        self.last_raw = None;
        self.bus.publish(StorageEvent {
            key: self.key.clone(),
            value: None,
            origin: ChangeOrigin::Instance(self.id),
        });
        Ok(())
    }

    /// Applies pending changes made by other instances or processes.
    ///
    /// Returns `true` if the in-memory value was replaced.
    pub fn sync(&mut self) -> bool {
        let mut changed = false;
        loop {
            match self.events.try_recv() {
                Ok(event) => changed |= self.apply_event(event),
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        "Persisted value '{}' missed {} change(s), reloading from store",
                        self.key,
                        skipped
                    );
                    self.reload();
                    changed = true;
                }
            }
        }
        changed
    }

    /// Re-reads the durable copy, replacing the in-memory value. No-op for a
    /// memory-only value.
    pub fn reload(&mut self) {
        if self.memory_only {
            return;
        }
        match self.load() {
            Loaded::Value(value, raw) => {
                self.value = value;
                self.last_raw = Some(raw);
                self.persisted = true;
            }
            Loaded::Missing => {
                self.value = self.default.clone();
                self.last_raw = None;
                self.persisted = true;
            }
            Loaded::Failed => {
                self.value = self.default.clone();
                self.last_raw = None;
                self.persisted = false;
            }
        }
    }

    fn load(&self) -> Loaded<T> {
        match self.store.read(&self.key) {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => Loaded::Value(value, raw),
                Err(e) => {
                    let err = Error::parse(format!("persisted value '{}'", self.key), e);
                    tracing::warn!("{}; using default", err);
                    Loaded::Failed
                }
            },
            Ok(None) => Loaded::Missing,
            Err(e) => {
                tracing::warn!(
                    "Could not read persisted value '{}': {}; using default",
                    self.key,
                    e
                );
                Loaded::Failed
            }
        }
    }

    fn write_through(&mut self) -> Result<()> {
        let raw = match serde_json::to_string_pretty(&self.value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Failed to serialize persisted value '{}': {}", self.key, e);
                self.persisted = false;
                return Err(Error::Serialization(e));
            }
        };

        if !self.memory_only {
            if let Err(e) = self.store.write(&self.key, &raw) {
                tracing::warn!("Failed to write persisted value '{}': {}", self.key, e);
                self.persisted = false;
                return Err(e);
            }
            self.persisted = true;
        }

        self.last_raw = Some(raw.clone());
        self.bus.publish(StorageEvent {
            key: self.key.clone(),
            value: Some(raw),
            origin: ChangeOrigin::Instance(self.id),
        });
        Ok(())
    }

    fn apply_event(&mut self, event: StorageEvent) -> bool {
        if event.key != self.key || event.origin == ChangeOrigin::Instance(self.id) {
            return false;
        }
        // The watcher also reports our own writes
        if event.value == self.last_raw {
            return false;
        }

        match event.value {
            Some(raw) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.value = value;
                    self.last_raw = Some(raw);
                }
                Err(e) => {
                    let err = Error::parse(format!("change to '{}'", self.key), e);
                    tracing::warn!("{}; using default", err);
                    self.value = self.default.clone();
                    self.last_raw = None;
                }
            },
            None => {
                self.value = self.default.clone();
                self.last_raw = None;
            }
        }
        self.persisted = !self.memory_only;
        true
    }
}
