//! Transient user-facing notifications (toasts)
//!
//! Every notification carries its own time-to-live. Callers prune on a timer
//! tick; nothing here spawns tasks.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::core::error::Error;

/// Oldest notifications are dropped past this count
pub const MAX_NOTIFICATIONS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub id: Uuid,
    pub level: Severity,
    pub message: String,
    pub expires_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotificationCenter {
    notifications: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: impl Into<String>, level: Severity, ttl_secs: u64) -> Uuid {
        self.push_at(message, level, ttl_secs, Utc::now())
    }

    fn push_at(
        &mut self,
        message: impl Into<String>,
        level: Severity,
        ttl_secs: u64,
        now: DateTime<Utc>,
    ) -> Uuid {
        let message = message.into();
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);

        // Repeating the active message refreshes it instead of stacking
        if let Some(existing) = self
            .notifications
            .iter_mut()
            .find(|n| n.level == level && n.message == message)
        {
            existing.expires_at = expires_at;
            return existing.id;
        }

        let id = Uuid::new_v4();
        tracing::debug!("Notification [{}]: {}", level, message);
        self.notifications.push(Notification {
            id,
            level,
            message,
            expires_at,
        });

        if self.notifications.len() > MAX_NOTIFICATIONS {
            let excess = self.notifications.len() - MAX_NOTIFICATIONS;
            self.notifications.drain(..excess);
        }
        id
    }

    /// Pushes the user-facing rendering of an error, suggestions included
    pub fn push_error(&mut self, error: &Error, ttl_secs: u64) -> Uuid {
        let translation = error.translate();
        let mut message = translation.user_message;
        if let Some(first) = translation.suggestions.first() {
            message.push_str(" (");
            message.push_str(first);
            message.push(')');
        }
        self.push(message, Severity::Error, ttl_secs)
    }

    /// Drops expired notifications; returns how many were removed
    pub fn prune_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.notifications.len();
        self.notifications.retain(|n| !n.is_expired(now));
        before - self.notifications.len()
    }

    pub fn dismiss(&mut self, index: usize) -> Option<Notification> {
        (index < self.notifications.len()).then(|| self.notifications.remove(index))
    }

    pub fn dismiss_id(&mut self, id: Uuid) -> Option<Notification> {
        let index = self.notifications.iter().position(|n| n.id == id)?;
        Some(self.notifications.remove(index))
    }

    pub fn clear(&mut self) {
        self.notifications.clear();
    }

    pub fn active(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }
}
