//! On-screen notification queue
//!
//! Notifications are shown in arrival order, several at once, and each one
//! disappears a fixed duration after it arrived. Like the display controller
//! this is driven by explicit instants; the host sleeps until
//! `next_deadline()` and calls `expire()`.

use crate::constants::NOTIFICATION_DISPLAY_DURATION;
use log::{debug, trace};
use rg_kiosk_types::Notification;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// A notification currently on screen
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveNotification {
    pub notification: Notification,
    pub expires_at: Instant,
}

impl ActiveNotification {
    /// Id assigned on arrival
    pub fn id(&self) -> &str {
        self.notification.id.as_deref().unwrap_or_default()
    }
}

#[derive(Debug)]
pub struct NotificationCenter {
    display_duration: Duration,
    active: VecDeque<ActiveNotification>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(NOTIFICATION_DISPLAY_DURATION)
    }
}

impl NotificationCenter {
    pub fn new(display_duration: Duration) -> Self {
        Self {
            display_duration,
            active: VecDeque::new(),
        }
    }

    pub fn display_duration(&self) -> Duration {
        self.display_duration
    }

    /// Show a notification, assigning an id if it has none. Returns the id.
    pub fn push(&mut self, notification: Notification, now: Instant) -> String {
        let notification = notification.ensure_id();
        let id = notification.id.clone().unwrap_or_default();
        debug!("Showing notification {}: {}", id, notification.message);
        self.active.push_back(ActiveNotification {
            notification,
            expires_at: now + self.display_duration,
        });
        id
    }

    /// Remove every notification whose time is up, oldest first
    pub fn expire(&mut self, now: Instant) -> Vec<Notification> {
        let mut expired = Vec::new();
        // Every entry gets the same duration, so arrival order is expiry order
        while self
            .active
            .front()
            .is_some_and(|entry| entry.expires_at <= now)
        {
            if let Some(entry) = self.active.pop_front() {
                trace!("Notification {} expired", entry.id());
                expired.push(entry.notification);
            }
        }
        expired
    }

    /// Remove a notification early
    pub fn dismiss(&mut self, id: &str) -> bool {
        let before = self.active.len();
        self.active.retain(|entry| entry.id() != id);
        before != self.active.len()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    /// Notifications on screen, in arrival order
    pub fn visible(&self) -> impl Iterator<Item = &ActiveNotification> {
        self.active.iter()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.active.front().map(|entry| entry.expires_at)
    }
}
