//! Async host loop for the display
//!
//! `DisplaySession` owns a `DisplayController` and a `NotificationCenter`
//! on one task. It sleeps until the earliest armed deadline, applies events
//! from a `SessionHandle` and publishes a `DisplaySnapshot` on a watch
//! channel whenever something visible changed.

use crate::controller::{DisplayCommand, DisplayController};
use crate::notifications::NotificationCenter;
use anyhow::{anyhow, Result};
use log::{debug, info, trace};
use rg_kiosk_types::{DisplayState, ModuleInfo, Notification};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

const EVENT_QUEUE_SIZE: usize = 64;

/// Input to a running session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Command(DisplayCommand),
    Notify(Notification),
    Dismiss(String),
    Shutdown,
}

/// What the screen shows right now
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub state: DisplayState,
    pub module: ModuleInfo,
    /// On-screen notifications in arrival order
    pub notifications: Vec<Notification>,
}

pub struct DisplaySession {
    controller: DisplayController,
    notifications: NotificationCenter,
    events: mpsc::Receiver<SessionEvent>,
    snapshots: watch::Sender<DisplaySnapshot>,
}

/// Client side of a running session
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    snapshots: watch::Receiver<DisplaySnapshot>,
}

impl DisplaySession {
    pub fn new(
        controller: DisplayController,
        notifications: NotificationCenter,
    ) -> (Self, SessionHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let (snapshot_tx, snapshot_rx) =
            watch::channel(build_snapshot(&controller, &notifications));

        (
            Self {
                controller,
                notifications,
                events: event_rx,
                snapshots: snapshot_tx,
            },
            SessionHandle {
                events: event_tx,
                snapshots: snapshot_rx,
            },
        )
    }

    /// Build a session and run it on its own task
    pub fn spawn(
        controller: DisplayController,
        notifications: NotificationCenter,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (session, handle) = Self::new(controller, notifications);
        (handle, tokio::spawn(session.run()))
    }

    /// Run until `Shutdown` arrives or every handle is dropped
    pub async fn run(mut self) {
        info!(
            "Display session started on {}",
            self.controller.current_module().display_name
        );

        loop {
            let event = match self.next_deadline() {
                Some(deadline) => tokio::select! {
                    event = self.events.recv() => event,
                    _ = sleep_until(deadline) => {
                        self.tick(Instant::now());
                        continue;
                    }
                },
                None => self.events.recv().await,
            };

            match event {
                Some(SessionEvent::Shutdown) | None => break,
                Some(event) => self.apply(event, Instant::now()),
            }
        }

        self.controller.teardown();
        self.notifications.clear();
        self.publish();
        info!("Display session stopped");
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.controller.next_deadline(), self.notifications.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn tick(&mut self, now: Instant) {
        let display_changed = self.controller.advance(now);
        let expired = self.notifications.expire(now);
        if display_changed || !expired.is_empty() {
            self.publish();
        }
    }

    fn apply(&mut self, event: SessionEvent, now: Instant) {
        trace!("Session event: {:?}", event);
        self.notifications.expire(now);
        match event {
            SessionEvent::Command(command) => {
                self.controller.handle(command, now);
            }
            SessionEvent::Notify(notification) => {
                self.notifications.push(notification, now);
            }
            SessionEvent::Dismiss(id) => {
                if !self.notifications.dismiss(&id) {
                    debug!("No notification {} to dismiss", id);
                }
            }
            SessionEvent::Shutdown => {}
        }
        self.publish();
    }

    fn publish(&self) {
        let snapshot = build_snapshot(&self.controller, &self.notifications);
        self.snapshots.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

fn build_snapshot(
    controller: &DisplayController,
    notifications: &NotificationCenter,
) -> DisplaySnapshot {
    DisplaySnapshot {
        state: controller.snapshot(),
        module: controller.current_module().clone(),
        notifications: notifications
            .visible()
            .map(|entry| entry.notification.clone())
            .collect(),
    }
}

impl SessionHandle {
    pub async fn send(&self, event: SessionEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| anyhow!("display session has stopped"))
    }

    pub async fn command(&self, command: DisplayCommand) -> Result<()> {
        self.send(SessionEvent::Command(command)).await
    }

    pub async fn notify(&self, notification: Notification) -> Result<()> {
        self.send(SessionEvent::Notify(notification)).await
    }

    /// Take a notification off the screen before its time is up
    pub async fn dismiss(&self, id: &str) -> Result<()> {
        self.send(SessionEvent::Dismiss(id.to_string())).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(SessionEvent::Shutdown).await
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> DisplaySnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<DisplaySnapshot> {
        self.snapshots.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_kiosk_types::DisplayTiming;
    use std::time::Duration;
    use tokio::time::sleep;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn modules() -> Vec<ModuleInfo> {
        vec![
            ModuleInfo::new("a", "A").with_credential(),
            ModuleInfo::new("b", "B"),
            ModuleInfo::new("c", "C"),
        ]
    }

    fn spawn_session(modules: Vec<ModuleInfo>) -> (SessionHandle, JoinHandle<()>) {
        let controller =
            DisplayController::new(modules, false, DisplayTiming::default(), Instant::now())
                .unwrap();
        DisplaySession::spawn(controller, NotificationCenter::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_goes_idle_and_cycles() {
        let (handle, _task) = spawn_session(modules());

        sleep(secs(299)).await;
        assert!(!handle.snapshot().state.is_idle);

        sleep(secs(2)).await;
        assert!(handle.snapshot().state.is_idle);

        let mut visited = Vec::new();
        for _ in 0..3 {
            sleep(secs(10)).await;
            visited.push(handle.snapshot().module.key);
        }
        assert_eq!(visited, vec!["b", "c", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_postpones_idle() {
        let (handle, _task) = spawn_session(modules());

        sleep(secs(200)).await;
        handle.command(DisplayCommand::Press).await.unwrap();
        handle.command(DisplayCommand::Release).await.unwrap();

        sleep(secs(200)).await;
        assert!(!handle.snapshot().state.is_idle);
        sleep(secs(101)).await;
        assert!(handle.snapshot().state.is_idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_press_locks_through_session() {
        let (handle, _task) = spawn_session(modules());

        handle.command(DisplayCommand::Press).await.unwrap();
        sleep(Duration::from_millis(900)).await;
        let state = handle.snapshot().state;
        assert!(state.is_locked);
        assert!(state.is_interaction_disabled);

        sleep(secs(1)).await;
        assert!(!handle.snapshot().state.is_interaction_disabled);

        // Locked displays never go idle
        sleep(secs(600)).await;
        assert!(!handle.snapshot().state.is_idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_expire() {
        let (handle, _task) = spawn_session(modules());

        handle.notify(Notification::new("first")).await.unwrap();
        sleep(secs(2)).await;
        handle.notify(Notification::new("second")).await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let messages: Vec<_> = handle
            .snapshot()
            .notifications
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(messages, vec!["first", "second"]);

        sleep(secs(3)).await;
        assert_eq!(handle.snapshot().notifications.len(), 1);
        sleep(secs(2)).await;
        assert!(handle.snapshot().notifications.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_removes_notification() {
        let (handle, _task) = spawn_session(modules());

        handle.notify(Notification::new("first")).await.unwrap();
        handle.notify(Notification::new("second")).await.unwrap();
        sleep(Duration::from_millis(100)).await;
        let shown = handle.snapshot().notifications;
        let first_id = shown[0].id.clone().unwrap();

        handle.dismiss(&first_id).await.unwrap();
        handle.dismiss("no-such-id").await.unwrap();
        sleep(Duration::from_millis(100)).await;

        let messages: Vec<_> = handle
            .snapshot()
            .notifications
            .into_iter()
            .map(|n| n.message)
            .collect();
        assert_eq!(messages, vec!["second"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_changes() {
        let (handle, _task) = spawn_session(modules());
        let mut rx = handle.subscribe();

        handle.command(DisplayCommand::Next).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().module.key, "b");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_task() {
        let (handle, task) = spawn_session(modules());
        handle.notify(Notification::new("bye")).await.unwrap();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(handle.snapshot().notifications.is_empty());
        assert!(handle.command(DisplayCommand::Next).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_task() {
        let (handle, task) = spawn_session(modules());
        drop(handle);
        task.await.unwrap();
    }
}
