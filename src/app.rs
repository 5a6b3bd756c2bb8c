//! Composition root
//!
//! `KioskApp` wires configuration and start-up parameters into a running
//! display: it registers and starts the modules, spawns the display session
//! and, when given a transport, forwards pushed notifications to the screen.

use crate::config::{KioskConfig, StartupParams};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use rg_kiosk_core::{
    DisplayCommand, DisplayController, DisplaySession, ModuleRegistry, NotificationCenter,
    NotificationHub, NotificationTransport, SessionHandle,
};
use rg_kiosk_types::{ModuleInfo, ModuleView};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub struct KioskApp {
    registry: ModuleRegistry,
    params: StartupParams,
    max_reconnect_attempts: u32,
    session: SessionHandle,
    session_task: JoinHandle<()>,
    hub: Option<NotificationHub>,
    forward_task: Option<JoinHandle<()>>,
}

impl KioskApp {
    /// Register and start modules, then start the display session.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(config: &KioskConfig, params: StartupParams) -> Result<Self> {
        let mut registry = ModuleRegistry::new();
        rg_kiosk_modules::register_all(&mut registry, &config.modules)?;
        info!("Registered {} modules", registry.len());

        let context = params.module_context();
        registry.start_all(&context);

        let controller = DisplayController::new(
            registry.infos(),
            params.has_credential(),
            config.timing,
            Instant::now(),
        )
        .context("Failed to create display controller")?
        .with_initial_module(params.app.as_deref());

        let notifications = NotificationCenter::new(config.notifications.display_duration());
        let (session, session_task) = DisplaySession::spawn(controller, notifications);

        Ok(Self {
            registry,
            params,
            max_reconnect_attempts: config.notifications.max_reconnect_attempts,
            session,
            session_task,
            hub: None,
            forward_task: None,
        })
    }

    /// Connect a notification transport and show what it delivers
    pub fn attach_notifications(&mut self, transport: impl NotificationTransport) -> Result<()> {
        let hub = NotificationHub::with_max_reconnect_attempts(transport, self.max_reconnect_attempts);
        let (_subscription, mut notifications) = hub.subscribe_channel();
        hub.connect()?;

        let session = self.session.clone();
        self.forward_task = Some(tokio::spawn(async move {
            while let Some(notification) = notifications.recv().await {
                if session.notify(notification).await.is_err() {
                    break;
                }
            }
            debug!("Notification forwarding stopped");
        }));
        self.hub = Some(hub);
        Ok(())
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn params(&self) -> &StartupParams {
        &self.params
    }

    pub fn is_notification_connected(&self) -> bool {
        self.hub.as_ref().is_some_and(NotificationHub::is_connected)
    }

    /// Module currently on screen
    pub fn current_module(&self) -> ModuleInfo {
        self.session.snapshot().module
    }

    /// Render the module currently on screen
    pub fn render_current(&self) -> Option<ModuleView> {
        let index = self.session.snapshot().state.current_index;
        self.registry.render(index, self.params.has_credential())
    }

    /// Forward a viewport change. On the device itself the screen is never
    /// scaled, so resizes are ignored there.
    pub async fn resize(&self, width: f64, height: f64) -> Result<()> {
        if self.params.on_device {
            debug!("Ignoring resize to {}x{} on device", width, height);
            return Ok(());
        }
        self.session
            .command(DisplayCommand::Resize { width, height })
            .await
    }

    /// Stop the session, the notification client and every module
    pub async fn shutdown(self) -> Result<()> {
        if let Some(hub) = &self.hub {
            hub.disconnect();
        }
        if let Some(task) = self.forward_task {
            task.abort();
        }

        if self.session.shutdown().await.is_err() {
            warn!("Display session already stopped");
        }
        self.session_task
            .await
            .context("Display session task failed")?;

        self.registry.stop_all();
        info!("Kiosk stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rg_kiosk_core::ChannelTransport;
    use rg_kiosk_types::{ModuleSettings, Notification, ViewStatus};
    use std::time::Duration;
    use tokio::time::sleep;

    fn config() -> KioskConfig {
        let mut config = KioskConfig::default();
        // Keep tests quiet: no background draws
        config.modules.insert(
            "random_number".to_string(),
            ModuleSettings {
                enabled: false,
                ..Default::default()
            },
        );
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_on_clock() {
        let app = KioskApp::start(&config(), StartupParams::default()).unwrap();
        assert_eq!(app.current_module().display_name, "Clock");
        app.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_deep_link_pins_module() {
        let params = StartupParams::from_query("app=messageboard");
        let app = KioskApp::start(&config(), params).unwrap();

        let snapshot = app.session().snapshot();
        assert_eq!(snapshot.module.key, "static_text");
        assert!(snapshot.state.is_locked);
        assert!(!snapshot.state.is_idle);
        app.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_module_renders_missing_credential() {
        let params = StartupParams::from_query("app=This Or That");
        let app = KioskApp::start(&config(), params).unwrap();

        let view = app.render_current().unwrap();
        assert_eq!(view.status, ViewStatus::MissingCredential);
        app.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_ignored_on_device() {
        let app = KioskApp::start(&config(), StartupParams::from_query("onDevice=true")).unwrap();
        app.resize(960.0, 240.0).await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert_eq!(app.session().snapshot().state.scale, 1.0);
        app.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_resize_scales_preview() {
        let app = KioskApp::start(&config(), StartupParams::default()).unwrap();
        app.resize(960.0, 240.0).await.unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(app.session().snapshot().state.scale < 0.5);
        app.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_notifications_reach_the_screen() {
        let mut app = KioskApp::start(&config(), StartupParams::default()).unwrap();
        let (transport, handle) = ChannelTransport::new();
        app.attach_notifications(transport).unwrap();
        sleep(Duration::from_millis(10)).await;
        assert!(app.is_notification_connected());

        handle.notify(Notification::new("Pizza in the kitchen"));
        sleep(Duration::from_millis(10)).await;
        let shown = app.session().snapshot().notifications;
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].message, "Pizza in the kitchen");

        sleep(Duration::from_secs(5)).await;
        assert!(app.session().snapshot().notifications.is_empty());
        app.shutdown().await.unwrap();
    }
}
