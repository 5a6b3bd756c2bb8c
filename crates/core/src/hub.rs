//! Notification client
//!
//! `NotificationHub` is an explicit, injectable client object: the host
//! creates one, connects it and subscribes callbacks. The wire protocol lives
//! behind `NotificationTransport`, which reports connection changes and
//! incoming notifications as `TransportEvent`s.

use crate::constants::MAX_RECONNECT_ATTEMPTS;
use crate::error::NotificationError;
use log::{debug, error, info, warn};
use rg_kiosk_types::Notification;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Something that happened on the notification connection
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Connected,
    Disconnected(String),
    Notification(Notification),
    ConnectError(String),
}

/// Connection to a notification server
///
/// `open` starts connecting and returns the event stream. The transport
/// retries failed connects on its own and reports each failure as
/// `ConnectError`; the stream ends once the transport is closed.
pub trait NotificationTransport: Send + 'static {
    fn open(&mut self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, NotificationError>;

    fn close(&mut self);

    /// Ask the server to push a test notification
    fn request_test_notification(&mut self) -> Result<(), NotificationError> {
        Err(NotificationError::Connect(
            "transport does not support test notifications".to_string(),
        ))
    }
}

/// Handle returned by `NotificationHub::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type NotificationCallback = Arc<dyn Fn(&Notification) + Send + Sync>;

struct HubShared {
    open: AtomicBool,
    connected: AtomicBool,
    reconnect_attempts: AtomicU32,
    max_reconnect_attempts: u32,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, NotificationCallback)>>,
}

impl HubShared {
    fn dispatch(&self, notification: &Notification) {
        // Snapshot so callbacks may subscribe or unsubscribe
        let callbacks: Vec<NotificationCallback> = match self.subscribers.lock() {
            Ok(subscribers) => subscribers.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(e) => e.into_inner().iter().map(|(_, cb)| Arc::clone(cb)).collect(),
        };
        for callback in callbacks {
            callback(notification);
        }
    }
}

type SharedTransport = Arc<Mutex<Box<dyn NotificationTransport>>>;

pub struct NotificationHub {
    transport: SharedTransport,
    shared: Arc<HubShared>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationHub {
    pub fn new(transport: impl NotificationTransport) -> Self {
        Self::with_max_reconnect_attempts(transport, MAX_RECONNECT_ATTEMPTS)
    }

    pub fn with_max_reconnect_attempts(
        transport: impl NotificationTransport,
        max_reconnect_attempts: u32,
    ) -> Self {
        Self {
            transport: Arc::new(Mutex::new(Box::new(transport))),
            shared: Arc::new(HubShared {
                open: AtomicBool::new(false),
                connected: AtomicBool::new(false),
                reconnect_attempts: AtomicU32::new(0),
                max_reconnect_attempts,
                next_id: AtomicU64::new(1),
                subscribers: Mutex::new(Vec::new()),
            }),
            pump: Mutex::new(None),
        }
    }

    /// Open the transport and start delivering notifications.
    ///
    /// Must be called inside a tokio runtime.
    pub fn connect(&self) -> Result<(), NotificationError> {
        if self.shared.open.load(Ordering::SeqCst) {
            warn!("Notification hub is already connected");
            return Err(NotificationError::AlreadyConnected);
        }

        let events = {
            let mut transport = self.transport.lock().unwrap_or_else(|e| e.into_inner());
            transport.open()?
        };
        self.shared.open.store(true, Ordering::SeqCst);
        self.shared.reconnect_attempts.store(0, Ordering::SeqCst);

        let handle = tokio::spawn(pump_events(
            events,
            Arc::clone(&self.shared),
            Arc::clone(&self.transport),
        ));
        if let Some(previous) = self
            .pump
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(handle)
        {
            previous.abort();
        }
        Ok(())
    }

    /// Close the transport. Subscriptions are kept for a later `connect`.
    pub fn disconnect(&self) {
        if let Some(handle) = self.pump.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.abort();
        }
        close_transport(&self.transport, &self.shared);
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Consecutive connect errors since the last successful connect
    pub fn reconnect_attempts(&self) -> u32 {
        self.shared.reconnect_attempts.load(Ordering::SeqCst)
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.shared.next_id.fetch_add(1, Ordering::SeqCst));
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        id
    }

    /// Subscribe with a channel instead of a callback
    pub fn subscribe_channel(&self) -> (SubscriptionId, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.subscribe(move |notification| {
            let _ = tx.send(notification.clone());
        });
        (id, rx)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.shared.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let before = subscribers.len();
        subscribers.retain(|(sub_id, _)| *sub_id != id);
        before != subscribers.len()
    }

    /// Ask the server for a test notification; only valid while connected
    pub fn send_test_notification(&self) -> Result<(), NotificationError> {
        if !self.is_connected() {
            warn!("Notification hub is not connected");
            return Err(NotificationError::Connect("not connected".to_string()));
        }
        self.transport
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .request_test_notification()
    }
}

impl Drop for NotificationHub {
    fn drop(&mut self) {
        self.disconnect();
    }
}

fn close_transport(transport: &SharedTransport, shared: &HubShared) {
    if shared.open.swap(false, Ordering::SeqCst) {
        transport.lock().unwrap_or_else(|e| e.into_inner()).close();
        debug!("Notification transport closed");
    }
    shared.connected.store(false, Ordering::SeqCst);
}

async fn pump_events(
    mut events: mpsc::UnboundedReceiver<TransportEvent>,
    shared: Arc<HubShared>,
    transport: SharedTransport,
) {
    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Connected => {
                info!("Connected to notification server");
                shared.connected.store(true, Ordering::SeqCst);
                shared.reconnect_attempts.store(0, Ordering::SeqCst);
            }
            TransportEvent::Disconnected(reason) => {
                info!("Disconnected from notification server: {}", reason);
                shared.connected.store(false, Ordering::SeqCst);
            }
            TransportEvent::Notification(notification) => {
                debug!("Notification received: {}", notification.message);
                shared.dispatch(&notification);
            }
            TransportEvent::ConnectError(message) => {
                error!("Notification server connection error: {}", message);
                let attempts = shared.reconnect_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if attempts >= shared.max_reconnect_attempts {
                    error!("Max notification server reconnection attempts reached");
                    close_transport(&transport, &shared);
                    return;
                }
            }
        }
    }
    shared.connected.store(false, Ordering::SeqCst);
    shared.open.store(false, Ordering::SeqCst);
}

/// In-process transport fed through a `ChannelTransportHandle`
pub struct ChannelTransport {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>>,
}

/// Producer side of a `ChannelTransport`
#[derive(Clone)]
pub struct ChannelTransportHandle {
    sender: Arc<Mutex<Option<mpsc::UnboundedSender<TransportEvent>>>>,
}

impl ChannelTransport {
    pub fn new() -> (Self, ChannelTransportHandle) {
        let sender = Arc::new(Mutex::new(None));
        (
            Self {
                sender: Arc::clone(&sender),
            },
            ChannelTransportHandle { sender },
        )
    }
}

impl NotificationTransport for ChannelTransport {
    fn open(&mut self) -> Result<mpsc::UnboundedReceiver<TransportEvent>, NotificationError> {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(TransportEvent::Connected)
            .map_err(|e| NotificationError::Connect(e.to_string()))?;
        *self.sender.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        Ok(rx)
    }

    fn close(&mut self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();
    }

    fn request_test_notification(&mut self) -> Result<(), NotificationError> {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let tx = sender
            .as_ref()
            .ok_or_else(|| NotificationError::Connect("transport closed".to_string()))?;
        tx.send(TransportEvent::Notification(
            Notification::new("Test notification").with_kind("test"),
        ))
        .map_err(|e| NotificationError::Connect(e.to_string()))
    }
}

impl ChannelTransportHandle {
    /// Inject an event. Returns `false` when the transport is closed.
    pub fn send(&self, event: TransportEvent) -> bool {
        match self.sender.lock() {
            Ok(sender) => sender.as_ref().is_some_and(|tx| tx.send(event).is_ok()),
            Err(_) => false,
        }
    }

    pub fn notify(&self, notification: Notification) -> bool {
        self.send(TransportEvent::Notification(notification))
    }

    pub fn is_open(&self) -> bool {
        self.sender
            .lock()
            .map(|sender| sender.is_some())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_and_receive() {
        let (transport, handle) = ChannelTransport::new();
        let hub = NotificationHub::new(transport);
        let (_id, mut rx) = hub.subscribe_channel();

        hub.connect().unwrap();
        settle().await;
        assert!(hub.is_connected());

        assert!(handle.notify(Notification::new("Standup in 5").with_kind("info")));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, "Standup in 5");
        assert_eq!(received.kind.as_deref(), Some("info"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_connect_is_rejected() {
        let (transport, _handle) = ChannelTransport::new();
        let hub = NotificationHub::new(transport);
        hub.connect().unwrap();
        assert_eq!(hub.connect(), Err(NotificationError::AlreadyConnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_stops_delivery() {
        let (transport, handle) = ChannelTransport::new();
        let hub = NotificationHub::new(transport);
        let received = Arc::new(AtomicU32::new(0));
        let r = received.clone();
        let id = hub.subscribe(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        });
        hub.connect().unwrap();

        handle.notify(Notification::new("one"));
        settle().await;
        assert!(hub.unsubscribe(id));
        assert!(!hub.unsubscribe(id));
        handle.notify(Notification::new("two"));
        settle().await;

        assert_eq!(received.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_connect_errors() {
        let (transport, handle) = ChannelTransport::new();
        let hub = NotificationHub::new(transport);
        hub.connect().unwrap();

        for n in 1..MAX_RECONNECT_ATTEMPTS {
            handle.send(TransportEvent::ConnectError(format!("refused {}", n)));
        }
        settle().await;
        assert!(handle.is_open());
        assert_eq!(hub.reconnect_attempts(), MAX_RECONNECT_ATTEMPTS - 1);

        handle.send(TransportEvent::ConnectError("refused".to_string()));
        settle().await;
        assert!(!handle.is_open());
        assert!(!hub.is_connected());

        // A later connect starts a fresh budget
        hub.connect().unwrap();
        settle().await;
        assert!(hub.is_connected());
        assert_eq!(hub.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_resets_error_count() {
        let (transport, handle) = ChannelTransport::new();
        let hub = NotificationHub::new(transport);
        hub.connect().unwrap();

        handle.send(TransportEvent::Disconnected("transport close".to_string()));
        handle.send(TransportEvent::ConnectError("refused".to_string()));
        settle().await;
        assert!(!hub.is_connected());
        assert_eq!(hub.reconnect_attempts(), 1);

        handle.send(TransportEvent::Connected);
        settle().await;
        assert!(hub.is_connected());
        assert_eq!(hub.reconnect_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_closes_transport() {
        let (transport, handle) = ChannelTransport::new();
        let hub = NotificationHub::new(transport);
        hub.connect().unwrap();
        settle().await;

        hub.disconnect();
        assert!(!hub.is_connected());
        assert!(!handle.is_open());
        assert!(!handle.notify(Notification::new("lost")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_test_notification_round_trip() {
        let (transport, _handle) = ChannelTransport::new();
        let hub = NotificationHub::new(transport);
        assert!(hub.send_test_notification().is_err());

        let (_id, mut rx) = hub.subscribe_channel();
        hub.connect().unwrap();
        settle().await;
        hub.send_test_notification().unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind.as_deref(), Some("test"));
    }
}
