//! rg-kiosk-core: Display state machine and fetch primitives for rg-Kiosk.
//!
//! This crate contains the `ContentModule` trait and the `ModuleRegistry`,
//! the `DisplayController` state machine and its async `DisplaySession`
//! host, the `RefreshScheduler` and `RetryBudgetFetcher` fetch primitives,
//! and the notification client.

pub mod constants;
mod controller;
mod credential;
mod error;
mod fetch_task;
mod hub;
mod module;
mod notifications;
mod refresh;
mod registry;
mod retry;
mod session;
mod timer;

pub use constants::{
    DEFAULT_MAX_ATTEMPTS, MAX_RECONNECT_ATTEMPTS, NOTIFICATION_DISPLAY_DURATION,
    PINNED_FIRST_MODULE,
};
pub use controller::{DisplayCommand, DisplayController};
pub use credential::{require_credential, Credential};
pub use error::{AttemptError, DisplayError, FetchError, NotificationError};
pub use fetch_task::{AutoRetryPolicy, RandomFetchTask};
pub use hub::{
    ChannelTransport, ChannelTransportHandle, NotificationHub, NotificationTransport,
    SubscriptionId, TransportEvent,
};
pub use module::{BoxedModule, ContentModule, ModuleContext};
pub use notifications::{ActiveNotification, NotificationCenter};
pub use refresh::{BoxFuture, RefreshScheduler, RefreshSession};
pub use registry::ModuleRegistry;
pub use retry::{
    accept_any, log_failed_attempt, DistinctBatch, FetchOutcome, RandomRange, RetryBudget,
    RetryBudgetFetcher,
};
pub use session::{DisplaySession, DisplaySnapshot, SessionEvent, SessionHandle};
pub use timer::TimerSlot;

// Re-export types used in trait signatures for convenience
pub use rg_kiosk_types::{FetchState, ModuleInfo, ModuleStatus, ModuleView, Notification};
