//! Shared constants for the display core

use std::time::Duration;

/// Default retry budget for randomized fetches
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// How long each notification stays on screen
pub const NOTIFICATION_DISPLAY_DURATION: Duration = Duration::from_secs(5);

/// Consecutive connect errors tolerated before the notification hub gives up
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Module whose display name always sorts first in the registry
pub const PINNED_FIRST_MODULE: &str = "Clock";
