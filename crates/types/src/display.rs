//! Display state and timing configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Width of the design surface in pixels
pub const DESIGN_WIDTH: f64 = 1920.0;

/// Height of the design surface in pixels
pub const DESIGN_HEIGHT: f64 = 480.0;

/// Fraction of the viewport the simulated screen may occupy
const VIEWPORT_FILL: f64 = 0.9;

/// Observable state of the display
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayState {
    /// Index of the visible module (always < module count)
    pub current_index: usize,
    /// Screensaver mode: modules auto-cycle
    pub is_idle: bool,
    /// Pinned to the current module, idle timer suspended
    pub is_locked: bool,
    /// Short window after a lock toggle during which navigation is ignored
    pub is_interaction_disabled: bool,
    /// Scale factor of the design surface within the viewport
    pub scale: f64,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self {
            current_index: 0,
            is_idle: false,
            is_locked: false,
            is_interaction_disabled: false,
            scale: 1.0,
        }
    }
}

impl DisplayState {
    /// Compute the scale that fits the design surface into a viewport.
    ///
    /// Returns `None` for degenerate viewports so the caller can keep the
    /// previous scale.
    pub fn compute_scale(viewport_width: f64, viewport_height: f64) -> Option<f64> {
        if !(viewport_width > 0.0 && viewport_height > 0.0) {
            return None;
        }

        let max_scale =
            (viewport_width / DESIGN_WIDTH).min(viewport_height / DESIGN_HEIGHT) * VIEWPORT_FILL;

        // Snap to whole-pixel dimensions
        let width = (DESIGN_WIDTH * max_scale).floor();
        let height = (DESIGN_HEIGHT * max_scale).floor();

        let scale = (width / DESIGN_WIDTH).min(height / DESIGN_HEIGHT).min(1.0);
        if scale > 0.0 {
            Some(scale)
        } else {
            None
        }
    }
}

/// Timing of the display state machine, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayTiming {
    /// Inactivity before entering screensaver mode
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Period between module changes while idle
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Hold duration that toggles the lock
    #[serde(default = "default_long_press_ms")]
    pub long_press_ms: u64,
    /// Window after a lock toggle during which input is ignored
    #[serde(default = "default_interaction_disable_ms")]
    pub interaction_disable_ms: u64,
}

fn default_idle_timeout_ms() -> u64 {
    5 * 60 * 1000
}

fn default_cycle_interval_ms() -> u64 {
    10_000
}

fn default_long_press_ms() -> u64 {
    800
}

fn default_interaction_disable_ms() -> u64 {
    1000
}

impl Default for DisplayTiming {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            cycle_interval_ms: default_cycle_interval_ms(),
            long_press_ms: default_long_press_ms(),
            interaction_disable_ms: default_interaction_disable_ms(),
        }
    }
}

impl DisplayTiming {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn interaction_disable(&self) -> Duration {
        Duration::from_millis(self.interaction_disable_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_defaults() {
        let timing = DisplayTiming::default();
        assert_eq!(timing.idle_timeout(), Duration::from_secs(300));
        assert_eq!(timing.cycle_interval(), Duration::from_secs(10));
        assert_eq!(timing.long_press(), Duration::from_millis(800));
        assert_eq!(timing.interaction_disable(), Duration::from_secs(1));
    }

    #[test]
    fn test_timing_partial_deserialize() {
        let timing: DisplayTiming = serde_json::from_str(r#"{"cycle_interval_ms":2500}"#).unwrap();
        assert_eq!(timing.cycle_interval_ms, 2500);
        assert_eq!(timing.idle_timeout_ms, 300_000);
    }

    #[test]
    fn test_scale_large_viewport_caps_at_one() {
        assert_eq!(DisplayState::compute_scale(4000.0, 2000.0), Some(1.0));
    }

    #[test]
    fn test_scale_small_viewport() {
        // 960 / 1920 * 0.9 = 0.45 -> 864 x 216 px
        let scale = DisplayState::compute_scale(960.0, 1000.0).unwrap();
        assert!((scale - 0.45).abs() < 1e-3);
    }

    #[test]
    fn test_scale_degenerate_viewport() {
        assert_eq!(DisplayState::compute_scale(0.0, 480.0), None);
        assert_eq!(DisplayState::compute_scale(-5.0, -5.0), None);
        assert_eq!(DisplayState::compute_scale(f64::NAN, 480.0), None);
    }
}
