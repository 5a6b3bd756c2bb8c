//! Kiosk configuration file

use anyhow::{Context, Result};
use rg_kiosk_core::{MAX_RECONNECT_ATTEMPTS, NOTIFICATION_DISPLAY_DURATION};
use rg_kiosk_types::{DisplayTiming, ModuleSettings};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application-wide configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KioskConfig {
    /// Version of the config format
    pub version: u32,
    /// Idle, cycling and lock timing
    #[serde(default)]
    pub timing: DisplayTiming,
    /// Per-module settings, keyed by module key
    #[serde(default)]
    pub modules: HashMap<String, ModuleSettings>,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

impl KioskConfig {
    /// Load configuration from disk
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let dirs = directories::ProjectDirs::from("com", "github.rg_kiosk", "rg-kiosk")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.json"))
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a specific file path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            version: 1,
            timing: DisplayTiming::default(),
            modules: HashMap::new(),
            notifications: NotificationConfig::default(),
        }
    }
}

/// Notification display and connection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// How long each notification stays on screen
    #[serde(default = "default_display_ms")]
    pub display_ms: u64,
    /// Consecutive connect errors before giving up
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
}

fn default_display_ms() -> u64 {
    NOTIFICATION_DISPLAY_DURATION.as_millis() as u64
}

fn default_max_reconnect_attempts() -> u32 {
    MAX_RECONNECT_ATTEMPTS
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_ms: default_display_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
        }
    }
}

impl NotificationConfig {
    pub fn display_duration(&self) -> Duration {
        Duration::from_millis(self.display_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = KioskConfig::default();
        assert_eq!(config.timing.idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.timing.cycle_interval(), Duration::from_secs(10));
        assert_eq!(config.notifications.display_duration(), Duration::from_secs(5));
        assert_eq!(config.notifications.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: KioskConfig = serde_json::from_value(json!({
            "version": 1,
            "timing": { "idle_timeout_ms": 60000 },
            "modules": { "static_text": { "options": { "lines": ["Hello"] } } }
        }))
        .unwrap();

        assert_eq!(config.timing.idle_timeout(), Duration::from_secs(60));
        assert_eq!(config.timing.long_press_ms, 800);
        assert!(config.modules["static_text"].enabled);
        assert_eq!(config.notifications, NotificationConfig::default());
    }

    #[test]
    fn test_save_and_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = KioskConfig::default();
        config.timing.cycle_interval_ms = 15_000;
        config.modules.insert(
            "random_number".to_string(),
            ModuleSettings {
                refresh_interval_ms: Some(2000),
                ..Default::default()
            },
        );
        config.save_to_path(&path).unwrap();

        let loaded = KioskConfig::load_from_path(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let error = KioskConfig::load_from_path(&path).unwrap_err();
        assert!(format!("{:#}", error).contains("config.json"));
    }
}
