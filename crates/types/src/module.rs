//! Module descriptors and rendered views

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Identity of a registered content module
///
/// This is everything the display controller is allowed to know about a
/// module. The module's data and rendering stay behind the module itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Unique key (e.g. "clock", "random_number")
    pub key: String,
    /// Human-readable name shown on screen (e.g. "Random Number")
    pub display_name: String,
    /// Whether the module needs a credential token to fetch its data
    #[serde(default)]
    pub requires_credential: bool,
}

impl ModuleInfo {
    pub fn new(key: &str, display_name: &str) -> Self {
        Self {
            key: key.to_string(),
            display_name: display_name.to_string(),
            requires_credential: false,
        }
    }

    /// Mark the module as requiring a credential
    pub fn with_credential(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    /// Check whether `name` refers to this module.
    ///
    /// Matching ignores case and all whitespace, so "random number",
    /// "RandomNumber" and "randomnumber" all select "Random Number".
    pub fn matches_name(&self, name: &str) -> bool {
        let wanted = normalize_module_name(name);
        !wanted.is_empty()
            && (normalize_module_name(&self.display_name) == wanted
                || normalize_module_name(&self.key) == wanted)
    }
}

/// Lowercase a module name and strip all whitespace
pub fn normalize_module_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Presentation status of a rendered view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    #[default]
    Ready,
    Loading,
    Error,
    MissingCredential,
}

/// Output of a module's render capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModuleView {
    pub title: String,
    pub lines: Vec<String>,
    #[serde(default)]
    pub status: ViewStatus,
}

impl ModuleView {
    pub fn ready(title: &str, lines: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            lines,
            status: ViewStatus::Ready,
        }
    }

    pub fn loading(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: vec![format!("Loading {}", title)],
            status: ViewStatus::Loading,
        }
    }

    pub fn error(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: vec![message.to_string()],
            status: ViewStatus::Error,
        }
    }

    pub fn missing_credential(title: &str) -> Self {
        Self {
            title: title.to_string(),
            lines: vec!["A credential is required to show this module".to_string()],
            status: ViewStatus::MissingCredential,
        }
    }
}

/// Per-module settings from the configuration file, keyed by module key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Refresh interval override in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_interval_ms: Option<u64>,
    /// Module-specific options, interpreted by the module itself
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

fn default_enabled() -> bool {
    true
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            refresh_interval_ms: None,
            options: Value::Null,
        }
    }
}

impl ModuleSettings {
    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}
