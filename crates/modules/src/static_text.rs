//! Static text module
//!
//! Shows configurable text lines, for announcements and labels.

use log::warn;
use rg_kiosk_core::ContentModule;
use rg_kiosk_types::{ModuleInfo, ModuleSettings, ModuleView};
use serde::{Deserialize, Serialize};

/// Options of the static text module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTextConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_lines")]
    pub lines: Vec<String>,
}

fn default_title() -> String {
    "Message Board".to_string()
}

fn default_lines() -> Vec<String> {
    vec!["Welcome!".to_string()]
}

impl Default for StaticTextConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            lines: default_lines(),
        }
    }
}

pub struct StaticTextModule {
    info: ModuleInfo,
    config: StaticTextConfig,
}

impl StaticTextModule {
    pub fn new(config: StaticTextConfig) -> Self {
        // Ensure at least one line exists
        let config = if config.lines.is_empty() {
            warn!("Static text configured without lines, using default");
            StaticTextConfig {
                lines: default_lines(),
                ..config
            }
        } else {
            config
        };

        Self {
            info: ModuleInfo::new("static_text", &config.title),
            config,
        }
    }

    /// Build from settings, falling back to defaults on malformed options
    pub fn from_settings(settings: &ModuleSettings) -> Self {
        let config = if settings.options.is_null() {
            StaticTextConfig::default()
        } else {
            serde_json::from_value(settings.options.clone()).unwrap_or_else(|e| {
                warn!("Invalid static text options, using defaults: {}", e);
                StaticTextConfig::default()
            })
        };
        Self::new(config)
    }

    pub fn config(&self) -> &StaticTextConfig {
        &self.config
    }
}

impl Default for StaticTextModule {
    fn default() -> Self {
        Self::new(StaticTextConfig::default())
    }
}

impl ContentModule for StaticTextModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn render(&self) -> ModuleView {
        ModuleView::ready(&self.config.title, self.config.lines.clone())
    }
}
