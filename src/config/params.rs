//! Start-up parameters
//!
//! Parsed once at process entry, from command-line flags or a URL-style
//! query string, and handed by value to the display and modules.

use rg_kiosk_core::{Credential, ModuleContext};
use url::form_urlencoded;

/// Immutable start-up parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartupParams {
    /// Module to pin at start-up, matched by name
    pub app: Option<String>,
    /// Running on the physical display rather than a scaled preview
    pub on_device: bool,
    pub credential: Option<Credential>,
    /// "HH:MM" time override for clock modules
    pub time: Option<String>,
}

impl StartupParams {
    /// Parse `app=Clock&onDevice=true&fccApiKey=...&time=12:34`.
    ///
    /// A leading `?` is allowed. The first occurrence of a key wins and
    /// unknown keys are ignored. `onDevice` is only set by the exact value
    /// `true`; blank values count as absent.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut params = Self::default();
        let mut on_device: Option<bool> = None;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            match &*key {
                "app" if params.app.is_none() => params.app = non_empty(value),
                "onDevice" if on_device.is_none() => on_device = Some(value == "true"),
                "fccApiKey" | "credential" if params.credential.is_none() => {
                    params.credential = Credential::new(value)
                }
                "time" if params.time.is_none() => params.time = non_empty(value),
                _ => {}
            }
        }

        params.on_device = on_device.unwrap_or(false);
        params
    }

    /// Overlay explicitly given values from `other` onto these
    pub fn overridden_by(self, other: StartupParams) -> Self {
        Self {
            app: other.app.or(self.app),
            on_device: other.on_device || self.on_device,
            credential: other.credential.or(self.credential),
            time: other.time.or(self.time),
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    /// Context handed to every module on start
    pub fn module_context(&self) -> ModuleContext {
        ModuleContext {
            credential: self.credential.clone(),
            time_override: self.time.clone(),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_query() {
        let params =
            StartupParams::from_query("?app=Random%20Number&onDevice=true&fccApiKey=abc&time=07:30");
        assert_eq!(params.app.as_deref(), Some("Random Number"));
        assert!(params.on_device);
        assert_eq!(params.credential.as_ref().map(Credential::expose), Some("abc"));
        assert_eq!(params.time.as_deref(), Some("07:30"));
    }

    #[test]
    fn test_on_device_requires_true() {
        assert!(!StartupParams::from_query("onDevice=1").on_device);
        assert!(!StartupParams::from_query("onDevice=TRUE").on_device);
        assert!(!StartupParams::from_query("").on_device);
    }

    #[test]
    fn test_first_value_wins_and_blank_is_absent() {
        let params = StartupParams::from_query("app=Clock&app=Other&fccApiKey=&time=");
        assert_eq!(params.app.as_deref(), Some("Clock"));
        assert!(!params.has_credential());
        assert_eq!(params.time, None);
    }

    #[test]
    fn test_plus_decodes_to_space() {
        let params = StartupParams::from_query("app=this+or+that");
        assert_eq!(params.app.as_deref(), Some("this or that"));
    }

    #[test]
    fn test_overridden_by() {
        let query = StartupParams::from_query("app=Clock&fccApiKey=from-query&time=10:00");
        let flags = StartupParams {
            app: Some("Random Number".to_string()),
            ..Default::default()
        };

        let merged = query.overridden_by(flags);
        assert_eq!(merged.app.as_deref(), Some("Random Number"));
        assert_eq!(merged.credential.as_ref().map(Credential::expose), Some("from-query"));
        assert_eq!(merged.time.as_deref(), Some("10:00"));
    }

    #[test]
    fn test_module_context() {
        let params = StartupParams::from_query("fccApiKey=k&time=12:00");
        let context = params.module_context();
        assert!(context.has_credential());
        assert_eq!(context.time_override.as_deref(), Some("12:00"));
    }
}
