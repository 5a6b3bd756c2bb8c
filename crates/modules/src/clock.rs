//! Clock module
//!
//! Shows the local time, refreshed every second. A valid "HH:MM" time
//! override pins the clock to that time and disables refreshing.

use anyhow::Result;
use chrono::{Local, NaiveTime, Timelike};
use log::{debug, warn};
use rg_kiosk_core::{ContentModule, ModuleContext, RefreshScheduler};
use rg_kiosk_types::{ModuleInfo, ModuleSettings, ModuleView};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CLOCK_INTERVAL: Duration = Duration::from_secs(1);

/// Parse a "HH:MM" override. Anything else is rejected.
pub fn parse_time_override(value: &str) -> Option<NaiveTime> {
    // chrono accepts single-digit hours and leading blanks; the override doesn't
    if value.len() != 5 || value.contains(char::is_whitespace) {
        return None;
    }
    NaiveTime::parse_from_str(value, "%H:%M").ok()
}

/// Format as "h:mm:ss AM"
pub fn format_time(time: NaiveTime) -> String {
    let (is_pm, hour) = time.hour12();
    format!(
        "{}:{:02}:{:02} {}",
        hour,
        time.minute(),
        time.second(),
        if is_pm { "PM" } else { "AM" }
    )
}

pub struct ClockModule {
    info: ModuleInfo,
    interval: Duration,
    time: Arc<Mutex<NaiveTime>>,
    scheduler: Mutex<Option<RefreshScheduler<NaiveTime>>>,
}

impl ClockModule {
    pub fn new() -> Self {
        Self::from_settings(&ModuleSettings::default())
    }

    pub fn from_settings(settings: &ModuleSettings) -> Self {
        Self {
            info: ModuleInfo::new("clock", "Clock"),
            interval: settings.refresh_interval().unwrap_or(CLOCK_INTERVAL),
            time: Arc::new(Mutex::new(Local::now().time())),
            scheduler: Mutex::new(None),
        }
    }

    /// Time currently shown
    pub fn time(&self) -> NaiveTime {
        *self.time.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_refreshing(&self) -> bool {
        self.scheduler
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}

impl Default for ClockModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentModule for ClockModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn render(&self) -> ModuleView {
        ModuleView::ready(&self.info.display_name, vec![format_time(self.time())])
    }

    fn start(&self, context: &ModuleContext) -> Result<()> {
        if let Some(value) = context.time_override.as_deref() {
            match parse_time_override(value) {
                Some(time) => {
                    debug!("Clock pinned to {}", value);
                    *self.time.lock().unwrap_or_else(|e| e.into_inner()) = time;
                    return Ok(());
                }
                None => warn!("Ignoring invalid time override {:?}, expected HH:MM", value),
            }
        }

        let time = Arc::clone(&self.time);
        let mut scheduler =
            RefreshScheduler::new("clock", self.interval, || async { Ok(Local::now().time()) })
                .on_success(move |now| {
                    if let Ok(mut time) = time.lock() {
                        *time = now;
                    }
                });
        scheduler.start();
        *self.scheduler.lock().unwrap_or_else(|e| e.into_inner()) = Some(scheduler);
        Ok(())
    }

    fn stop(&self) {
        if let Ok(mut slot) = self.scheduler.lock() {
            slot.take();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_time_override() {
        assert_eq!(
            parse_time_override("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_time_override("23:59"),
            NaiveTime::from_hms_opt(23, 59, 0)
        );
        assert_eq!(parse_time_override("9:30"), None);
        assert_eq!(parse_time_override(" 9:30"), None);
        assert_eq!(parse_time_override("9:300"), None);
        assert_eq!(parse_time_override("24:00"), None);
        assert_eq!(parse_time_override("12:60"), None);
        assert_eq!(parse_time_override("12.30"), None);
        assert_eq!(parse_time_override(""), None);
    }

    #[test]
    fn test_format_time() {
        let time = NaiveTime::from_hms_opt(13, 5, 9).unwrap();
        assert_eq!(format_time(time), "1:05:09 PM");
        let time = NaiveTime::from_hms_opt(0, 0, 0).unwrap();
        assert_eq!(format_time(time), "12:00:00 AM");
    }

    #[tokio::test]
    async fn test_override_pins_time() {
        let clock = ClockModule::new();
        let context = ModuleContext {
            time_override: Some("07:45".to_string()),
            ..Default::default()
        };
        clock.start(&context).unwrap();

        assert!(!clock.is_refreshing());
        assert_eq!(clock.render().lines, vec!["7:45:00 AM".to_string()]);
    }

    #[tokio::test]
    async fn test_invalid_override_falls_back_to_live_time() {
        let clock = ClockModule::new();
        let context = ModuleContext {
            time_override: Some("7:45".to_string()),
            ..Default::default()
        };
        clock.start(&context).unwrap();
        assert!(clock.is_refreshing());

        clock.stop();
        assert!(!clock.is_refreshing());
    }
}
