//! Random number module
//!
//! Draws a number from a configured range, rejecting unwanted values, and
//! redraws periodically. Shows the loading and error states of a
//! `RandomFetchTask` while it works.

use anyhow::{anyhow, Result};
use log::debug;
use rg_kiosk_core::{
    AutoRetryPolicy, ContentModule, ModuleContext, RandomFetchTask, RandomRange, RetryBudget,
    RetryBudgetFetcher, DEFAULT_MAX_ATTEMPTS,
};
use rg_kiosk_types::{ModuleInfo, ModuleSettings, ModuleStatus, ModuleView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const REDRAW_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomNumberConfig {
    #[serde(default = "default_min")]
    pub min: i64,
    #[serde(default = "default_max")]
    pub max: i64,
    /// Values that are never shown
    #[serde(default = "default_rejected")]
    pub rejected: Vec<i64>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_min() -> i64 {
    1
}

fn default_max() -> i64 {
    100
}

fn default_rejected() -> Vec<i64> {
    vec![13]
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for RandomNumberConfig {
    fn default() -> Self {
        Self {
            min: default_min(),
            max: default_max(),
            rejected: default_rejected(),
            max_attempts: default_max_attempts(),
        }
    }
}

pub struct RandomNumberModule {
    info: ModuleInfo,
    interval: Duration,
    task: Arc<RandomFetchTask<i64>>,
}

impl RandomNumberModule {
    pub fn new(config: RandomNumberConfig, interval: Duration) -> Result<Self> {
        Self::with_fetcher(config, interval, None)
    }

    /// Deterministic variant for reproducible draws
    pub fn with_seed(config: RandomNumberConfig, interval: Duration, seed: u64) -> Result<Self> {
        Self::with_fetcher(config, interval, Some(seed))
    }

    fn with_fetcher(config: RandomNumberConfig, interval: Duration, seed: Option<u64>) -> Result<Self> {
        let range = RandomRange::new(config.min, config.max)?;
        let budget = RetryBudget::new(config.max_attempts).with_range(range);
        let fetcher = match seed {
            Some(seed) => RetryBudgetFetcher::with_seed(budget, seed),
            None => RetryBudgetFetcher::new(budget),
        };

        let rejected = config.rejected;
        let task = RandomFetchTask::new(
            "random_number",
            fetcher,
            |input| async move { input.ok_or_else(|| anyhow!("no range configured")) },
            move |value: &i64| !rejected.contains(value),
        );

        Ok(Self {
            info: ModuleInfo::new("random_number", "Random Number"),
            interval,
            task: Arc::new(task),
        })
    }

    pub fn from_settings(settings: &ModuleSettings) -> Result<Self> {
        let config = if settings.options.is_null() {
            RandomNumberConfig::default()
        } else {
            serde_json::from_value(settings.options.clone())?
        };
        Self::new(config, settings.refresh_interval().unwrap_or(REDRAW_INTERVAL))
    }

    pub fn status(&self) -> ModuleStatus<i64> {
        self.task.status()
    }

    /// Draw a new number now
    pub async fn refresh(&self) {
        self.task.fetch_data().await;
    }
}

impl ContentModule for RandomNumberModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn render(&self) -> ModuleView {
        let title = &self.info.display_name;
        match self.task.status() {
            ModuleStatus::Loading => ModuleView::loading(title),
            ModuleStatus::Ready { data } => ModuleView::ready(title, vec![data.to_string()]),
            ModuleStatus::Failed { error, .. } => ModuleView::error(title, &error),
            ModuleStatus::MissingCredential => ModuleView::missing_credential(title),
        }
    }

    fn start(&self, _context: &ModuleContext) -> Result<()> {
        debug!("Starting random number draws every {:?}", self.interval);
        self.task.start_auto_refresh(self.interval, AutoRetryPolicy::Always);
        Ok(())
    }

    fn stop(&self) {
        self.task.stop_auto_retry();
    }
}
