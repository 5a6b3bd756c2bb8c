//! "This or That" module
//!
//! Puts two distinct choices side by side for a vote. Drawing choices calls
//! an authenticated service, so the module requires a credential; without
//! one its retry budget is zero and it shows the missing-credential view.

use anyhow::{anyhow, Result};
use log::warn;
use rg_kiosk_core::{
    accept_any, ContentModule, DistinctBatch, ModuleContext, RandomRange, RefreshScheduler,
    RetryBudget, RetryBudgetFetcher, DEFAULT_MAX_ATTEMPTS,
};
use rg_kiosk_types::{ModuleInfo, ModuleSettings, ModuleStatus, ModuleView};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const PAIR_INTERVAL: Duration = Duration::from_secs(60);

/// Bounded number of draws spent looking for two distinct choices
const MAX_PAIR_DRAWS: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThisOrThatConfig {
    #[serde(default = "default_choices")]
    pub choices: Vec<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_choices() -> Vec<String> {
    ["Cats", "Dogs", "Tea", "Coffee", "Mountains", "Beaches", "Books", "Movies"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

impl Default for ThisOrThatConfig {
    fn default() -> Self {
        Self {
            choices: default_choices(),
            max_attempts: default_max_attempts(),
        }
    }
}

type Pair = Vec<String>;

pub struct ThisOrThatModule {
    info: ModuleInfo,
    config: ThisOrThatConfig,
    range: RandomRange,
    interval: Duration,
    status: Arc<Mutex<ModuleStatus<Pair>>>,
    scheduler: Mutex<Option<RefreshScheduler<DistinctBatch<String>>>>,
}

impl ThisOrThatModule {
    pub fn new(config: ThisOrThatConfig, interval: Duration) -> Result<Self> {
        if config.choices.len() < 2 {
            return Err(anyhow!("This or That needs at least two choices"));
        }
        let range = RandomRange::new(0, config.choices.len() as i64 - 1)?;

        Ok(Self {
            info: ModuleInfo::new("this_or_that", "This Or That").with_credential(),
            config,
            range,
            interval,
            status: Arc::new(Mutex::new(ModuleStatus::Loading)),
            scheduler: Mutex::new(None),
        })
    }

    pub fn from_settings(settings: &ModuleSettings) -> Result<Self> {
        let config = if settings.options.is_null() {
            ThisOrThatConfig::default()
        } else {
            serde_json::from_value(settings.options.clone())?
        };
        Self::new(config, settings.refresh_interval().unwrap_or(PAIR_INTERVAL))
    }

    pub fn status(&self) -> ModuleStatus<Pair> {
        self.status
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn set_status(status: &Mutex<ModuleStatus<Pair>>, value: ModuleStatus<Pair>) {
        *status.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }
}

/// Draw two distinct choices
async fn draw_pair(fetcher: &RetryBudgetFetcher, choices: &[String]) -> DistinctBatch<String> {
    fetcher
        .collect_distinct(
            2,
            MAX_PAIR_DRAWS,
            |input| {
                let choice = input
                    .and_then(|i| usize::try_from(i).ok())
                    .and_then(|i| choices.get(i).cloned());
                async move { choice.ok_or_else(|| anyhow!("no choice for draw {:?}", input)) }
            },
            accept_any,
            |choice: &String| choice.clone(),
        )
        .await
}

fn pair_status(batch: DistinctBatch<String>) -> ModuleStatus<Pair> {
    if batch.items.len() == 2 {
        ModuleStatus::Ready { data: batch.items }
    } else {
        ModuleStatus::Failed {
            error: format!(
                "Failed to draw two distinct choices after {} attempts",
                batch.attempts
            ),
            attempts: batch.attempts,
        }
    }
}

impl ContentModule for ThisOrThatModule {
    fn info(&self) -> &ModuleInfo {
        &self.info
    }

    fn render(&self) -> ModuleView {
        let title = &self.info.display_name;
        match self.status() {
            ModuleStatus::Loading => ModuleView::loading(title),
            ModuleStatus::Ready { data } => {
                ModuleView::ready(title, vec![data.join("  or  ")])
            }
            ModuleStatus::Failed { error, .. } => ModuleView::error(title, &error),
            ModuleStatus::MissingCredential => ModuleView::missing_credential(title),
        }
    }

    fn start(&self, context: &ModuleContext) -> Result<()> {
        // No credential, no attempts
        let max_attempts = if context.has_credential() {
            self.config.max_attempts
        } else {
            Self::set_status(&self.status, ModuleStatus::MissingCredential);
            return Ok(());
        };

        let fetcher = Arc::new(RetryBudgetFetcher::new(
            RetryBudget::new(max_attempts).with_range(self.range),
        ));
        let choices = Arc::new(self.config.choices.clone());
        let on_success = Arc::clone(&self.status);
        let on_error = Arc::clone(&self.status);

        let mut scheduler = RefreshScheduler::new("this_or_that", self.interval, move || {
            let fetcher = Arc::clone(&fetcher);
            let choices = Arc::clone(&choices);
            async move { Ok(draw_pair(&fetcher, &choices).await) }
        })
        .on_success(move |batch| {
            let status = pair_status(batch);
            if let ModuleStatus::Failed { error, .. } = &status {
                warn!("This or That draw failed: {}", error);
            }
            Self::set_status(&on_success, status);
        })
        .on_error(move |e| {
            warn!("This or That refresh failed: {:#}", e);
            Self::set_status(
                &on_error,
                ModuleStatus::Failed {
                    error: e.to_string(),
                    attempts: 0,
                },
            );
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
    use rg_kiosk_core::Credential;
    use rg_kiosk_types::ViewStatus;

    #[tokio::test]
    async fn test_draw_pair_is_distinct() {
        let choices = default_choices();
        let range = RandomRange::new(0, choices.len() as i64 - 1).unwrap();
        let fetcher = RetryBudgetFetcher::with_seed(RetryBudget::new(10).with_range(range), 3);

        let pair = draw_pair(&fetcher, &choices).await.items;
        assert_eq!(pair.len(), 2);
        assert_ne!(pair[0], pair[1]);
        assert!(pair.iter().all(|c| choices.contains(c)));
    }

    #[tokio::test]
    async fn test_zero_budget_cannot_draw() {
        let choices = default_choices();
        let range = RandomRange::new(0, choices.len() as i64 - 1).unwrap();
        let fetcher = RetryBudgetFetcher::with_seed(RetryBudget::new(0).with_range(range), 3);

        let batch = draw_pair(&fetcher, &choices).await;
        assert!(batch.items.is_empty());
        assert_eq!(batch.attempts, 0);
        assert_eq!(
            pair_status(batch),
            ModuleStatus::Failed {
                error: "Failed to draw two distinct choices after 0 attempts".to_string(),
                attempts: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_failed_draw_reports_real_attempts() {
        // Every draw lands outside the choice list
        let choices = vec!["Only".to_string(), "Other".to_string()];
        let range = RandomRange::new(5, 9).unwrap();
        let fetcher = RetryBudgetFetcher::with_seed(RetryBudget::new(3).with_range(range), 3);

        let batch = draw_pair(&fetcher, &choices).await;
        assert_eq!(batch.attempts, 3 * MAX_PAIR_DRAWS);
        match pair_status(batch) {
            ModuleStatus::Failed { attempts, .. } => assert_eq!(attempts, 30),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credential() {
        let module = ThisOrThatModule::new(ThisOrThatConfig::default(), PAIR_INTERVAL).unwrap();
        assert!(module.info().requires_credential);

        module.start(&ModuleContext::default()).unwrap();
        assert_eq!(module.status(), ModuleStatus::MissingCredential);
        assert_eq!(module.render().status, ViewStatus::MissingCredential);
    }

    #[tokio::test(start_paused = true)]
    async fn test_draws_with_credential() {
        let module = ThisOrThatModule::new(ThisOrThatConfig::default(), PAIR_INTERVAL).unwrap();
        let context = ModuleContext {
            credential: Credential::new("token"),
            ..Default::default()
        };
        module.start(&context).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let view = module.render();
        assert_eq!(view.status, ViewStatus::Ready);
        assert!(view.lines[0].contains(" or "));
        module.stop();
    }

    #[test]
    fn test_needs_two_choices() {
        let config = ThisOrThatConfig {
            choices: vec!["Only".to_string()],
            max_attempts: 10,
        };
        assert!(ThisOrThatModule::new(config, PAIR_INTERVAL).is_err());
    }
}
