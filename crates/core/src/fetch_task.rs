//! Stateful randomized fetch with optional auto-retry
//!
//! `RandomFetchTask` wraps a `RetryBudgetFetcher` with the state a module
//! renders from (`FetchState`) and a periodic auto-retry built on
//! `RefreshScheduler`, so retries never overlap each other or a manual fetch.

use crate::refresh::{BoxFuture, RefreshScheduler};
use crate::retry::{FetchOutcome, RetryBudgetFetcher};
use anyhow::Result;
use log::{debug, warn};
use rg_kiosk_types::{FetchState, ModuleStatus};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type FetchFn<T> = dyn Fn(Option<i64>) -> BoxFuture<'static, Result<T>> + Send + Sync;
type ValidatorFn<T> = dyn Fn(&T) -> bool + Send + Sync;

/// When an auto-retry cycle actually fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoRetryPolicy {
    /// Only while nothing valid has been fetched or the last cycle failed
    #[default]
    OnFailure,
    /// Every cycle, replacing the data with a fresh draw
    Always,
}

struct FetchInner<T> {
    name: String,
    fetcher: RetryBudgetFetcher,
    fetch_fn: Arc<FetchFn<T>>,
    validator: Arc<ValidatorFn<T>>,
    state: Mutex<FetchState<T>>,
}

impl<T: Clone + Send + Sync + 'static> FetchInner<T> {
    fn update(&self, f: impl FnOnce(&mut FetchState<T>)) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    fn should_fetch(&self, policy: AutoRetryPolicy) -> bool {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.is_loading {
            return false;
        }
        match policy {
            AutoRetryPolicy::Always => true,
            AutoRetryPolicy::OnFailure => state.data.is_none() || state.error.is_some(),
        }
    }

    async fn run(&self) -> FetchOutcome<T> {
        self.update(|state| {
            state.is_loading = true;
            state.error = None;
            state.attempts = 0;
        });

        let fetch_fn = Arc::clone(&self.fetch_fn);
        let validator = Arc::clone(&self.validator);
        let outcome = self
            .fetcher
            .fetch(
                move |input| fetch_fn(input),
                move |data: &T| validator(data),
                |attempt, error| {
                    warn!("{}: attempt {} failed: {}", self.name, attempt, error);
                    self.update(|state| state.attempts = attempt);
                },
            )
            .await;

        match &outcome {
            FetchOutcome::Success { data, attempts } => {
                debug!("{}: fetched after {} attempt(s)", self.name, attempts);
                let data = data.clone();
                self.update(|state| {
                    state.data = Some(data);
                    state.is_loading = false;
                });
            }
            FetchOutcome::Failure { error, .. } => {
                let error = error.clone();
                self.update(|state| {
                    state.error = Some(error);
                    state.is_loading = false;
                });
            }
        }
        outcome
    }
}

/// A randomized fetch whose progress is observable as `FetchState`
pub struct RandomFetchTask<T: Clone + Send + Sync + 'static> {
    inner: Arc<FetchInner<T>>,
    auto_retry: Mutex<Option<RefreshScheduler<()>>>,
}

impl<T: Clone + Send + Sync + 'static> RandomFetchTask<T> {
    pub fn new<F, Fut, V>(name: &str, fetcher: RetryBudgetFetcher, fetch_fn: F, validator: V) -> Self
    where
        F: Fn(Option<i64>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        V: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let fetch_fn: Arc<FetchFn<T>> =
            Arc::new(move |input| Box::pin(fetch_fn(input)) as BoxFuture<'static, Result<T>>);
        Self {
            inner: Arc::new(FetchInner {
                name: name.to_string(),
                fetcher,
                fetch_fn,
                validator: Arc::new(validator),
                state: Mutex::new(FetchState::default()),
            }),
            auto_retry: Mutex::new(None),
        }
    }

    /// Run one bounded fetch, updating the shared state as it goes.
    ///
    /// Previously fetched data is kept when the fetch fails.
    pub async fn fetch_data(&self) -> FetchOutcome<T> {
        self.inner.run().await
    }

    /// Copy of the current state
    pub fn state(&self) -> FetchState<T> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn status(&self) -> ModuleStatus<T> {
        let state = self.inner.state.lock().unwrap_or_else(|e| e.into_inner());
        ModuleStatus::from_fetch_state(&state)
    }

    /// Start periodic fetching, the first cycle one `interval` from now.
    ///
    /// Replaces any running auto-retry. Must be called inside a tokio runtime.
    pub fn start_auto_retry(&self, interval: Duration, policy: AutoRetryPolicy) {
        self.schedule(interval, policy, false);
    }

    /// Like `start_auto_retry`, but the first cycle runs right away
    pub fn start_auto_refresh(&self, interval: Duration, policy: AutoRetryPolicy) {
        self.schedule(interval, policy, true);
    }

    fn schedule(&self, interval: Duration, policy: AutoRetryPolicy, immediate: bool) {
        let inner = Arc::clone(&self.inner);
        let mut scheduler = RefreshScheduler::new(
            &format!("{} auto-retry", self.inner.name),
            interval,
            move || {
                let inner = Arc::clone(&inner);
                async move {
                    if inner.should_fetch(policy) {
                        inner.run().await;
                    }
                    Ok(())
                }
            },
        )
        .immediate(immediate);
        scheduler.start();

        let mut slot = self.auto_retry.lock().unwrap_or_else(|e| e.into_inner());
        // Dropping the previous scheduler stops it
        *slot = Some(scheduler);
    }

    pub fn stop_auto_retry(&self) {
        if let Ok(mut slot) = self.auto_retry.lock() {
            slot.take();
        }
    }

    pub fn is_auto_retrying(&self) -> bool {
        self.auto_retry
            .lock()
            .map(|slot| slot.is_some())
            .unwrap_or(false)
    }
}
