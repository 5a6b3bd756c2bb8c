//! Bounded randomized fetch with retry
//!
//! `RetryBudgetFetcher` draws a random input from a configured range, runs a
//! fetch with it and validates the result, retrying up to a fixed number of
//! attempts. Attempts are strictly sequential and the call always resolves to
//! a structured `FetchOutcome`; errors never escape.

use crate::constants::DEFAULT_MAX_ATTEMPTS;
use crate::error::{AttemptError, FetchError};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::future::Future;
use std::hash::Hash;
use std::sync::Mutex;

/// Distinct results gathered by `collect_distinct`
#[derive(Debug, Clone, PartialEq)]
pub struct DistinctBatch<T> {
    /// Results in arrival order
    pub items: Vec<T>,
    /// Fetch attempts spent across every call
    pub attempts: u32,
}

/// Inclusive integer range random inputs are drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomRange {
    min: i64,
    max: i64,
}

impl RandomRange {
    pub fn new(min: i64, max: i64) -> Result<Self, FetchError> {
        if min > max {
            return Err(FetchError::InvalidRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> i64 {
        self.min
    }

    pub fn max(&self) -> i64 {
        self.max
    }

    /// Uniform draw in `min..=max`
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.gen_range(self.min..=self.max)
    }
}

/// Attempt count and input range for a fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub max_attempts: u32,
    /// Without a range the fetch receives no input
    pub range: Option<RandomRange>,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            range: None,
        }
    }
}

impl RetryBudget {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            range: None,
        }
    }

    pub fn with_range(mut self, range: RandomRange) -> Self {
        self.range = Some(range);
        self
    }
}

/// Result of a bounded fetch
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Success { data: T, attempts: u32 },
    Failure { error: String, attempts: u32 },
}

impl<T> FetchOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }

    /// Attempts spent, including the successful one
    pub fn attempts(&self) -> u32 {
        match self {
            FetchOutcome::Success { attempts, .. } | FetchOutcome::Failure { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchOutcome::Success { data, .. } => Some(data),
            FetchOutcome::Failure { .. } => None,
        }
    }

    pub fn into_result(self) -> Result<T, String> {
        match self {
            FetchOutcome::Success { data, .. } => Ok(data),
            FetchOutcome::Failure { error, .. } => Err(error),
        }
    }
}

/// Validator that accepts every value the fetch produced
///
/// Fetches that may legitimately find nothing should return `Option<T>` and
/// validate with `Option::is_some` instead.
pub fn accept_any<T>(_data: &T) -> bool {
    true
}

/// Observer that logs each failed attempt
pub fn log_failed_attempt(attempt: u32, error: &AttemptError) {
    warn!("Attempt {} failed: {}", attempt, error);
}

/// Randomized fetcher with a bounded retry budget
pub struct RetryBudgetFetcher {
    budget: RetryBudget,
    rng: Mutex<StdRng>,
}

impl RetryBudgetFetcher {
    /// Fetcher seeded from OS entropy
    pub fn new(budget: RetryBudget) -> Self {
        Self {
            budget,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic fetcher for reproducible draws
    pub fn with_seed(budget: RetryBudget, seed: u64) -> Self {
        Self {
            budget,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn budget(&self) -> &RetryBudget {
        &self.budget
    }

    fn draw(&self) -> Option<i64> {
        let range = self.budget.range?;
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        Some(range.sample(&mut *rng))
    }

    /// Fetch until `validator` accepts a result or the budget runs out.
    ///
    /// `observer` is called with the 1-based attempt number for every failed
    /// attempt, whether the fetch errored or the validator rejected its data.
    pub async fn fetch<T, F, Fut, V, O>(
        &self,
        mut fetch_fn: F,
        validator: V,
        mut observer: O,
    ) -> FetchOutcome<T>
    where
        F: FnMut(Option<i64>) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        V: Fn(&T) -> bool,
        O: FnMut(u32, &AttemptError),
    {
        let max_attempts = self.budget.max_attempts;

        for attempt in 1..=max_attempts {
            let input = self.draw();
            let error = match fetch_fn(input).await {
                Ok(data) if validator(&data) => {
                    debug!("Fetch succeeded on attempt {} (input {:?})", attempt, input);
                    return FetchOutcome::Success {
                        data,
                        attempts: attempt,
                    };
                }
                Ok(_) => AttemptError::ValidationFailed,
                Err(e) => AttemptError::Transport(e),
            };
            observer(attempt, &error);
        }

        FetchOutcome::Failure {
            error: format!("Failed after {} attempts", max_attempts),
            attempts: max_attempts,
        }
    }

    /// `fetch` with the accept-anything validator and logging observer
    pub async fn fetch_any<T, F, Fut>(&self, fetch_fn: F) -> FetchOutcome<T>
    where
        F: FnMut(Option<i64>) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.fetch(fetch_fn, accept_any, log_failed_attempt).await
    }

    /// Accumulate up to `count` results with distinct keys.
    ///
    /// Each of at most `max_calls` calls is a full bounded `fetch`; duplicates
    /// and failed calls count against `max_calls`. Results keep arrival order
    /// and the batch records the attempts actually made.
    pub async fn collect_distinct<T, K, F, Fut, V, KF>(
        &self,
        count: usize,
        max_calls: u32,
        mut fetch_fn: F,
        validator: V,
        key_fn: KF,
    ) -> DistinctBatch<T>
    where
        F: FnMut(Option<i64>) -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
        V: Fn(&T) -> bool,
        K: Eq + Hash,
        KF: Fn(&T) -> K,
    {
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(count);
        let mut attempts = 0;

        for _ in 0..max_calls {
            if items.len() >= count {
                break;
            }
            let outcome = self.fetch(&mut fetch_fn, &validator, log_failed_attempt).await;
            attempts += outcome.attempts();
            if let FetchOutcome::Success { data, .. } = outcome {
                if seen.insert(key_fn(&data)) {
                    items.push(data);
                }
            }
        }

        if items.len() < count {
            debug!(
                "Collected {} of {} distinct items after {} attempts",
                items.len(),
                count,
                attempts
            );
        }
        DistinctBatch { items, attempts }
    }
}
