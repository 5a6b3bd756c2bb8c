//! Fetch status types exposed to module renderers

use serde::{Deserialize, Serialize};

/// State of a randomized fetch task
///
/// Mirrors what a module needs to pick between its loading, error and
/// content presentations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchState<T> {
    /// Last validated result, kept across later failed cycles
    pub data: Option<T>,
    pub is_loading: bool,
    /// Terminal error of the last cycle
    pub error: Option<String>,
    /// Failed attempts in the current or last cycle
    pub attempts: u32,
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
            attempts: 0,
        }
    }
}

/// What a module currently has to show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModuleStatus<T> {
    Loading,
    Ready { data: T },
    Failed { error: String, attempts: u32 },
    MissingCredential,
}

impl<T: Clone> ModuleStatus<T> {
    /// Derive a status from fetch state.
    ///
    /// Data wins over a later error so a transient failure doesn't blank
    /// the screen; an error is only shown when nothing was ever fetched.
    pub fn from_fetch_state(state: &FetchState<T>) -> Self {
        match (&state.data, &state.error) {
            (Some(data), _) => ModuleStatus::Ready { data: data.clone() },
            (None, Some(error)) if !state.is_loading => ModuleStatus::Failed {
                error: error.clone(),
                attempts: state.attempts,
            },
            _ => ModuleStatus::Loading,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_prefers_data() {
        let state = FetchState {
            data: Some(3),
            is_loading: false,
            error: Some("Failed after 10 attempts".to_string()),
            attempts: 10,
        };
        assert_eq!(
            ModuleStatus::from_fetch_state(&state),
            ModuleStatus::Ready { data: 3 }
        );
    }

    #[test]
    fn test_status_error_without_data() {
        let state: FetchState<u32> = FetchState {
            data: None,
            is_loading: false,
            error: Some("Failed after 2 attempts".to_string()),
            attempts: 2,
        };
        assert_eq!(
            ModuleStatus::from_fetch_state(&state),
            ModuleStatus::Failed {
                error: "Failed after 2 attempts".to_string(),
                attempts: 2
            }
        );
    }

    #[test]
    fn test_status_loading_initially() {
        let state: FetchState<u32> = FetchState::default();
        assert_eq!(ModuleStatus::from_fetch_state(&state), ModuleStatus::Loading);
    }
}
