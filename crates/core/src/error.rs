//! Error types of the display core

use thiserror::Error;

/// Errors raised while building a display controller
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DisplayError {
    #[error("no modules registered; the display needs at least one module")]
    NoModules,
}

/// Errors raised by the fetch primitives before any attempt is made
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("invalid random range: min {min} is greater than max {max}")]
    InvalidRange { min: i64, max: i64 },
    #[error("a credential is required but none is configured")]
    MissingCredential,
}

/// A single failed attempt of a bounded fetch
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The fetch itself failed (network error, decode error, ...)
    #[error("fetch failed: {0:#}")]
    Transport(#[from] anyhow::Error),
    /// The fetch returned data the validator rejected
    #[error("Validation failed")]
    ValidationFailed,
}

/// Errors raised by the notification hub
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification hub is already connected")]
    AlreadyConnected,
    #[error("notification transport failed to connect: {0}")]
    Connect(String),
}
