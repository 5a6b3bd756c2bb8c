//! Credential token gating modules that call authenticated services

use crate::error::FetchError;
use std::fmt;

/// An opaque credential token
///
/// The token is never printed; `Debug` and `Display` redact it so it can't
/// leak through log lines.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token. Blank tokens are treated as absent.
    pub fn new(token: &str) -> Option<Self> {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(Self(token.to_string()))
        }
    }

    /// Access the raw token, e.g. to put it on a request
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Check for a credential before entering any retry loop.
///
/// A missing credential is not retryable, so callers should surface
/// `FetchError::MissingCredential` directly instead of burning attempts.
pub fn require_credential(credential: Option<&Credential>) -> Result<&Credential, FetchError> {
    credential.ok_or(FetchError::MissingCredential)
}
