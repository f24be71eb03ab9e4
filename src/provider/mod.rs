//! Capability surface of the external identity provider. The sign-up flow only
//! talks to the provider through [`IdentityProvider`], so the state machine can be
//! driven by the HTTP client in production and by fakes in tests.
//!
//! Flow Overview: `create_account` registers the email/password pair and returns an
//! [`AccountRef`]; `send_verification_code` asks the provider to email a one-time
//! code; `attempt_verification` submits the code and, when the provider reports the
//! sign-up as complete, yields a [`SessionId`] that `activate_session` turns into the
//! active session.
//!
//! Failures are reported as [`ProviderError`]. Rejections carry the provider's ordered
//! list of structured error entries; callers surface the first entry's long message.

pub mod config;
pub mod http;
pub mod token_cache;

pub use config::{ConfigError, ProviderConfig, DEFAULT_TIMEOUT_SECS};
pub use http::HttpProvider;
pub use token_cache::{FileTokenCache, MemoryTokenCache, TokenCache, TokenCacheError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Provider identifier of an in-progress sign-up.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountRef(String);

impl AccountRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session identifier issued by a completed verification.
/// Opaque to the flow; it is only handed to `activate_session`.
#[derive(Clone)]
pub struct SessionId(SecretString);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(SecretString::from(id.into()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionId([REDACTED])")
    }
}

/// Channel used to deliver the verification code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStrategy {
    EmailCode,
}

impl VerificationStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmailCode => "email_code",
        }
    }
}

/// Sign-up status reported after a verification attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttemptStatus {
    Complete,
    Other(String),
}

impl AttemptStatus {
    #[must_use]
    pub fn parse(status: &str) -> Self {
        if status == "complete" {
            Self::Complete
        } else {
            Self::Other(status.to_string())
        }
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => f.write_str("complete"),
            Self::Other(status) => f.write_str(status),
        }
    }
}

/// Result of `attempt_verification` when the provider answered without raising.
#[derive(Clone, Debug)]
pub struct VerificationAttempt {
    pub status: AttemptStatus,
    pub session_id: Option<SessionId>,
    pub message: Option<String>,
}

impl VerificationAttempt {
    /// Completed attempt carrying the created session.
    pub fn complete(session_id: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::Complete,
            session_id: Some(SessionId::new(session_id)),
            message: None,
        }
    }

    /// Attempt that left the sign-up in a non-complete status.
    pub fn incomplete(status: impl Into<String>) -> Self {
        Self {
            status: AttemptStatus::Other(status.into()),
            session_id: None,
            message: None,
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// One structured error entry returned by the provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub long_message: Option<String>,
}

impl ErrorEntry {
    pub fn new(code: impl Into<String>, long_message: impl Into<String>) -> Self {
        let long_message = long_message.into();
        Self {
            code: code.into(),
            message: long_message.clone(),
            long_message: Some(long_message),
        }
    }

    /// Long-form message when present, otherwise the short message.
    #[must_use]
    pub fn display_message(&self) -> &str {
        match self.long_message.as_deref() {
            Some(long) if !long.trim().is_empty() => long,
            _ => &self.message,
        }
    }
}

fn rejection_summary(entries: &[ErrorEntry]) -> &str {
    entries
        .first()
        .map_or("no details", ErrorEntry::display_message)
}

#[derive(Clone, Debug, Error)]
pub enum ProviderError {
    #[error("provider rejected the request: {}", rejection_summary(.0))]
    Rejected(Vec<ErrorEntry>),
    #[error("unexpected provider response ({status}): {body}")]
    Unexpected { status: u16, body: String },
    #[error("provider unreachable: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Rejection with a single entry, mostly useful for fakes.
    pub fn rejected(code: impl Into<String>, long_message: impl Into<String>) -> Self {
        Self::Rejected(vec![ErrorEntry::new(code, long_message)])
    }

    /// First structured message, if the provider sent one.
    #[must_use]
    pub fn first_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(entries) => entries
                .first()
                .map(ErrorEntry::display_message)
                .filter(|message| !message.trim().is_empty()),
            Self::Unexpected { .. } | Self::Transport(_) => None,
        }
    }
}

/// Operations the sign-up flow needs from the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Whether the client finished loading; operations are skipped until it has.
    fn is_ready(&self) -> bool;

    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountRef, ProviderError>;

    async fn send_verification_code(
        &self,
        account: &AccountRef,
        strategy: VerificationStrategy,
    ) -> Result<(), ProviderError>;

    async fn attempt_verification(
        &self,
        account: &AccountRef,
        code: &str,
    ) -> Result<VerificationAttempt, ProviderError>;

    async fn activate_session(&self, session: &SessionId) -> Result<(), ProviderError>;
}
