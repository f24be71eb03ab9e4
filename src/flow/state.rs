//! Verification state snapshot and its reducer. All phase changes go through
//! [`VerificationState::apply`], which rejects every edge not in the transition table:
//!
//! | From             | Event        | To      |
//! |------------------|--------------|---------|
//! | default, failed  | `CodeSent`   | pending |
//! | pending          | `CodeSent`   | pending |
//! | pending, failed  | `CodeEdited` | same    |
//! | pending, failed  | `Verified`   | success |
//! | pending, failed  | `Rejected`   | failed  |
//!
//! Nothing re-enters `default`, and `success` accepts no event at all.

use std::fmt;
use thiserror::Error;

/// Message shown when the provider leaves the sign-up incomplete without saying why.
pub const VERIFICATION_FAILED: &str = "verification failed";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Default,
    Pending,
    Success,
    Failed,
}

impl Phase {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Phases in which the code field is editable and `verify` may run.
    #[must_use]
    pub const fn accepts_code(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }

    /// Phases from which a fresh submit cycle may start.
    #[must_use]
    pub const fn accepts_submit(self) -> bool {
        matches!(self, Self::Default | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// A verification code was (re)sent to the user.
    CodeSent,
    /// The user edited the code field.
    CodeEdited(String),
    /// The provider confirmed the sign-up and the session is active.
    Verified,
    /// The attempt failed with a user-facing message.
    Rejected(String),
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CodeSent => "code_sent",
            Self::CodeEdited(_) => "code_edited",
            Self::Verified => "verified",
            Self::Rejected(_) => "rejected",
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("cannot apply {event} while verification is {from}")]
pub struct TransitionError {
    pub from: Phase,
    pub event: &'static str,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VerificationState {
    phase: Phase,
    code: String,
    error: String,
}

impl VerificationState {
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Last failure message; empty unless the phase is `failed`.
    #[must_use]
    pub fn error(&self) -> &str {
        &self.error
    }

    /// Returns the state after `event`, leaving `self` untouched.
    ///
    /// # Errors
    /// Returns [`TransitionError`] when `event` is not allowed in the current phase.
    pub fn apply(&self, event: Event) -> Result<Self, TransitionError> {
        let rejected = TransitionError {
            from: self.phase,
            event: event.name(),
        };

        match (self.phase, event) {
            (Phase::Default | Phase::Pending | Phase::Failed, Event::CodeSent) => Ok(Self {
                phase: Phase::Pending,
                code: String::new(),
                error: String::new(),
            }),
            (phase, Event::CodeEdited(code)) if phase.accepts_code() => Ok(Self {
                code,
                ..self.clone()
            }),
            (phase, Event::Verified) if phase.accepts_code() => Ok(Self {
                phase: Phase::Success,
                code: self.code.clone(),
                error: String::new(),
            }),
            (phase, Event::Rejected(message)) if phase.accepts_code() => Ok(Self {
                phase: Phase::Failed,
                code: self.code.clone(),
                error: if message.trim().is_empty() {
                    VERIFICATION_FAILED.to_string()
                } else {
                    message
                },
            }),
            _ => Err(rejected),
        }
    }
}
