//! Sign-up flow covering account creation and email code verification. It keeps the
//! provider round-trips and the state they drive out of the presentation layer, so a
//! terminal, desktop or web front end only renders [`VerificationState`] snapshots and
//! forwards user input.
//!
//! Flow Overview: [`FormController::submit`] creates the account and asks the provider
//! to email a code, moving verification to `pending`. [`VerificationController::verify`]
//! submits the code; a complete sign-up activates the issued session and moves to
//! `success`, anything else moves to `failed` with a user-facing message. From
//! `failed` the user may correct the code and verify again, or request a new code.
//! [`SignUpScreen::acknowledge`] sends the user home once.
//!
//! Provider failures never escape an operation: account creation and code delivery
//! failures become notifications, verification failures become the `error` field.
//! Operations return [`FlowError`] only when they did not run (provider not ready,
//! a request already in flight, or a transition the current phase does not allow).

pub mod error;
pub mod form;
mod form_controller;
pub mod ports;
mod screen;
pub mod state;
mod verification;

#[cfg(test)]
pub(crate) mod fake;

pub use error::{user_message, FlowError, GENERIC_FAILURE};
pub use form::RegistrationForm;
pub use form_controller::FormController;
pub use ports::{Navigator, Notifier, Route};
pub use screen::SignUpScreen;
pub use state::{Phase, VerificationState};
pub use verification::VerificationController;

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A verification code was sent and verification is pending.
    CodeSent,
    /// The provider refused; the message was shown to the user.
    Rejected(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The session is active and verification reached `success`.
    Verified,
    /// Verification is `failed` with this message.
    Failed(String),
}

/// Marks a controller busy for the lifetime of the guard.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_flight_is_exclusive_and_released_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::acquire(&flag);
        assert!(guard.is_some());
        assert!(InFlight::acquire(&flag).is_none());
        drop(guard);
        assert!(InFlight::acquire(&flag).is_some());
    }
}
