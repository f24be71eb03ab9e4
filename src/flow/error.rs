use super::state::TransitionError;
use crate::provider::ProviderError;
use thiserror::Error;

/// Message shown for provider failures that carry no structured error.
pub const GENERIC_FAILURE: &str = "Something went wrong. Please try again.";

/// Reasons a flow operation did not run or did not finish.
/// Provider failures are never reported here; they are already turned into a
/// notification or the verification `error` field when the operation returns.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlowError {
    #[error("identity provider is not ready")]
    NotReady,
    #[error("a {0} request is already in flight")]
    InFlight(&'static str),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("name, email and password are required")]
    IncompleteForm,
    #[error("verification code is required")]
    EmptyCode,
    #[error("no sign-up has been created yet")]
    NoAccount,
    #[error("session activation was already attempted")]
    ActivationAttempted,
    #[error("success has already been acknowledged")]
    AlreadyAcknowledged,
}

/// Message shown to the user for a provider failure.
#[must_use]
pub fn user_message(err: &ProviderError) -> String {
    err.first_message()
        .map_or_else(|| GENERIC_FAILURE.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ErrorEntry;

    #[test]
    fn user_message_uses_first_structured_entry() {
        let err = ProviderError::Rejected(vec![
            ErrorEntry::new("form_identifier_exists", "That email address is taken."),
            ErrorEntry::new("form_password_pwned", "Password has been found in a breach."),
        ]);
        assert_eq!(user_message(&err), "That email address is taken.");
    }

    #[test]
    fn user_message_falls_back_for_unstructured_failures() {
        assert_eq!(
            user_message(&ProviderError::Transport("timed out".to_string())),
            GENERIC_FAILURE
        );
        assert_eq!(
            user_message(&ProviderError::Unexpected {
                status: 500,
                body: "<html>".to_string()
            }),
            GENERIC_FAILURE
        );
        assert_eq!(user_message(&ProviderError::Rejected(Vec::new())), GENERIC_FAILURE);
    }
}
