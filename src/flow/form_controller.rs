use super::{
    error::{user_message, FlowError},
    form::RegistrationForm,
    ports::{Notifier, ERROR_TITLE},
    state::TransitionError,
    verification::VerificationController,
    InFlight, SubmitOutcome,
};
use crate::provider::{IdentityProvider, ProviderError, VerificationStrategy};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

/// Notification shown when a field is left blank.
pub const INCOMPLETE_FORM_MESSAGE: &str = "Name, email and password are required.";

/// Owns the registration form and starts the sign-up: account creation followed by
/// the verification code request.
pub struct FormController {
    provider: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    form: watch::Sender<RegistrationForm>,
}

impl FormController {
    pub fn new(provider: Arc<dyn IdentityProvider>, notifier: Arc<dyn Notifier>) -> Self {
        let (form, _) = watch::channel(RegistrationForm::default());
        Self {
            provider,
            notifier,
            form,
        }
    }

    #[must_use]
    pub fn form(&self) -> RegistrationForm {
        self.form.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RegistrationForm> {
        self.form.subscribe()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.form.send_modify(|form| form.set_name(name));
    }

    pub fn set_email(&self, email: impl Into<String>) {
        let email = email.into();
        self.form.send_modify(|form| form.set_email(email));
    }

    pub fn set_password(&self, password: impl Into<String>) {
        let password = password.into();
        self.form.send_modify(|form| form.set_password(password));
    }

    /// Creates the account and requests an email code, moving `verification` to
    /// `pending`. Provider failures are shown through the notifier and leave the
    /// phase untouched so the form can be corrected and submitted again.
    ///
    /// Submit, verify and resend share one in-flight guard, so no code is sent while
    /// a verification is still running.
    ///
    /// # Errors
    /// Returns an error if the provider is not ready, another request is running,
    /// the verification phase does not accept a new submit, a session activation
    /// was already attempted, or a field is blank.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        verification: &VerificationController,
    ) -> Result<SubmitOutcome, FlowError> {
        if !self.provider.is_ready() {
            debug!("provider not ready, ignoring submit");
            return Err(FlowError::NotReady);
        }
        let Some(_guard) = InFlight::acquire(verification.in_flight()) else {
            debug!("submit already in flight");
            return Err(FlowError::InFlight("submit"));
        };

        let phase = verification.phase();
        if !phase.accepts_submit() {
            return Err(TransitionError {
                from: phase,
                event: "submit",
            }
            .into());
        }
        if verification.activation_attempted() {
            return Err(FlowError::ActivationAttempted);
        }

        let form = self.form();
        if !form.is_complete() {
            self.notifier.notify(ERROR_TITLE, INCOMPLETE_FORM_MESSAGE);
            return Err(FlowError::IncompleteForm);
        }

        let account = match self
            .provider
            .create_account(form.email().trim(), form.password())
            .await
        {
            Ok(account) => account,
            Err(err) => return Ok(self.reject("account creation", &err)),
        };
        debug!("account {account} created");

        if let Err(err) = self
            .provider
            .send_verification_code(&account, VerificationStrategy::EmailCode)
            .await
        {
            return Ok(self.reject("verification code delivery", &err));
        }

        verification.code_sent(account).await?;
        info!("verification code sent");
        Ok(SubmitOutcome::CodeSent)
    }

    fn reject(&self, stage: &str, err: &ProviderError) -> SubmitOutcome {
        warn!("{stage} failed: {err}");
        let message = user_message(err);
        self.notifier.notify(ERROR_TITLE, &message);
        SubmitOutcome::Rejected(message)
    }
}
