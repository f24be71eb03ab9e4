use super::{
    error::{user_message, FlowError},
    ports::{Notifier, ERROR_TITLE},
    state::{Event, Phase, TransitionError, VerificationState},
    InFlight, SubmitOutcome, VerifyOutcome,
};
use crate::provider::{AccountRef, IdentityProvider, SessionId, VerificationStrategy};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, instrument, warn};

/// Owns the verification sub-flow: phase, entered code and last error.
/// Front ends render [`VerificationController::subscribe`] snapshots.
pub struct VerificationController {
    provider: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<VerificationState>,
    account: RwLock<Option<AccountRef>>,
    in_flight: AtomicBool,
    activation_attempted: AtomicBool,
}

impl VerificationController {
    pub fn new(provider: Arc<dyn IdentityProvider>, notifier: Arc<dyn Notifier>) -> Self {
        let (state, _) = watch::channel(VerificationState::default());
        Self {
            provider,
            notifier,
            state,
            account: RwLock::new(None),
            in_flight: AtomicBool::new(false),
            activation_attempted: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> VerificationState {
        self.state.borrow().clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.state.borrow().phase()
    }

    pub fn subscribe(&self) -> watch::Receiver<VerificationState> {
        self.state.subscribe()
    }

    /// True once a session activation was sent to the provider, whatever its outcome.
    #[must_use]
    pub fn activation_attempted(&self) -> bool {
        self.activation_attempted.load(Ordering::Acquire)
    }

    /// Busy flag shared by submit, verify and resend on one screen.
    pub(crate) fn in_flight(&self) -> &AtomicBool {
        &self.in_flight
    }

    fn apply(&self, event: Event) -> Result<(), TransitionError> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match state.apply(event) {
            Ok(next) => {
                let changed = next != *state;
                if next.phase() != state.phase() {
                    debug!("verification {} -> {}", state.phase(), next.phase());
                }
                *state = next;
                changed
            }
            Err(err) => {
                outcome = Err(err);
                false
            }
        });
        outcome
    }

    /// Records the sign-up a code was just sent for and moves to `pending`.
    /// Callers hold the shared in-flight guard.
    pub(crate) async fn code_sent(&self, account: AccountRef) -> Result<(), FlowError> {
        self.apply(Event::CodeSent)?;
        *self.account.write().await = Some(account);
        Ok(())
    }

    /// Edits the code field.
    ///
    /// # Errors
    /// Returns [`FlowError::Transition`] unless the phase is `pending` or `failed`.
    pub fn update_code(&self, code: impl Into<String>) -> Result<(), FlowError> {
        self.apply(Event::CodeEdited(code.into()))?;
        Ok(())
    }

    /// Submits `code` to the provider and activates the session on completion.
    ///
    /// # Errors
    /// Returns an error if the provider is not ready, another request is running,
    /// the code is blank, the phase does not accept a code, or a session activation
    /// was already attempted.
    #[instrument(skip_all)]
    pub async fn verify(&self, code: &str) -> Result<VerifyOutcome, FlowError> {
        if !self.provider.is_ready() {
            debug!("provider not ready, ignoring verify");
            return Err(FlowError::NotReady);
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("verification request already in flight");
            return Err(FlowError::InFlight("verification"));
        };

        let phase = self.phase();
        if !phase.accepts_code() {
            return Err(TransitionError {
                from: phase,
                event: "verify",
            }
            .into());
        }
        if self.activation_attempted() {
            return Err(FlowError::ActivationAttempted);
        }

        let code = code.trim();
        if code.is_empty() {
            return Err(FlowError::EmptyCode);
        }
        self.apply(Event::CodeEdited(code.to_string()))?;

        let account = self
            .account
            .read()
            .await
            .clone()
            .ok_or(FlowError::NoAccount)?;

        let message = match self.provider.attempt_verification(&account, code).await {
            Ok(attempt) if attempt.status.is_complete() => {
                if let Some(session) = attempt.session_id {
                    return self.activate(&session).await;
                }
                warn!("sign-up complete without a session");
                attempt.message.unwrap_or_default()
            }
            Ok(attempt) => {
                warn!("verification incomplete: {}", attempt.status);
                attempt.message.unwrap_or_default()
            }
            Err(err) => {
                warn!("verification failed: {err}");
                user_message(&err)
            }
        };

        self.fail(message)
    }

    async fn activate(&self, session: &SessionId) -> Result<VerifyOutcome, FlowError> {
        // Activation is not idempotent: a timed out call may still have succeeded.
        if self.activation_attempted.swap(true, Ordering::AcqRel) {
            return Err(FlowError::ActivationAttempted);
        }

        match self.provider.activate_session(session).await {
            Ok(()) => {
                self.apply(Event::Verified)?;
                info!("sign-up verified and session activated");
                Ok(VerifyOutcome::Verified)
            }
            Err(err) => {
                error!("session activation failed: {err}");
                self.fail(user_message(&err))
            }
        }
    }

    fn fail(&self, message: String) -> Result<VerifyOutcome, FlowError> {
        self.apply(Event::Rejected(message))?;
        Ok(VerifyOutcome::Failed(self.state.borrow().error().to_string()))
    }

    /// Asks the provider for a new code for the current sign-up.
    ///
    /// # Errors
    /// Returns an error if the provider is not ready, a verification request is
    /// running, or no code was sent before.
    #[instrument(skip_all)]
    pub async fn resend(&self) -> Result<SubmitOutcome, FlowError> {
        if !self.provider.is_ready() {
            debug!("provider not ready, ignoring resend");
            return Err(FlowError::NotReady);
        }
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("verification request already in flight");
            return Err(FlowError::InFlight("verification"));
        };

        let phase = self.phase();
        if !phase.accepts_code() {
            return Err(TransitionError {
                from: phase,
                event: "resend",
            }
            .into());
        }

        let account = self
            .account
            .read()
            .await
            .clone()
            .ok_or(FlowError::NoAccount)?;

        match self
            .provider
            .send_verification_code(&account, VerificationStrategy::EmailCode)
            .await
        {
            Ok(()) => {
                self.apply(Event::CodeSent)?;
                info!("verification code re-sent");
                Ok(SubmitOutcome::CodeSent)
            }
            Err(err) => {
                warn!("resending verification code failed: {err}");
                let message = user_message(&err);
                self.notifier.notify(ERROR_TITLE, &message);
                Ok(SubmitOutcome::Rejected(message))
            }
        }
    }

    /// The pending dialog was closed. Only a provider-confirmed completion reaches
    /// `success`, so the phase is left as is.
    pub fn dismiss(&self) {
        let phase = self.phase();
        if phase == Phase::Pending {
            info!("verification dialog dismissed while pending");
        } else {
            debug!("verification dialog dismissed in {phase}");
        }
    }
}
