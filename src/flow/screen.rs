use super::{
    error::FlowError,
    form_controller::FormController,
    ports::{Navigator, Notifier, Route},
    state::{Phase, TransitionError},
    verification::VerificationController,
    SubmitOutcome, VerifyOutcome,
};
use crate::provider::IdentityProvider;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::info;

/// One sign-up screen instance: both controllers plus the navigation sink.
/// Dropping the screen discards the form and the verification state.
pub struct SignUpScreen {
    form: FormController,
    verification: VerificationController,
    navigator: Arc<dyn Navigator>,
    acknowledged: AtomicBool,
}

impl SignUpScreen {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            form: FormController::new(provider.clone(), notifier.clone()),
            verification: VerificationController::new(provider, notifier),
            navigator,
            acknowledged: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn form(&self) -> &FormController {
        &self.form
    }

    #[must_use]
    pub fn verification(&self) -> &VerificationController {
        &self.verification
    }

    /// See [`FormController::submit`].
    ///
    /// # Errors
    /// Propagates the errors of [`FormController::submit`].
    pub async fn submit(&self) -> Result<SubmitOutcome, FlowError> {
        self.form.submit(&self.verification).await
    }

    /// See [`VerificationController::verify`].
    ///
    /// # Errors
    /// Propagates the errors of [`VerificationController::verify`].
    pub async fn verify(&self, code: &str) -> Result<VerifyOutcome, FlowError> {
        self.verification.verify(code).await
    }

    pub fn dismiss(&self) {
        self.verification.dismiss();
    }

    /// The user confirmed the success dialog; navigates home exactly once.
    ///
    /// # Errors
    /// Returns an error before `success` or when already acknowledged.
    pub fn acknowledge(&self) -> Result<(), FlowError> {
        let phase = self.verification.phase();
        if phase != Phase::Success {
            return Err(TransitionError {
                from: phase,
                event: "acknowledge",
            }
            .into());
        }
        if self.acknowledged.swap(true, Ordering::AcqRel) {
            return Err(FlowError::AlreadyAcknowledged);
        }

        info!("navigating to {}", Route::Home);
        self.navigator.navigate(Route::Home);
        Ok(())
    }
}
