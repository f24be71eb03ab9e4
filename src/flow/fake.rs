//! Scripted provider and recording sinks for flow tests.

#![allow(clippy::unwrap_used)]

use super::ports::{Navigator, Notifier, Route};
use crate::provider::{
    AccountRef, IdentityProvider, ProviderError, SessionId, VerificationAttempt,
    VerificationStrategy,
};
use async_trait::async_trait;
use secrecy::SecretString;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};
use tokio::sync::Notify;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    CreateAccount(String),
    SendCode(String),
    Attempt(String),
    Activate(String),
}

/// Answers from queued results; an empty queue falls back to a successful call,
/// except `attempt_verification` which reports `needs_more_info`.
pub(crate) struct FakeProvider {
    ready: AtomicBool,
    create: Mutex<VecDeque<Result<AccountRef, ProviderError>>>,
    send: Mutex<VecDeque<Result<(), ProviderError>>>,
    attempts: Mutex<VecDeque<Result<VerificationAttempt, ProviderError>>>,
    activate: Mutex<VecDeque<Result<(), ProviderError>>>,
    create_gate: Mutex<Option<Arc<Notify>>>,
    attempt_gate: Mutex<Option<Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl FakeProvider {
    pub(crate) fn ready() -> Self {
        Self {
            ready: AtomicBool::new(true),
            create: Mutex::new(VecDeque::new()),
            send: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(VecDeque::new()),
            activate: Mutex::new(VecDeque::new()),
            create_gate: Mutex::new(None),
            attempt_gate: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn not_ready() -> Self {
        let provider = Self::ready();
        provider.ready.store(false, Ordering::SeqCst);
        provider
    }

    pub(crate) fn with_create(self, result: Result<AccountRef, ProviderError>) -> Self {
        self.create.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_send(self, result: Result<(), ProviderError>) -> Self {
        self.send.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_attempt(self, result: Result<VerificationAttempt, ProviderError>) -> Self {
        self.attempts.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn with_activate(self, result: Result<(), ProviderError>) -> Self {
        self.activate.lock().unwrap().push_back(result);
        self
    }

    /// Makes `create_account` wait until the returned handle is notified.
    pub(crate) fn hold_create(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.create_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    /// Makes `attempt_verification` wait until the returned handle is notified.
    pub(crate) fn hold_attempt(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.attempt_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn activations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Activate(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn create_account(
        &self,
        email: &str,
        _password: &SecretString,
    ) -> Result<AccountRef, ProviderError> {
        self.record(Call::CreateAccount(email.to_string()));
        let gate = self.create_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.create
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AccountRef::new("sua_1")))
    }

    async fn send_verification_code(
        &self,
        account: &AccountRef,
        _strategy: VerificationStrategy,
    ) -> Result<(), ProviderError> {
        self.record(Call::SendCode(account.to_string()));
        self.send.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }

    async fn attempt_verification(
        &self,
        _account: &AccountRef,
        code: &str,
    ) -> Result<VerificationAttempt, ProviderError> {
        self.record(Call::Attempt(code.to_string()));
        let gate = self.attempt_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.attempts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(VerificationAttempt::incomplete("needs_more_info")))
    }

    async fn activate_session(&self, session: &SessionId) -> Result<(), ProviderError> {
        self.record(Call::Activate(session.expose().to_string()));
        self.activate.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub(crate) struct RecordingNotifier {
    messages: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub(crate) fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((title.to_string(), message.to_string()));
    }
}

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}
