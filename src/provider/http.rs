//! HTTP implementation of [`IdentityProvider`] against the provider's JSON frontend
//! API. Every request carries the publishable key as a bearer token, the crate user
//! agent, and the configured timeout. Passwords, codes and session identifiers are
//! sent in request bodies only and never recorded in spans.
//!
//! Error bodies follow `{ "errors": [{ "code", "message", "long_message" }] }`.
//! Anything else is reported as [`ProviderError::Unexpected`] with a truncated body.

use super::{
    token_cache::SESSION_KEY, AccountRef, AttemptStatus, ErrorEntry, IdentityProvider,
    ProviderConfig, ProviderError, SessionId, TokenCache, TokenCacheError, VerificationAttempt,
    VerificationStrategy,
};
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

/// Maximum number of error body characters kept for diagnostics.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email_address: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct SignUpResponse {
    id: String,
    #[serde(default)]
    status: String,
}

#[derive(Serialize)]
struct PrepareVerificationRequest {
    strategy: VerificationStrategy,
}

#[derive(Serialize)]
struct AttemptVerificationRequest<'a> {
    strategy: VerificationStrategy,
    code: &'a str,
}

#[derive(Deserialize)]
struct AttemptVerificationResponse {
    status: String,
    #[serde(default)]
    created_session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvironmentResponse {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorEntry>,
}

#[derive(Serialize)]
struct Empty {}

pub struct HttpProvider {
    client: Client,
    config: ProviderConfig,
    token_cache: Arc<dyn TokenCache>,
    session: RwLock<Option<SessionId>>,
    ready: AtomicBool,
}

impl HttpProvider {
    /// Builds the HTTP client. The provider is not ready until [`HttpProvider::load`]
    /// succeeds.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(
        config: ProviderConfig,
        token_cache: Arc<dyn TokenCache>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|err| ProviderError::Transport(format!("failed to build client: {err}")))?;

        Ok(Self {
            client,
            config,
            token_cache,
            session: RwLock::new(None),
            ready: AtomicBool::new(false),
        })
    }

    /// Fetches the instance environment, restores a cached session and marks the
    /// client ready.
    ///
    /// # Errors
    /// Returns an error if the environment cannot be fetched.
    #[instrument(skip(self), fields(api = %self.config.api_base_url))]
    pub async fn load(&self) -> Result<(), ProviderError> {
        let request = self.client.get(self.config.endpoint("/v1/environment"));
        let environment: EnvironmentResponse = self.send_json(request).await?;
        debug!(
            "environment loaded: {}",
            environment.display_name.as_deref().unwrap_or("unnamed")
        );

        match self.token_cache.get(SESSION_KEY).await {
            Ok(Some(token)) if !token.is_empty() => {
                *self.session.write().await = Some(SessionId::new(token));
                info!("restored cached session");
            }
            Ok(_) => debug!("no cached session"),
            Err(err) => warn!("token cache unavailable: {err}"),
        }

        self.ready.store(true, Ordering::Release);
        Ok(())
    }

    /// The active session: restored by [`HttpProvider::load`] or set by a
    /// successful activation.
    pub async fn session(&self) -> Option<SessionId> {
        self.session.read().await.clone()
    }

    /// Forgets the active session here and in the token cache.
    ///
    /// # Errors
    /// Returns an error if the token cache cannot be updated.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), TokenCacheError> {
        self.token_cache.clear(SESSION_KEY).await?;
        *self.session.write().await = None;
        info!("session cleared");
        Ok(())
    }

    fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> RequestBuilder {
        self.client.post(self.config.endpoint(path)).json(body)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        response
            .json::<T>()
            .await
            .map_err(|err| ProviderError::Unexpected {
                status,
                body: format!("invalid response body: {err}"),
            })
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), ProviderError> {
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .bearer_auth(self.config.publishable_key.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(error_from_body(status, &body))
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Transport("request timed out".to_string())
    } else {
        ProviderError::Transport(err.without_url().to_string())
    }
}

fn error_from_body(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.errors.is_empty() => ProviderError::Rejected(parsed.errors),
        _ => {
            error!("unexpected provider response: {status}");
            ProviderError::Unexpected {
                status,
                body: truncate(body.trim(), MAX_ERROR_CHARS),
            }
        }
    }
}

fn truncate(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated: String = value.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}

#[async_trait]
impl IdentityProvider for HttpProvider {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    #[instrument(skip(self, email, password))]
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AccountRef, ProviderError> {
        let body = SignUpRequest {
            email_address: email,
            password: password.expose_secret(),
        };
        let response: SignUpResponse = self
            .send_json(self.post("/v1/client/sign_ups", &body))
            .await?;
        debug!("sign-up {} created with status {}", response.id, response.status);
        Ok(AccountRef::new(response.id))
    }

    #[instrument(skip(self, account), fields(account = %account))]
    async fn send_verification_code(
        &self,
        account: &AccountRef,
        strategy: VerificationStrategy,
    ) -> Result<(), ProviderError> {
        let path = format!("/v1/client/sign_ups/{account}/prepare_verification");
        self.send_empty(self.post(&path, &PrepareVerificationRequest { strategy }))
            .await
    }

    #[instrument(skip(self, account, code), fields(account = %account))]
    async fn attempt_verification(
        &self,
        account: &AccountRef,
        code: &str,
    ) -> Result<VerificationAttempt, ProviderError> {
        let path = format!("/v1/client/sign_ups/{account}/attempt_verification");
        let body = AttemptVerificationRequest {
            strategy: VerificationStrategy::EmailCode,
            code,
        };
        let response: AttemptVerificationResponse =
            self.send_json(self.post(&path, &body)).await?;

        let status = AttemptStatus::parse(&response.status);
        debug!("verification attempt finished with status {status}");

        Ok(VerificationAttempt {
            status,
            session_id: response
                .created_session_id
                .filter(|id| !id.is_empty())
                .map(SessionId::new),
            message: None,
        })
    }

    #[instrument(skip(self, session))]
    async fn activate_session(&self, session: &SessionId) -> Result<(), ProviderError> {
        let path = format!("/v1/client/sessions/{}/touch", session.expose());
        self.send_empty(self.post(&path, &Empty {})).await?;
        *self.session.write().await = Some(session.clone());

        if let Err(err) = self.token_cache.save(SESSION_KEY, session.expose()).await {
            // The session is active; it just won't survive a restart.
            warn!("failed to persist session: {err}");
        }
        info!("session activated");
        Ok(())
    }
}
