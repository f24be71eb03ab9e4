//! Provider client configuration. The publishable key is mandatory: it authenticates
//! the client against the frontend API and, when no explicit API URL is given, encodes
//! the API host itself (`pk_test_` or `pk_live_` followed by base64 of `<host>$`).
//! The key is public by design but is still kept out of logs.

use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
    Engine,
};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Default request timeout applied to every provider call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const KEY_PREFIXES: [&str; 2] = ["pk_test_", "pk_live_"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing publishable key, set ENROLL_PUBLISHABLE_KEY")]
    MissingPublishableKey,
    #[error("invalid publishable key: {0}")]
    InvalidPublishableKey(&'static str),
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("timeout must be greater than zero")]
    InvalidTimeout,
}

#[derive(Clone, Debug)]
pub struct ProviderConfig {
    pub api_base_url: Url,
    pub publishable_key: SecretString,
    pub timeout: Duration,
}

impl ProviderConfig {
    /// Builds and validates the configuration.
    ///
    /// # Errors
    /// Returns an error if the publishable key is missing or malformed, the base URL
    /// cannot be parsed, or the timeout is zero.
    pub fn new(
        publishable_key: SecretString,
        api_base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let key = publishable_key.expose_secret().trim();
        if key.is_empty() {
            return Err(ConfigError::MissingPublishableKey);
        }

        if timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }

        let base = match api_base_url.map(str::trim).filter(|url| !url.is_empty()) {
            Some(url) => url.to_string(),
            // Validates the key shape as a side effect.
            None => format!("https://{}", frontend_api_from_key(key)?),
        };

        let api_base_url =
            Url::parse(&base).map_err(|err| ConfigError::InvalidBaseUrl(format!("{base}: {err}")))?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl(format!(
                "{base}: scheme must be http or https"
            )));
        }

        Ok(Self {
            api_base_url,
            publishable_key: SecretString::from(key.to_string()),
            timeout,
        })
    }

    /// Joins an absolute API path onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.api_base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// Decodes the frontend API host embedded in a publishable key.
///
/// # Errors
/// Returns an error if the prefix, encoding or terminator is wrong.
pub fn frontend_api_from_key(key: &str) -> Result<String, ConfigError> {
    let encoded = KEY_PREFIXES
        .iter()
        .find_map(|prefix| key.strip_prefix(prefix))
        .ok_or(ConfigError::InvalidPublishableKey(
            "expected pk_test_ or pk_live_ prefix",
        ))?;

    let decoded = STANDARD
        .decode(encoded)
        .or_else(|_| STANDARD_NO_PAD.decode(encoded))
        .map_err(|_| ConfigError::InvalidPublishableKey("not base64 encoded"))?;

    let decoded = String::from_utf8(decoded)
        .map_err(|_| ConfigError::InvalidPublishableKey("not valid UTF-8"))?;

    let host = decoded
        .strip_suffix('$')
        .ok_or(ConfigError::InvalidPublishableKey("missing host terminator"))?;

    if host.is_empty() || host.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(ConfigError::InvalidPublishableKey("invalid host"));
    }

    Ok(host.to_string())
}
