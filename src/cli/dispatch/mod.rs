use crate::cli::{
    actions::{
        signup::{Args, Prefill},
        Action,
    },
    commands::{provider, signup},
};
use crate::provider::{ProviderConfig, DEFAULT_TIMEOUT_SECS};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{path::PathBuf, time::Duration};

/// # Errors
/// Returns an error if required arguments are missing or the provider settings are invalid.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let publishable_key = matches
        .get_one::<String>(provider::ARG_PUBLISHABLE_KEY)
        .cloned()
        .context("missing required argument: --publishable-key")?;
    let api_url = matches.get_one::<String>(provider::ARG_API_URL);
    let timeout = matches
        .get_one::<u64>(provider::ARG_TIMEOUT)
        .copied()
        .unwrap_or(DEFAULT_TIMEOUT_SECS);

    let config = ProviderConfig::new(
        SecretString::from(publishable_key),
        api_url.map(String::as_str),
        Duration::from_secs(timeout),
    )
    .context("invalid provider configuration")?;

    let token_cache = matches
        .get_one::<String>(provider::ARG_TOKEN_CACHE)
        .map(PathBuf::from);

    let prefill = Prefill {
        name: matches.get_one::<String>(signup::ARG_NAME).cloned(),
        email: matches.get_one::<String>(signup::ARG_EMAIL).cloned(),
        password: matches
            .get_one::<String>(signup::ARG_PASSWORD)
            .cloned()
            .map(SecretString::from),
    };

    let sign_out = matches.get_flag(signup::ARG_SIGN_OUT);

    Ok(Action::SignUp(Args {
        config,
        token_cache,
        prefill,
        sign_out,
    }))
}
