use crate::cli::terminal::{Prompt, TerminalUi};
use crate::flow::{FlowError, SignUpScreen, SubmitOutcome, VerifyOutcome};
use crate::provider::{FileTokenCache, HttpProvider, MemoryTokenCache, ProviderConfig, TokenCache};
use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use std::{io::IsTerminal, path::PathBuf, sync::Arc};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tracing::{debug, info};

pub const RESEND_COMMAND: &str = "resend";
pub const SUCCESS_MESSAGE: &str = "Verified! You have successfully verified your account.";
pub const SIGNED_IN_MESSAGE: &str =
    "You are already signed in. Run again with --sign-out to register another account.";
pub const ACTIVATION_SPENT_MESSAGE: &str =
    "The session could not be activated. Please start the sign-up again.";

/// Form values given on the command line; missing ones are prompted for.
#[derive(Debug, Default)]
pub struct Prefill {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<SecretString>,
}

#[derive(Debug)]
pub struct Args {
    pub config: ProviderConfig,
    pub token_cache: Option<PathBuf>,
    pub prefill: Prefill,
    pub sign_out: bool,
}

/// Runs an interactive sign-up against the configured provider.
///
/// # Errors
/// Returns an error if the provider cannot be loaded or the terminal fails.
pub async fn execute(args: Args) -> Result<()> {
    let token_cache: Arc<dyn TokenCache> = match args.token_cache {
        Some(path) => {
            debug!("session token cache: {}", path.display());
            Arc::new(FileTokenCache::new(path))
        }
        None => Arc::new(MemoryTokenCache::default()),
    };

    let provider = HttpProvider::new(args.config, token_cache)
        .context("failed to create the identity provider client")?;
    provider
        .load()
        .await
        .context("failed to load the identity provider")?;

    let mut prompt = Prompt::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .hiding_secrets(std::io::stdin().is_terminal());

    if !release_session(&provider, args.sign_out, &mut prompt).await? {
        return Ok(());
    }

    let ui = Arc::new(TerminalUi);
    let screen = SignUpScreen::new(Arc::new(provider), ui.clone(), ui);

    if drive(&screen, &mut prompt, args.prefill).await? {
        info!("sign-up complete");
    } else {
        info!("sign-up abandoned");
    }

    Ok(())
}

/// Returns `false` when a stored session should be kept, which ends the run.
pub(crate) async fn release_session<R, W>(
    provider: &HttpProvider,
    sign_out: bool,
    prompt: &mut Prompt<R, W>,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if provider.session().await.is_none() {
        return Ok(true);
    }
    if !sign_out {
        prompt.say(SIGNED_IN_MESSAGE).await?;
        return Ok(false);
    }

    provider
        .sign_out()
        .await
        .context("failed to clear the stored session")?;
    Ok(true)
}

/// Walks the screen through form entry, code verification and the success dialog.
/// Returns `false` when the user quits or input ends before verification succeeds.
pub(crate) async fn drive<R, W>(
    screen: &SignUpScreen,
    prompt: &mut Prompt<R, W>,
    mut prefill: Prefill,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        let Some(name) = field(prompt, prefill.name.take(), "Name: ").await? else {
            return Ok(false);
        };
        let Some(email) = field(prompt, prefill.email.take(), "Email: ").await? else {
            return Ok(false);
        };
        let password = match prefill.password.take() {
            Some(password) => password.expose_secret().to_string(),
            None => match prompt.ask_secret("Password: ").await? {
                Some(password) => password,
                None => return Ok(false),
            },
        };

        screen.form().set_name(name);
        screen.form().set_email(email);
        screen.form().set_password(password);

        match screen.submit().await {
            Ok(SubmitOutcome::CodeSent) => break,
            // already shown by the notifier
            Ok(SubmitOutcome::Rejected(_)) | Err(FlowError::IncompleteForm) => continue,
            Err(err) => return Err(err.into()),
        }
    }

    prompt
        .say(&format!(
            "We sent a verification code to {}",
            screen.form().form().email().trim()
        ))
        .await?;

    loop {
        let question =
            format!("Verification code (\"{RESEND_COMMAND}\" for a new one, empty to quit): ");
        let code = match prompt.ask(&question).await? {
            Some(code) if !code.is_empty() => code,
            _ => {
                screen.dismiss();
                return Ok(false);
            }
        };

        if code.eq_ignore_ascii_case(RESEND_COMMAND) {
            if screen.verification().resend().await? == SubmitOutcome::CodeSent {
                prompt.say("A new code is on its way.").await?;
            }
            continue;
        }

        match screen.verify(&code).await {
            Ok(VerifyOutcome::Verified) => break,
            Ok(VerifyOutcome::Failed(message)) => {
                prompt.say(&message).await?;
                if screen.verification().activation_attempted() {
                    prompt.say(ACTIVATION_SPENT_MESSAGE).await?;
                    return Ok(false);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }

    prompt.say(SUCCESS_MESSAGE).await?;
    screen
        .acknowledge()
        .context("failed to leave the sign-up screen")?;

    Ok(true)
}

async fn field<R, W>(
    prompt: &mut Prompt<R, W>,
    prefilled: Option<String>,
    question: &str,
) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match prefilled {
        Some(value) => Ok(Some(value)),
        None => prompt.ask(question).await,
    }
}
