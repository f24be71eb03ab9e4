//! Terminal front end: line prompts plus the notification and navigation sinks the
//! sign-up screen reports through.

use crate::flow::{Navigator, Notifier, Route};
use anyhow::{Context, Result};
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tracing::info;

/// Alerts go to stderr, the navigation notice to stdout.
#[derive(Debug, Default)]
pub struct TerminalUi;

impl Notifier for TerminalUi {
    fn notify(&self, title: &str, message: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{title}: {message}");
    }
}

impl Navigator for TerminalUi {
    fn navigate(&self, route: Route) {
        info!("navigate to {route}");
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "Continuing to {route}");
    }
}

/// Reads answers line by line and writes questions without a trailing newline.
pub struct Prompt<R, W> {
    lines: Lines<R>,
    output: W,
    hide_secrets: bool,
}

impl<R, W> Prompt<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            lines: input.lines(),
            output,
            hide_secrets: false,
        }
    }

    /// Reads secrets from the controlling terminal with echo disabled.
    #[must_use]
    pub fn hiding_secrets(mut self, hide: bool) -> Self {
        self.hide_secrets = hide;
        self
    }

    /// Asks a question and returns the trimmed answer, or `None` at end of input.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be written to or read from.
    pub async fn ask(&mut self, question: &str) -> Result<Option<String>> {
        self.output.write_all(question.as_bytes()).await?;
        self.output.flush().await?;
        let line = self.lines.next_line().await?;
        Ok(line.map(|line| line.trim().to_string()))
    }

    /// Like [`Prompt::ask`] but keeps surrounding whitespace, for passwords.
    ///
    /// # Errors
    /// Returns an error if the terminal cannot be written to or read from.
    pub async fn ask_secret(&mut self, question: &str) -> Result<Option<String>> {
        self.output.write_all(question.as_bytes()).await?;
        self.output.flush().await?;
        if self.hide_secrets {
            let secret = tokio::task::spawn_blocking(rpassword::read_password)
                .await?
                .context("failed to read from the terminal")?;
            return Ok(Some(secret));
        }
        let line = self.lines.next_line().await?;
        Ok(line.map(|line| line.trim_end_matches('\r').to_string()))
    }

    /// # Errors
    /// Returns an error if the terminal cannot be written to.
    pub async fn say(&mut self, message: &str) -> Result<()> {
        self.output.write_all(message.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        self.output.flush().await?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
