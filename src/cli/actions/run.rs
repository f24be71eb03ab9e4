use crate::cli::actions::{signup, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::SignUp(args) => signup::execute(args).await,
    }
}
