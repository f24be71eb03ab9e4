use clap::{Arg, ArgAction, Command};

pub const ARG_NAME: &str = "name";
pub const ARG_EMAIL: &str = "email";
pub const ARG_PASSWORD: &str = "password";
pub const ARG_SIGN_OUT: &str = "sign-out";

/// Form fields; anything left out is prompted for.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NAME)
                .short('n')
                .long(ARG_NAME)
                .help("Full name")
                .env("ENROLL_NAME"),
        )
        .arg(
            Arg::new(ARG_EMAIL)
                .short('e')
                .long(ARG_EMAIL)
                .help("Email address that receives the verification code")
                .env("ENROLL_EMAIL"),
        )
        .arg(
            Arg::new(ARG_PASSWORD)
                .long(ARG_PASSWORD)
                .help("Account password")
                .env("ENROLL_PASSWORD")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_SIGN_OUT)
                .long(ARG_SIGN_OUT)
                .help("Forget a stored session and register another account")
                .env("ENROLL_SIGN_OUT")
                .action(ArgAction::SetTrue),
        )
}
