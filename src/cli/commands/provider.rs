use clap::{Arg, Command};

pub const ARG_API_URL: &str = "api-url";
pub const ARG_PUBLISHABLE_KEY: &str = "publishable-key";
pub const ARG_TOKEN_CACHE: &str = "token-cache";
pub const ARG_TIMEOUT: &str = "timeout";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PUBLISHABLE_KEY)
                .short('k')
                .long(ARG_PUBLISHABLE_KEY)
                .help("Publishable key of the identity provider instance (pk_test_... or pk_live_...)")
                .env("ENROLL_PUBLISHABLE_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_API_URL)
                .long(ARG_API_URL)
                .help("Base URL of the identity provider frontend API")
                .long_help(
                    "Base URL of the identity provider frontend API. Defaults to the host encoded in the publishable key.",
                )
                .env("ENROLL_API_URL"),
        )
        .arg(
            Arg::new(ARG_TOKEN_CACHE)
                .long(ARG_TOKEN_CACHE)
                .help("File where the session token is stored (in-memory when omitted)")
                .env("ENROLL_TOKEN_CACHE"),
        )
        .arg(
            Arg::new(ARG_TIMEOUT)
                .long(ARG_TIMEOUT)
                .help("Request timeout in seconds (default: 10)")
                .env("ENROLL_TIMEOUT")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
