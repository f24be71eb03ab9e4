//! # Enroll (Sign-up & Email Code Verification)
//!
//! `enroll` drives the client side of account registration against an external
//! identity provider. A new user submits a name, email and password; the provider
//! creates the account and emails a one-time code; the user enters the code and,
//! once the provider reports the sign-up as complete, the issued session is
//! activated and the user is sent to the home route.
//!
//! ## Layout
//!
//! - [`provider`]: the capability surface consumed by the flow (`IdentityProvider`,
//!   `TokenCache`) and the HTTP implementation used by the binary.
//! - [`flow`]: the sign-up state machine. `FormController` owns the registration form
//!   and account creation, `VerificationController` owns the code verification sub-flow,
//!   and `SignUpScreen` wires both to the notification and navigation sinks.
//! - [`cli`]: the `enroll` binary, a terminal front end for the flow.
//!
//! ## Secrets
//!
//! Passwords, verification codes, session identifiers and the publishable key must never
//! be logged. They travel as `SecretString` where they are stored and are skipped in every
//! `#[instrument]` span.

pub mod cli;
pub mod flow;
pub mod provider;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
