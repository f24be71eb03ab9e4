//! Presentation-side collaborators of the flow.

use std::fmt;

/// Title used for every failure notification.
pub const ERROR_TITLE: &str = "Error";

/// Blocking "show this message to the user" capability.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Fire-and-forget navigation capability.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
}

impl Route {
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/(root)/(tabs)/home",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
