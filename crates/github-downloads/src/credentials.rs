//! Account credentials.

use std::fmt;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// Account login and API token used to sign every request.
///
/// Both values are opaque and immutable for the lifetime of a client.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct Credentials {
    /// GitHub account login
    #[cfg_attr(feature = "config", arg(long = "github-login", env = "GITHUB_LOGIN"))]
    pub login: String,

    /// GitHub API token
    #[cfg_attr(
        feature = "config",
        arg(long = "github-token", env = "GITHUB_TOKEN", hide_env_values = true)
    )]
    pub token: String,
}

impl Credentials {
    /// Creates credentials from a login and token.
    pub fn new(login: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            token: token.into(),
        }
    }

    /// Returns the account login.
    #[inline]
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Returns the API token.
    #[inline]
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("token", &"<redacted>")
            .finish()
    }
}
