//! Client configuration.

use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Default host of the listing pages and the metadata API.
pub const DEFAULT_GITHUB_URL: &str = "https://github.com";

/// Default base of canonical download URLs.
pub const DEFAULT_DOWNLOADS_URL: &str = "http://cloud.github.com/downloads";

/// Default storage endpoint receiving multipart uploads.
pub const DEFAULT_STORAGE_URL: &str = "https://github.s3.amazonaws.com/";

/// Configuration for the downloads client.
///
/// Endpoints are plain strings so the configuration can be deserialized and
/// parsed from the command line; [`DownloadsConfig::validate`] checks them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
pub struct DownloadsConfig {
    /// Host of the listing pages and the upload authorization API
    #[cfg_attr(
        feature = "config",
        arg(long = "github-url", env = "GITHUB_URL", default_value = DEFAULT_GITHUB_URL)
    )]
    #[serde(default = "default_github_url")]
    pub github_url: String,

    /// Base URL of published downloads, as linked from the listing page
    #[cfg_attr(
        feature = "config",
        arg(long = "downloads-url", env = "GITHUB_DOWNLOADS_URL", default_value = DEFAULT_DOWNLOADS_URL)
    )]
    #[serde(default = "default_downloads_url")]
    pub downloads_url: String,

    /// Storage endpoint receiving the multipart upload
    #[cfg_attr(
        feature = "config",
        arg(long = "storage-url", env = "GITHUB_STORAGE_URL", default_value = DEFAULT_STORAGE_URL)
    )]
    #[serde(default = "default_storage_url")]
    pub storage_url: String,

    /// HTTP request timeout in seconds (no timeout when unset)
    #[cfg_attr(feature = "config", arg(long = "http-timeout", env = "HTTP_TIMEOUT"))]
    #[serde(default)]
    pub http_timeout: Option<u64>,

    /// User-Agent header to send with requests
    #[cfg_attr(
        feature = "config",
        arg(long = "http-user-agent", env = "HTTP_USER_AGENT")
    )]
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_github_url() -> String {
    DEFAULT_GITHUB_URL.to_owned()
}

fn default_downloads_url() -> String {
    DEFAULT_DOWNLOADS_URL.to_owned()
}

fn default_storage_url() -> String {
    DEFAULT_STORAGE_URL.to_owned()
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            github_url: default_github_url(),
            downloads_url: default_downloads_url(),
            storage_url: default_storage_url(),
            http_timeout: None,
            user_agent: None,
        }
    }
}

impl DownloadsConfig {
    /// Set the listing and metadata API host.
    #[must_use]
    pub fn with_github_url(mut self, url: impl Into<String>) -> Self {
        self.github_url = url.into();
        self
    }

    /// Set the base of canonical download URLs.
    #[must_use]
    pub fn with_downloads_url(mut self, url: impl Into<String>) -> Self {
        self.downloads_url = url.into();
        self
    }

    /// Set the storage endpoint.
    #[must_use]
    pub fn with_storage_url(mut self, url: impl Into<String>) -> Self {
        self.storage_url = url.into();
        self
    }

    /// Set the timeout in seconds.
    #[must_use]
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.http_timeout = Some(timeout_secs);
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Returns the timeout as a Duration, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.http_timeout.map(Duration::from_secs)
    }

    /// Returns the effective user agent, using default if not set.
    pub fn effective_user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(Self::default_user_agent)
    }

    /// Returns the default user agent string.
    fn default_user_agent() -> String {
        format!("github-downloads/{}", env!("CARGO_PKG_VERSION"))
    }

    /// Listing and metadata API host without a trailing slash.
    pub(crate) fn github_base(&self) -> &str {
        self.github_url.trim_end_matches('/')
    }

    /// Download URL base without a trailing slash.
    pub(crate) fn downloads_base(&self) -> &str {
        self.downloads_url.trim_end_matches('/')
    }

    /// Validates that every endpoint is an absolute URL.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("github_url", &self.github_url),
            ("downloads_url", &self.downloads_url),
            ("storage_url", &self.storage_url),
        ] {
            Url::parse(value).map_err(|err| {
                Error::configuration(format!("{name} is not a valid URL"))
                    .with_property(name, value)
                    .with_source(err)
            })?;
        }

        if self.http_timeout == Some(0) {
            return Err(Error::configuration("http_timeout must be positive"));
        }

        Ok(())
    }
}
