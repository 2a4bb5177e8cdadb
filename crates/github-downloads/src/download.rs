//! Download descriptors.

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::client::ClientInner;
use crate::{Error, Result, TRACING_TARGET_DOWNLOAD, endpoint};

/// One published download of a project.
///
/// Descriptors come only from a listing and carry the listing client's
/// credentials so [`Download::delete`] needs no further arguments. Deleting
/// does not invalidate copies already held; list again to refresh.
#[derive(Clone)]
pub struct Download {
    id: String,
    url: Url,
    account: String,
    project: String,
    client: Arc<ClientInner>,
}

impl Download {
    pub(crate) fn new(
        client: Arc<ClientInner>,
        account: &str,
        project: &str,
        id: &str,
        url: Url,
    ) -> Self {
        Self {
            id: id.to_owned(),
            url,
            account: account.to_owned(),
            project: project.to_owned(),
            client,
        }
    }

    /// Returns the identifier assigned by the service.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the canonical download URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the account the download was listed under.
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Returns the project the download was listed under.
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the URL path relative to `{downloads}/{account}/{project}/`.
    ///
    /// The result is recomputed from the URL on every call. It is not
    /// percent-decoded: a name published as `my%20tool.zip` is returned as is.
    /// A URL outside the project base is returned whole.
    pub fn file_name(&self) -> String {
        let base = endpoint::project_base(
            self.client.config.downloads_base(),
            &self.account,
            &self.project,
        );

        match base {
            Ok(base) => self
                .url
                .as_str()
                .strip_prefix(base.as_str())
                .unwrap_or(self.url.as_str())
                .to_owned(),
            Err(_) => self.url.to_string(),
        }
    }

    /// Deletes the download from the service.
    ///
    /// The delete endpoint only takes POST, so the request carries the
    /// `_method=delete` override next to the credentials.
    pub fn delete(&self) -> Result<()> {
        let target = endpoint::download_entry(
            self.client.config.github_base(),
            &self.account,
            &self.project,
            &self.id,
        )?;

        tracing::debug!(
            target: TRACING_TARGET_DOWNLOAD,
            id = %self.id,
            url = %target,
            "Deleting download"
        );

        let credentials = &self.client.credentials;
        let response = self
            .client
            .http
            .post(target.clone())
            .form(&[
                ("_method", "delete"),
                ("login", credentials.login()),
                ("token", credentials.token()),
            ])
            .send()
            .map_err(|err| Error::api_io(target.as_str(), err))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                target: TRACING_TARGET_DOWNLOAD,
                id = %self.id,
                status = status.as_u16(),
                "Delete rejected"
            );
            return Err(Error::api_status(status.as_u16()).with_property("url", &target));
        }

        tracing::info!(
            target: TRACING_TARGET_DOWNLOAD,
            id = %self.id,
            file_name = %self.file_name(),
            "Download deleted"
        );

        Ok(())
    }
}

impl PartialEq for Download {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.url == other.url
    }
}

impl Eq for Download {}

impl fmt::Debug for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Download")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("account", &self.account)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Download {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}, {}}}", self.id, self.url)
    }
}
