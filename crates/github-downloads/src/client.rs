//! Client facade binding credentials to the listing, upload and delete operations.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use reqwest::blocking::Client;

use crate::download::Download;
use crate::upload::{self, UploadRequest};
use crate::{Credentials, DownloadsConfig, Error, Result, TRACING_TARGET_CLIENT, listing};

/// State shared by the facade and every descriptor it lists.
pub(crate) struct ClientInner {
    pub(crate) http: Client,
    pub(crate) config: DownloadsConfig,
    pub(crate) credentials: Credentials,
}

/// Client for the downloads of one GitHub account.
///
/// Cloning is cheap and clones share the same HTTP client. Every operation is
/// blocking and issues its requests sequentially; independent calls may run
/// concurrently from several threads.
///
/// # Examples
///
/// ```rust,no_run
/// use github_downloads::{Credentials, GitHubDownloads, UploadRequest};
///
/// let client = GitHubDownloads::with_defaults(Credentials::new("alice", "token"))?;
/// for download in client.list_downloads("tool")? {
///     println!("{} {}", download.id(), download.file_name());
/// }
///
/// let request = UploadRequest::new("tool-1.0.zip", "application/zip");
/// client.upload_file("tool", &request, "target/tool-1.0.zip")?;
/// # Ok::<(), github_downloads::Error>(())
/// ```
#[derive(Clone)]
pub struct GitHubDownloads {
    inner: Arc<ClientInner>,
}

impl GitHubDownloads {
    /// Creates a client from credentials and configuration.
    pub fn new(credentials: Credentials, config: DownloadsConfig) -> Result<Self> {
        config.validate()?;

        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            login = %credentials.login(),
            github_url = %config.github_url,
            storage_url = %config.storage_url,
            timeout_secs = config.http_timeout,
            "Creating downloads client"
        );

        let http = Client::builder()
            .user_agent(config.effective_user_agent())
            .timeout(config.timeout())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|err| Error::configuration("failed to build HTTP client").with_source(err))?;

        let inner = ClientInner {
            http,
            config,
            credentials,
        };

        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    /// Creates a client against the public service endpoints.
    pub fn with_defaults(credentials: Credentials) -> Result<Self> {
        Self::new(credentials, DownloadsConfig::default())
    }

    pub(crate) fn inner(&self) -> &Arc<ClientInner> {
        &self.inner
    }

    /// Returns the login requests are signed with.
    pub fn login(&self) -> &str {
        self.inner.credentials.login()
    }

    /// Returns the client configuration.
    pub fn config(&self) -> &DownloadsConfig {
        &self.inner.config
    }

    /// Lists the downloads of one of the client's own projects, in page order.
    pub fn list_downloads(&self, project: &str) -> Result<Vec<Download>> {
        listing::fetch_downloads(&self.inner, self.login(), project)
    }

    /// Lists the downloads of a project owned by another account.
    ///
    /// The returned descriptors still delete with this client's credentials.
    pub fn list_account_downloads(&self, account: &str, project: &str) -> Result<Vec<Download>> {
        listing::fetch_downloads(&self.inner, account, project)
    }

    /// Uploads `size` bytes read from `body` to one of the client's projects.
    ///
    /// The reader is consumed and dropped before the call returns.
    pub fn upload<R>(&self, project: &str, request: &UploadRequest, body: R, size: u64) -> Result<()>
    where
        R: Read + Send + 'static,
    {
        upload::upload(&self.inner, project, request, body, size)
    }

    /// Uploads a file to one of the client's projects.
    pub fn upload_file(
        &self,
        project: &str,
        request: &UploadRequest,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        upload::upload_file(&self.inner, project, request, path.as_ref())
    }
}

impl std::fmt::Debug for GitHubDownloads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubDownloads")
            .field("credentials", &self.inner.credentials)
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
