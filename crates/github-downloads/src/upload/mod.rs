//! Two-phase upload.
//!
//! An upload first asks the metadata API for a signed storage policy, then
//! posts the file inside a `multipart/form-data` envelope straight to the
//! storage endpoint. The transfer never starts when authorization fails, and
//! a policy is never reused: every call authorizes again.

mod multipart;
mod policy;

use std::fs::File;
use std::io::Read;
use std::path::Path;

use reqwest::blocking::Body;
use reqwest::header::CONTENT_TYPE;
use strum::{AsRefStr, Display, IntoStaticStr};
use url::Url;

pub use self::multipart::{BOUNDARY_ALPHABET, BOUNDARY_LEN, Envelope, generate_boundary};
use self::multipart::{BodyProgress, TrackedReader};
pub use self::policy::UploadPolicy;
use crate::client::ClientInner;
use crate::xml::{find_element_text, parse_flat};
use crate::{Error, ErrorKind, Result, TRACING_TARGET_UPLOAD, endpoint};

/// Content type used when the caller does not know better.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Status the storage endpoint is asked to answer with on success.
const SUCCESS_STATUS: u16 = 201;

/// Describes the file being published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Name the download is published under.
    pub file_name: String,
    /// MIME type declared to both the metadata API and the storage endpoint.
    pub content_type: String,
    /// Free-form description shown on the downloads page.
    pub description: String,
}

impl UploadRequest {
    /// Creates a request with an empty description.
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            description: String::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Progress of one upload.
///
/// Errors raised by an upload carry the phase that failed in their `phase`
/// property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UploadPhase {
    /// Nothing has been sent yet.
    Idle,
    /// Waiting for the metadata API to issue a policy.
    Authorizing,
    /// A policy was issued; the transfer has not started.
    Authorized,
    /// Streaming the envelope to the storage endpoint.
    Transferring,
    /// The storage endpoint accepted the file.
    Complete,
}

impl Error {
    fn in_phase(self, phase: UploadPhase) -> Self {
        self.with_property("phase", phase)
    }
}

/// Uploads `size` bytes read from `body` under the client's own account.
///
/// `body` is consumed by the call and dropped on every exit path.
pub(crate) fn upload<R>(
    client: &ClientInner,
    project: &str,
    request: &UploadRequest,
    body: R,
    size: u64,
) -> Result<()>
where
    R: Read + Send + 'static,
{
    tracing::debug!(
        target: TRACING_TARGET_UPLOAD,
        phase = %UploadPhase::Authorizing,
        project,
        file_name = %request.file_name,
        size,
        "Requesting upload policy"
    );

    let policy = authorize(client, project, request, size)
        .map_err(|err| err.in_phase(UploadPhase::Authorizing))?;

    tracing::debug!(
        target: TRACING_TARGET_UPLOAD,
        phase = %UploadPhase::Authorized,
        key = %policy.key(&request.file_name),
        "Upload policy issued"
    );

    transfer(client, request, &policy, body, size)
        .map_err(|err| err.in_phase(UploadPhase::Transferring))?;

    tracing::info!(
        target: TRACING_TARGET_UPLOAD,
        phase = %UploadPhase::Complete,
        project,
        file_name = %request.file_name,
        size,
        "Upload complete"
    );

    Ok(())
}

/// Uploads the file at `path`, sized from its metadata.
///
/// A file that cannot be opened fails before any request is issued.
pub(crate) fn upload_file(
    client: &ClientInner,
    project: &str,
    request: &UploadRequest,
    path: &Path,
) -> Result<()> {
    let file = File::open(path).map_err(|err| {
        Error::body_not_found(path.display().to_string(), err).in_phase(UploadPhase::Idle)
    })?;

    let size = file
        .metadata()
        .map_err(|err| Error::body_io(&request.file_name, err).in_phase(UploadPhase::Idle))?
        .len();

    upload(client, project, request, file, size)
}

/// Requests a signed storage policy for the upload.
fn authorize(
    client: &ClientInner,
    project: &str,
    request: &UploadRequest,
    size: u64,
) -> Result<UploadPolicy> {
    let credentials = &client.credentials;
    let target = endpoint::downloads_page(client.config.github_base(), credentials.login(), project)?;

    let file_size = size.to_string();
    let response = client
        .http
        .post(target.clone())
        .form(&[
            ("file_size", file_size.as_str()),
            ("content_type", request.content_type.as_str()),
            ("file_name", request.file_name.as_str()),
            ("description", request.description.as_str()),
            ("login", credentials.login()),
            ("token", credentials.token()),
        ])
        .send()
        .map_err(|err| Error::api_io(target.as_str(), err))?;

    let status = response.status();
    if !status.is_success() {
        let mut error = Error::api_status(status.as_u16()).with_property("url", &target);

        let detail = response
            .bytes()
            .ok()
            .and_then(|document| find_element_text(&document, "error"))
            .map(|detail| detail.trim().to_owned())
            .filter(|detail| !detail.is_empty());

        if let Some(detail) = detail {
            error = error.with_argument(detail.clone()).with_property("error", detail);
        }

        tracing::warn!(
            target: TRACING_TARGET_UPLOAD,
            url = %target,
            status = status.as_u16(),
            detail = error.property("error").unwrap_or_default(),
            "Upload authorization rejected"
        );

        return Err(error);
    }

    let document = response
        .bytes()
        .map_err(|err| Error::api_io(target.as_str(), err))?;
    let fields = parse_flat(&document).map_err(|err| Error::api_bad_xml(target.as_str(), err))?;

    UploadPolicy::from_fields(&fields).map_err(|missing| {
        Error::new(ErrorKind::ApiBadXml)
            .with_argument(target.as_str())
            .with_property("url", &target)
            .with_property("missing", missing)
    })
}

/// Posts the envelope to the storage endpoint.
///
/// The file part is sized from `size` and the source must yield exactly that
/// many bytes; a shorter or longer source fails as [`ErrorKind::BodyIo`]
/// before the envelope is closed. When the storage endpoint answers before
/// the source is drained, its status is reported and the error carries
/// `body_consumed=false`; a source failure that would only have surfaced
/// later in the stream is not observed in that case.
fn transfer<R>(
    client: &ClientInner,
    request: &UploadRequest,
    policy: &UploadPolicy,
    body: R,
    size: u64,
) -> Result<()>
where
    R: Read + Send + 'static,
{
    let storage_url = client.config.storage_url.as_str();
    let target =
        Url::parse(storage_url).map_err(|err| Error::malformed_url(storage_url).with_source(err))?;

    let key = policy.key(&request.file_name);
    let fields = [
        ("Filename", request.file_name.as_str()),
        ("policy", policy.policy.as_str()),
        ("success_action_status", "201"),
        ("key", key.as_str()),
        ("AWSAccessKeyId", policy.access_key_id.as_str()),
        ("Content-Type", request.content_type.as_str()),
        ("signature", policy.signature.as_str()),
        ("acl", policy.acl.as_str()),
    ];

    let envelope = Envelope::new(generate_boundary(), &fields, &request.content_type);
    let content_type = envelope.content_type_header();
    let length = envelope.len(size);

    tracing::debug!(
        target: TRACING_TARGET_UPLOAD,
        phase = %UploadPhase::Transferring,
        url = %target,
        key = %key,
        length,
        "Posting upload envelope"
    );

    let progress = BodyProgress::default();
    let reader = TrackedReader::new(body, size, progress.clone());
    let body = Body::sized(envelope.into_reader(reader), length);

    let result = client
        .http
        .post(target.clone())
        .header(CONTENT_TYPE, content_type)
        .body(body)
        .send();

    if let Some(err) = progress.take_failure() {
        tracing::warn!(
            target: TRACING_TARGET_UPLOAD,
            file_name = %request.file_name,
            error = %err,
            "Upload body failed while streaming"
        );
        return Err(Error::body_io(&request.file_name, err));
    }

    let response = result.map_err(|err| Error::storage_io(target.as_str(), err))?;

    let status = response.status();
    let consumed = progress.is_finished();
    if status.as_u16() != SUCCESS_STATUS || !consumed {
        tracing::warn!(
            target: TRACING_TARGET_UPLOAD,
            url = %target,
            status = status.as_u16(),
            body_consumed = consumed,
            "Storage rejected upload"
        );

        let error = Error::storage_status(status.as_u16()).with_property("url", &target);
        return Err(if consumed {
            error
        } else {
            error.with_property("body_consumed", false)
        });
    }

    Ok(())
}
