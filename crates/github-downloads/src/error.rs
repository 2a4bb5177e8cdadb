//! Structured error handling for downloads operations.
//!
//! Every failure is one [`ErrorKind`] carrying a fixed numeric code, the
//! positional arguments of its message, named diagnostic properties and an
//! optional source error. Callers branch on the kind; the human-readable text
//! is only rendered when the error is displayed.

use std::collections::BTreeMap;

use strum::{AsRefStr, Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Type alias for boxed dynamic errors that can be sent across threads.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Type alias for Results with our custom Error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Categories of errors that can occur in downloads operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The account, project or id produced an invalid request target.
    MalformedUrl,
    /// The client configuration is invalid or the HTTP client could not be built.
    Configuration,
    /// Network failure while talking to the metadata API.
    ApiIo,
    /// The metadata API answered with a non-2xx status.
    ApiError,
    /// The metadata API answered with 403 Forbidden.
    ApiForbidden,
    /// The metadata API answered with a document that could not be parsed.
    ApiBadXml,
    /// Network failure while talking to the storage endpoint.
    StorageIo,
    /// The storage endpoint answered with a status other than 201.
    StorageError,
    /// The storage endpoint answered with 403 Forbidden.
    StorageForbidden,
    /// The upload source file could not be opened.
    BodyNotFound,
    /// The upload source failed while it was being read.
    BodyIo,
}

impl ErrorKind {
    /// Returns the fixed numeric code of this kind.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::MalformedUrl => 1001,
            Self::Configuration => 1002,
            Self::ApiIo => 1101,
            Self::ApiError => 1102,
            Self::ApiForbidden => 1103,
            Self::ApiBadXml => 1104,
            Self::StorageIo => 1201,
            Self::StorageError => 1202,
            Self::StorageForbidden => 1203,
            Self::BodyNotFound => 1401,
            Self::BodyIo => 1402,
        }
    }

    /// Check if this kind reports a rejected credential.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::ApiForbidden | Self::StorageForbidden)
    }

    /// Check if this kind reports a network failure rather than a response.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::ApiIo | Self::StorageIo)
    }
}

/// Source of message templates used to render errors for display.
///
/// A template contains `{}` placeholders that are filled with the error's
/// arguments in order. Returning `None` renders the numeric code instead.
pub trait MessageCatalog {
    /// Returns the template for the given kind.
    fn template(&self, kind: ErrorKind) -> Option<&str>;
}

/// Built-in English message templates.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCatalog;

impl MessageCatalog for DefaultCatalog {
    fn template(&self, kind: ErrorKind) -> Option<&str> {
        let template = match kind {
            ErrorKind::MalformedUrl => "malformed request target: {}",
            ErrorKind::Configuration => "invalid configuration: {}",
            ErrorKind::ApiIo => "I/O error while talking to {}",
            ErrorKind::ApiError => "GitHub rejected the request with status {}",
            ErrorKind::ApiForbidden => "GitHub refused access with status {}",
            ErrorKind::ApiBadXml => "GitHub returned an unparsable response from {}",
            ErrorKind::StorageIo => "I/O error while uploading to {}",
            ErrorKind::StorageError => "storage rejected the upload with status {}",
            ErrorKind::StorageForbidden => "storage refused the upload with status {}",
            ErrorKind::BodyNotFound => "upload body not found: {}",
            ErrorKind::BodyIo => "unable to read upload body for {}",
        };

        Some(template)
    }
}

/// Fills `{}` placeholders in order; arguments left over are appended.
fn render_message(catalog: &dyn MessageCatalog, kind: ErrorKind, arguments: &[String]) -> String {
    let Some(template) = catalog.template(kind) else {
        return kind.code().to_string();
    };

    let mut remaining = arguments.iter();
    let mut pieces = template.split("{}");
    let mut message = pieces.next().unwrap_or_default().to_owned();
    for piece in pieces {
        match remaining.next() {
            Some(argument) => message.push_str(argument),
            None => message.push_str("{}"),
        }
        message.push_str(piece);
    }

    for argument in remaining {
        message.push_str(": ");
        message.push_str(argument);
    }

    message
}

/// Structured error type with classification and diagnostic properties.
#[must_use]
#[derive(Debug, Error)]
#[error("[{}] {}", .kind.code(), render_message(&DefaultCatalog, .kind.clone(), &.arguments))]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Positional arguments for the message template.
    pub arguments: Vec<String>,
    /// Named diagnostic context, such as the offending URL or status code.
    pub properties: BTreeMap<String, String>,
    /// Underlying source error, if any.
    #[source]
    pub source: Option<BoxedError>,
}

impl Error {
    /// Creates a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            arguments: Vec::new(),
            properties: BTreeMap::new(),
            source: None,
        }
    }

    /// Creates a new error from a source error.
    pub fn from_source(kind: ErrorKind, source: impl Into<BoxedError>) -> Self {
        Self::new(kind).with_source(source)
    }

    /// Creates an error for a request target that is not a valid URL.
    pub fn malformed_url(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(ErrorKind::MalformedUrl)
            .with_argument(url.clone())
            .with_property("url", url)
    }

    /// Creates an error for an invalid configuration value.
    pub fn configuration(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration).with_argument(detail)
    }

    /// Creates an error for a network failure against the metadata API.
    pub fn api_io(url: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        let url = url.into();
        Self::from_source(ErrorKind::ApiIo, source)
            .with_argument(url.clone())
            .with_property("url", url)
    }

    /// Creates an error for a non-2xx metadata API response.
    ///
    /// 403 maps to [`ErrorKind::ApiForbidden`], anything else to [`ErrorKind::ApiError`].
    pub fn api_status(status: u16) -> Self {
        let kind = if status == 403 {
            ErrorKind::ApiForbidden
        } else {
            ErrorKind::ApiError
        };

        Self::new(kind)
            .with_argument(status.to_string())
            .with_property("status", status)
    }

    /// Creates an error for a metadata API document that could not be parsed.
    pub fn api_bad_xml(url: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        let url = url.into();
        Self::from_source(ErrorKind::ApiBadXml, source)
            .with_argument(url.clone())
            .with_property("url", url)
    }

    /// Creates an error for a network failure against the storage endpoint.
    pub fn storage_io(url: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        let url = url.into();
        Self::from_source(ErrorKind::StorageIo, source)
            .with_argument(url.clone())
            .with_property("url", url)
    }

    /// Creates an error for a storage response other than 201 Created.
    ///
    /// 403 maps to [`ErrorKind::StorageForbidden`], anything else to [`ErrorKind::StorageError`].
    pub fn storage_status(status: u16) -> Self {
        let kind = if status == 403 {
            ErrorKind::StorageForbidden
        } else {
            ErrorKind::StorageError
        };

        Self::new(kind)
            .with_argument(status.to_string())
            .with_property("status", status)
    }

    /// Creates an error for an upload source file that could not be opened.
    pub fn body_not_found(path: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        let path = path.into();
        Self::from_source(ErrorKind::BodyNotFound, source)
            .with_argument(path.clone())
            .with_property("path", path)
    }

    /// Creates an error for an upload source that failed mid-read.
    pub fn body_io(file_name: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        let file_name = file_name.into();
        Self::from_source(ErrorKind::BodyIo, source)
            .with_argument(file_name.clone())
            .with_property("file_name", file_name)
    }

    /// Appends a positional message argument.
    pub fn with_argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Attaches a named diagnostic property, replacing any previous value.
    pub fn with_property(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.properties.insert(name.into(), value.to_string());
        self
    }

    /// Sets the source of the error.
    pub fn with_source(mut self, source: impl Into<BoxedError>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the numeric code of the error kind.
    pub fn code(&self) -> u16 {
        self.kind.code()
    }

    /// Returns a named property, if present.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Returns the HTTP status attached to this error, if any.
    pub fn status(&self) -> Option<u16> {
        self.property("status").and_then(|status| status.parse().ok())
    }

    /// Check if this error reports a rejected credential.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.kind.is_forbidden()
    }

    /// Renders the message with the given catalog.
    pub fn render(&self, catalog: &dyn MessageCatalog) -> String {
        render_message(catalog, self.kind, &self.arguments)
    }
}
