#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod client;
mod credentials;
mod download;
mod endpoint;
mod error;

pub mod config;
pub mod listing;
pub mod upload;
pub mod xml;

pub use client::GitHubDownloads;
pub use config::DownloadsConfig;
pub use credentials::Credentials;
pub use download::Download;
pub use error::{BoxedError, DefaultCatalog, Error, ErrorKind, MessageCatalog, Result};
pub use listing::{DownloadPattern, ScrapedDownload};
pub use upload::{DEFAULT_CONTENT_TYPE, UploadPhase, UploadPolicy, UploadRequest};

/// Tracing target for client construction.
pub const TRACING_TARGET_CLIENT: &str = "github_downloads::client";

/// Tracing target for listing page requests.
pub const TRACING_TARGET_LISTING: &str = "github_downloads::listing";

/// Tracing target for download deletion.
pub const TRACING_TARGET_DOWNLOAD: &str = "github_downloads::download";

/// Tracing target for the two upload phases.
pub const TRACING_TARGET_UPLOAD: &str = "github_downloads::upload";
