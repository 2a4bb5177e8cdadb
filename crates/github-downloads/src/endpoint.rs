//! Request target composition.
//!
//! Account, project and download id are spliced into URL paths verbatim, so
//! each one must be a single, non-empty path segment.

use url::Url;

use crate::{Error, Result};

/// Characters that would change the shape of the composed URL.
const RESERVED: &[char] = &['/', '?', '#', '\\'];

fn is_segment(value: &str) -> bool {
    !value.is_empty()
        && !value.contains(RESERVED)
        && !value.chars().any(|c| c.is_whitespace() || c.is_control())
}

fn compose(target: String, segments: &[&str]) -> Result<Url> {
    if !segments.iter().all(|segment| is_segment(segment)) {
        return Err(Error::malformed_url(target));
    }

    Url::parse(&target).map_err(|err| Error::malformed_url(target).with_source(err))
}

/// `{host}/{account}/{project}/downloads`, the listing page and upload authorization target.
pub(crate) fn downloads_page(host: &str, account: &str, project: &str) -> Result<Url> {
    compose(
        format!("{host}/{account}/{project}/downloads"),
        &[account, project],
    )
}

/// `{host}/{account}/{project}/downloads/{id}`, the delete target of one download.
pub(crate) fn download_entry(host: &str, account: &str, project: &str, id: &str) -> Result<Url> {
    compose(
        format!("{host}/{account}/{project}/downloads/{id}"),
        &[account, project, id],
    )
}

/// `{downloads}/{account}/{project}/`, the base every canonical download URL lives under.
pub(crate) fn project_base(downloads: &str, account: &str, project: &str) -> Result<Url> {
    compose(
        format!("{downloads}/{account}/{project}/"),
        &[account, project],
    )
}
