//! Download listing scraped from the project downloads page.
//!
//! The service has no structured listing API. Downloads are recovered from the
//! rendered HTML by [`DownloadPattern`], which matches an element carrying
//! `id="download_<digits>"` followed by the first `href` pointing under the
//! account's download base. Any markup change on the service side breaks this.

use std::sync::Arc;

use regex::Regex;
use url::Url;

use crate::client::ClientInner;
use crate::download::Download;
use crate::{Error, Result, TRACING_TARGET_LISTING, endpoint};

/// Charset assumed when the listing page does not declare one.
pub const DEFAULT_CHARSET: &str = "ISO-8859-1";

/// One match of the listing pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapedDownload<'a> {
    /// Digits captured from `id="download_<digits>"`.
    pub id: &'a str,
    /// Captured `href` value.
    pub href: &'a str,
}

/// Listing page parser scoped to one account.
#[derive(Debug, Clone)]
pub struct DownloadPattern {
    regex: Regex,
}

impl DownloadPattern {
    /// Builds the pattern for downloads published under `{downloads_base}/{account}/`.
    pub fn new(downloads_base: &str, account: &str) -> Self {
        let pattern = format!(
            r#"(?s)id="download_(\d+)".*?href="({}/{}/.*?)""#,
            regex::escape(downloads_base.trim_end_matches('/')),
            regex::escape(account),
        );

        let regex = Regex::new(&pattern).expect("escaped listing pattern is valid");
        Self { regex }
    }

    /// Scans the page left to right, resuming after each match.
    ///
    /// Results are in document order with no deduplication.
    pub fn scan<'a>(&'a self, page: &'a str) -> impl Iterator<Item = ScrapedDownload<'a>> + 'a {
        self.regex.captures_iter(page).filter_map(|captures| {
            Some(ScrapedDownload {
                id: captures.get(1)?.as_str(),
                href: captures.get(2)?.as_str(),
            })
        })
    }
}

/// Fetches the downloads page of `account/project` and extracts its downloads.
pub(crate) fn fetch_downloads(
    client: &Arc<ClientInner>,
    account: &str,
    project: &str,
) -> Result<Vec<Download>> {
    let target = endpoint::downloads_page(client.config.github_base(), account, project)?;

    tracing::debug!(
        target: TRACING_TARGET_LISTING,
        account,
        project,
        url = %target,
        "Fetching downloads page"
    );

    let response = client
        .http
        .get(target.clone())
        .send()
        .map_err(|err| Error::api_io(target.as_str(), err))?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(
            target: TRACING_TARGET_LISTING,
            url = %target,
            status = status.as_u16(),
            "Downloads page request rejected"
        );
        return Err(Error::api_status(status.as_u16()).with_property("url", &target));
    }

    let page = response
        .text_with_charset(DEFAULT_CHARSET)
        .map_err(|err| Error::api_io(target.as_str(), err))?;

    let pattern = DownloadPattern::new(client.config.downloads_base(), account);
    let downloads = pattern
        .scan(&page)
        .map(|scraped| {
            let url = Url::parse(scraped.href)
                .map_err(|err| Error::malformed_url(scraped.href).with_source(err))?;
            Ok(Download::new(client.clone(), account, project, scraped.id, url))
        })
        .collect::<Result<Vec<_>>>()?;

    tracing::info!(
        target: TRACING_TARGET_LISTING,
        account,
        project,
        count = downloads.len(),
        "Downloads listed"
    );

    Ok(downloads)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "http://cloud.github.com/downloads";

    fn page(entries: &[(&str, &str)]) -> String {
        let mut html = String::from("<html><body><table id=\"manual_downloads\">\n");
        for (id, href) in entries {
            html.push_str(&format!(
                "<tr id=\"download_{id}\">\n  <td class=\"name\">\n    <a href=\"{href}\">file</a>\n  </td>\n</tr>\n"
            ));
        }
        html.push_str("</table></body></html>\n");
        html
    }

    #[test]
    fn test_scan_in_document_order() {
        let html = page(&[
            ("12", "http://cloud.github.com/downloads/alice/tool/tool-1.1.zip"),
            ("7", "http://cloud.github.com/downloads/alice/tool/tool-1.0.zip"),
        ]);
        let pattern = DownloadPattern::new(BASE, "alice");
        let found: Vec<_> = pattern.scan(&html).collect();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, "12");
        assert_eq!(
            found[0].href,
            "http://cloud.github.com/downloads/alice/tool/tool-1.1.zip"
        );
        assert_eq!(found[1].id, "7");
    }

    #[test]
    fn test_scan_without_matches() {
        let pattern = DownloadPattern::new(BASE, "alice");
        assert_eq!(pattern.scan("<html><body>No downloads</body></html>").count(), 0);
        assert_eq!(pattern.scan("").count(), 0);
    }

    #[test]
    fn test_scan_skips_other_accounts() {
        let html = page(&[
            ("1", "http://cloud.github.com/downloads/bob/tool/tool.zip"),
            ("2", "http://cloud.github.com/downloads/alice/tool/tool.zip"),
        ]);
        let pattern = DownloadPattern::new(BASE, "alice");
        let found: Vec<_> = pattern.scan(&html).collect();

        // The first id is paired with the next href under the account.
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
        assert_eq!(
            found[0].href,
            "http://cloud.github.com/downloads/alice/tool/tool.zip"
        );
    }

    #[test]
    fn test_scan_requires_digits() {
        let html = "<tr id=\"download_abc\"><a href=\"http://cloud.github.com/downloads/alice/tool/x.zip\">";
        let pattern = DownloadPattern::new(BASE, "alice");
        assert_eq!(pattern.scan(html).count(), 0);
    }

    #[test]
    fn test_scan_escapes_account() {
        let html = page(&[("3", "http://cloud.github.com/downloads/aXb/tool/x.zip")]);
        let pattern = DownloadPattern::new(BASE, "a.b");
        assert_eq!(pattern.scan(&html).count(), 0);
    }

    #[test]
    fn test_base_trailing_slash_is_ignored() {
        let html = page(&[("3", "http://cloud.github.com/downloads/alice/tool/x.zip")]);
        let pattern = DownloadPattern::new("http://cloud.github.com/downloads/", "alice");
        assert_eq!(pattern.scan(&html).count(), 1);
    }
}
