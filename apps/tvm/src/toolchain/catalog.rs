//! Release catalog scraping.
//!
//! The catalog is a plain HTML index: the root page lists one link per
//! release, and every release page lists its downloads. Download links carry
//! `data-os`, `data-arch` and `data-version` attributes; checksum manifests
//! and their signatures are recognized by file name suffix.
//!
//! ```html
//! <ul>
//!   <li><a href="/terraform/1.0.0/terraform_1.0.0_SHA256SUMS">...</a></li>
//!   <li><a href="/terraform/1.0.0/terraform_1.0.0_SHA256SUMS.sig">...</a></li>
//!   <li><a data-os="linux" data-arch="amd64" data-version="1.0.0"
//!          href="/terraform/1.0.0/terraform_1.0.0_linux_amd64.zip">...</a></li>
//! </ul>
//! ```

use std::time::Duration;

use futures_util::{StreamExt, TryStreamExt, stream};
use reqwest::{Client, Url};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use super::Platform;
use super::constraint::{Version, parse_version};
use super::select::Versioned;
use crate::config::Config;
use crate::errors::{Result, TvmError};

/// Links considered on both index and release pages.
const LINK_SELECTOR: &str = "body ul li a";

/// Suffix of checksum manifest links.
const CHECKSUM_SUFFIX: &str = "_SHA256SUMS";

/// Suffix of checksum signature links.
const SIGNATURE_SUFFIX: &str = "_SHA256SUMS.sig";

/// Timeout for a single catalog page request.
const PAGE_TIMEOUT_SECS: u64 = 30;

/// User-Agent header for HTTP requests.
const USER_AGENT: &str = concat!("tvm/", env!("CARGO_PKG_VERSION"));

/// A remotely published release usable on the current platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseCandidate {
    /// Release version.
    pub version: Version,
    /// Download location of the platform archive.
    pub url: Url,
    /// Location of the `SHA256SUMS` manifest, if published.
    pub checksum_url: Option<Url>,
    /// Location of the manifest signature, if published.
    pub checksum_signature_url: Option<Url>,
}

impl ReleaseCandidate {
    /// File name of the archive (last path segment of the download URL).
    #[must_use]
    pub fn archive_name(&self) -> &str {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .unwrap_or("archive.zip")
    }
}

impl Versioned for ReleaseCandidate {
    fn version(&self) -> &Version {
        &self.version
    }
}

/// Builds the HTTP client shared by catalog and download requests.
///
/// # Errors
///
/// Returns [`TvmError::Network`] if the client cannot be constructed.
pub fn http_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TvmError::network_with_source("Failed to create HTTP client", e))
}

/// Fetches the release index and every release page, returning the releases
/// available for the configured platform.
///
/// Release pages are fetched concurrently, at most
/// [`Config::max_concurrent_fetches`] at a time. The first failure is
/// returned and every outstanding fetch is dropped before returning.
///
/// # Errors
///
/// Returns [`TvmError::Network`] if any page cannot be fetched or answers
/// with a non-success status, or [`TvmError::Parse`] if the link selector
/// cannot be built.
pub async fn fetch_candidates(client: &Client, config: &Config) -> Result<Vec<ReleaseCandidate>> {
    let index = fetch_page(client, &config.releases_url).await?;
    let pages = index_links(&index, &config.releases_url)?;
    debug!(count = pages.len(), url = %config.releases_url, "discovered release pages");

    let platform = config.platform;
    let scanned: Vec<Option<ReleaseCandidate>> = stream::iter(pages)
        .map(move |url| async move {
            let html = fetch_page(client, &url).await?;
            parse_release_page(&html, &url, platform)
        })
        .buffer_unordered(config.max_concurrent_fetches.max(1))
        .try_collect()
        .await?;

    let candidates: Vec<ReleaseCandidate> = scanned.into_iter().flatten().collect();
    debug!(count = candidates.len(), %platform, "collected release candidates");
    Ok(candidates)
}

/// Fetches a page body, failing on any non-success status.
async fn fetch_page(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching catalog page");

    let response = client
        .get(url.clone())
        .timeout(Duration::from_secs(PAGE_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| TvmError::network_with_source(format!("Failed to get {url}"), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TvmError::network(format!("Error getting {url}: {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| TvmError::network_with_source(format!("Failed to read {url}"), e))
}

fn link_selector() -> Result<Selector> {
    Selector::parse(LINK_SELECTOR)
        .map_err(|e| TvmError::parse(format!("invalid link selector '{LINK_SELECTOR}': {e}")))
}

/// Extracts release page links from the index page.
///
/// Only links that resolve beneath the catalog root are kept; the root
/// itself and links leading out of it (such as `../`) are dropped.
///
/// # Errors
///
/// Returns [`TvmError::Parse`] if the link selector cannot be built.
pub fn index_links(html: &str, base: &Url) -> Result<Vec<Url>> {
    let selector = link_selector()?;
    let document = Html::parse_document(html);

    let links = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| base.join(href).ok())
        .filter(|url| url.path().starts_with(base.path()) && url.path() != base.path())
        .collect();

    Ok(links)
}

/// Classifies the links of one release page.
///
/// Returns `None` when the page has no archive for `platform`; such pages
/// never produce a candidate, even if they list checksum files.
///
/// # Errors
///
/// Returns [`TvmError::Parse`] if the link selector cannot be built.
pub fn parse_release_page(
    html: &str,
    page_url: &Url,
    platform: Platform,
) -> Result<Option<ReleaseCandidate>> {
    let selector = link_selector()?;
    let document = Html::parse_document(html);

    let mut archive: Option<(Version, Url)> = None;
    let mut checksum_url = None;
    let mut checksum_signature_url = None;

    for anchor in document.select(&selector) {
        let element = anchor.value();
        let Some(href) = element.attr("href") else {
            continue;
        };
        let Ok(url) = page_url.join(href) else {
            warn!(href, page = %page_url, "skipping unresolvable link");
            continue;
        };

        if href.ends_with(CHECKSUM_SUFFIX) {
            checksum_url = Some(url);
            continue;
        }

        if href.ends_with(SIGNATURE_SUFFIX) {
            checksum_signature_url = Some(url);
            continue;
        }

        let (Some(os), Some(arch), Some(raw_version)) = (
            element.attr("data-os"),
            element.attr("data-arch"),
            element.attr("data-version"),
        ) else {
            continue;
        };

        if !platform.matches(os, arch) {
            continue;
        }

        match parse_version(raw_version) {
            Ok(version) => archive = Some((version, url)),
            Err(e) => debug!(href, error = %e, "skipping archive with unparseable version"),
        }
    }

    Ok(archive.map(|(version, url)| ReleaseCandidate {
        version,
        url,
        checksum_url,
        checksum_signature_url,
    }))
}
