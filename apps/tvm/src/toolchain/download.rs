//! Verified archive download.
//!
//! The archive is streamed to a temporary file in the cache directory while
//! its SHA-256 digest is computed over the same chunks, so the bytes are
//! never read twice. The digest is then checked against the release's
//! `SHA256SUMS` manifest when one is published.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, Url};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use super::catalog::ReleaseCandidate;
use super::checksums::{DIGEST_LEN, find_digest};
use crate::errors::{Result, TvmError};

/// Request timeout for archive downloads in seconds.
const DOWNLOAD_TIMEOUT_SECS: u64 = 300;

/// Request timeout for checksum manifests in seconds.
const MANIFEST_TIMEOUT_SECS: u64 = 30;

/// A downloaded archive held in a temporary file.
///
/// The file is removed when this value is dropped.
#[derive(Debug)]
pub struct DownloadedArchive {
    file: NamedTempFile,
    name: String,
    digest: [u8; DIGEST_LEN],
}

impl DownloadedArchive {
    /// Location of the temporary archive file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Archive file name as published (used for manifest lookup).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// SHA-256 digest of the downloaded bytes.
    #[must_use]
    pub fn digest(&self) -> &[u8; DIGEST_LEN] {
        &self.digest
    }
}

/// Outcome of checksum verification that still allows installation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// The manifest lists the archive and the digests match.
    Verified,
    /// The release publishes no checksum manifest.
    NoManifest,
    /// The manifest does not list the archive.
    NoEntry,
}

impl Verification {
    /// Whether the archive was actually checked against a published digest.
    #[must_use]
    pub fn is_verified(self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Downloads and verifies a release archive.
///
/// # Errors
///
/// Returns an error if the download or manifest request fails, the temporary
/// file cannot be written, or [`TvmError::ChecksumMismatch`] if the published
/// digest differs from the downloaded bytes.
pub async fn fetch_verified(
    client: &Client,
    candidate: &ReleaseCandidate,
    cache_dir: &Path,
) -> Result<(DownloadedArchive, Verification)> {
    let archive = download_archive(client, &candidate.url, candidate.archive_name(), cache_dir).await?;

    let verification = match &candidate.checksum_url {
        None => Verification::NoManifest,
        Some(url) => {
            let manifest = fetch_manifest(client, url).await?;
            check_digest(&manifest, archive.name(), archive.digest())?
        }
    };

    debug!(archive = archive.name(), ?verification, "archive verification finished");
    Ok((archive, verification))
}

/// Streams `url` into a temporary file in `cache_dir`, hashing as it goes.
///
/// # Errors
///
/// Returns [`TvmError::Network`] if the request fails or answers with a
/// non-success status, and [`TvmError::Io`] if the temporary file cannot be
/// created or written.
pub async fn download_archive(
    client: &Client,
    url: &Url,
    name: &str,
    cache_dir: &Path,
) -> Result<DownloadedArchive> {
    info!(%url, "downloading archive");

    let response = client
        .get(url.clone())
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS))
        .send()
        .await
        .map_err(|e| TvmError::network_with_source(format!("Failed to connect to {url}"), e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(TvmError::network(format!("HTTP error {status}: {url}")));
    }

    let temp = tempfile::Builder::new()
        .prefix(&format!("{name}."))
        .suffix(".part")
        .tempfile_in(cache_dir)
        .map_err(|e| TvmError::io_at("create temporary file in", cache_dir, e))?;

    let handle = temp
        .reopen()
        .map_err(|e| TvmError::io_at("open", temp.path(), e))?;
    let mut file = tokio::fs::File::from_std(handle);

    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk
            .map_err(|e| TvmError::network_with_source(format!("Failed to read chunk from {url}"), e))?;
        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .map_err(|e| TvmError::io_at("write to", temp.path(), e))?;
        downloaded += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| TvmError::io_at("flush", temp.path(), e))?;
    drop(file);

    debug!(bytes = downloaded, path = %temp.path().display(), "archive downloaded");

    Ok(DownloadedArchive {
        file: temp,
        name: name.to_string(),
        digest: hasher.finalize().into(),
    })
}

/// Fetches the checksum manifest body.
async fn fetch_manifest(client: &Client, url: &Url) -> Result<String> {
    debug!(%url, "fetching checksum manifest");

    let response = client
        .get(url.clone())
        .timeout(Duration::from_secs(MANIFEST_TIMEOUT_SECS))
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

/// Compares a computed digest with the manifest record for `filename`.
///
/// # Errors
///
/// Returns [`TvmError::ChecksumMismatch`] if the manifest lists `filename`
/// with a different digest.
pub fn check_digest(
    manifest: &str,
    filename: &str,
    actual: &[u8; DIGEST_LEN],
) -> Result<Verification> {
    let Some(expected) = find_digest(manifest, filename) else {
        return Ok(Verification::NoEntry);
    };

    if &expected != actual {
        return Err(TvmError::checksum_mismatch(
            filename,
            hex::encode(expected),
            hex::encode(actual),
        ));
    }

    Ok(Verification::Verified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::constraint::parse_version;
    use httpmock::prelude::*;

    const NAME: &str = "terraform_1.0.0_linux_amd64.zip";

    fn sha256(bytes: &[u8]) -> [u8; DIGEST_LEN] {
        Sha256::digest(bytes).into()
    }

    fn manifest_for(bytes: &[u8]) -> String {
        format!(
            "{}  terraform_1.0.0_darwin_arm64.zip\n{}  {NAME}\n",
            "0".repeat(64),
            hex::encode(sha256(bytes))
        )
    }

    #[test]
    fn check_digest_accepts_true_digest() {
        let bytes = b"archive bytes";
        let result = check_digest(&manifest_for(bytes), NAME, &sha256(bytes)).unwrap();
        assert_eq!(result, Verification::Verified);
        assert!(result.is_verified());
    }

    #[test]
    fn check_digest_rejects_any_flipped_byte() {
        let bytes = b"archive bytes".to_vec();
        let manifest = manifest_for(&bytes);
        for i in 0..bytes.len() {
            let mut tampered = bytes.clone();
            tampered[i] ^= 0x01;
            let err = check_digest(&manifest, NAME, &sha256(&tampered)).unwrap_err();
            assert!(matches!(err, TvmError::ChecksumMismatch { .. }));
        }
    }

    #[test]
    fn check_digest_missing_entry_is_soft() {
        let manifest = format!("{}  other.zip\n", "0".repeat(64));
        let result = check_digest(&manifest, NAME, &sha256(b"x")).unwrap();
        assert_eq!(result, Verification::NoEntry);
        assert!(!result.is_verified());
    }

    fn candidate(server: &MockServer, with_manifest: bool) -> ReleaseCandidate {
        ReleaseCandidate {
            version: parse_version("1.0.0").unwrap(),
            url: Url::parse(&server.url(format!("/terraform/1.0.0/{NAME}"))).unwrap(),
            checksum_url: with_manifest.then(|| {
                Url::parse(&server.url("/terraform/1.0.0/terraform_1.0.0_SHA256SUMS")).unwrap()
            }),
            checksum_signature_url: None,
        }
    }

    async fn serve(server: &MockServer, archive: &[u8], manifest: &str) {
        let archive = archive.to_vec();
        let manifest = manifest.to_string();
        server
            .mock_async(move |when, then| {
                when.method(GET).path(format!("/terraform/1.0.0/{NAME}"));
                then.status(200).body(archive);
            })
            .await;
        server
            .mock_async(move |when, then| {
                when.method(GET).path("/terraform/1.0.0/terraform_1.0.0_SHA256SUMS");
                then.status(200).body(manifest);
            })
            .await;
    }

    #[tokio::test]
    async fn fetch_verified_streams_and_verifies() {
        let server = MockServer::start_async().await;
        let bytes = vec![7u8; 64 * 1024];
        serve(&server, &bytes, &manifest_for(&bytes)).await;

        let cache = tempfile::tempdir().unwrap();
        let client = crate::toolchain::catalog::http_client().unwrap();
        let (archive, verification) =
            fetch_verified(&client, &candidate(&server, true), cache.path())
                .await
                .unwrap();

        assert_eq!(verification, Verification::Verified);
        assert_eq!(archive.name(), NAME);
        assert_eq!(archive.digest(), &sha256(&bytes));
        assert_eq!(std::fs::read(archive.path()).unwrap(), bytes);

        let path = archive.path().to_path_buf();
        drop(archive);
        assert!(!path.exists(), "temporary archive should be removed on drop");
    }

    #[tokio::test]
    async fn fetch_verified_rejects_tampered_archive() {
        let server = MockServer::start_async().await;
        let published = b"the real archive".to_vec();
        let mut served = published.clone();
        served[0] ^= 0xff;
        serve(&server, &served, &manifest_for(&published)).await;

        let cache = tempfile::tempdir().unwrap();
        let client = crate::toolchain::catalog::http_client().unwrap();
        let err = fetch_verified(&client, &candidate(&server, true), cache.path())
            .await
            .unwrap_err();

        assert!(matches!(err, TvmError::ChecksumMismatch { .. }));
        assert_eq!(
            std::fs::read_dir(cache.path()).unwrap().count(),
            0,
            "temporary archive should not outlive a failed verification"
        );
    }

    #[tokio::test]
    async fn fetch_verified_without_manifest_is_soft() {
        let server = MockServer::start_async().await;
        serve(&server, b"bytes", "").await;

        let cache = tempfile::tempdir().unwrap();
        let client = crate::toolchain::catalog::http_client().unwrap();
        let (_archive, verification) =
            fetch_verified(&client, &candidate(&server, false), cache.path())
                .await
                .unwrap();

        assert_eq!(verification, Verification::NoManifest);
    }

    #[tokio::test]
    async fn download_fails_on_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing.zip");
                then.status(404);
            })
            .await;

        let cache = tempfile::tempdir().unwrap();
        let client = crate::toolchain::catalog::http_client().unwrap();
        let url = Url::parse(&server.url("/missing.zip")).unwrap();
        let err = download_archive(&client, &url, "missing.zip", cache.path())
            .await
            .unwrap_err();

        assert!(matches!(err, TvmError::Network { .. }));
        assert!(err.to_string().contains("404"));
    }
}
