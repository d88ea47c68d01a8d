//! Parser for `SHA256SUMS` checksum manifests.
//!
//! A manifest holds one record per line:
//!
//! ```text
//! <64 hex characters>  <file name>
//! ```
//!
//! Parsing is independent of where the text came from; the fetcher hands the
//! downloaded body to [`find_digest`].

use tracing::warn;

use crate::errors::{Result, TvmError};

/// Length in bytes of a SHA-256 digest.
pub const DIGEST_LEN: usize = 32;

/// Length of a hex-encoded SHA-256 digest.
const HEX_DIGEST_LEN: usize = DIGEST_LEN * 2;

/// Separator between digest and file name.
const SEPARATOR: &str = "  ";

/// One `(digest, filename)` record of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumRecord {
    /// Raw SHA-256 digest.
    pub digest: [u8; DIGEST_LEN],
    /// File name the digest belongs to.
    pub filename: String,
}

impl ChecksumRecord {
    /// Parses a single manifest line.
    ///
    /// # Errors
    ///
    /// Returns [`TvmError::Parse`] if the line is not `<hex digest>  <filename>`.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);

        let (hex_digest, rest) = match (line.get(..HEX_DIGEST_LEN), line.get(HEX_DIGEST_LEN..)) {
            (Some(digest), Some(rest)) => (digest, rest),
            _ => {
                return Err(TvmError::parse(format!(
                    "checksum record too short: '{line}'"
                )));
            }
        };

        let mut digest = [0u8; DIGEST_LEN];
        hex::decode_to_slice(hex_digest, &mut digest).map_err(|e| {
            TvmError::parse(format!("invalid digest in checksum record '{line}': {e}"))
        })?;

        let filename = rest
            .strip_prefix(SEPARATOR)
            .map(str::trim_end)
            .filter(|name| !name.is_empty() && !name.starts_with(char::is_whitespace))
            .ok_or_else(|| {
                TvmError::parse(format!("missing file name in checksum record '{line}'"))
            })?;

        Ok(Self {
            digest,
            filename: filename.to_string(),
        })
    }
}

/// Parses every non-blank line of a manifest, in order.
///
/// Each item carries its 1-based line number so malformed records can be
/// reported precisely.
pub fn records(text: &str) -> impl Iterator<Item = (usize, Result<ChecksumRecord>)> + '_ {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| (index + 1, ChecksumRecord::parse(line)))
}

/// Scans a manifest for the record of `filename`.
///
/// Malformed records are reported and skipped. Scanning stops at the first
/// record for `filename`. Returns `None` if no such record exists.
#[must_use]
pub fn find_digest(text: &str, filename: &str) -> Option<[u8; DIGEST_LEN]> {
    for (line_number, record) in records(text) {
        match record {
            Ok(record) if record.filename == filename => return Some(record.digest),
            Ok(_) => {}
            Err(e) => warn!(line = line_number, error = %e, "skipping malformed checksum record"),
        }
    }
    None
}
