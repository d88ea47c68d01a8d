//! Error types for the tvm CLI.
//!
//! Every operation in the resolve, fetch, verify, install and exec pipeline
//! returns a [`TvmError`] on failure. Only the command layer decides whether a
//! failure is reported and the process exits, or whether it is a soft outcome
//! (for example, no version satisfying the constraint).

use thiserror::Error;

/// Convenience alias used by the toolchain modules.
pub type Result<T, E = TvmError> = std::result::Result<T, E>;

/// Consolidated error type for tvm operations.
#[derive(Debug, Error)]
pub enum TvmError {
    /// A request failed or the server answered with a non-success status.
    #[error("network error: {message}")]
    Network {
        /// Description of the failed request.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Malformed version, constraint, checksum record or directory name.
    #[error("parse error: {message}")]
    Parse {
        /// Description of what could not be parsed.
        message: String,
    },

    /// The downloaded archive does not match its published digest.
    #[error("checksum mismatch for {filename}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Archive file name as listed in the checksum manifest.
        filename: String,
        /// Digest published in the manifest.
        expected: String,
        /// Digest computed over the downloaded bytes.
        actual: String,
    },

    /// Something required was not present (archive entry, binary, version).
    #[error("not found: {message}")]
    NotFound {
        /// Description of what is missing.
        message: String,
    },

    /// Filesystem or process-level I/O failure.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// No release is published for this OS/architecture pair.
    #[error("unsupported platform: {os} on {arch}")]
    UnsupportedPlatform {
        /// Operating system reported by the standard library.
        os: String,
        /// Architecture reported by the standard library.
        arch: String,
    },

    /// A delegated process exited with a non-zero code.
    ///
    /// The code is forwarded as the exit status of tvm without printing an
    /// additional message; the child already reported its own failure.
    #[error("process exited with code {code}")]
    ProcessExitCode {
        /// The exit code from the child process.
        code: i32,
    },
}

impl TvmError {
    /// Creates a new `Network` error without an underlying source.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new `Network` error wrapping a source error.
    #[must_use]
    pub fn network_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a new `Parse` error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Creates a new `ChecksumMismatch` error.
    #[must_use]
    pub fn checksum_mismatch(
        filename: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::ChecksumMismatch {
            filename: filename.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a new `Io` error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Creates a new `Io` error describing a failed operation on a path.
    #[must_use]
    pub fn io_at(action: &str, path: &std::path::Path, source: std::io::Error) -> Self {
        Self::io(format!("Failed to {action} {}", path.display()), source)
    }

    /// Creates a new `UnsupportedPlatform` error.
    #[must_use]
    pub fn unsupported_platform(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self::UnsupportedPlatform {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Creates a new `ProcessExitCode` error.
    #[must_use]
    pub const fn process_exit_code(code: i32) -> Self {
        Self::ProcessExitCode { code }
    }
}
