//! Platform detection for release selection.
//!
//! The release catalog tags every download link with `data-os` and
//! `data-arch` attributes using Go-style names (`linux`/`darwin`,
//! `amd64`/`arm64`, ...). This module maps the host reported by
//! [`std::env::consts`] onto those names.

use std::fmt;

use crate::errors::{Result, TvmError};

/// The OS/architecture pair of the running host, in catalog naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    os: &'static str,
    arch: &'static str,
}

impl Platform {
    /// Creates a platform from catalog names directly.
    #[must_use]
    pub const fn new(os: &'static str, arch: &'static str) -> Self {
        Self { os, arch }
    }

    /// Detects the current platform.
    ///
    /// # Errors
    ///
    /// Returns [`TvmError::UnsupportedPlatform`] when the host OS or
    /// architecture has no catalog equivalent.
    pub fn detect() -> Result<Self> {
        Self::from_consts(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Maps Rust target names onto catalog names.
    ///
    /// # Errors
    ///
    /// Returns [`TvmError::UnsupportedPlatform`] for unknown names.
    pub fn from_consts(os: &str, arch: &str) -> Result<Self> {
        let catalog_os = match os {
            "linux" => "linux",
            "macos" => "darwin",
            "windows" => "windows",
            "freebsd" => "freebsd",
            "openbsd" => "openbsd",
            "solaris" => "solaris",
            _ => return Err(TvmError::unsupported_platform(os, arch)),
        };

        let catalog_arch = match arch {
            "x86_64" => "amd64",
            "aarch64" => "arm64",
            "x86" => "386",
            "arm" => "arm",
            _ => return Err(TvmError::unsupported_platform(os, arch)),
        };

        Ok(Self::new(catalog_os, catalog_arch))
    }

    /// Catalog name of the operating system (`data-os`).
    #[must_use]
    pub const fn os(self) -> &'static str {
        self.os
    }

    /// Catalog name of the architecture (`data-arch`).
    #[must_use]
    pub const fn arch(self) -> &'static str {
        self.arch
    }

    /// Returns `.exe` on Windows, empty string elsewhere.
    #[must_use]
    pub fn executable_extension(self) -> &'static str {
        if self.os() == "windows" { ".exe" } else { "" }
    }

    /// Whether a link's `data-os`/`data-arch` attributes describe this platform.
    #[must_use]
    pub fn matches(self, os: &str, arch: &str) -> bool {
        self.os() == os && self.arch() == arch
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os(), self.arch())
    }
}
