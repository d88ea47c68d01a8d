//! Enumeration of locally installed versions.
//!
//! Every entry directly under the install root must be named by a strict
//! semantic version. Anything else means the root has been tampered with,
//! and the scan fails rather than guessing.

use std::path::{Path, PathBuf};

use super::constraint::{Version, parse_version};
use super::select::Versioned;
use crate::errors::{Result, TvmError};

/// A version directory found under the install root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    /// Version parsed from the directory name.
    pub version: Version,
    /// The version's install directory.
    pub dir: PathBuf,
}

impl Versioned for InstalledVersion {
    fn version(&self) -> &Version {
        &self.version
    }
}

/// Lists installed versions in directory order.
///
/// A missing install root counts as empty.
///
/// # Errors
///
/// Returns [`TvmError::Parse`] naming the first entry whose name is not a
/// valid version, and [`TvmError::Io`] if the directory cannot be read.
pub fn scan(versions_dir: &Path) -> Result<Vec<InstalledVersion>> {
    let entries = match std::fs::read_dir(versions_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(TvmError::io_at("read", versions_dir, e)),
    };

    let mut installed = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TvmError::io_at("read", versions_dir, e))?;
        let name = entry.file_name();
        let name = name.to_str().ok_or_else(|| {
            TvmError::parse(format!(
                "invalid entry in {}: {}",
                versions_dir.display(),
                name.to_string_lossy()
            ))
        })?;

        let version = parse_version(name).map_err(|e| {
            TvmError::parse(format!(
                "invalid entry '{name}' in {}: {e}",
                versions_dir.display()
            ))
        })?;

        installed.push(InstalledVersion {
            version,
            dir: entry.path(),
        });
    }

    Ok(installed)
}
