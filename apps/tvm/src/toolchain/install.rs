//! Installation of a downloaded release archive.
//!
//! Only the tool binary is extracted. It is written into a private staging
//! directory next to the install root, made executable, and the staging
//! directory is then renamed to `<versions>/<version>`. The rename is the
//! only step that makes a version visible, so an interrupted install never
//! leaves a directory that looks installed.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::ZipArchive;
use zip::result::ZipError;

use super::constraint::Version;
use crate::config::Config;
use crate::errors::{Result, TvmError};

/// Mode applied to the installed binary and its version directory.
#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Whether `version` already has its binary in place.
#[must_use]
pub fn is_installed(config: &Config, version: &Version) -> bool {
    config.binary_path(&version.to_string()).is_file()
}

/// Installs the tool binary from `archive_path` as `version`.
///
/// Returns the path of the installed binary.
///
/// # Errors
///
/// Returns [`TvmError::NotFound`] if the archive has no entry named after the
/// tool binary, [`TvmError::Parse`] if the archive is not a valid zip, and
/// [`TvmError::Io`] for any filesystem failure. On error nothing is left in
/// the install root.
pub fn install_archive(config: &Config, archive_path: &Path, version: &Version) -> Result<PathBuf> {
    let version_name = version.to_string();
    let final_dir = config.version_dir(&version_name);

    std::fs::create_dir_all(&config.staging_dir)
        .map_err(|e| TvmError::io_at("create directory", &config.staging_dir, e))?;
    std::fs::create_dir_all(&config.versions_dir)
        .map_err(|e| TvmError::io_at("create directory", &config.versions_dir, e))?;

    let staging = tempfile::Builder::new()
        .prefix(&format!("{version_name}."))
        .tempdir_in(&config.staging_dir)
        .map_err(|e| TvmError::io_at("create staging directory in", &config.staging_dir, e))?;

    let staged_binary = staging.path().join(&config.binary_name);
    extract_binary(archive_path, &config.binary_name, &staged_binary)?;
    set_executable(&staged_binary)?;
    set_executable(staging.path())?;

    if final_dir.exists() {
        // Only reachable for directories without a binary; see `is_installed`.
        warn!(path = %final_dir.display(), "replacing incomplete install directory");
        std::fs::remove_dir_all(&final_dir)
            .map_err(|e| TvmError::io_at("remove incomplete directory", &final_dir, e))?;
    }

    std::fs::rename(staging.path(), &final_dir).map_err(|e| {
        TvmError::io(
            format!(
                "Failed to move {} into place at {}",
                staging.path().display(),
                final_dir.display()
            ),
            e,
        )
    })?;
    // The directory now lives at `final_dir`; disarm the cleanup guard.
    let _ = staging.keep();

    let installed = final_dir.join(&config.binary_name);
    debug!(path = %installed.display(), "installed binary");
    Ok(installed)
}

/// Copies the archive entry named `entry_name` to `dest`.
///
/// # Errors
///
/// Returns an error if the archive cannot be read, the entry is absent, or
/// `dest` cannot be written.
pub fn extract_binary(archive_path: &Path, entry_name: &str, dest: &Path) -> Result<()> {
    let file = File::open(archive_path).map_err(|e| TvmError::io_at("open archive", archive_path, e))?;

    let mut archive = ZipArchive::new(file).map_err(|e| zip_error(e, archive_path))?;

    let mut entry = archive.by_name(entry_name).map_err(|e| match e {
        ZipError::FileNotFound => TvmError::not_found(format!(
            "archive {} has no entry named '{entry_name}'",
            archive_path.display()
        )),
        other => zip_error(other, archive_path),
    })?;

    let mut out = File::create(dest).map_err(|e| TvmError::io_at("create", dest, e))?;
    std::io::copy(&mut entry, &mut out).map_err(|e| TvmError::io_at("extract to", dest, e))?;
    out.sync_all().map_err(|e| TvmError::io_at("sync", dest, e))?;

    Ok(())
}

fn zip_error(error: ZipError, archive_path: &Path) -> TvmError {
    match error {
        ZipError::Io(e) => TvmError::io_at("read archive", archive_path, e),
        other => TvmError::parse(format!(
            "invalid zip archive {}: {other}",
            archive_path.display()
        )),
    }
}

/// Sets mode 0755 on `path` (no-op on non-Unix hosts).
#[cfg(unix)]
fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::set_permissions(path, std::fs::Permissions::from_mode(EXECUTABLE_MODE))
        .map_err(|e| TvmError::io_at("set permissions on", path, e))
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}
