//! Delegation to an installed binary.
//!
//! [`resolve`] picks the binary to run from the installed versions and
//! [`exec`] hands the process over to it. On Unix the current process image
//! is replaced, so a successful [`exec`] never returns.

use std::convert::Infallible;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use super::constraint::{Constraint, Version};
use super::installed::InstalledVersion;
use super::select::matching;
use crate::config::Config;
use crate::errors::{Result, TvmError};

/// A binary belonging to an installed version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledBinary {
    pub version: Version,
    pub path: PathBuf,
}

/// Outcome of choosing an installed binary.
#[derive(Debug, Default)]
pub struct Resolution {
    /// Newest matching version whose binary exists.
    pub selected: Option<InstalledBinary>,
    /// Newer matching versions skipped because their binary is missing,
    /// newest first.
    pub missing: Vec<InstalledBinary>,
}

/// Chooses the newest installed version that satisfies `constraint` and
/// actually has its binary on disk.
///
/// Matching versions are tried newest first. A version whose directory lacks
/// the binary is recorded in [`Resolution::missing`] and the next one is
/// tried.
#[must_use]
pub fn resolve(config: &Config, installed: &[InstalledVersion], constraint: &Constraint) -> Resolution {
    let mut resolution = Resolution::default();

    for candidate in matching(installed, constraint) {
        let binary = InstalledBinary {
            version: candidate.version.clone(),
            path: candidate.dir.join(&config.binary_name),
        };
        if binary.path.is_file() {
            debug!(version = %binary.version, path = %binary.path.display(), "selected installed binary");
            resolution.selected = Some(binary);
            break;
        }
        debug!(version = %binary.version, "installed version has no binary");
        resolution.missing.push(binary);
    }

    resolution
}

/// Replaces the current process with `binary`.
///
/// The child sees `tool_name` as `argv[0]`, followed by `args` unchanged, and
/// inherits the environment.
///
/// # Errors
///
/// Returns [`TvmError::Io`] if the binary cannot be executed.
#[cfg(unix)]
pub fn exec(binary: &Path, tool_name: &str, args: &[OsString]) -> Result<Infallible> {
    use std::os::unix::process::CommandExt;

    debug!(path = %binary.display(), args = args.len(), "replacing process");
    let err = Command::new(binary).arg0(tool_name).args(args).exec();
    Err(TvmError::io_at("execute", binary, err))
}

/// Runs `binary` to completion and forwards its exit status.
///
/// Process image replacement is not available here, so the child is spawned
/// and waited on. The exit code always comes back as
/// [`TvmError::ProcessExitCode`] for `main` to forward.
///
/// # Errors
///
/// Returns [`TvmError::Io`] if the binary cannot be started, otherwise
/// [`TvmError::ProcessExitCode`] carrying the child's exit code.
#[cfg(not(unix))]
pub fn exec(binary: &Path, _tool_name: &str, args: &[OsString]) -> Result<Infallible> {
    debug!(path = %binary.display(), args = args.len(), "spawning delegated process");
    let status = Command::new(binary)
        .args(args)
        .status()
        .map_err(|e| TvmError::io_at("execute", binary, e))?;
    Err(TvmError::process_exit_code(status.code().unwrap_or(1)))
}
