//! Install command for the tvm CLI.
//!
//! Installs the newest published release that satisfies the project's
//! constraint. The version is never given on the command line; it always
//! comes from the project (see [`crate::project`]).
//!
//! ```bash
//! tvm install
//! ```

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::config::Config;
use crate::project::load_constraint;
use crate::toolchain::{
    Verification, Version, fetch_candidates, fetch_verified, http_client, install_archive,
    is_installed, select,
};

/// What an install attempt ended with.
#[derive(Debug, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The version was downloaded and installed.
    Installed {
        version: Version,
        binary: PathBuf,
        verification: Verification,
    },
    /// The selected version was already in place; nothing was downloaded.
    AlreadyInstalled(Version),
    /// No published release satisfies the constraint.
    NoMatch,
}

/// Executes the install command for the project in `project_dir`.
///
/// # Process
///
/// 1. Create the data and cache directories
/// 2. Read the project constraint
/// 3. Scrape the release catalog
/// 4. Select the newest matching release
/// 5. Download and verify the archive
/// 6. Stage the binary and move it into place
///
/// # Errors
///
/// Returns an error if:
/// - The constraint is malformed
/// - The catalog or archive cannot be fetched
/// - The archive digest does not match the published checksum
/// - Extraction or placement fails
pub async fn execute(config: &Config, project_dir: &Path) -> Result<()> {
    let outcome = install_matching(config, project_dir, |version, verification| {
        if !verification.is_verified() {
            println!("No checksum found");
        }
        println!("Installing {} version {version}...", config.display_name);
    })
    .await?;

    match outcome {
        InstallOutcome::Installed {
            version,
            binary,
            verification,
        } => {
            debug!(path = %binary.display(), ?verification, "install finished");
            println!("Successfully installed {} version {version}", config.display_name);
        }
        InstallOutcome::AlreadyInstalled(version) => {
            println!("{} version {version} is already installed", config.display_name);
        }
        InstallOutcome::NoMatch => {
            println!(
                "None of the available {} versions matched the constraints",
                config.display_name
            );
        }
    }

    Ok(())
}

/// Runs the install pipeline without printing the final outcome.
///
/// `on_verified` is called once the archive has been downloaded and checked,
/// just before it is installed.
///
/// # Errors
///
/// See [`execute`].
pub async fn install_matching<F>(
    config: &Config,
    project_dir: &Path,
    on_verified: F,
) -> Result<InstallOutcome>
where
    F: FnOnce(&Version, Verification),
{
    config.ensure_directories()?;
    let constraint = load_constraint(project_dir)?;
    debug!(%constraint, unconstrained = constraint.is_any(), "resolved project constraint");

    let client = http_client()?;
    let candidates = fetch_candidates(&client, config).await?;

    let Some(candidate) = select(&candidates, &constraint) else {
        return Ok(InstallOutcome::NoMatch);
    };

    if is_installed(config, &candidate.version) {
        return Ok(InstallOutcome::AlreadyInstalled(candidate.version.clone()));
    }

    if let Some(signature) = &candidate.checksum_signature_url {
        debug!(%signature, "checksum signature published; signatures are not checked");
    }

    let (archive, verification) = fetch_verified(&client, candidate, &config.cache_dir).await?;
    on_verified(&candidate.version, verification);

    let binary = install_archive(config, archive.path(), &candidate.version)?;

    Ok(InstallOutcome::Installed {
        version: candidate.version.clone(),
        binary,
        verification,
    })
}
