//! Exec command for the tvm CLI.
//!
//! Runs the newest installed Terraform that satisfies the project
//! constraint, forwarding every argument untouched. This is also what runs
//! when tvm is invoked under the tool's own name (shim mode).
//!
//! ```bash
//! tvm exec plan -out=tfplan
//! terraform plan -out=tfplan   # tvm installed on PATH as `terraform`
//! ```

use std::ffi::OsString;
use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::config::Config;
use crate::project::load_constraint;
use crate::toolchain::{exec, resolve, scan};

/// Arguments for the exec command.
#[derive(Args)]
pub struct ExecArgs {
    /// Arguments forwarded to the delegated binary.
    #[clap(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<OsString>,
}

/// Executes the exec command.
///
/// On Unix a successful delegation replaces this process and never returns.
/// Returning `Ok` means no installed version could be run, which is reported
/// but is not a failure.
///
/// # Errors
///
/// Returns an error if:
/// - An entry in the install root is not a version
/// - The constraint is malformed
/// - The selected binary cannot be executed
/// - The delegated process exits with a non-zero code (non-Unix only)
pub fn execute(config: &Config, project_dir: &Path, args: &[OsString]) -> Result<()> {
    let installed = scan(&config.versions_dir)?;
    let constraint = load_constraint(project_dir)?;
    let resolution = resolve(config, &installed, &constraint);

    for missing in &resolution.missing {
        eprintln!(
            "Warning: Found {name} version {} but {name} binary is missing",
            missing.version,
            name = config.display_name
        );
    }

    let Some(selected) = resolution.selected else {
        println!(
            "None of the installed {} versions matched the constraints",
            config.display_name
        );
        return Ok(());
    };

    match exec(&selected.path, &config.tool_name, args)? {}
}
