#![warn(clippy::pedantic)]

//! # Terraform Version Manager (tvm)
//!
//! `tvm` installs the Terraform release a project asks for and runs it.
//! The wanted version comes from the `required_version` constraint in the
//! project's `*.tf` files (or `TVM_REQUIRED_VERSION`).
//!
//! ## Subcommands
//!
//! - `list` - List every release published for this platform
//! - `install` - Install the newest release matching the constraint
//! - `exec` - Run the newest installed release matching the constraint
//!
//! ## Shim Mode
//!
//! When the executable is invoked as `terraform` (for example through a
//! symlink or copy on `PATH`), every argument is forwarded to the matching
//! installed release as if `tvm exec` had been run.
//!
//! ## Examples
//!
//! ```bash
//! tvm install
//! tvm exec plan
//! ln -s "$(command -v tvm)" ~/.local/bin/terraform && terraform plan
//! ```

mod commands;
mod config;
mod errors;
mod project;
mod toolchain;

use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{exec, install, list};
use config::Config;
use errors::TvmError;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "TVM_LOG";

/// Terraform version manager.
#[derive(Parser)]
#[command(
    name = "tvm",
    author,
    version,
    about = "Installs and runs the Terraform version a project requires",
    arg_required_else_help = true,
    after_help = "\
SHIM MODE:
    Invoked under the name 'terraform', tvm behaves like 'tvm exec' and
    forwards all arguments to the matching installed version.

ENVIRONMENT VARIABLES:
    TVM_REQUIRED_VERSION    Constraint overriding the project's required_version
    TVM_RELEASES_URL        Release catalog (default: https://releases.hashicorp.com/terraform/)
    TVM_DATA_DIR            Install root parent (default: platform data dir + /tvm)
    TVM_CACHE_DIR           Download cache (default: platform cache dir + /tvm)
    TVM_LOG                 Log filter for stderr diagnostics (default: warn)"
)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the tvm CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// List available Terraform versions.
    ///
    /// Scrapes the release catalog and prints every version published for
    /// this platform, oldest first.
    List,

    /// Install the newest Terraform version matching the project constraint.
    ///
    /// Downloads the release archive, verifies its SHA-256 checksum and
    /// installs the binary. Does nothing if that version is already
    /// installed.
    Install,

    /// Run the newest installed Terraform version matching the constraint.
    ///
    /// All arguments after `exec` are forwarded unchanged.
    Exec(exec::ExecArgs),
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Sends diagnostics to stderr, filtered by `TVM_LOG` (default `warn`).
///
/// Stdout is left to command output and the delegated tool.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Handles an error and returns the appropriate exit code.
///
/// For `ProcessExitCode` errors, returns the embedded exit code without
/// printing an error message (the delegated process already printed its
/// output). For all other errors, prints the error and returns exit code 1.
fn handle_error(e: &anyhow::Error) -> i32 {
    if let Some(TvmError::ProcessExitCode { code }) = e.downcast_ref::<TvmError>() {
        return *code;
    }
    eprintln!("Error: {e:?}");
    1
}

async fn run() -> Result<()> {
    let mut argv = std::env::args_os();
    let argv0 = argv.next().map(PathBuf::from).unwrap_or_default();

    let config = Config::from_env()?;
    let project_dir = current_dir()?;

    if config.is_tool_invocation(&argv0) {
        let forwarded: Vec<OsString> = argv.collect();
        return exec::execute(&config, &project_dir, &forwarded);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::List => list::execute(&config).await,
        Commands::Install => install::execute(&config, &project_dir).await,
        Commands::Exec(args) => exec::execute(&config, &project_dir, &args.args),
    }
}

fn current_dir() -> Result<PathBuf> {
    std::env::current_dir().context("Failed to determine current directory")
}
