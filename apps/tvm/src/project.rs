//! Discovery of the project's declared version constraint.
//!
//! The constraint comes from `TVM_REQUIRED_VERSION` when set. Otherwise the
//! `*.tf` files of the working directory are scanned for
//! `required_version = "..."` declarations. Several declarations must all
//! hold, so they are joined into one comma-separated constraint.

use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::errors::{Result, TvmError};
use crate::toolchain::Constraint;

/// Environment variable holding an explicit constraint.
pub const REQUIRED_VERSION_ENV: &str = "TVM_REQUIRED_VERSION";

/// Extension of Terraform configuration files.
const CONFIG_EXTENSION: &str = "tf";

/// Matches an uncommented `required_version = "<expr>"` attribute.
const REQUIRED_VERSION_PATTERN: &str = r#"(?m)^\s*required_version\s*=\s*"([^"]*)""#;

/// Returns the active constraint for the project rooted at `dir`.
///
/// No declaration anywhere yields [`Constraint::any`].
///
/// # Errors
///
/// Returns [`TvmError::Io`] if a configuration file cannot be read and
/// [`TvmError::Parse`] if the declared constraint is malformed.
pub fn load_constraint(dir: &Path) -> Result<Constraint> {
    if let Some(raw) = std::env::var(REQUIRED_VERSION_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
    {
        debug!(constraint = %raw, "using constraint from {REQUIRED_VERSION_ENV}");
        return Constraint::parse(&raw);
    }

    let declared = declared_constraints(dir)?;
    if declared.is_empty() {
        return Ok(Constraint::any());
    }

    let combined = declared.join(", ");
    debug!(constraint = %combined, dir = %dir.display(), "using constraint from project files");
    Constraint::parse(&combined)
}

/// Collects every non-empty `required_version` value from the `*.tf` files
/// directly inside `dir`, in file name order.
///
/// # Errors
///
/// Returns [`TvmError::Io`] if the directory or a matching file cannot be read.
pub fn declared_constraints(dir: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| TvmError::io_at("read", dir, e))? {
        let path = entry.map_err(|e| TvmError::io_at("read", dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == CONFIG_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();

    let pattern = Regex::new(REQUIRED_VERSION_PATTERN)
        .map_err(|e| TvmError::parse(format!("invalid required_version pattern: {e}")))?;

    let mut declared = Vec::new();
    for file in &files {
        let text = std::fs::read_to_string(file).map_err(|e| TvmError::io_at("read", file, e))?;
        declared.extend(
            pattern
                .captures_iter(&text)
                .map(|caps| caps[1].trim().to_string())
                .filter(|value| !value.is_empty()),
        );
    }

    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::constraint::parse_version;
    use serial_test::serial;

    fn clear_env() {
        // SAFETY: callers are serialized with other environment-mutating tests.
        unsafe { std::env::remove_var(REQUIRED_VERSION_ENV) };
    }

    #[test]
    fn finds_declaration_in_terraform_block() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(
            temp.path().join("versions.tf"),
            "terraform {\n  required_version = \">= 0.13.0\"\n}\n",
        )
        .unwrap();

        assert_eq!(declared_constraints(temp.path()).unwrap(), vec![">= 0.13.0"]);
    }

    #[test]
    fn ignores_other_files_and_comments() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("notes.txt"), "required_version = \"1.0.0\"\n").unwrap();
        std::fs::write(
            temp.path().join("main.tf"),
            "# required_version = \"0.1.0\"\nresource \"null_resource\" \"x\" {}\n",
        )
        .unwrap();

        assert!(declared_constraints(temp.path()).unwrap().is_empty());
    }

    #[test]
    #[serial]
    fn joins_multiple_declarations() {
        clear_env();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("a.tf"), "required_version = \">= 0.13.0\"\n").unwrap();
        std::fs::write(temp.path().join("b.tf"), "required_version = \"< 1.0.0\"\n").unwrap();

        let constraint = load_constraint(temp.path()).unwrap();
        assert_eq!(constraint.to_string(), ">= 0.13.0, < 1.0.0");
        assert!(constraint.matches(&parse_version("0.13.5").unwrap()));
        assert!(!constraint.matches(&parse_version("1.0.0").unwrap()));
    }

    #[test]
    #[serial]
    fn no_declaration_accepts_any() {
        clear_env();
        let temp = tempfile::tempdir().unwrap();

        assert!(load_constraint(temp.path()).unwrap().is_any());
    }

    #[test]
    #[serial]
    fn environment_overrides_files() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("main.tf"), "required_version = \"0.12.0\"\n").unwrap();

        // SAFETY: serialized with other environment-mutating tests.
        unsafe { std::env::set_var(REQUIRED_VERSION_ENV, "~> 1.2") };
        let result = load_constraint(temp.path());
        clear_env();

        let constraint = result.unwrap();
        assert!(constraint.matches(&parse_version("1.5.0").unwrap()));
        assert!(!constraint.matches(&parse_version("0.12.0").unwrap()));
    }

    #[test]
    #[serial]
    fn malformed_declaration_is_an_error() {
        clear_env();
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("main.tf"), "required_version = \">= banana\"\n").unwrap();

        let err = load_constraint(temp.path()).unwrap_err();
        assert!(matches!(err, TvmError::Parse { .. }));
    }
}
