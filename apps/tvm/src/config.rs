//! Runtime configuration for tvm.
//!
//! A single [`Config`] is built in `main` and handed to every component by
//! reference. Defaults can be overridden through environment variables, which
//! is also how the integration tests isolate themselves from the user's data.
//!
//! ## Directory Structure
//!
//! ```text
//! ~/.local/share/tvm/          # data_dir (or TVM_DATA_DIR)
//!   versions/                  # install root, one entry per installed version
//!     0.13.0/
//!       terraform
//!     1.0.0/
//!       terraform
//!   staging/                   # in-progress installs, renamed into versions/
//! ~/.cache/tvm/                # cache_dir (or TVM_CACHE_DIR), transient archives
//! ```

use std::path::{Path, PathBuf};

use reqwest::Url;

use crate::errors::{Result, TvmError};
use crate::toolchain::Platform;

/// Environment variable overriding the release catalog root.
pub const RELEASES_URL_ENV: &str = "TVM_RELEASES_URL";

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "TVM_DATA_DIR";

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "TVM_CACHE_DIR";

/// Default release catalog root.
const DEFAULT_RELEASES_URL: &str = "https://releases.hashicorp.com/terraform/";

/// Name of the delegated tool, as published in the catalog and archives.
const TOOL_NAME: &str = "terraform";

/// Human-readable tool name used in messages.
const DISPLAY_NAME: &str = "Terraform";

/// Directory name used under the platform data and cache directories.
const APP_DIR: &str = "tvm";

/// Default upper bound on concurrent catalog page fetches.
const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;

/// Explicit configuration shared by every component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Name of the delegated tool (`terraform`).
    pub tool_name: String,
    /// Capitalized tool name for user-facing messages.
    pub display_name: String,
    /// File name of the tool binary inside archives and install directories.
    pub binary_name: String,
    /// Host platform releases are selected for.
    pub platform: Platform,
    /// Root of the release catalog; always ends with `/`.
    pub releases_url: Url,
    /// Root data directory.
    pub data_dir: PathBuf,
    /// Install root: one subdirectory per installed version.
    pub versions_dir: PathBuf,
    /// Scratch space for installs; same filesystem as `versions_dir`.
    pub staging_dir: PathBuf,
    /// Directory for transient downloaded archives.
    pub cache_dir: PathBuf,
    /// Upper bound on concurrent catalog page fetches.
    pub max_concurrent_fetches: usize,
}

impl Config {
    /// Builds the configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported, the releases URL
    /// override is not a valid URL, or the platform data/cache directories
    /// cannot be determined and no override is set.
    pub fn from_env() -> Result<Self> {
        let platform = Platform::detect()?;

        let releases_url = parse_releases_url(
            &env_override(RELEASES_URL_ENV).unwrap_or_else(|| DEFAULT_RELEASES_URL.to_string()),
        )?;

        let data_dir = match env_override(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .ok_or_else(|| {
                    TvmError::not_found(format!(
                        "Cannot determine data directory. Set {DATA_DIR_ENV}."
                    ))
                })?
                .join(APP_DIR),
        };

        let cache_dir = match env_override(CACHE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::cache_dir()
                .ok_or_else(|| {
                    TvmError::not_found(format!(
                        "Cannot determine cache directory. Set {CACHE_DIR_ENV}."
                    ))
                })?
                .join(APP_DIR),
        };

        Ok(Self::with_dirs(platform, releases_url, data_dir, cache_dir))
    }

    /// Builds a configuration with explicit locations.
    #[must_use = "returns new config without side effects"]
    pub fn with_dirs(
        platform: Platform,
        releases_url: Url,
        data_dir: PathBuf,
        cache_dir: PathBuf,
    ) -> Self {
        Self {
            tool_name: TOOL_NAME.to_string(),
            display_name: DISPLAY_NAME.to_string(),
            binary_name: format!("{TOOL_NAME}{}", platform.executable_extension()),
            platform,
            releases_url,
            versions_dir: data_dir.join("versions"),
            staging_dir: data_dir.join("staging"),
            data_dir,
            cache_dir,
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
        }
    }

    /// Install directory of a given version.
    #[must_use = "returns the path without side effects"]
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.versions_dir.join(version)
    }

    /// Path of the tool binary inside a version's install directory.
    #[must_use = "returns the path without side effects"]
    pub fn binary_path(&self, version: &str) -> PathBuf {
        self.version_dir(version).join(&self.binary_name)
    }

    /// Whether an executable path refers to the delegated tool by name.
    ///
    /// Used to detect shim mode, where tvm was placed on `PATH` as `terraform`.
    #[must_use]
    pub fn is_tool_invocation(&self, argv0: &Path) -> bool {
        argv0
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n == self.binary_name || n == self.tool_name)
    }

    /// Creates the data, install, staging and cache directories.
    ///
    /// # Errors
    ///
    /// Returns an error if any directory cannot be created.
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.data_dir,
            &self.versions_dir,
            &self.staging_dir,
            &self.cache_dir,
        ] {
            std::fs::create_dir_all(dir).map_err(|e| TvmError::io_at("create directory", dir, e))?;
        }
        Ok(())
    }
}

/// Reads an environment override; empty or whitespace-only values count as unset.
fn env_override(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parses the catalog root, enforcing a trailing slash so relative links
/// resolve beneath it.
///
/// # Errors
///
/// Returns [`TvmError::Parse`] if `raw` is not an absolute URL.
pub fn parse_releases_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| TvmError::parse(format!("invalid releases URL '{raw}': {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn sample_config(root: &Path) -> Config {
        Config::with_dirs(
            Platform::new("linux", "amd64"),
            parse_releases_url(DEFAULT_RELEASES_URL).unwrap(),
            root.join("data"),
            root.join("cache"),
        )
    }

    #[test]
    fn with_dirs_derives_layout() {
        let config = sample_config(Path::new("/tmp/tvm-test"));
        assert_eq!(config.versions_dir, PathBuf::from("/tmp/tvm-test/data/versions"));
        assert_eq!(config.staging_dir, PathBuf::from("/tmp/tvm-test/data/staging"));
        assert_eq!(
            config.binary_path("1.0.0"),
            PathBuf::from("/tmp/tvm-test/data/versions/1.0.0/terraform")
        );
    }

    #[test]
    fn windows_binary_name_has_extension() {
        let config = Config::with_dirs(
            Platform::new("windows", "amd64"),
            parse_releases_url(DEFAULT_RELEASES_URL).unwrap(),
            PathBuf::from("data"),
            PathBuf::from("cache"),
        );
        assert_eq!(config.binary_name, "terraform.exe");
    }

    #[test]
    fn releases_url_gets_trailing_slash() {
        let url = parse_releases_url("http://localhost:8080/terraform").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/terraform/");
    }

    #[test]
    fn releases_url_rejects_relative() {
        let err = parse_releases_url("terraform/").unwrap_err();
        assert!(matches!(err, TvmError::Parse { .. }));
    }

    #[test]
    fn tool_invocation_matches_file_name_only() {
        let config = sample_config(Path::new("/tmp"));
        assert!(config.is_tool_invocation(Path::new("/usr/local/bin/terraform")));
        assert!(config.is_tool_invocation(Path::new("terraform")));
        assert!(!config.is_tool_invocation(Path::new("/usr/local/bin/tvm")));
        assert!(!config.is_tool_invocation(Path::new("/terraform/tvm")));
    }

    #[test]
    fn ensure_directories_creates_everything() {
        let temp = tempfile::tempdir().unwrap();
        let config = sample_config(temp.path());
        config.ensure_directories().unwrap();
        assert!(config.versions_dir.is_dir());
        assert!(config.staging_dir.is_dir());
        assert!(config.cache_dir.is_dir());
    }

    #[test]
    #[serial_test::serial]
    fn from_env_honors_overrides() {
        // SAFETY: serialized with other environment-mutating tests.
        unsafe {
            env::set_var(RELEASES_URL_ENV, "http://127.0.0.1:9/tf");
            env::set_var(DATA_DIR_ENV, "/tmp/tvm-data");
            env::set_var(CACHE_DIR_ENV, "  ");
        }

        let result = Config::from_env();

        // SAFETY: restoring previous state.
        unsafe {
            env::remove_var(RELEASES_URL_ENV);
            env::remove_var(DATA_DIR_ENV);
            env::remove_var(CACHE_DIR_ENV);
        }

        let Ok(config) = result else {
            // Hosts without a cache directory or supported platform cannot build a default.
            return;
        };
        assert_eq!(config.releases_url.as_str(), "http://127.0.0.1:9/tf/");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/tvm-data"));
        assert_ne!(config.cache_dir, PathBuf::from("  "));
    }
}
