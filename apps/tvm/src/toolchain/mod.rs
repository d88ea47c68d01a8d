//! Toolchain management for tvm.
//!
//! Everything needed to go from "which Terraform does this project want" to a
//! running binary: discovering releases, choosing a version, downloading and
//! verifying it, installing it, and delegating to it.
//!
//! ## Module Structure
//!
//! - [`platform`] - OS and architecture detection in catalog naming
//! - [`constraint`] - Version constraint grammar
//! - [`select`] - Version ordering and best-match selection
//! - [`catalog`] - Concurrent scraping of the release catalog
//! - [`checksums`] - `SHA256SUMS` manifest parsing
//! - [`download`] - Streaming download with digest verification
//! - [`install`] - Staged, atomic installation from a release archive
//! - [`installed`] - Enumeration of installed versions
//! - [`delegate`] - Hand-off to an installed binary

pub mod catalog;
pub mod checksums;
pub mod constraint;
pub mod delegate;
pub mod download;
pub mod install;
pub mod installed;
pub mod platform;
pub mod select;

pub use catalog::{fetch_candidates, http_client};
pub use constraint::{Constraint, Version};
pub use delegate::{exec, resolve};
pub use download::{Verification, fetch_verified};
pub use install::{install_archive, is_installed};
pub use installed::scan;
pub use platform::Platform;
pub use select::{select, sort_ascending};
